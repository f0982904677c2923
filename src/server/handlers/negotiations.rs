use axum::extract::{Extension, Json, Path};
use uuid::Uuid;

use crate::api::{DynAPI, ProposeNegotiation, RespondNegotiation};
use crate::entities::Negotiation;
use crate::error::Error;

pub async fn propose(
    Extension(api): Extension<DynAPI>,
    Path(ride_id): Path<Uuid>,
    Json(params): Json<ProposeNegotiation>,
) -> Result<Json<Negotiation>, Error> {
    let negotiation = api.propose_negotiation(ride_id, params).await?;

    Ok(negotiation.into())
}

pub async fn respond(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<RespondNegotiation>,
) -> Result<Json<Negotiation>, Error> {
    let negotiation = api.respond_negotiation(id, params).await?;

    Ok(negotiation.into())
}
