use axum::extract::{Extension, Json, Path};
use uuid::Uuid;

use crate::api::{DynAPI, UpdatePaymentStatus};
use crate::entities::Payment;
use crate::error::Error;

pub async fn update_status(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<UpdatePaymentStatus>,
) -> Result<Json<Payment>, Error> {
    let payment = api.update_payment_status(id, params).await?;

    Ok(payment.into())
}
