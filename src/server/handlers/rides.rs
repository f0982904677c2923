use axum::extract::{Extension, Json, Path, Query};
use uuid::Uuid;

use crate::api::{
    AcceptRide, CancelRide, CompleteRide, CompletedRide, CreateRide, CreatedRide, DynAPI,
    RideFilter, StartRide,
};
use crate::entities::Ride;
use crate::error::Error;

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<CreateRide>,
) -> Result<Json<CreatedRide>, Error> {
    let created = api.create_ride(params).await?;

    Ok(created.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, Error> {
    let ride = api.find_ride(id).await?;

    Ok(ride.into())
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    Query(filter): Query<RideFilter>,
) -> Result<Json<Vec<Ride>>, Error> {
    let rides = api.list_rides(filter).await?;

    Ok(rides.into())
}

pub async fn accept(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<AcceptRide>,
) -> Result<Json<Ride>, Error> {
    let ride = api.accept_ride(id, params).await?;

    Ok(ride.into())
}

pub async fn start(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<StartRide>,
) -> Result<Json<Ride>, Error> {
    let ride = api.start_ride(id, params).await?;

    Ok(ride.into())
}

pub async fn complete(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<CompleteRide>,
) -> Result<Json<CompletedRide>, Error> {
    let completed = api.complete_ride(id, params).await?;

    Ok(completed.into())
}

pub async fn cancel(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<CancelRide>,
) -> Result<Json<Ride>, Error> {
    let ride = api.cancel_ride(id, params).await?;

    Ok(ride.into())
}
