use axum::extract::{Extension, Json, Query};

use crate::api::{AvailableRide, AvailableSearch, DynAPI, NearbyDriver, NearbySearch};
use crate::error::Error;

pub async fn nearby_drivers(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<NearbySearch>,
) -> Result<Json<Vec<NearbyDriver>>, Error> {
    let drivers = api.nearby_drivers(params).await?;

    Ok(drivers.into())
}

pub async fn available_rides(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<AvailableSearch>,
) -> Result<Json<Vec<AvailableRide>>, Error> {
    let rides = api.available_rides(params).await?;

    Ok(rides.into())
}
