mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::api::{DynAPI, API};
use crate::server::handlers::{drivers, negotiations, payments, rides, search};

pub async fn serve<T: API + Send + Sync + 'static>(api: T, addr: SocketAddr) {
    let api = Arc::new(api) as DynAPI;

    let app = Router::new()
        .route("/rides", post(rides::create).get(rides::list))
        .route("/rides/:id", get(rides::find))
        .route("/rides/:id/accept", patch(rides::accept))
        .route("/rides/:id/start", patch(rides::start))
        .route("/rides/:id/complete", patch(rides::complete))
        .route("/rides/:id/cancel", patch(rides::cancel))
        .route("/rides/:id/negotiations", post(negotiations::propose))
        .route("/negotiations/:id/respond", patch(negotiations::respond))
        .route("/search/drivers", get(search::nearby_drivers))
        .route("/search/rides", get(search::available_rides))
        .route("/drivers/:id", get(drivers::find))
        .route("/drivers/:id/online", patch(drivers::go_online))
        .route("/drivers/:id/offline", patch(drivers::go_offline))
        .route("/drivers/:id/location", patch(drivers::update_location))
        .route("/payments/:id/status", patch(payments::update_status))
        .layer(Extension(api));

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
