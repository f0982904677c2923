mod driver_api;
mod helpers;
mod negotiation_api;
mod payment_api;
mod ride_api;
mod search_api;

use serde_json::Value;
use sqlx::{Executor, Pool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::API,
    config::Config,
    error::Error,
    external::{LiveChannel, Notification, Notifier, Topic},
};

type Database = Postgres;

// Row-lock ordering across all operations: ride, then driver, then rider.

pub struct Engine {
    pool: Pool<Database>,
    config: Config,
    notifier: Arc<dyn Notifier>,
    live: Arc<dyn LiveChannel>,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub async fn new(
        pool: Pool<Database>,
        config: Config,
        notifier: Arc<dyn Notifier>,
        live: Arc<dyn LiveChannel>,
    ) -> Result<Self, Error> {
        // ride service
        pool.execute("CREATE TABLE IF NOT EXISTS rides (id UUID PRIMARY KEY, status VARCHAR NOT NULL, data JSONB NOT NULL)")
            .await?;

        // negotiation service
        pool.execute("CREATE TABLE IF NOT EXISTS negotiations (id UUID PRIMARY KEY, ride_id UUID NOT NULL, status VARCHAR NOT NULL, data JSONB NOT NULL)")
            .await?;

        // payment service
        pool.execute("CREATE TABLE IF NOT EXISTS payments (id UUID PRIMARY KEY, ride_id UUID NOT NULL, status VARCHAR NOT NULL, data JSONB NOT NULL)")
            .await?;

        // promotions collaborator (read + usage increments only)
        pool.execute("CREATE TABLE IF NOT EXISTS promos (id UUID PRIMARY KEY, code VARCHAR NOT NULL UNIQUE, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS promo_usages (promo_id UUID NOT NULL, rider_id UUID NOT NULL, ride_id UUID NOT NULL, used_at TIMESTAMPTZ NOT NULL, PRIMARY KEY (promo_id, ride_id))")
            .await?;

        // parties
        pool.execute("CREATE TABLE IF NOT EXISTS riders (id UUID PRIMARY KEY, status VARCHAR NOT NULL, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS drivers (id UUID PRIMARY KEY, status VARCHAR NOT NULL, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS vehicles (id UUID PRIMARY KEY, driver_id UUID NOT NULL, data JSONB NOT NULL)")
            .await?;

        // driver presence feed for the matcher
        pool.execute("CREATE TABLE IF NOT EXISTS driver_locations (driver_id UUID PRIMARY KEY, latitude DOUBLE PRECISION NOT NULL, longitude DOUBLE PRECISION NOT NULL, expires_at TIMESTAMPTZ NOT NULL)")
            .await?;

        // completion rollups
        pool.execute("CREATE TABLE IF NOT EXISTS driver_daily_earnings (driver_id UUID NOT NULL, day DATE NOT NULL, rides INT4 NOT NULL, earnings DECIMAL NOT NULL, PRIMARY KEY (driver_id, day))")
            .await?;

        // wallet collaborator ledger
        pool.execute("CREATE TABLE IF NOT EXISTS wallets (user_id UUID PRIMARY KEY, balance DECIMAL NOT NULL)")
            .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS wallet_entries (id UUID PRIMARY KEY, user_id UUID NOT NULL, payment_id UUID NOT NULL, amount DECIMAL NOT NULL, direction VARCHAR NOT NULL, created_at TIMESTAMPTZ NOT NULL)")
            .await?;

        // rider address history, recorded at ride creation
        pool.execute("CREATE TABLE IF NOT EXISTS recent_locations (id UUID PRIMARY KEY, rider_id UUID NOT NULL, latitude DOUBLE PRECISION NOT NULL, longitude DOUBLE PRECISION NOT NULL, address VARCHAR NOT NULL, created_at TIMESTAMPTZ NOT NULL)")
            .await?;

        Ok(Self {
            pool,
            config,
            notifier,
            live,
        })
    }
}

impl Engine {
    /// Collaborator failures are logged, never propagated: by the time a
    /// notification goes out the primary transaction has committed.
    pub(crate) async fn notify(&self, user_id: Uuid, notification: Notification) {
        if let Err(err) = self.notifier.notify(user_id, notification).await {
            tracing::warn!(%user_id, "failed to dispatch notification: {err}");
        }
    }

    pub(crate) async fn publish(&self, topic: Topic, event: &str, payload: Value) {
        if let Err(err) = self.live.publish(topic, event, payload).await {
            tracing::warn!(topic = %topic.name(), event, "failed to publish live event: {err}");
        }
    }
}

impl API for Engine {}
