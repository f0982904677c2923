use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::env;
use uuid::Uuid;

use crate::error::{upstream_error, Error};

#[derive(Clone, Debug, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: Kind,
    pub data: Value,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    RideAccepted,
    RideStarted,
    RideCompleted,
    RideCancelled,
    NegotiationResolved,
    PaymentUpdated,
}

impl Notification {
    pub fn new(kind: Kind, title: impl Into<String>, message: impl Into<String>, data: Value) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            data,
        }
    }
}

/// Push delivery is fire-and-forget from the engine's point of view: a
/// failed dispatch is logged by the caller and never rolls back the ride
/// transaction that triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: Uuid, notification: Notification) -> Result<(), Error>;
}

pub struct PushGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PushGateway {
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: env::var("PUSH_GATEWAY_URL")?,
            api_key: env::var("PUSH_GATEWAY_KEY")?,
        })
    }
}

#[async_trait]
impl Notifier for PushGateway {
    #[tracing::instrument(skip(self))]
    async fn notify(&self, user_id: Uuid, notification: Notification) -> Result<(), Error> {
        let url = format!("{}/v1/notifications", self.base_url);

        let res = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "user_id": user_id,
                "notification": notification,
            }))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(upstream_error());
        }

        Ok(())
    }
}

/// Default wiring for deployments without a push gateway.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: Uuid, notification: Notification) -> Result<(), Error> {
        tracing::info!(
            %user_id,
            kind = ?notification.kind,
            title = %notification.title,
            "notification dispatched"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_notifier_always_delivers() {
        let notification = Notification::new(
            Kind::RideAccepted,
            "Driver found",
            "Your driver is on the way",
            json!({}),
        );

        let result = tokio_test::block_on(LogNotifier.notify(Uuid::new_v4(), notification));
        assert!(result.is_ok());
    }
}
