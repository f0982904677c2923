use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Error;

/// Topics are scoped per party so clients only ever subscribe to their own
/// stream.
#[derive(Clone, Copy, Debug)]
pub enum Topic {
    Rider(Uuid),
    Driver(Uuid),
}

impl Topic {
    pub fn name(&self) -> String {
        match self {
            Self::Rider(id) => format!("rider:{id}"),
            Self::Driver(id) => format!("driver:{id}"),
        }
    }
}

/// Near-real-time fan-out to connected clients. Like notifications, a
/// publish failure is logged by the caller and never fails the operation
/// that produced the event.
#[async_trait]
pub trait LiveChannel: Send + Sync {
    async fn publish(&self, topic: Topic, event: &str, payload: Value) -> Result<(), Error>;
}

pub struct LogChannel;

#[async_trait]
impl LiveChannel for LogChannel {
    async fn publish(&self, topic: Topic, event: &str, _payload: Value) -> Result<(), Error> {
        tracing::debug!(topic = %topic.name(), event, "live event published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_are_party_scoped() {
        let id = Uuid::nil();
        assert_eq!(Topic::Rider(id).name(), format!("rider:{id}"));
        assert_eq!(Topic::Driver(id).name(), format!("driver:{id}"));
    }
}
