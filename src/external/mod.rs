pub mod live;
pub mod notifier;

pub use live::{LiveChannel, LogChannel, Topic};
pub use notifier::{LogNotifier, Notification, Notifier, PushGateway};

use std::sync::Arc;

/// Prefers the configured push gateway, falling back to log-only delivery
/// when the deployment carries none.
pub fn notifier_from_env() -> Arc<dyn Notifier> {
    match PushGateway::from_env() {
        Ok(gateway) => Arc::new(gateway),
        Err(_) => Arc::new(LogNotifier),
    }
}
