//! Administrator alerting for denied access attempts

use super::Observer;
use crate::error::Result;
use crate::sink::{Sink, TracingSink};
use crate::types::{AccessEvent, Identity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Alert raised for an unauthorized access attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Unique alert identifier (alrt-<uuid>)
    pub id: String,

    /// The denied identity
    pub identity: Identity,

    /// Human-readable description
    pub message: String,

    /// Timestamp (milliseconds since epoch)
    pub raised_at: i64,
}

impl Alert {
    /// Build an alert for a denied identity
    pub fn unauthorized(identity: &Identity) -> Self {
        Self {
            id: format!("alrt-{}", uuid::Uuid::new_v4()),
            identity: identity.clone(),
            message: format!("Unauthorized access attempt by user: {}", identity.name()),
            raised_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Observer that alerts administrators when access is denied
///
/// Granted events produce no effect.
pub struct AdminNotifier {
    sink: Arc<dyn Sink<Alert>>,
}

impl AdminNotifier {
    /// Create a notifier writing alerts to `sink`
    pub fn new(sink: Arc<dyn Sink<Alert>>) -> Self {
        Self { sink }
    }

    /// Name of the sink alerts are routed to
    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }
}

impl Default for AdminNotifier {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl Observer for AdminNotifier {
    fn update(&self, event: &AccessEvent) -> Result<()> {
        if event.granted() {
            return Ok(());
        }
        self.sink.write(&Alert::unauthorized(event.identity()))
    }

    fn name(&self) -> &str {
        "admin-notifier"
    }
}

impl Sink<Alert> for TracingSink {
    fn write(&self, alert: &Alert) -> Result<()> {
        tracing::warn!(
            alert_id = %alert.id,
            user = %alert.identity.name(),
            "[ALERT] {}",
            alert.message
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
