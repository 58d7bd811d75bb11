//! Audit logging for access decisions
//!
//! Records every access event, granted or denied, as an `AuditEntry`
//! routed to a pluggable sink.

use super::Observer;
use crate::error::Result;
use crate::sink::{Sink, TracingSink};
use crate::types::{status_label, AccessEvent, Identity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A structured audit record of one access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Unique entry identifier (aud-<uuid>)
    pub id: String,

    /// Identity that attempted access
    pub identity: Identity,

    /// Whether access was granted
    pub granted: bool,

    /// Timestamp (milliseconds since epoch)
    pub recorded_at: i64,
}

impl AuditEntry {
    /// Build an audit entry from an access event
    pub fn from_event(event: &AccessEvent) -> Self {
        Self {
            id: format!("aud-{}", uuid::Uuid::new_v4()),
            identity: event.identity().clone(),
            granted: event.granted(),
            recorded_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Status label of the recorded decision
    pub fn status(&self) -> &'static str {
        status_label(self.granted)
    }
}

/// Observer that records every access event to an audit trail
pub struct Logger {
    sink: Arc<dyn Sink<AuditEntry>>,
}

impl Logger {
    /// Create a logger writing entries to `sink`
    pub fn new(sink: Arc<dyn Sink<AuditEntry>>) -> Self {
        Self { sink }
    }

    /// Name of the sink entries are routed to
    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl Observer for Logger {
    fn update(&self, event: &AccessEvent) -> Result<()> {
        self.sink.write(&AuditEntry::from_event(event))
    }

    fn name(&self) -> &str {
        "audit-logger"
    }
}

impl Sink<AuditEntry> for TracingSink {
    fn write(&self, entry: &AuditEntry) -> Result<()> {
        tracing::info!(
            entry_id = %entry.id,
            user = %entry.identity.name(),
            granted = entry.granted,
            "[LOG] Access event [user: {}, status: {}]",
            entry.identity.name(),
            entry.status()
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
