//! Observer trait — the capability every access-event listener implements
//!
//! The engine calls `update` once per dispatched event, synchronously and
//! in registration order. Observers report failures through the returned
//! `Result`; the engine isolates them so one failing observer never blocks
//! delivery to the rest.

use crate::error::Result;
use crate::types::AccessEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod logger;
pub mod notifier;

/// Listener notified of every access decision
pub trait Observer: Send + Sync {
    /// Handle a dispatched access event
    fn update(&self, event: &AccessEvent) -> Result<()>;

    /// Observer name used in logs and failure reports
    fn name(&self) -> &str {
        "observer"
    }
}

/// Why an observer's delivery was reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// `update` returned an error
    Error,
    /// `update` panicked
    Panic,
    /// `update` completed but exceeded the configured time threshold
    SlowObserver,
}

/// Non-fatal failure recorded while dispatching to one observer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverFailure {
    /// Name of the observer that failed
    pub observer: String,

    /// Position of the observer in the dispatch order
    pub position: usize,

    /// Failure kind
    pub kind: FailureKind,

    /// Human-readable detail
    pub message: String,
}

impl fmt::Display for ObserverFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "observer '{}' at position {} ({:?}): {}",
            self.observer, self.position, self.kind, self.message
        )
    }
}
