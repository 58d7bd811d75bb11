//! # a3s-access
//!
//! Allow-list access decisions with synchronous observer dispatch for the
//! A3S ecosystem.
//!
//! ## Overview
//!
//! `a3s-access` decides whether a presented identity may pass and broadcasts
//! every decision to a dynamic set of observers, such as an administrator
//! alert channel and an audit trail. Observers route their side effects
//! through pluggable sinks (tracing, in-memory, JSON-lines file).
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_access::{
//!     AccessDecisionEngine, AdminNotifier, BiometricTemplate, Identity, Logger, Observer,
//! };
//! use std::sync::Arc;
//!
//! # fn example() -> a3s_access::Result<()> {
//! let engine = AccessDecisionEngine::new();
//!
//! // The engine keeps weak handles; hold on to the observers
//! let notifier: Arc<dyn Observer> = Arc::new(AdminNotifier::default());
//! let logger: Arc<dyn Observer> = Arc::new(Logger::default());
//! engine.add_observer(&notifier);
//! engine.add_observer(&logger);
//!
//! let ivan = Identity::new("Ivan", BiometricTemplate::new("fingerprint1", "iris1"));
//! let olga = Identity::new("Olga", BiometricTemplate::new("fingerprint2", "iris2"));
//! let allowed = vec![ivan.clone(), olga];
//!
//! let event = engine.process_access(&ivan, &allowed)?;
//! assert!(event.granted());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Observer** trait — capability every listener implements
//! - **AccessDecisionEngine** — membership check plus ordered dispatch
//! - **Sink** trait — destination for alerts and audit entries
//! - **AccessEvent** — immutable record of one decision

pub mod engine;
pub mod error;
pub mod observer;
pub mod sink;
pub mod types;

// Re-export core types
pub use engine::{AccessDecisionEngine, DispatchReport, EngineConfig};
pub use error::{AccessError, Result};
pub use observer::logger::{AuditEntry, Logger};
pub use observer::notifier::{AdminNotifier, Alert};
pub use observer::{FailureKind, Observer, ObserverFailure};
pub use sink::{FileSink, FileSinkConfig, MemorySink, Sink, TracingSink};
pub use types::{AccessEvent, BiometricTemplate, Identity};
