//! Access decision engine with synchronous observer dispatch
//!
//! `AccessDecisionEngine` decides access by allow-list membership and
//! delivers the resulting `AccessEvent` to every registered observer, in
//! registration order, before returning.
//!
//! The registry holds `Weak` handles: callers own their observers and the
//! engine never extends their lifetime. Entries whose observer has been
//! dropped are skipped and pruned on the next dispatch.

use crate::error::{AccessError, Result};
use crate::observer::{FailureKind, Observer, ObserverFailure};
use crate::types::{AccessEvent, Identity};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock, Weak};
use std::time::{Duration, Instant};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Report observers whose `update` takes longer than this (milliseconds)
    ///
    /// Overruns are reported, never aborted. `None` disables the check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow_observer_threshold_ms: Option<u64>,

    /// Catch observer panics and report them as failures
    pub catch_panics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slow_observer_threshold_ms: None,
            catch_panics: true,
        }
    }
}

/// Result of one access attempt and its dispatch
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// The decided event
    pub event: AccessEvent,

    /// Observers whose `update` returned successfully
    pub delivered: usize,

    /// Non-fatal failures, in dispatch order
    pub failures: Vec<ObserverFailure>,
}

impl DispatchReport {
    /// True when every observer was notified without failure
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures as `AccessError::ObserverFailed` values, in dispatch order
    pub fn errors(&self) -> Vec<AccessError> {
        self.failures.iter().cloned().map(AccessError::from).collect()
    }
}

/// Allow-list access decisions broadcast to registered observers
///
/// Thread-safe: the registry sits behind a `RwLock`, and dispatch works on a
/// snapshot taken under the read lock, so observers may register or remove
/// observers from inside `update` without deadlocking.
pub struct AccessDecisionEngine {
    config: EngineConfig,
    observers: RwLock<Vec<Weak<dyn Observer>>>,
}

impl std::fmt::Debug for AccessDecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessDecisionEngine")
            .field("config", &self.config)
            .field("observers_count", &self.observer_count())
            .finish()
    }
}

impl Default for AccessDecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessDecisionEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with an explicit configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Get the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register an observer
    ///
    /// Only a weak handle is kept. Registering the same observer twice
    /// yields two notifications per event.
    pub fn add_observer(&self, observer: &Arc<dyn Observer>) {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        observers.push(Arc::downgrade(observer));

        tracing::debug!(
            observer = %observer.name(),
            registered = observers.len(),
            "Observer added"
        );
    }

    /// Remove the first registry entry matching `observer`
    ///
    /// Matching is by pointer identity. Returns `false` (and changes
    /// nothing) when the observer is not registered.
    pub fn remove_observer(&self, observer: &Arc<dyn Observer>) -> bool {
        let target = Arc::downgrade(observer);
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match observers.iter().position(|entry| Weak::ptr_eq(entry, &target)) {
            Some(index) => {
                observers.remove(index);
                tracing::debug!(
                    observer = %observer.name(),
                    registered = observers.len(),
                    "Observer removed"
                );
                true
            }
            None => false,
        }
    }

    /// Remove every registered observer
    pub fn clear_observers(&self) {
        self.observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Number of registered observers that are still alive
    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    /// Decide access for `candidate` and notify every observer
    ///
    /// Observer failures are logged and never change the returned event.
    pub fn process_access(
        &self,
        candidate: &Identity,
        allow_list: &[Identity],
    ) -> Result<AccessEvent> {
        self.process_access_reported(candidate, allow_list)
            .map(|report| report.event)
    }

    /// Decide access and return the event together with dispatch failures
    pub fn process_access_reported(
        &self,
        candidate: &Identity,
        allow_list: &[Identity],
    ) -> Result<DispatchReport> {
        if candidate.is_unset() {
            return Err(AccessError::InvalidIdentity(
                "candidate identity has no principal name".to_string(),
            ));
        }

        let granted = allow_list.contains(candidate);
        let event = AccessEvent::new(candidate.clone(), granted);

        tracing::debug!(
            user = %candidate.name(),
            granted,
            allow_list = allow_list.len(),
            "Access decided"
        );

        Ok(self.dispatch(event))
    }

    /// Deliver `event` to a snapshot of the live observers, in order
    fn dispatch(&self, event: AccessEvent) -> DispatchReport {
        let observers = self.snapshot();
        let threshold = self
            .config
            .slow_observer_threshold_ms
            .map(Duration::from_millis);

        let mut delivered = 0;
        let mut failures = Vec::new();

        for (position, observer) in observers.iter().enumerate() {
            let started = Instant::now();
            let outcome = self.invoke(observer.as_ref(), &event);
            let elapsed = started.elapsed();

            match outcome {
                Ok(()) => delivered += 1,
                Err((kind, message)) => failures.push(ObserverFailure {
                    observer: observer.name().to_string(),
                    position,
                    kind,
                    message,
                }),
            }

            if let Some(limit) = threshold {
                if elapsed > limit {
                    failures.push(ObserverFailure {
                        observer: observer.name().to_string(),
                        position,
                        kind: FailureKind::SlowObserver,
                        message: format!(
                            "update took {}ms (threshold {}ms)",
                            elapsed.as_millis(),
                            limit.as_millis()
                        ),
                    });
                }
            }
        }

        for failure in &failures {
            let error = AccessError::from(failure.clone());
            tracing::warn!(
                observer = %failure.observer,
                position = failure.position,
                kind = ?failure.kind,
                user = %event.identity().name(),
                error = %error,
                "Observer dispatch failed"
            );
        }

        DispatchReport {
            event,
            delivered,
            failures,
        }
    }

    fn invoke(
        &self,
        observer: &dyn Observer,
        event: &AccessEvent,
    ) -> std::result::Result<(), (FailureKind, String)> {
        if !self.config.catch_panics {
            return observer
                .update(event)
                .map_err(|e| (FailureKind::Error, e.to_string()));
        }

        match panic::catch_unwind(AssertUnwindSafe(|| observer.update(event))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err((FailureKind::Error, e.to_string())),
            Err(payload) => Err((FailureKind::Panic, panic_message(payload.as_ref()))),
        }
    }

    /// Upgrade live handles and prune dead ones
    fn snapshot(&self) -> Vec<Arc<dyn Observer>> {
        let (live, dead) = {
            let observers = self
                .observers
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let live: Vec<Arc<dyn Observer>> =
                observers.iter().filter_map(Weak::upgrade).collect();
            let dead = observers.len() - live.len();
            (live, dead)
        };

        if dead > 0 {
            let mut observers = self
                .observers
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            observers.retain(|entry| entry.strong_count() > 0);
            tracing::debug!(pruned = dead, "Dropped observers pruned");
        }

        live
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
