//! Access engine integration tests
//!
//! End-to-end tests exercising decisions, ordered dispatch, observer
//! isolation, sinks, and concurrent registry use.

use a3s_access::{
    AccessDecisionEngine, AccessError, AccessEvent, AdminNotifier, Alert, AuditEntry,
    BiometricTemplate, EngineConfig, FailureKind, FileSink, FileSinkConfig, Identity, Logger,
    MemorySink, Observer,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn user(name: &str, fingerprint: &str, iris: &str) -> Identity {
    Identity::new(name, BiometricTemplate::new(fingerprint, iris))
}

fn ivan() -> Identity {
    user("Ivan", "fingerprint1", "iris1")
}

fn olga() -> Identity {
    user("Olga", "fingerprint2", "iris2")
}

fn stranger() -> Identity {
    user("Stranger", "fingerprint3", "iris3")
}

struct Harness {
    engine: AccessDecisionEngine,
    alerts: Arc<MemorySink<Alert>>,
    audit: Arc<MemorySink<AuditEntry>>,
    _notifier: Arc<dyn Observer>,
    _logger: Arc<dyn Observer>,
}

fn harness() -> Harness {
    init_tracing();
    let engine = AccessDecisionEngine::new();
    let alerts = Arc::new(MemorySink::<Alert>::new(100));
    let audit = Arc::new(MemorySink::<AuditEntry>::new(100));

    let notifier: Arc<dyn Observer> = Arc::new(AdminNotifier::new(alerts.clone()));
    let logger: Arc<dyn Observer> = Arc::new(Logger::new(audit.clone()));
    engine.add_observer(&notifier);
    engine.add_observer(&logger);

    Harness {
        engine,
        alerts,
        audit,
        _notifier: notifier,
        _logger: logger,
    }
}

struct Counting {
    count: AtomicUsize,
}

impl Counting {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            count: AtomicUsize::new(0),
        })
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Observer for Counting {
    fn update(&self, _event: &AccessEvent) -> a3s_access::Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

struct Failing;

impl Observer for Failing {
    fn update(&self, _event: &AccessEvent) -> a3s_access::Result<()> {
        Err(AccessError::Sink {
            sink: "pager".to_string(),
            reason: "channel unavailable".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

struct Panicking;

impl Observer for Panicking {
    fn update(&self, _event: &AccessEvent) -> a3s_access::Result<()> {
        panic!("observer exploded");
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

struct Sleepy(Duration);

impl Observer for Sleepy {
    fn update(&self, _event: &AccessEvent) -> a3s_access::Result<()> {
        std::thread::sleep(self.0);
        Ok(())
    }

    fn name(&self) -> &str {
        "sleepy"
    }
}

// ─── Decisions ───────────────────────────────────────────────────

#[test]
fn test_allowed_user_is_granted_and_logged() {
    let h = harness();
    let allowed = vec![ivan(), olga()];

    let event = h.engine.process_access(&ivan(), &allowed).unwrap();

    assert!(event.granted());
    assert_eq!(event.identity(), &ivan());
    assert_eq!(h.audit.len(), 1);
    assert!(h.audit.records()[0].granted);
    assert!(h.alerts.is_empty());
}

#[test]
fn test_unknown_user_is_denied_and_alerted() {
    let h = harness();
    let allowed = vec![ivan(), olga()];

    let event = h.engine.process_access(&stranger(), &allowed).unwrap();

    assert!(!event.granted());
    assert_eq!(event.identity().name(), "Stranger");

    let audit = h.audit.records();
    assert_eq!(audit.len(), 1);
    assert!(!audit[0].granted);

    let alerts = h.alerts.records();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].identity, stranger());
    assert!(alerts[0].message.contains("Stranger"));
}

#[test]
fn test_reconstructed_identity_matches_by_value() {
    let h = harness();
    let allowed = vec![ivan(), olga()];

    // A fresh record for the same principal must not be denied
    let presented = user("Olga", "fingerprint2", "iris2");
    assert!(h.engine.process_access(&presented, &allowed).unwrap().granted());
}

#[test]
fn test_same_name_different_template_is_denied() {
    let h = harness();
    let impostor = user("Ivan", "fingerprint9", "iris1");

    let event = h.engine.process_access(&impostor, &[ivan(), olga()]).unwrap();
    assert!(!event.granted());
    assert_eq!(h.alerts.len(), 1);
}

#[test]
fn test_empty_allow_list_denies() {
    let h = harness();
    assert!(!h.engine.process_access(&ivan(), &[]).unwrap().granted());
}

#[test]
fn test_invalid_identity_dispatches_nothing() {
    let h = harness();
    let blank = user("", "fingerprint1", "iris1");

    let err = h.engine.process_access(&blank, &[blank.clone()]).unwrap_err();

    assert!(matches!(err, AccessError::InvalidIdentity(_)));
    assert!(h.audit.is_empty());
    assert!(h.alerts.is_empty());
}

// ─── Dispatch ────────────────────────────────────────────────────

#[test]
fn test_no_observers_still_decides() {
    let engine = AccessDecisionEngine::new();
    let report = engine
        .process_access_reported(&ivan(), &[ivan()])
        .unwrap();

    assert!(report.event.granted());
    assert_eq!(report.delivered, 0);
    assert!(report.is_clean());
}

#[test]
fn test_duplicate_registration_notifies_twice() {
    let engine = AccessDecisionEngine::new();
    let counter = Counting::new();
    let handle: Arc<dyn Observer> = counter.clone();

    engine.add_observer(&handle);
    engine.add_observer(&handle);
    engine.process_access(&ivan(), &[ivan()]).unwrap();

    assert_eq!(counter.count(), 2);
}

#[test]
fn test_repeated_calls_are_not_deduplicated() {
    let h = harness();
    let allowed = vec![ivan(), olga()];

    let first = h.engine.process_access(&stranger(), &allowed).unwrap();
    let second = h.engine.process_access(&stranger(), &allowed).unwrap();

    assert_eq!(first, second);
    assert_eq!(h.audit.len(), 2);
    assert_eq!(h.alerts.len(), 2);
}

#[test]
fn test_removed_observer_stops_receiving() {
    let engine = AccessDecisionEngine::new();
    let counter = Counting::new();
    let handle: Arc<dyn Observer> = counter.clone();

    engine.add_observer(&handle);
    engine.process_access(&ivan(), &[]).unwrap();
    assert!(engine.remove_observer(&handle));
    engine.process_access(&ivan(), &[]).unwrap();

    assert_eq!(counter.count(), 1);
    assert!(!engine.remove_observer(&handle));
}

#[test]
fn test_clear_observers() {
    let h = harness();
    h.engine.clear_observers();

    h.engine.process_access(&stranger(), &[ivan()]).unwrap();

    assert_eq!(h.engine.observer_count(), 0);
    assert!(h.audit.is_empty());
    assert!(h.alerts.is_empty());
}

// ─── Failure isolation ───────────────────────────────────────────

#[test]
fn test_failing_observer_does_not_block_others() {
    init_tracing();
    let engine = AccessDecisionEngine::new();
    let failing: Arc<dyn Observer> = Arc::new(Failing);
    let counter = Counting::new();
    let counting: Arc<dyn Observer> = counter.clone();

    engine.add_observer(&failing);
    engine.add_observer(&counting);

    let report = engine
        .process_access_reported(&stranger(), &[ivan()])
        .unwrap();

    assert!(!report.event.granted());
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].observer, "failing");
    assert_eq!(report.failures[0].position, 0);
    assert_eq!(report.failures[0].kind, FailureKind::Error);
    assert!(report.failures[0].message.contains("channel unavailable"));
    assert_eq!(counter.count(), 1);
}

#[test]
fn test_panicking_observer_is_contained() {
    init_tracing();
    let engine = AccessDecisionEngine::new();
    let panicking: Arc<dyn Observer> = Arc::new(Panicking);
    let counter = Counting::new();
    let counting: Arc<dyn Observer> = counter.clone();

    engine.add_observer(&panicking);
    engine.add_observer(&counting);

    let event = engine.process_access(&ivan(), &[ivan()]).unwrap();
    assert!(event.granted());
    assert_eq!(counter.count(), 1);

    let report = engine.process_access_reported(&ivan(), &[ivan()]).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::Panic);
    assert!(report.failures[0].message.contains("observer exploded"));
}

#[test]
fn test_slow_observer_is_reported_not_aborted() {
    init_tracing();
    let engine = AccessDecisionEngine::with_config(EngineConfig {
        slow_observer_threshold_ms: Some(1),
        ..EngineConfig::default()
    });
    let sleepy: Arc<dyn Observer> = Arc::new(Sleepy(Duration::from_millis(20)));
    engine.add_observer(&sleepy);

    let report = engine.process_access_reported(&ivan(), &[]).unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::SlowObserver);
}

#[test]
#[should_panic(expected = "observer exploded")]
fn test_panic_propagates_when_catching_disabled() {
    let engine = AccessDecisionEngine::with_config(EngineConfig {
        catch_panics: false,
        ..EngineConfig::default()
    });
    let panicking: Arc<dyn Observer> = Arc::new(Panicking);
    engine.add_observer(&panicking);

    let _ = engine.process_access(&ivan(), &[ivan()]);
}

#[test]
fn test_observer_within_threshold_is_clean() {
    let engine = AccessDecisionEngine::with_config(EngineConfig {
        slow_observer_threshold_ms: Some(10_000),
        ..EngineConfig::default()
    });
    let counter = Counting::new();
    let counting: Arc<dyn Observer> = counter.clone();
    engine.add_observer(&counting);

    let report = engine.process_access_reported(&ivan(), &[]).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.delivered, 1);
    assert!(report.errors().is_empty());
}

#[test]
fn test_report_errors_name_failing_observer() {
    let engine = AccessDecisionEngine::new();
    let failing: Arc<dyn Observer> = Arc::new(Failing);
    engine.add_observer(&failing);

    let report = engine.process_access_reported(&ivan(), &[]).unwrap();
    let errors = report.errors();

    assert_eq!(errors.len(), 1);
    match &errors[0] {
        AccessError::ObserverFailed { observer, reason } => {
            assert_eq!(observer, "failing");
            assert!(reason.contains("channel unavailable"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ─── Sinks ───────────────────────────────────────────────────────

#[test]
fn test_file_audit_trail_survives_engine() {
    init_tracing();
    let dir = std::env::temp_dir().join(format!("a3s-access-test-{}", uuid::Uuid::new_v4()));
    let path = dir.join("audit.jsonl");

    {
        let engine = AccessDecisionEngine::new();
        let sink = Arc::new(
            FileSink::<AuditEntry>::open(FileSinkConfig {
                path: path.clone(),
                flush_each: false,
            })
            .unwrap(),
        );
        let logger: Arc<dyn Observer> = Arc::new(Logger::new(sink));
        engine.add_observer(&logger);

        engine.process_access(&ivan(), &[ivan(), olga()]).unwrap();
        engine.process_access(&stranger(), &[ivan(), olga()]).unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let entries: Vec<AuditEntry> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(entries.len(), 2);
    assert!(entries[0].granted);
    assert_eq!(entries[1].identity.name(), "Stranger");
    assert!(!entries[1].granted);

    let _ = std::fs::remove_dir_all(&dir);
}

// ─── Concurrency ─────────────────────────────────────────────────

#[test]
fn test_concurrent_dispatch_and_registration() {
    let engine = Arc::new(AccessDecisionEngine::new());
    let counter = Counting::new();
    let stable: Arc<dyn Observer> = counter.clone();
    engine.add_observer(&stable);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let engine = engine.clone();
            scope.spawn(move || {
                for _ in 0..50 {
                    engine.process_access(&ivan(), &[ivan()]).unwrap();
                }
            });
        }

        let engine = engine.clone();
        scope.spawn(move || {
            for _ in 0..50 {
                let churn: Arc<dyn Observer> = Counting::new();
                engine.add_observer(&churn);
                engine.remove_observer(&churn);
            }
        });
    });

    assert_eq!(counter.count(), 200);
    assert_eq!(engine.observer_count(), 1);
}

#[test]
fn test_observer_may_modify_registry_during_dispatch() {
    struct SelfRemoving {
        engine: Arc<AccessDecisionEngine>,
        me: std::sync::Mutex<Option<Arc<dyn Observer>>>,
        calls: AtomicUsize,
    }

    impl Observer for SelfRemoving {
        fn update(&self, _event: &AccessEvent) -> a3s_access::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(me) = self.me.lock().unwrap().take() {
                self.engine.remove_observer(&me);
            }
            Ok(())
        }
    }

    let engine = Arc::new(AccessDecisionEngine::new());
    let observer = Arc::new(SelfRemoving {
        engine: engine.clone(),
        me: std::sync::Mutex::new(None),
        calls: AtomicUsize::new(0),
    });
    let handle: Arc<dyn Observer> = observer.clone();
    *observer.me.lock().unwrap() = Some(handle.clone());
    engine.add_observer(&handle);

    engine.process_access(&ivan(), &[]).unwrap();
    engine.process_access(&ivan(), &[]).unwrap();

    assert_eq!(observer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.observer_count(), 0);
}
