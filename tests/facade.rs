//! End-to-end dispatch tests through the facade.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use herald::{
    Behavior, BuildError, Command, CommandHandler, Event, EventSubscriber, Herald, Next,
    RegistryError, SendError, SubscriberError, UseCase, UseCaseHandler,
};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

struct Multiply(i64);

impl Command for Multiply {
    type Response = i64;
}

/// External collaborator injected into the handler.
struct Multiplier {
    factor: i64,
}

impl Multiplier {
    fn apply(&self, value: i64) -> i64 {
        value * self.factor
    }
}

struct MultiplyHandler {
    multiplier: Arc<Multiplier>,
}

#[async_trait]
impl CommandHandler<Multiply> for MultiplyHandler {
    async fn handle(&self, command: Multiply, _cancel: CancellationToken) -> i64 {
        self.multiplier.apply(command.0)
    }
}

struct Submit;

impl Command for Submit {
    type Response = Result<&'static str, String>;
}

struct SubmitHandler {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CommandHandler<Submit> for SubmitHandler {
    async fn handle(
        &self,
        _command: Submit,
        _cancel: CancellationToken,
    ) -> Result<&'static str, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("accepted")
    }
}

struct Recording {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Behavior<Submit> for Recording {
    async fn handle(
        &self,
        command: Submit,
        next: Next<Submit>,
        cancel: CancellationToken,
    ) -> Result<&'static str, String> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}-before", self.label));
        let response = next.run(command, cancel).await;
        self.log
            .lock()
            .unwrap()
            .push(format!("{}-after", self.label));
        response
    }
}

struct RejectAll;

#[async_trait]
impl Behavior<Submit> for RejectAll {
    async fn handle(
        &self,
        _command: Submit,
        _next: Next<Submit>,
        _cancel: CancellationToken,
    ) -> Result<&'static str, String> {
        Err("validation failed".to_string())
    }
}

struct BailOnCancel;

#[async_trait]
impl Behavior<Submit> for BailOnCancel {
    async fn handle(
        &self,
        command: Submit,
        next: Next<Submit>,
        cancel: CancellationToken,
    ) -> Result<&'static str, String> {
        if cancel.is_cancelled() {
            return Err("cancelled".to_string());
        }
        next.run(command, cancel).await
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

struct ValueChanged {
    value: i64,
}

impl Event for ValueChanged {}

struct ValueRecorder {
    seen: Mutex<Vec<i64>>,
}

impl ValueRecorder {
    fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EventSubscriber<ValueChanged> for ValueRecorder {
    async fn handle(
        &self,
        event: Arc<ValueChanged>,
        _cancel: CancellationToken,
    ) -> Result<(), SubscriberError> {
        self.seen.lock().unwrap().push(event.value);
        Ok(())
    }
}

struct AlwaysFails;

#[async_trait]
impl EventSubscriber<ValueChanged> for AlwaysFails {
    async fn handle(
        &self,
        _event: Arc<ValueChanged>,
        _cancel: CancellationToken,
    ) -> Result<(), SubscriberError> {
        Err(SubscriberError::Failed("intentional failure".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Use cases
// ---------------------------------------------------------------------------

struct Shout(String);

impl UseCase for Shout {
    type Output = String;
}

struct ShoutHandler;

#[async_trait]
impl UseCaseHandler<Shout> for ShoutHandler {
    async fn execute(&self, use_case: Shout, _cancel: CancellationToken) -> String {
        use_case.0.to_uppercase()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn round_trip_with_injected_collaborator() {
    let herald = Herald::builder()
        .command_handler(MultiplyHandler {
            multiplier: Arc::new(Multiplier { factor: 10 }),
        })
        .build()
        .unwrap();

    assert_eq!(herald.send(Multiply(5)).await.unwrap(), 50);
}

#[tokio::test]
async fn send_without_handler_fails_with_handler_not_found() {
    let herald = Herald::builder().build().unwrap();

    let result = herald.send(Multiply(5)).await;

    match result {
        Err(SendError::HandlerNotFound { command }) => assert!(command.contains("Multiply")),
        _ => panic!("Expected HandlerNotFound"),
    }
}

#[tokio::test]
async fn behaviors_run_in_onion_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let herald = Herald::builder()
        .command_handler(SubmitHandler {
            calls: Arc::new(AtomicUsize::new(0)),
        })
        .behavior::<Submit, _>(Recording {
            label: "first",
            log: Arc::clone(&log),
        })
        .behavior::<Submit, _>(Recording {
            label: "second",
            log: Arc::clone(&log),
        })
        .build()
        .unwrap();

    assert_eq!(herald.send(Submit).await.unwrap(), Ok("accepted"));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["first-before", "second-before", "second-after", "first-after"]
    );
}

#[tokio::test]
async fn lower_order_group_wraps_higher() {
    let log = Arc::new(Mutex::new(Vec::new()));
    // Registered inner-first; the explicit order groups must win.
    let herald = Herald::builder()
        .command_handler(SubmitHandler {
            calls: Arc::new(AtomicUsize::new(0)),
        })
        .behavior_with_order::<Submit, _>(
            Recording {
                label: "inner",
                log: Arc::clone(&log),
            },
            10,
        )
        .behavior_with_order::<Submit, _>(
            Recording {
                label: "outer",
                log: Arc::clone(&log),
            },
            -10,
        )
        .build()
        .unwrap();

    herald.send(Submit).await.unwrap().unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["outer-before", "inner-before", "inner-after", "outer-after"]
    );
}

#[tokio::test]
async fn short_circuiting_behavior_prevents_handler_side_effects() {
    let calls = Arc::new(AtomicUsize::new(0));
    let herald = Herald::builder()
        .command_handler(SubmitHandler {
            calls: Arc::clone(&calls),
        })
        .behavior::<Submit, _>(RejectAll)
        .build()
        .unwrap();

    let response = herald.send(Submit).await.unwrap();

    assert_eq!(response, Err("validation failed".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_first_dispatches_all_observe_one_pipeline() {
    let herald = Arc::new(
        Herald::builder()
            .command_handler(MultiplyHandler {
                multiplier: Arc::new(Multiplier { factor: 10 }),
            })
            .build()
            .unwrap(),
    );

    let mut tasks = Vec::new();
    for i in 0..32i64 {
        let herald = Arc::clone(&herald);
        tasks.push(tokio::spawn(
            async move { herald.send(Multiply(i)).await },
        ));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap().unwrap(), i as i64 * 10);
    }
}

#[tokio::test]
async fn duplicate_handler_registration_fails_build() {
    let result = Herald::builder()
        .command_handler(MultiplyHandler {
            multiplier: Arc::new(Multiplier { factor: 10 }),
        })
        .command_handler(MultiplyHandler {
            multiplier: Arc::new(Multiplier { factor: 2 }),
        })
        .build();

    match result {
        Err(BuildError::Registry(RegistryError::AmbiguousHandler { command, .. })) => {
            assert!(command.contains("Multiply"));
        }
        _ => panic!("Expected ambiguous handler build error"),
    }
}

#[tokio::test]
async fn publish_isolates_faulting_subscriber() {
    let recorder = Arc::new(ValueRecorder::new());
    let herald = Herald::builder()
        .subscriber::<ValueChanged, _>(SharedRecorder(Arc::clone(&recorder)))
        .subscriber::<ValueChanged, _>(AlwaysFails)
        .build()
        .unwrap();

    let report = herald.publish(ValueChanged { value: 5 }).completed().await;

    assert_eq!(*recorder.seen.lock().unwrap(), vec![5]);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.faulted, 1);
}

/// Forwards to a shared recorder so the test keeps a handle on the state.
struct SharedRecorder(Arc<ValueRecorder>);

#[async_trait]
impl EventSubscriber<ValueChanged> for SharedRecorder {
    async fn handle(
        &self,
        event: Arc<ValueChanged>,
        cancel: CancellationToken,
    ) -> Result<(), SubscriberError> {
        self.0.handle(event, cancel).await
    }
}

#[tokio::test]
async fn publish_with_no_subscribers_is_noop() {
    let herald = Herald::builder().build().unwrap();

    let report = herald.publish(ValueChanged { value: 1 }).completed().await;

    assert_eq!(report.delivered, 0);
    assert_eq!(report.faulted, 0);
}

#[tokio::test]
async fn late_subscription_receives_later_publishes_only() {
    let herald = Herald::builder().build().unwrap();

    herald.publish(ValueChanged { value: 1 }).completed().await;

    let recorder = Arc::new(ValueRecorder::new());
    herald.subscribe::<ValueChanged, _>(SharedRecorder(Arc::clone(&recorder)));

    herald.publish(ValueChanged { value: 2 }).completed().await;

    assert_eq!(*recorder.seen.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn use_case_runs_without_a_chain() {
    let herald = Herald::builder().use_case_handler(ShoutHandler).build().unwrap();

    assert_eq!(herald.run(Shout("quiet".to_string())).await.unwrap(), "QUIET");
}

#[tokio::test]
async fn cancellation_token_reaches_behaviors() {
    let calls = Arc::new(AtomicUsize::new(0));
    let herald = Herald::builder()
        .command_handler(SubmitHandler {
            calls: Arc::clone(&calls),
        })
        .behavior::<Submit, _>(BailOnCancel)
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let response = herald.send_with(Submit, cancel).await.unwrap();

    assert_eq!(response, Err("cancelled".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // A live token lets the chain through.
    let response = herald
        .send_with(Submit, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response, Ok("accepted"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
