//! Unit tests for supervisor ordering, idempotency, and partial bootstrap.

use std::future::Future;
use std::sync::{Arc, Mutex};

use agent_conduit::config::ServicesConfig;
use agent_conduit::lifecycle::{
    LifecycleState, ShutdownReason, Stack, Supervisor, Teardown,
};
use agent_conduit::services::ServiceContext;
use agent_conduit::{AppError, Result};

type EventLog = Arc<Mutex<Vec<String>>>;

fn push(log: &EventLog, event: &str) {
    log.lock().expect("event log").push(event.to_string());
}

fn events(log: &EventLog) -> Vec<String> {
    log.lock().expect("event log").clone()
}

struct FakeHandle {
    log: EventLog,
    name: &'static str,
    fail_close: bool,
}

impl Teardown for FakeHandle {
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send {
        push(&self.log, &format!("close:{}", self.name));
        let result = if self.fail_close {
            Err(AppError::Shutdown(format!("{} close failed", self.name)))
        } else {
            Ok(())
        };
        std::future::ready(result)
    }
}

struct FakeStack {
    log: EventLog,
    fail_services: bool,
    fail_connect: bool,
    fail_transport_close: bool,
}

impl FakeStack {
    fn new(log: &EventLog) -> Self {
        Self {
            log: Arc::clone(log),
            fail_services: false,
            fail_connect: false,
            fail_transport_close: false,
        }
    }

    fn handle(&self, name: &'static str, fail_close: bool) -> FakeHandle {
        FakeHandle {
            log: Arc::clone(&self.log),
            name,
            fail_close,
        }
    }
}

impl Stack for FakeStack {
    type Services = FakeHandle;
    type Server = FakeHandle;
    type Transport = FakeHandle;

    fn services(&mut self) -> impl Future<Output = Result<FakeHandle>> + Send {
        push(&self.log, "create:services");
        let result = if self.fail_services {
            Err(AppError::Bootstrap("services construction failed".into()))
        } else {
            Ok(self.handle("services", false))
        };
        std::future::ready(result)
    }

    fn server(&mut self) -> Result<FakeHandle> {
        push(&self.log, "create:server");
        Ok(self.handle("server", false))
    }

    fn connect(&mut self, _server: &mut FakeHandle) -> impl Future<Output = Result<FakeHandle>> + Send {
        let result = if self.fail_connect {
            Err(AppError::Transport("transport refused".into()))
        } else {
            push(&self.log, "create:transport");
            Ok(self.handle("transport", self.fail_transport_close))
        };
        std::future::ready(result)
    }
}

/// Stack with a real service context so background-task behavior can be
/// observed through the supervisor.
struct ContextStack {
    log: EventLog,
}

impl Stack for ContextStack {
    type Services = ServiceContext;
    type Server = FakeHandle;
    type Transport = FakeHandle;

    fn services(&mut self) -> impl Future<Output = Result<ServiceContext>> + Send {
        async { ServiceContext::create(&ServicesConfig::default()).await }
    }

    fn server(&mut self) -> Result<FakeHandle> {
        Ok(FakeHandle {
            log: Arc::clone(&self.log),
            name: "server",
            fail_close: false,
        })
    }

    fn connect(&mut self, _server: &mut FakeHandle) -> impl Future<Output = Result<FakeHandle>> + Send {
        std::future::ready(Ok(FakeHandle {
            log: Arc::clone(&self.log),
            name: "transport",
            fail_close: false,
        }))
    }
}

#[tokio::test]
async fn teardown_is_the_exact_reverse_of_construction() {
    let log = EventLog::default();
    let mut stack = FakeStack::new(&log);
    let mut supervisor = Supervisor::<FakeStack>::new();

    supervisor.start(&mut stack).await.expect("start");
    assert_eq!(supervisor.state(), LifecycleState::Running);
    assert_eq!(supervisor.live_handles(), (true, true, true));

    assert!(supervisor.shutdown(ShutdownReason::Interrupt).await);
    assert_eq!(supervisor.state(), LifecycleState::Stopped);
    assert_eq!(supervisor.live_handles(), (false, false, false));

    assert_eq!(
        events(&log),
        [
            "create:services",
            "create:server",
            "create:transport",
            "close:transport",
            "close:server",
            "close:services",
        ]
    );
}

#[tokio::test]
async fn second_shutdown_is_a_no_op() {
    let log = EventLog::default();
    let mut stack = FakeStack::new(&log);
    let mut supervisor = Supervisor::<FakeStack>::new();

    supervisor.start(&mut stack).await.expect("start");
    assert!(supervisor.shutdown(ShutdownReason::Interrupt).await);
    assert!(!supervisor.shutdown(ShutdownReason::Terminate).await);

    let close_events = events(&log)
        .into_iter()
        .filter(|event| event.starts_with("close:"))
        .count();
    assert_eq!(close_events, 3, "each handle closes exactly once");
}

#[tokio::test]
async fn services_failure_prevents_later_construction() {
    let log = EventLog::default();
    let mut stack = FakeStack::new(&log);
    stack.fail_services = true;
    let mut supervisor = Supervisor::<FakeStack>::new();

    let err = supervisor.start(&mut stack).await.expect_err("bootstrap fails");
    assert!(matches!(err, AppError::Bootstrap(_)));
    assert_eq!(supervisor.live_handles(), (false, false, false));

    assert!(supervisor.shutdown(ShutdownReason::Bootstrap).await);
    assert_eq!(supervisor.state(), LifecycleState::Stopped);

    assert_eq!(events(&log), ["create:services"]);
    assert_eq!(ShutdownReason::Bootstrap.exit_code(), 1);
}

#[tokio::test]
async fn connect_failure_tears_down_already_constructed_handles() {
    let log = EventLog::default();
    let mut stack = FakeStack::new(&log);
    stack.fail_connect = true;
    let mut supervisor = Supervisor::<FakeStack>::new();

    let err = supervisor.start(&mut stack).await.expect_err("connect fails");
    assert!(matches!(err, AppError::Transport(_)));
    assert_eq!(supervisor.live_handles(), (true, true, false));

    assert!(supervisor.shutdown(ShutdownReason::Bootstrap).await);
    assert_eq!(
        events(&log),
        [
            "create:services",
            "create:server",
            "close:server",
            "close:services",
        ]
    );
}

#[tokio::test]
async fn failed_transport_close_does_not_stop_remaining_steps() {
    let log = EventLog::default();
    let mut stack = FakeStack::new(&log);
    stack.fail_transport_close = true;
    let mut supervisor = Supervisor::<FakeStack>::new();

    supervisor.start(&mut stack).await.expect("start");
    assert!(supervisor.shutdown(ShutdownReason::Terminate).await);
    assert_eq!(supervisor.state(), LifecycleState::Stopped);

    let all = events(&log);
    assert_eq!(
        &all[3..],
        ["close:transport", "close:server", "close:services"]
    );
}

#[tokio::test]
async fn failed_background_task_leaves_the_process_running() {
    let log = EventLog::default();
    let mut stack = ContextStack {
        log: Arc::clone(&log),
    };
    let mut supervisor = Supervisor::<ContextStack>::new();

    supervisor.start(&mut stack).await.expect("start");

    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let tasks = supervisor
        .services()
        .expect("live service context")
        .tasks()
        .expect("task registry");
    tasks.spawn("doomed", async move {
        let _ = done_tx.send(());
        Err(AppError::Io("disk gone".into()))
    });
    done_rx.await.expect("task ran");
    tokio::task::yield_now().await;

    assert_eq!(supervisor.state(), LifecycleState::Running);
    assert_eq!(supervisor.live_handles(), (true, true, true));

    assert!(supervisor.shutdown(ShutdownReason::Interrupt).await);
    assert_eq!(supervisor.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn starting_twice_is_rejected() {
    let log = EventLog::default();
    let mut stack = FakeStack::new(&log);
    let mut supervisor = Supervisor::<FakeStack>::new();

    supervisor.start(&mut stack).await.expect("first start");
    let err = supervisor.start(&mut stack).await.expect_err("second start");
    assert!(matches!(err, AppError::Bootstrap(_)));
}

#[tokio::test]
async fn shutdown_before_start_stops_with_no_handles_touched() {
    let log = EventLog::default();
    let mut supervisor = Supervisor::<FakeStack>::new();

    assert!(supervisor.shutdown(ShutdownReason::Interrupt).await);
    assert_eq!(supervisor.state(), LifecycleState::Stopped);
    assert!(events(&log).is_empty());
}
