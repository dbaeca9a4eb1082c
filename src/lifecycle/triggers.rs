//! Termination trigger sources: operator signals and uncaught faults.

use std::fmt::{Display, Formatter};

use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::{AppError, Result};

/// Why the process is shutting down; determines the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Operator interrupt signal (SIGINT / ctrl-c).
    Interrupt,
    /// Operator termination signal (SIGTERM).
    Terminate,
    /// The protocol peer closed the stdio stream.
    Disconnect,
    /// A startup step failed.
    Bootstrap,
    /// An uncaught synchronous fault (panic).
    Fault,
}

impl ShutdownReason {
    /// Process exit status after teardown for this trigger.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Interrupt | Self::Terminate | Self::Disconnect => 0,
            Self::Bootstrap | Self::Fault => 1,
        }
    }
}

impl Display for ShutdownReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Disconnect => "STDIO_EOF",
            Self::Bootstrap => "BOOTSTRAP_ERROR",
            Self::Fault => "UNCAUGHT_FAULT",
        };
        f.write_str(name)
    }
}

/// An uncaught-fault report delivered to the control loop.
#[derive(Debug)]
pub struct FaultReport {
    /// Component or task that faulted.
    pub component: String,
    /// Human-readable description.
    pub message: String,
}

/// Cloneable sender half used to escalate uncaught faults.
#[derive(Debug, Clone)]
pub struct FaultSender(mpsc::UnboundedSender<FaultReport>);

impl FaultSender {
    /// Report an uncaught fault.
    ///
    /// Best-effort: when the control loop is gone the report is dropped.
    pub fn report(&self, component: impl Into<String>, message: impl Into<String>) {
        let report = FaultReport {
            component: component.into(),
            message: message.into(),
        };
        if self.0.send(report).is_err() {
            warn!("fault report dropped: control loop closed");
        }
    }

    /// Route panics through the fault channel after logging them.
    ///
    /// A panic inside a spawned task is an uncaught synchronous fault and
    /// escalates to ordered teardown with exit status 1. The hook fires for
    /// every panic, but a panic on the main task unwinds out of `block_on`
    /// before the report is handled, so that case ends the process with the
    /// runtime's nonzero status and no teardown. Background tasks that
    /// merely resolve to `Err` never reach this path.
    pub fn install_panic_hook(&self) {
        let sender = self.clone();
        std::panic::set_hook(Box::new(move |info| {
            let message = info.to_string();
            error!(%message, "uncaught panic");
            sender.report("panic", message);
        }));
    }
}

/// The set of termination trigger sources, registered exactly once.
///
/// The process exits after the first trigger is handled, so signal streams
/// are never re-armed.
pub struct Triggers {
    faults: mpsc::UnboundedReceiver<FaultReport>,
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl Triggers {
    /// Register signal handlers and the fault channel.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Bootstrap`] when a signal handler cannot be
    /// registered.
    pub fn install() -> Result<(Self, FaultSender)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = FaultSender(tx);

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let interrupt = signal(SignalKind::interrupt()).map_err(|err| {
                AppError::Bootstrap(format!("cannot register SIGINT handler: {err}"))
            })?;
            let terminate = signal(SignalKind::terminate()).map_err(|err| {
                AppError::Bootstrap(format!("cannot register SIGTERM handler: {err}"))
            })?;

            Ok((
                Self {
                    faults: rx,
                    interrupt,
                    terminate,
                },
                sender,
            ))
        }

        #[cfg(not(unix))]
        Ok((Self { faults: rx }, sender))
    }

    /// Wait for the first termination trigger to arrive.
    pub async fn wait(&mut self) -> ShutdownReason {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => ShutdownReason::Interrupt,
                _ = self.terminate.recv() => ShutdownReason::Terminate,
                Some(fault) = self.faults.recv() => Self::faulted(&fault),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        error!(%err, "ctrl-c handler failed");
                    }
                    ShutdownReason::Interrupt
                }
                Some(fault) = self.faults.recv() => Self::faulted(&fault),
            }
        }
    }

    fn faulted(fault: &FaultReport) -> ShutdownReason {
        error!(
            component = %fault.component,
            message = %fault.message,
            "uncaught fault"
        );
        ShutdownReason::Fault
    }
}

impl std::fmt::Debug for Triggers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Triggers").finish_non_exhaustive()
    }
}
