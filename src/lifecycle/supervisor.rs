//! Startup/shutdown orchestration for the process's owned handles.

use std::future::Future;

use tracing::{error, info};

use super::state::{LifecycleState, StateCell};
use super::triggers::ShutdownReason;
use crate::{AppError, Result};

/// A handle the supervisor can tear down.
pub trait Teardown {
    /// Release the handle's resources.
    ///
    /// Implementations are idempotent and never fail for "already closed".
    ///
    /// # Errors
    ///
    /// Returns [`crate::AppError::Shutdown`] (or a service-specific error)
    /// when releasing genuinely fails; the supervisor reports such failures
    /// and continues with the remaining steps.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Factory for the three owned handles, invoked in construction order.
pub trait Stack {
    /// Application-service bundle.
    type Services: Teardown + Send;
    /// Protocol endpoint handle.
    type Server: Teardown + Send;
    /// Stream-level connection handle.
    type Transport: Teardown + Send;

    /// Construct the service bundle; may acquire resources.
    ///
    /// # Errors
    ///
    /// Any construction failure; treated as a bootstrap error by the caller.
    fn services(&mut self) -> impl Future<Output = Result<Self::Services>> + Send;

    /// Construct the protocol server. Synchronous and allocation-only.
    ///
    /// # Errors
    ///
    /// Any construction failure; treated as a bootstrap error by the caller.
    fn server(&mut self) -> Result<Self::Server>;

    /// Bind the duplex stream and attach it to the server.
    ///
    /// # Errors
    ///
    /// Any binding or attach failure; treated as a bootstrap error by the
    /// caller.
    fn connect(
        &mut self,
        server: &mut Self::Server,
    ) -> impl Future<Output = Result<Self::Transport>> + Send;
}

/// Orchestrates startup order, ordered idempotent teardown, and the
/// lifecycle state machine.
///
/// Owns at most one live instance of each handle for the process lifetime.
/// Teardown runs in the exact reverse of construction order no matter which
/// trigger caused it, and its body executes at most once.
pub struct Supervisor<K: Stack> {
    state: StateCell,
    services: Option<K::Services>,
    server: Option<K::Server>,
    transport: Option<K::Transport>,
}

impl<K: Stack> Supervisor<K> {
    /// New supervisor with no live handles.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: StateCell::new(),
            services: None,
            server: None,
            transport: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state.load()
    }

    /// Borrow the live service bundle, if constructed and not yet closed.
    #[must_use]
    pub fn services(&self) -> Option<&K::Services> {
        self.services.as_ref()
    }

    /// Which of the three handles are live, in construction order.
    #[must_use]
    pub fn live_handles(&self) -> (bool, bool, bool) {
        (
            self.services.is_some(),
            self.server.is_some(),
            self.transport.is_some(),
        )
    }

    /// Run the startup sequence: services, then server, then transport.
    ///
    /// Each handle is stored the moment it exists, so a failure partway
    /// leaves the already-constructed handles for [`Supervisor::shutdown`]
    /// to tear down.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Bootstrap`] when invoked a second time, and any
    /// construction or connection error otherwise. Callers route every
    /// failure through [`Supervisor::shutdown`] with
    /// [`ShutdownReason::Bootstrap`].
    pub async fn start(&mut self, stack: &mut K) -> Result<()> {
        if !self
            .state
            .transition(LifecycleState::NotStarted, LifecycleState::Starting)
        {
            return Err(AppError::Bootstrap("startup may only run once".into()));
        }
        info!("starting");

        self.services = Some(stack.services().await?);
        self.server = Some(stack.server()?);
        if let Some(server) = self.server.as_mut() {
            self.transport = Some(stack.connect(server).await?);
        }

        if !self
            .state
            .transition(LifecycleState::Starting, LifecycleState::Running)
        {
            return Err(AppError::Bootstrap(
                "lifecycle state changed during startup".into(),
            ));
        }
        info!("running");
        Ok(())
    }

    /// Tear down every live handle in reverse construction order.
    ///
    /// The first caller to claim the shutdown performs the teardown and gets
    /// `true`; every later call returns `false` without side effects. Each
    /// handle is dropped immediately after its close resolves or fails, and
    /// a failing step never prevents the remaining steps.
    pub async fn shutdown(&mut self, reason: ShutdownReason) -> bool {
        if !self.state.begin_shutdown() {
            return false;
        }
        info!(trigger = %reason, "shutting down");

        let mut failures = 0_u32;

        if let Some(mut transport) = self.transport.take() {
            if let Err(err) = transport.close().await {
                failures += 1;
                error!(%err, "transport close failed");
            }
        }
        if let Some(mut server) = self.server.take() {
            if let Err(err) = server.close().await {
                failures += 1;
                error!(%err, "protocol server close failed");
            }
        }
        if let Some(mut services) = self.services.take() {
            if let Err(err) = services.close().await {
                failures += 1;
                error!(%err, "service context close failed");
            }
        }

        let _ = self
            .state
            .transition(LifecycleState::ShuttingDown, LifecycleState::Stopped);
        if failures == 0 {
            info!("shutdown complete");
        } else {
            error!(failures, "shutdown complete with failed steps");
        }
        true
    }
}

impl<K: Stack> Default for Supervisor<K> {
    fn default() -> Self {
        Self::new()
    }
}
