//! Application-service context: a lazily constructed bundle of services
//! owned by the lifecycle supervisor and torn down exactly once.

pub mod audit;
pub mod tasks;

use std::future::Future;

use tracing::{info, warn};

use crate::config::ServicesConfig;
use crate::lifecycle::Teardown;
use crate::Result;

pub use audit::AuditWriter;
pub use tasks::TaskRegistry;

/// Opaque bundle of application services with a single teardown operation.
///
/// Inner services come up in a fixed order and go down in the exact reverse.
/// `close` is idempotent and tolerates partial construction.
#[derive(Debug)]
pub struct ServiceContext {
    tasks: Option<TaskRegistry>,
    audit: Option<AuditWriter>,
}

impl ServiceContext {
    /// Bring up the service bundle described by `config`.
    ///
    /// Construction order: task registry, then audit writer. When a later
    /// service fails to construct, the earlier ones are closed before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AppError::Bootstrap`] when a service cannot be
    /// constructed.
    pub async fn create(config: &ServicesConfig) -> Result<Self> {
        let mut tasks = TaskRegistry::new();

        let audit = match &config.audit_log {
            Some(path) => match AuditWriter::open(path).await {
                Ok(audit) => Some(audit),
                Err(err) => {
                    tasks.close().await;
                    return Err(err);
                }
            },
            None => None,
        };

        let mut context = Self {
            tasks: Some(tasks),
            audit,
        };
        context.record("services started").await;
        info!("service context ready");
        Ok(context)
    }

    /// Supervised background-task registry; absent once closed.
    #[must_use]
    pub fn tasks(&self) -> Option<&TaskRegistry> {
        self.tasks.as_ref()
    }

    /// Append an event to the audit log, if one is configured. Best-effort.
    pub async fn record(&mut self, event: &str) {
        if let Some(audit) = self.audit.as_mut() {
            if let Err(err) = audit.record(event).await {
                warn!(%err, "audit record failed");
            }
        }
    }

    /// Tear down every constructed service in reverse construction order.
    ///
    /// Idempotent: a second call is a no-op. Every step is attempted; the
    /// first failure is returned after all steps ran.
    ///
    /// # Errors
    ///
    /// Returns the first [`crate::AppError`] raised by a closing service.
    pub async fn close(&mut self) -> Result<()> {
        self.record("services closing").await;

        let mut first_failure = None;

        if let Some(mut audit) = self.audit.take() {
            if let Err(err) = audit.close().await {
                warn!(%err, "audit close failed");
                first_failure.get_or_insert(err);
            }
        }

        if let Some(mut tasks) = self.tasks.take() {
            tasks.close().await;
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Teardown for ServiceContext {
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send {
        Self::close(self)
    }
}
