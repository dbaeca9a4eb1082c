//! Process lifecycle supervision: ordered bring-up, termination triggers,
//! and idempotent reverse-order teardown.

pub mod stack;
pub mod state;
pub mod supervisor;
pub mod triggers;

pub use stack::StdioStack;
pub use state::{LifecycleState, StateCell};
pub use supervisor::{Stack, Supervisor, Teardown};
pub use triggers::{FaultReport, FaultSender, ShutdownReason, Triggers};
