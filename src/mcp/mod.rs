//! Model Context Protocol server layer.

pub mod server;
pub mod transport;

pub use server::{ProtocolServer, ServerIdentity};
pub use transport::{BoundTransport, StdioTransport};
