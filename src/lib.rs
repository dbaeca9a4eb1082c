#![forbid(unsafe_code)]

//! `agent-conduit`: supervised MCP stdio server.
//!
//! The process speaks MCP over its stdin/stdout and keeps every diagnostic
//! line on stderr, so protocol framing is never corrupted by logging. The
//! lifecycle supervisor brings the dependent subsystems up in a fixed order
//! (service context, protocol server, transport binding), tears them down in
//! exact reverse on the first termination trigger to arrive (operator signal,
//! uncaught fault, bootstrap failure), and resolves that trigger into the
//! process exit status.

pub mod config;
pub mod diag;
pub mod errors;
pub mod lifecycle;
pub mod mcp;
pub mod services;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
