#![forbid(unsafe_code)]

//! `agent-conduit` server binary.
//!
//! Bootstraps configuration, brings the service context, protocol server,
//! and stdio transport up in order, and routes every termination trigger
//! through the lifecycle supervisor's single teardown path.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use agent_conduit::diag::{self, LogFormat};
use agent_conduit::lifecycle::{ShutdownReason, StdioStack, Supervisor, Triggers};
use agent_conduit::GlobalConfig;

#[derive(Debug, Parser)]
#[command(name = "agent-conduit", about = "Supervised MCP stdio server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json). Diagnostics always go to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

/// How the bootstrap select resolved.
enum BootOutcome {
    /// Startup ran to completion (successfully or not).
    Finished(agent_conduit::Result<()>),
    /// A termination trigger won while startup was still in flight.
    Triggered(ShutdownReason),
}

fn main() {
    let args = Cli::parse();

    if let Err(err) = diag::init_tracing(args.log_format) {
        eprintln!("failed to initialize diagnostics: {err}");
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "failed to build tokio runtime");
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(run(args));
    std::process::exit(i32::from(code));
}

async fn run(args: Cli) -> u8 {
    let config = match GlobalConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(err) => {
            error!(%err, "configuration rejected");
            return ShutdownReason::Bootstrap.exit_code();
        }
    };
    info!("configuration loaded");

    let (mut triggers, faults) = match Triggers::install() {
        Ok(parts) => parts,
        Err(err) => {
            error!(%err, "trigger registration failed");
            return ShutdownReason::Bootstrap.exit_code();
        }
    };
    faults.install_panic_hook();

    let mut stack = StdioStack::new(config);
    let mut supervisor = Supervisor::<StdioStack>::new();

    // A trigger arriving while startup is still in flight wins the select;
    // whatever was already constructed is torn down in reverse below.
    let outcome = tokio::select! {
        result = supervisor.start(&mut stack) => BootOutcome::Finished(result),
        reason = triggers.wait() => BootOutcome::Triggered(reason),
    };

    let reason = match outcome {
        BootOutcome::Finished(Ok(())) => {
            info!("server ready, listening on stdio");
            let disconnected = stack.disconnected();
            tokio::select! {
                () = disconnected.cancelled() => {
                    info!("peer closed the stream");
                    ShutdownReason::Disconnect
                }
                reason = triggers.wait() => reason,
            }
        }
        BootOutcome::Finished(Err(err)) => {
            error!(%err, "bootstrap failed");
            ShutdownReason::Bootstrap
        }
        BootOutcome::Triggered(reason) => reason,
    };

    supervisor.shutdown(reason).await;
    reason.exit_code()
}
