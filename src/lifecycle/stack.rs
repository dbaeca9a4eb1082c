//! Production stack: config-driven services, rmcp server, stdio binding.

use std::future::Future;
use std::sync::Arc;

use rmcp::model::Tool;
use tokio_util::sync::CancellationToken;

use super::supervisor::Stack;
use crate::config::GlobalConfig;
use crate::mcp::server::{ProtocolServer, ServerIdentity};
use crate::mcp::transport::{BoundTransport, StdioTransport};
use crate::services::ServiceContext;
use crate::Result;

/// Builds the production handle set over the process's stdin/stdout.
#[derive(Debug)]
pub struct StdioStack {
    config: Arc<GlobalConfig>,
    tools: Vec<Tool>,
    terminated: CancellationToken,
}

impl StdioStack {
    /// New stack over the given configuration.
    #[must_use]
    pub fn new(config: Arc<GlobalConfig>) -> Self {
        Self {
            config,
            tools: Vec::new(),
            terminated: CancellationToken::new(),
        }
    }

    /// Apply tool registrations before the server starts accepting input.
    pub fn register_tools(&mut self, tools: impl IntoIterator<Item = Tool>) {
        self.tools.extend(tools);
    }

    /// Token cancelled when the connected protocol session ends, peer
    /// disconnect included. Inert until the server is constructed.
    #[must_use]
    pub fn disconnected(&self) -> CancellationToken {
        self.terminated.clone()
    }
}

impl Stack for StdioStack {
    type Services = ServiceContext;
    type Server = ProtocolServer;
    type Transport = BoundTransport;

    fn services(&mut self) -> impl Future<Output = Result<ServiceContext>> + Send {
        let config = self.config.services.clone();
        async move { ServiceContext::create(&config).await }
    }

    fn server(&mut self) -> Result<ProtocolServer> {
        let identity = ServerIdentity::from_config(&self.config);
        let server = ProtocolServer::create(identity, std::mem::take(&mut self.tools));
        self.terminated = server.terminated();
        Ok(server)
    }

    fn connect(
        &mut self,
        server: &mut ProtocolServer,
    ) -> impl Future<Output = Result<BoundTransport>> + Send {
        server.connect(StdioTransport::bind())
    }
}
