//! Protocol server handle: synchronous construction, transport attach, and
//! idempotent close.

use std::future::Future;
use std::sync::Arc;

use rmcp::handler::server::{
    tool::{ToolCallContext, ToolRoute, ToolRouter},
    ServerHandler,
};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam,
    PromptsCapability, ResourcesCapability, ServerCapabilities, ServerInfo, Tool, ToolsCapability,
};
use rmcp::service::{RequestContext, RoleServer, ServiceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{CapabilitiesConfig, GlobalConfig};
use crate::lifecycle::Teardown;
use crate::mcp::transport::{BoundTransport, StdioTransport};
use crate::{AppError, Result};

/// Identity metadata presented to the peer at initialization.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
    /// Optional usage instructions surfaced to the peer.
    pub instructions: Option<String>,
    /// Declared capability categories.
    pub capabilities: CapabilitiesConfig,
}

impl ServerIdentity {
    /// Build the identity from global configuration.
    #[must_use]
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            name: config.server.name.clone(),
            version: config.server.version.clone(),
            instructions: config.server.instructions.clone(),
            capabilities: config.capabilities,
        }
    }
}

/// MCP request handler carrying identity and registered tool metadata.
///
/// Tool dispatch bodies are external collaborators; registrations applied
/// here only answer `list_tools` until a real route replaces the
/// placeholder.
#[derive(Clone)]
pub(crate) struct ConduitHandler {
    identity: ServerIdentity,
    tools: Arc<Vec<Tool>>,
}

impl ConduitHandler {
    fn new(identity: ServerIdentity, tools: Vec<Tool>) -> Self {
        Self {
            identity,
            tools: Arc::new(tools),
        }
    }

    fn tool_router(&self) -> ToolRouter<Self> {
        let mut router = ToolRouter::new();

        for tool in self.tools.as_slice() {
            router.add_route(ToolRoute::new_dyn(tool.clone(), |_context| {
                Box::pin(async {
                    Err(rmcp::ErrorData::internal_error(
                        "tool not implemented",
                        None,
                    ))
                })
            }));
        }

        router
    }
}

impl ServerHandler for ConduitHandler {
    fn get_info(&self) -> ServerInfo {
        let declared = self.identity.capabilities;
        let mut capabilities = ServerCapabilities::default();
        if declared.tools {
            capabilities.tools = Some(ToolsCapability::default());
        }
        if declared.resources {
            capabilities.resources = Some(ResourcesCapability::default());
        }
        if declared.prompts {
            capabilities.prompts = Some(PromptsCapability::default());
        }

        ServerInfo {
            capabilities,
            server_info: Implementation {
                name: self.identity.name.clone(),
                version: self.identity.version.clone(),
                ..Implementation::default()
            },
            instructions: self.identity.instructions.clone(),
            ..ServerInfo::default()
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<CallToolResult, rmcp::ErrorData>> + Send + '_
    {
        let router = self.tool_router();

        async move {
            router
                .call(ToolCallContext::new(self, request, context))
                .await
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<ListToolsResult, rmcp::ErrorData>> + Send + '_
    {
        let tools = self.tools.as_ref().clone();

        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }
}

/// Handle to the running protocol endpoint.
///
/// `create` is synchronous and allocation-only; `connect` attaches the
/// process stream and begins accepting messages; `close` detaches and stops.
pub struct ProtocolServer {
    handler: Option<ConduitHandler>,
    terminated: CancellationToken,
    running: Option<RunningSession>,
}

/// A connected session: its cancel token and the task watching it end.
struct RunningSession {
    cancel: CancellationToken,
    watcher: tokio::task::JoinHandle<()>,
}

impl ProtocolServer {
    /// Construct the server with identity metadata and the tool
    /// registrations applied before it accepts input.
    #[must_use]
    pub fn create(identity: ServerIdentity, tools: Vec<Tool>) -> Self {
        Self {
            handler: Some(ConduitHandler::new(identity, tools)),
            terminated: CancellationToken::new(),
            running: None,
        }
    }

    /// Whether the server is currently attached to a transport.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.running.is_some()
    }

    /// Token cancelled when the protocol session ends for any reason,
    /// including the peer closing the stream.
    ///
    /// The control loop selects on this so a dead session shuts the process
    /// down instead of leaving it idle behind a closed stream.
    #[must_use]
    pub fn terminated(&self) -> CancellationToken {
        self.terminated.clone()
    }

    /// Attach the transport and begin accepting protocol messages.
    ///
    /// Consumes the binding; the returned [`BoundTransport`] releases the
    /// stream-level resources and is closed by the supervisor before this
    /// server.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`] if the peer handshake fails or the
    /// server was already connected once.
    pub async fn connect(&mut self, transport: StdioTransport) -> Result<BoundTransport> {
        let handler = self
            .handler
            .take()
            .ok_or_else(|| AppError::Transport("server already connected".into()))?;
        let (reader, writer, cancel) = transport.into_parts();

        let service_ct = cancel.child_token();
        let running = handler
            .serve_with_ct((reader, writer), service_ct.clone())
            .await
            .map_err(|err| AppError::Transport(format!("cannot attach transport: {err}")))?;

        let terminated = self.terminated.clone();
        let watcher = tokio::spawn(async move {
            match running.waiting().await {
                Ok(reason) => debug!(reason = ?reason, "protocol session ended"),
                Err(err) => warn!(%err, "protocol session task failed"),
            }
            terminated.cancel();
        });

        self.running = Some(RunningSession {
            cancel: service_ct,
            watcher,
        });
        info!("protocol server attached to transport");
        Ok(BoundTransport::new(cancel))
    }

    /// Detach from the transport and stop accepting messages.
    ///
    /// Idempotent: closing an unconnected or already-closed server is a
    /// no-op, never an error.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Shutdown`] if the session watcher fails to join.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(session) = self.running.take() {
            session.cancel.cancel();
            session.watcher.await.map_err(|err| {
                AppError::Shutdown(format!("protocol server close failed: {err}"))
            })?;
            debug!("protocol server detached");
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProtocolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolServer")
            .field("connected", &self.running.is_some())
            .finish_non_exhaustive()
    }
}

impl Teardown for ProtocolServer {
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send {
        Self::close(self)
    }
}
