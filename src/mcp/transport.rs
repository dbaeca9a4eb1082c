//! Single-owner binding of the process's duplex byte stream.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::lifecycle::Teardown;
use crate::Result;

pub(crate) type StreamReader = Box<dyn AsyncRead + Send + Unpin + 'static>;
pub(crate) type StreamWriter = Box<dyn AsyncWrite + Send + Unpin + 'static>;

/// The process's duplex stream, owned by exactly one value.
///
/// Connecting a [`crate::mcp::ProtocolServer`] consumes the binding, so
/// attaching the same stream twice is unrepresentable rather than checked
/// at runtime.
pub struct StdioTransport {
    reader: StreamReader,
    writer: StreamWriter,
    cancel: CancellationToken,
}

impl StdioTransport {
    /// Bind the process's stdin/stdout.
    #[must_use]
    pub fn bind() -> Self {
        let (stdin, stdout) = rmcp::transport::io::stdio();
        Self::from_stream(stdin, stdout)
    }

    /// Bind an arbitrary duplex pair (in-memory duplex streams in tests,
    /// embedded use).
    pub fn from_stream<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            cancel: CancellationToken::new(),
        }
    }

    /// Token scoped to this binding's stream I/O.
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn into_parts(self) -> (StreamReader, StreamWriter, CancellationToken) {
        (self.reader, self.writer, self.cancel)
    }
}

impl std::fmt::Debug for StdioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Stream-side handle held by the supervisor after a successful connect.
///
/// Closed before the protocol server; cancelling its token stops the
/// stream-level I/O the server is attached to.
#[derive(Debug)]
pub struct BoundTransport {
    cancel: CancellationToken,
    open: bool,
}

impl BoundTransport {
    pub(crate) fn new(cancel: CancellationToken) -> Self {
        Self { cancel, open: true }
    }

    /// Whether the stream-level resources are still held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn release(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.cancel.cancel();
            debug!("transport binding released");
        }
        Ok(())
    }
}

impl Teardown for BoundTransport {
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send {
        std::future::ready(self.release())
    }
}
