//! The stdio MCP server.
//!
//! One [`McpSession`] for the life of the process, fed line by line from the
//! transport. Requests are handled one at a time. The loop ends on EOF,
//! SIGINT or SIGTERM (Ctrl+C on Windows).

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::decompiler::DecompilerService;
use crate::mcp::session::{McpSession, ServerState};
use crate::mcp::transport::StdioTransport;

/// The stdio MCP server.
pub struct McpServer<R = tokio::io::BufReader<tokio::io::Stdin>, W = tokio::io::Stdout> {
    session: McpSession,
    transport: StdioTransport<R, W>,
}

impl McpServer {
    /// Creates a server on stdin/stdout.
    #[must_use]
    pub fn new(service: Arc<DecompilerService>) -> Self {
        Self::with_transport(service, StdioTransport::new())
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server on an arbitrary transport.
    #[must_use]
    pub const fn with_transport(
        service: Arc<DecompilerService>,
        transport: StdioTransport<R, W>,
    ) -> Self {
        Self {
            session: McpSession::new(service),
            transport,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.session.state()
    }

    /// Consumes the server and returns the transport's writer.
    pub fn into_writer(self) -> W {
        self.transport.into_writer()
    }

    /// Runs the main loop until EOF or a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.run_with_shutdown().await
    }

    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    self.session.shutdown();
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    self.session.shutdown();
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    self.session.shutdown();
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Returns `true` when the server should stop.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            tracing::info!("stdin closed");
            self.session.shutdown();
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        if let Some(reply) = self.session.handle_line(&line) {
            self.transport.write_reply(&reply).await?;
        }

        Ok(self.session.state() == ServerState::ShuttingDown)
    }
}
