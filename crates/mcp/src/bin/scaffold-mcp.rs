// Standalone MCP server binary (local deployment over STDIO)

use anyhow::Result;
use scaffold_mcp::server::{McpServer, ServerOptions};
use scaffold_mcp::{init_tracing, stdio, DEFAULT_LOG_FILTER};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout is the protocol channel
    let log_control = init_tracing(DEFAULT_LOG_FILTER)?;

    tracing::info!("Starting scaffold MCP server (STDIO)");

    let options = ServerOptions::new("scaffold", env!("CARGO_PKG_VERSION"));
    let server = McpServer::with_examples(options).with_log_sink(Arc::new(log_control));

    tracing::info!("Registered {} tools", server.tools().len());

    if let Err(e) = stdio::serve_stdio(&server).await {
        tracing::error!("Fatal error: {:#}", e);
        return Err(e);
    }

    Ok(())
}
