use anyhow::Result;
use clap::Parser;
use scaffold_mcp::{init_tracing, stdio, McpServer, DEFAULT_LOG_FILTER};
use std::path::PathBuf;
use std::sync::Arc;

mod api;
mod config;
mod middleware;

use config::{build_authenticator, ServerConfig, TransportKind};

#[derive(Parser, Debug)]
#[command(name = "scaffold")]
#[command(about = "MCP server exposing tools, resources and prompts", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "scaffold.toml")]
    config: PathBuf,

    /// Transport to serve on
    #[arg(short, long, value_enum, env = "MCP_TRANSPORT")]
    transport: Option<TransportKind>,

    /// Host to bind to (SSE only)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (SSE only)
    #[arg(short, long)]
    port: Option<u16>,
}

impl Args {
    /// Command-line flags take precedence over file and environment
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(transport) = self.transport {
            config.transport.kind = transport;
        }
        if let Some(host) = &self.host {
            config.transport.host = host.clone();
        }
        if let Some(port) = self.port {
            config.transport.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so STDIO keeps stdout for the protocol
    let log_control = init_tracing(DEFAULT_LOG_FILTER)?;

    let args = Args::parse();

    let mut config = ServerConfig::load(&args.config)?;
    config.apply_env(|name| std::env::var(name).ok())?;
    args.apply(&mut config);

    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }

    let mcp = McpServer::with_examples(config.server_options()).with_log_sink(Arc::new(log_control));
    tracing::info!(
        "Starting {} v{} with {} tools",
        mcp.options().name,
        mcp.options().version,
        mcp.tools().len()
    );

    let result = match config.transport.kind {
        TransportKind::Stdio => stdio::serve_stdio(&mcp).await,
        TransportKind::Sse => {
            let authenticator = build_authenticator(&config.auth).await;
            api::serve(&config, mcp, authenticator).await
        }
    };

    if let Err(e) = &result {
        tracing::error!("Fatal error: {:#}", e);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::try_parse_from(["scaffold", "--transport", "sse", "--port", "9100"]).unwrap();
        let mut config = ServerConfig::default();
        config.transport.host = "10.0.0.1".to_string();
        args.apply(&mut config);

        assert_eq!(config.transport.kind, TransportKind::Sse);
        assert_eq!(config.transport.bind_addr(), "10.0.0.1:9100");
        assert_eq!(args.config, PathBuf::from("scaffold.toml"));
    }

    #[test]
    fn test_cli_rejects_unknown_transport() {
        assert!(Args::try_parse_from(["scaffold", "--transport", "carrier-pigeon"]).is_err());
    }
}
