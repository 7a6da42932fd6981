// MCP (Model Context Protocol) server implementation
// Exposes tools, resources and prompts to LLM clients over stdio or HTTP

pub mod error;
pub mod logging;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod stdio;
pub mod tools;

pub use error::{McpError, McpResult};
pub use logging::{init_tracing, LogControl, LogLevelSink};
pub use server::{McpServer, ServerOptions};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "scaffold=info,scaffold_mcp=info,scaffold_core=info,tower_http=info";
