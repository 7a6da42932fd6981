use crate::api::sse::SessionRegistry;
use anyhow::{Context, Result};
use scaffold_core::api_key::{normalize_keys, parse_keys, API_KEYS_ENV};
use scaffold_core::{ApiKeyHandler, Authenticator, OAuthConfig, OAuthHandler};
use scaffold_mcp::{McpServer, ServerOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

pub const PORT_ENV: &str = "PORT";
pub const HOST_ENV: &str = "HOST";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub capabilities: CapabilitiesConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Free-text hint returned to clients on initialize
    #[serde(default)]
    pub instructions: Option<String>,
}

fn default_name() -> String {
    "scaffold".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            instructions: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Local deployment: JSON-RPC over stdin/stdout
    #[default]
    Stdio,
    /// Remote deployment: HTTP with Server-Sent Events
    Sse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl TransportConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitiesConfig {
    #[serde(default = "enabled")]
    pub resources: bool,

    #[serde(default = "enabled")]
    pub prompts: bool,
}

fn enabled() -> bool {
    true
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            resources: true,
            prompts: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMechanism {
    #[default]
    None,
    ApiKey,
    Oauth2,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mechanism: AuthMechanism,

    #[serde(default)]
    pub api_keys: Vec<String>,

    #[serde(default)]
    pub oauth: OAuthConfig,
}

impl ServerConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .context("Failed to read configuration file")?;
            Self::from_toml(&content)
        } else {
            tracing::info!(
                "Configuration file {} not found, using defaults",
                config_path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).context("Failed to parse configuration file")?;
        config.auth.api_keys = normalize_keys(std::mem::take(&mut config.auth.api_keys));
        Ok(config)
    }

    /// Apply environment overrides; `var` looks a variable up by name
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = var(PORT_ENV).filter(|p| !p.trim().is_empty()) {
            self.transport.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} value: {}", PORT_ENV, port))?;
        }

        if let Some(host) = var(HOST_ENV).filter(|h| !h.trim().is_empty()) {
            self.transport.host = host;
        }

        if let Some(keys) = var(API_KEYS_ENV) {
            self.auth.api_keys = parse_keys(&keys);
        }

        let oauth = OAuthConfig::from_lookup(&var);
        if oauth.client_id.is_some() {
            self.auth.oauth.client_id = oauth.client_id;
        }
        if oauth.client_secret.is_some() {
            self.auth.oauth.client_secret = oauth.client_secret;
        }
        if oauth.issuer_url.is_some() {
            self.auth.oauth.issuer_url = oauth.issuer_url;
        }

        Ok(())
    }

    /// Deployment combinations worth flagging at startup
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        match (self.transport.kind, self.auth.mechanism) {
            (TransportKind::Sse, AuthMechanism::None) => warnings.push(
                "Remote deployment without authentication is not recommended for production"
                    .to_string(),
            ),
            (TransportKind::Sse, AuthMechanism::ApiKey) => warnings.push(
                "API key authentication selected; consider OAuth 2.1 for public clients"
                    .to_string(),
            ),
            (TransportKind::Stdio, AuthMechanism::ApiKey | AuthMechanism::Oauth2) => warnings
                .push("Authentication only applies to the SSE transport and is ignored on STDIO".to_string()),
            _ => {}
        }

        if self.auth.mechanism == AuthMechanism::ApiKey && self.auth.api_keys.is_empty() {
            warnings.push(format!(
                "No API keys configured (set {} or auth.api_keys)",
                API_KEYS_ENV
            ));
        }

        warnings
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            name: self.server.name.clone(),
            version: self.server.version.clone(),
            instructions: self.server.instructions.clone(),
            resources_enabled: self.capabilities.resources,
            prompts_enabled: self.capabilities.prompts,
        }
    }
}

/// Build the request gate for the configured mechanism; `None` lets everything through
pub async fn build_authenticator(auth: &AuthConfig) -> Option<Arc<dyn Authenticator>> {
    match auth.mechanism {
        AuthMechanism::None => None,
        AuthMechanism::ApiKey => Some(Arc::new(ApiKeyHandler::new(auth.api_keys.clone()))),
        AuthMechanism::Oauth2 => Some(Arc::new(OAuthHandler::discover(auth.oauth.clone()).await)),
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub mcp: Arc<McpServer>,
    pub sessions: Arc<SessionRegistry>,
    pub authenticator: Option<Arc<dyn Authenticator>>,
}

impl AppState {
    pub fn new(mcp: McpServer, authenticator: Option<Arc<dyn Authenticator>>) -> Self {
        if let Some(auth) = &authenticator {
            tracing::info!("Authentication enabled ({})", auth.scheme());
        }

        Self {
            mcp: Arc::new(mcp),
            sessions: Arc::new(SessionRegistry::new()),
            authenticator,
        }
    }
}
