//! Error types for authentication handlers.

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised while configuring or running an authentication handler.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Required OAuth settings are missing.
    #[error("OAuth not configured: {0}")]
    NotConfigured(&'static str),

    /// Discovery has not completed, so no provider endpoints are known.
    #[error("OAuth client not initialized")]
    NotInitialized,

    /// Issuer or endpoint URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Transport-level failure talking to the provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered discovery with a non-success status.
    #[error("Discovery failed (status {status}) for {issuer}")]
    Discovery { issuer: String, status: u16 },

    /// Discovery document has no userinfo endpoint.
    #[error("Provider does not advertise a userinfo endpoint")]
    MissingUserinfoEndpoint,

    /// Provider rejected the bearer token.
    #[error("Token rejected by provider (status {status})")]
    TokenRejected { status: u16 },
}
