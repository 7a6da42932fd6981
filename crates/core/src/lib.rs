// Authentication building blocks for scaffolded MCP servers

pub mod api_key;
pub mod credentials;
pub mod error;
pub mod oauth;
pub mod pkce;

pub use api_key::ApiKeyHandler;
pub use credentials::Credentials;
pub use error::{AuthError, AuthResult};
pub use oauth::{AuthorizationRequest, OAuthConfig, OAuthHandler, ProviderMetadata, UserInfo};
pub use pkce::PkceChallenge;

/// Something that can decide whether an incoming HTTP request is allowed through.
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Short name of the scheme, used in logs
    fn scheme(&self) -> &'static str;

    /// Returns true when the request carries valid credentials
    async fn authenticate(&self, credentials: &Credentials<'_>) -> bool;
}
