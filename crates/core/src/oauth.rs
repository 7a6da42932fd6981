//! OAuth 2.1 bearer-token authentication.
//!
//! The provider is discovered once through its OpenID Connect discovery document.
//! Each request's bearer token is then checked by calling the provider's userinfo
//! endpoint; any failure counts as unauthenticated. Tokens are not cached.

use crate::pkce::{PkceChallenge, CHALLENGE_METHOD};
use crate::{AuthError, AuthResult, Authenticator, Credentials};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const OAUTH_CLIENT_ID_ENV: &str = "OAUTH_CLIENT_ID";
pub const OAUTH_CLIENT_SECRET_ENV: &str = "OAUTH_CLIENT_SECRET";
pub const OAUTH_ISSUER_URL_ENV: &str = "OAUTH_ISSUER_URL";

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
const DEFAULT_SCOPE: &str = "openid profile email";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// OAuth client settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    /// Optional; public clients should use PKCE instead
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub issuer_url: Option<String>,
}

impl OAuthConfig {
    /// Read `OAUTH_*` settings through `var`; blank values count as unset
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        Self {
            client_id: non_empty(OAUTH_CLIENT_ID_ENV),
            client_secret: non_empty(OAUTH_CLIENT_SECRET_ENV),
            issuer_url: non_empty(OAUTH_ISSUER_URL_ENV),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.issuer_url.is_some()
    }
}

/// Subset of the OpenID provider metadata we rely on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Parameters for building a consent URL
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRequest {
    pub redirect_uri: Option<String>,
    pub state: Option<String>,
    /// Overrides the default `openid profile email`
    pub scope: Option<String>,
    pub pkce: Option<PkceChallenge>,
}

pub struct OAuthHandler {
    config: OAuthConfig,
    http: reqwest::Client,
    provider: Option<ProviderMetadata>,
}

impl OAuthHandler {
    /// Build a handler, running provider discovery once.
    ///
    /// Missing settings or a failed discovery are logged and leave the handler
    /// uninitialized; it then rejects every request.
    pub async fn discover(config: OAuthConfig) -> Self {
        if !config.is_configured() {
            tracing::warn!("OAuth not configured - authentication will fail");
            return Self::uninitialized(config);
        }

        match Self::try_discover(config.clone()).await {
            Ok(handler) => handler,
            Err(e) => {
                tracing::error!("Failed to initialize OAuth: {}", e);
                Self::uninitialized(config)
            }
        }
    }

    /// Like [`OAuthHandler::discover`] but surfaces the error
    pub async fn try_discover(config: OAuthConfig) -> AuthResult<Self> {
        let issuer = config
            .issuer_url
            .clone()
            .ok_or(AuthError::NotConfigured("issuer URL is missing"))?;
        if config.client_id.is_none() {
            return Err(AuthError::NotConfigured("client id is missing"));
        }

        let http = reqwest::Client::new();
        let url = discovery_url(&issuer)?;
        tracing::debug!("Fetching OAuth provider metadata from {}", url);

        let response = http.get(url).timeout(REQUEST_TIMEOUT).send().await?;
        if !response.status().is_success() {
            return Err(AuthError::Discovery {
                issuer,
                status: response.status().as_u16(),
            });
        }
        let provider: ProviderMetadata = response.json().await?;

        tracing::info!("OAuth client initialized for issuer {}", provider.issuer);
        Ok(Self {
            config,
            http,
            provider: Some(provider),
        })
    }

    /// Handler with already-known provider metadata (skips discovery)
    pub fn with_provider(config: OAuthConfig, provider: ProviderMetadata) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            provider: Some(provider),
        }
    }

    fn uninitialized(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            provider: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider(&self) -> Option<&ProviderMetadata> {
        self.provider.as_ref()
    }

    pub fn token_endpoint_auth_method(&self) -> &'static str {
        if self.config.client_secret.is_some() {
            "client_secret_basic"
        } else {
            "none"
        }
    }

    /// Ask the provider's userinfo endpoint whether the token is good
    pub async fn verify_token(&self, token: &str) -> AuthResult<UserInfo> {
        let provider = self.provider.as_ref().ok_or(AuthError::NotInitialized)?;
        let endpoint = provider
            .userinfo_endpoint
            .as_deref()
            .ok_or(AuthError::MissingUserinfoEndpoint)?;
        let endpoint = Url::parse(endpoint)?;

        let response = self
            .http
            .get(endpoint)
            .bearer_auth(token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::TokenRejected {
                status: response.status().as_u16(),
            });
        }

        let user: UserInfo = response.json().await?;
        tracing::info!("Token verified for user: {}", user.sub);
        Ok(user)
    }

    /// Consent URL for the authorization-code flow
    pub fn authorization_url(&self, request: &AuthorizationRequest) -> AuthResult<Url> {
        let provider = self.provider.as_ref().ok_or(AuthError::NotInitialized)?;
        let endpoint = provider
            .authorization_endpoint
            .as_deref()
            .ok_or(AuthError::NotConfigured("provider has no authorization endpoint"))?;
        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or(AuthError::NotConfigured("client id is missing"))?;

        let mut url = Url::parse(endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", client_id)
                .append_pair("scope", request.scope.as_deref().unwrap_or(DEFAULT_SCOPE));
            if let Some(redirect_uri) = &request.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
            if let Some(state) = &request.state {
                query.append_pair("state", state);
            }
            if let Some(pkce) = &request.pkce {
                query
                    .append_pair("code_challenge", &pkce.challenge)
                    .append_pair("code_challenge_method", CHALLENGE_METHOD);
            }
        }

        Ok(url)
    }
}

fn discovery_url(issuer: &str) -> AuthResult<Url> {
    let base = issuer.trim_end_matches('/');
    Ok(Url::parse(&format!("{}{}", base, DISCOVERY_PATH))?)
}

#[async_trait::async_trait]
impl Authenticator for OAuthHandler {
    fn scheme(&self) -> &'static str {
        "oauth2"
    }

    async fn authenticate(&self, credentials: &Credentials<'_>) -> bool {
        let Some(token) = credentials.bearer_token() else {
            tracing::warn!("Missing or invalid Authorization header");
            return false;
        };

        match self.verify_token(token).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Token verification failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn provider_server() -> MockServer {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "issuer": base,
                "authorization_endpoint": format!("{}/authorize", base),
                "token_endpoint": format!("{}/token", base),
                "userinfo_endpoint": format!("{}/userinfo", base),
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "user-42",
                "email": "someone@example.com",
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        server
    }

    fn config_for(server: &MockServer) -> OAuthConfig {
        OAuthConfig {
            client_id: Some("client-abc".to_string()),
            client_secret: None,
            issuer_url: Some(format!("{}/", server.uri())),
        }
    }

    #[test]
    fn test_config_from_lookup() {
        let config = OAuthConfig::from_lookup(|name| match name {
            OAUTH_CLIENT_ID_ENV => Some("id".to_string()),
            OAUTH_CLIENT_SECRET_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.client_id.as_deref(), Some("id"));
        assert_eq!(config.client_secret, None);
        assert!(!config.is_configured());
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_discovery_and_valid_token() {
        let server = provider_server().await;
        let handler = OAuthHandler::discover(config_for(&server)).await;
        assert!(handler.is_initialized());

        let headers = bearer("good-token");
        assert!(handler.authenticate(&Credentials::new(&headers, None)).await);

        let user = handler.verify_token("good-token").await.unwrap();
        assert_eq!(user.sub, "user-42");
        assert_eq!(user.email.as_deref(), Some("someone@example.com"));
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let server = provider_server().await;
        let handler = OAuthHandler::discover(config_for(&server)).await;

        let headers = bearer("stale-token");
        assert!(!handler.authenticate(&Credentials::new(&headers, None)).await);
        assert!(matches!(
            handler.verify_token("stale-token").await,
            Err(AuthError::TokenRejected { status: 401 })
        ));
    }

    #[tokio::test]
    async fn test_discovery_once_userinfo_per_request() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "issuer": base,
                "userinfo_endpoint": format!("{}/userinfo", base),
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "user-42",
            })))
            .expect(2)
            .mount(&server)
            .await;

        let handler = OAuthHandler::discover(config_for(&server)).await;
        let headers = bearer("good-token");
        assert!(handler.authenticate(&Credentials::new(&headers, None)).await);
        assert!(handler.authenticate(&Credentials::new(&headers, None)).await);

        server.verify().await;
    }

    #[tokio::test]
    async fn test_missing_bearer_rejected() {
        let server = provider_server().await;
        let handler = OAuthHandler::discover(config_for(&server)).await;

        let headers = HeaderMap::new();
        assert!(!handler.authenticate(&Credentials::new(&headers, Some("api_key=good-token"))).await);
    }

    #[tokio::test]
    async fn test_unconfigured_handler_rejects() {
        let handler = OAuthHandler::discover(OAuthConfig::default()).await;
        assert!(!handler.is_initialized());

        let headers = bearer("good-token");
        assert!(!handler.authenticate(&Credentials::new(&headers, None)).await);
        assert!(matches!(
            handler.verify_token("good-token").await,
            Err(AuthError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_failed_discovery_leaves_handler_uninitialized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = OAuthHandler::try_discover(config_for(&server)).await.err();
        assert!(matches!(err, Some(AuthError::Discovery { status: 500, .. })));

        let handler = OAuthHandler::discover(config_for(&server)).await;
        assert!(!handler.is_initialized());
    }

    #[tokio::test]
    async fn test_authorization_url() {
        let server = provider_server().await;
        let handler = OAuthHandler::discover(config_for(&server)).await;

        let pkce = PkceChallenge::from_verifier("verifier-value");
        let url = handler
            .authorization_url(&AuthorizationRequest {
                redirect_uri: Some("http://localhost:8000/callback".to_string()),
                state: Some("xyz".to_string()),
                scope: None,
                pkce: Some(pkce.clone()),
            })
            .unwrap();

        assert_eq!(url.path(), "/authorize");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "client-abc");
        assert_eq!(pairs["scope"], "openid profile email");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8000/callback");
        assert_eq!(pairs["state"], "xyz");
        assert_eq!(pairs["code_challenge"], pkce.challenge);
        assert_eq!(pairs["code_challenge_method"], "S256");
    }

    #[test]
    fn test_token_endpoint_auth_method() {
        let provider = ProviderMetadata {
            issuer: "https://issuer.example".to_string(),
            authorization_endpoint: None,
            token_endpoint: None,
            userinfo_endpoint: None,
            scopes_supported: vec![],
        };

        let public = OAuthHandler::with_provider(OAuthConfig::default(), provider.clone());
        assert_eq!(public.token_endpoint_auth_method(), "none");

        let confidential = OAuthHandler::with_provider(
            OAuthConfig {
                client_secret: Some("s3cret".to_string()),
                ..Default::default()
            },
            provider,
        );
        assert_eq!(confidential.token_endpoint_auth_method(), "client_secret_basic");
    }

    #[test]
    fn test_discovery_url_strips_trailing_slash() {
        let url = discovery_url("https://auth.example.com/realms/demo/").unwrap();
        assert_eq!(
            url.as_str(),
            "https://auth.example.com/realms/demo/.well-known/openid-configuration"
        );
    }
}
