// Read-only view over the parts of an HTTP request that can carry credentials

use http::header::AUTHORIZATION;
use http::HeaderMap;

const BEARER_PREFIX: &str = "Bearer ";

/// Headers and query string of an incoming request.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    headers: &'a HeaderMap,
    query: Option<&'a str>,
}

impl<'a> Credentials<'a> {
    pub fn new(headers: &'a HeaderMap, query: Option<&'a str>) -> Self {
        Self { headers, query }
    }

    /// Token from an `Authorization: Bearer <token>` header
    pub fn bearer_token(&self) -> Option<&'a str> {
        self.header(AUTHORIZATION.as_str())?
            .strip_prefix(BEARER_PREFIX)
    }

    /// Header value as UTF-8, if present
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// First value of a query parameter, percent-decoded
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));

        let creds = Credentials::new(&headers, None);
        assert_eq!(creds.bearer_token(), Some("abc123"));
    }

    #[test]
    fn test_non_bearer_authorization_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));

        let creds = Credentials::new(&headers, None);
        assert_eq!(creds.bearer_token(), None);
    }

    #[test]
    fn test_query_param_decoding() {
        let headers = HeaderMap::new();
        let creds = Credentials::new(&headers, Some("foo=1&api_key=a%2Bb&api_key=second"));

        assert_eq!(creds.query_param("api_key").as_deref(), Some("a+b"));
        assert_eq!(creds.query_param("foo").as_deref(), Some("1"));
        assert_eq!(creds.query_param("missing"), None);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("k1"));

        let creds = Credentials::new(&headers, None);
        assert_eq!(creds.header("X-API-Key"), Some("k1"));
    }
}
