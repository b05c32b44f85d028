use url::Url;

use crate::error::Error;

const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "playlist-read-private",
    "playlist-read-collaborative",
    "playlist-modify-private",
    "playlist-modify-public",
];

/// Spotify `OAuth2` and Web API configuration.
///
/// Required fields are constructor parameters; everything else defaults to
/// the public Spotify endpoints.
///
/// ```rust,ignore
/// use playlist_organizer::OAuthConfig;
///
/// let config = OAuthConfig::new("my-client-id", "http://127.0.0.1:5173/callback".parse()?)
///     .with_scopes(vec!["playlist-modify-private".into()]);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: Option<String>,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) api_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl OAuthConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri,
            auth_url: Url::parse("https://accounts.spotify.com/authorize")
                .expect("valid default URL"),
            token_url: Url::parse("https://accounts.spotify.com/api/token")
                .expect("valid default URL"),
            api_url: Url::parse("https://api.spotify.com/v1").expect("valid default URL"),
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `SPOTIFY_CLIENT_ID`
    /// - `SPOTIFY_REDIRECT_URI` (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `SPOTIFY_CLIENT_SECRET`: confidential clients only
    /// - `SPOTIFY_AUTH_URL`, `SPOTIFY_TOKEN_URL`, `SPOTIFY_API_URL`
    /// - `SPOTIFY_SCOPES`: comma-separated
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required vars are missing or a URL is invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required vars are missing or a URL is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let client_id = lookup("SPOTIFY_CLIENT_ID")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Config("SPOTIFY_CLIENT_ID is required".into()))?;
        let redirect_uri = lookup("SPOTIFY_REDIRECT_URI")
            .ok_or_else(|| Error::Config("SPOTIFY_REDIRECT_URI is required".into()))
            .and_then(|s| parse_url("SPOTIFY_REDIRECT_URI", &s))?;

        let mut config = Self::new(client_id, redirect_uri);

        if let Some(secret) = lookup("SPOTIFY_CLIENT_SECRET").filter(|s| !s.is_empty()) {
            config = config.with_client_secret(secret);
        }
        if let Some(s) = lookup("SPOTIFY_AUTH_URL") {
            config = config.with_auth_url(parse_url("SPOTIFY_AUTH_URL", &s)?);
        }
        if let Some(s) = lookup("SPOTIFY_TOKEN_URL") {
            config = config.with_token_url(parse_url("SPOTIFY_TOKEN_URL", &s)?);
        }
        if let Some(s) = lookup("SPOTIFY_API_URL") {
            config = config.with_api_url(parse_url("SPOTIFY_API_URL", &s)?);
        }
        if let Some(scopes) = lookup("SPOTIFY_SCOPES") {
            config = config.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        Ok(config)
    }

    /// Use a client secret on token requests (HTTP Basic auth).
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the Web API base, e.g. to point at a mock server.
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

fn parse_url(var: &str, value: &str) -> Result<Url, Error> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("{var}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = OAuthConfig::new("app", "http://127.0.0.1:5173/callback".parse().unwrap());

        assert_eq!(config.client_id(), "app");
        assert!(config.client_secret().is_none());
        assert_eq!(config.auth_url().as_str(), "https://accounts.spotify.com/authorize");
        assert_eq!(config.token_url().as_str(), "https://accounts.spotify.com/api/token");
        assert_eq!(config.api_url().as_str(), "https://api.spotify.com/v1");
        assert!(config.scopes().iter().any(|s| s == "playlist-modify-private"));
        assert_eq!(config.scopes().len(), 6);
    }

    #[test]
    fn test_from_lookup_required_and_overrides() {
        let config = OAuthConfig::from_lookup(lookup(&[
            ("SPOTIFY_CLIENT_ID", "cid"),
            ("SPOTIFY_REDIRECT_URI", "http://localhost:3000/callback"),
            ("SPOTIFY_CLIENT_SECRET", "shh"),
            ("SPOTIFY_API_URL", "http://127.0.0.1:9999/v1"),
            ("SPOTIFY_SCOPES", "playlist-read-private, playlist-modify-private,"),
        ]))
        .unwrap();

        assert_eq!(config.client_id(), "cid");
        assert_eq!(config.client_secret(), Some("shh"));
        assert_eq!(config.api_url().as_str(), "http://127.0.0.1:9999/v1");
        assert_eq!(
            config.scopes(),
            &["playlist-read-private", "playlist-modify-private"]
        );
    }

    #[test]
    fn test_from_lookup_missing_client_id() {
        let err = OAuthConfig::from_lookup(lookup(&[(
            "SPOTIFY_REDIRECT_URI",
            "http://localhost:3000/callback",
        )]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("SPOTIFY_CLIENT_ID")));
    }

    #[test]
    fn test_from_lookup_invalid_redirect() {
        let err = OAuthConfig::from_lookup(lookup(&[
            ("SPOTIFY_CLIENT_ID", "cid"),
            ("SPOTIFY_REDIRECT_URI", "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.starts_with("SPOTIFY_REDIRECT_URI")));
    }
}
