/// Failures reported by a [`Gateway`](crate::gateway::Gateway) call.
///
/// [`Unauthorized`](GatewayError::Unauthorized) is kept apart from every other
/// failure: it is the only one the session manager recovers from.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The access token was rejected (HTTP 401).
    #[error("access token rejected")]
    Unauthorized,

    /// Any other non-success response.
    #[error("{operation} failed with status {status}: {detail}")]
    Status {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    #[cfg(feature = "spotify")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Session lifecycle errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Callback `state` did not match the persisted nonce. The authorization
    /// attempt is dead; the user has to start over.
    #[error("authorization state mismatch")]
    CsrfMismatch,

    /// The service redirected back with an `error` instead of a code.
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Code exchange was rejected by the token endpoint.
    #[error("token exchange failed: {detail}")]
    AuthExchangeFailed { status: Option<u16>, detail: String },

    /// The session could not be recovered and has been cleared.
    #[error("session expired, please reauthenticate")]
    SessionExpired,

    /// No session exists.
    #[error("not authenticated")]
    NotAuthenticated,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the caller should send the user back through authorization.
    #[must_use]
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::NotAuthenticated)
    }
}
