use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Deserialize;

use crate::config::OAuthConfig;
use crate::error::{Error, GatewayError};
use crate::gateway::{Gateway, TokenResponse};
use crate::pkce;
use crate::session::{Session, SessionState};
use crate::storage::{
    ACCESS_TOKEN_KEY, ALL_KEYS, AUTH_STATE_KEY, CODE_VERIFIER_KEY, KeyValueStore,
    REFRESH_TOKEN_KEY,
};

/// Query parameters the service appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse the query string of a callback URL.
    #[must_use]
    pub fn from_url(url: &url::Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }
        params
    }
}

/// Owns the session and every token read or write.
///
/// Authenticated gateway calls go through
/// [`authorized_request`](Self::authorized_request), which retries once after
/// a refresh when the token is rejected. Refreshes are single-flight: callers
/// that see a 401 while a refresh is running wait for it instead of issuing
/// their own.
pub struct SessionManager<G, S> {
    config: OAuthConfig,
    gateway: G,
    store: S,
    session: Mutex<Session>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl<G: Gateway, S: KeyValueStore> SessionManager<G, S> {
    /// Create a manager, restoring any token pair already in `store`.
    #[must_use]
    pub fn new(config: OAuthConfig, gateway: G, store: S) -> Self {
        let mut session = match store.get(ACCESS_TOKEN_KEY) {
            Some(access) => Session::restored(access, store.get(REFRESH_TOKEN_KEY)),
            None => Session::default(),
        };
        if !session.is_authenticated() && store.get(AUTH_STATE_KEY).is_some() {
            session.begin_authorizing();
        }

        Self {
            config,
            gateway,
            store,
            session: Mutex::new(session),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated()
    }

    /// Build the authorization URL and persist the handshake for the callback.
    ///
    /// No network call is made.
    #[must_use]
    pub fn begin_authorization(&self) -> String {
        let handshake = pkce::generate_handshake();
        self.store.set(CODE_VERIFIER_KEY, &handshake.code_verifier);
        self.store.set(AUTH_STATE_KEY, &handshake.state);
        self.lock().begin_authorizing();

        let scope = self.config.scopes.join(" ");
        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", &scope)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("state", &handshake.state)
            .append_pair("code_challenge_method", "S256")
            .append_pair("code_challenge", &handshake.code_challenge);

        url.into()
    }

    /// Verify the callback and exchange its code for a token pair.
    ///
    /// The persisted verifier and state are discarded whether or not this
    /// succeeds.
    ///
    /// # Errors
    ///
    /// [`Error::CsrfMismatch`] if `state` does not match (no exchange is
    /// attempted), [`Error::AuthorizationDenied`] if the service returned an
    /// error or no code, [`Error::AuthExchangeFailed`] if the exchange fails.
    pub async fn complete_authorization(&self, params: CallbackParams) -> Result<(), Error> {
        let stored_state = self.store.take(AUTH_STATE_KEY);
        let code_verifier = self.store.take(CODE_VERIFIER_KEY);

        let state_matches = matches!(
            (&params.state, &stored_state),
            (Some(received), Some(stored)) if received == stored
        );
        if !state_matches {
            tracing::warn!("OAuth state mismatch");
            self.lock().abandon_authorization();
            return Err(Error::CsrfMismatch);
        }

        if let Some(error) = params.error {
            let desc = params.error_description.unwrap_or(error);
            tracing::warn!(description = %desc, "Authorization denied by Spotify");
            self.lock().abandon_authorization();
            return Err(Error::AuthorizationDenied(desc));
        }

        let Some(code) = params.code else {
            self.lock().abandon_authorization();
            return Err(Error::AuthorizationDenied("missing authorization code".into()));
        };
        let Some(code_verifier) = code_verifier else {
            self.lock().abandon_authorization();
            return Err(Error::AuthExchangeFailed {
                status: None,
                detail: "missing code verifier".into(),
            });
        };

        self.lock().set_exchanging(true);
        let tokens = match self.gateway.exchange_code(&code, &code_verifier).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::error!(error = %e, "Token exchange failed");
                self.lock().abandon_authorization();
                return Err(match e {
                    GatewayError::Status { status, detail, .. } => Error::AuthExchangeFailed {
                        status: Some(status),
                        detail,
                    },
                    GatewayError::Unauthorized => Error::AuthExchangeFailed {
                        status: Some(401),
                        detail: "client credentials rejected".into(),
                    },
                    other => Error::AuthExchangeFailed {
                        status: None,
                        detail: other.to_string(),
                    },
                });
            }
        };

        self.persist(&tokens);
        self.lock().establish(tokens.access_token, tokens.refresh_token);
        tracing::info!("Spotify OAuth2 login successful");
        Ok(())
    }

    /// Run `operation` with the current access token.
    ///
    /// On [`GatewayError::Unauthorized`] the session is refreshed (or an
    /// in-flight refresh is awaited) and `operation` is retried exactly once.
    ///
    /// # Errors
    ///
    /// [`Error::NotAuthenticated`] without a session, [`Error::SessionExpired`]
    /// if the refresh fails or the retry is rejected again, otherwise the
    /// gateway error.
    pub async fn authorized_request<T, F, Fut>(&self, operation: F) -> Result<T, Error>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let token = self.current_token()?;

        match operation(token.clone()).await {
            Err(GatewayError::Unauthorized) => {
                let fresh = self.refresh_after(&token).await?;
                match operation(fresh).await {
                    Err(GatewayError::Unauthorized) => {
                        tracing::warn!("Access token rejected after refresh");
                        self.invalidate();
                        Err(Error::SessionExpired)
                    }
                    other => other.map_err(Error::Gateway),
                }
            }
            other => other.map_err(Error::Gateway),
        }
    }

    /// Obtain a new access token with the stored refresh token.
    ///
    /// Concurrent callers share a single refresh.
    ///
    /// # Errors
    ///
    /// [`Error::SessionExpired`] if the refresh fails (the session is cleared),
    /// [`Error::NotAuthenticated`] without a session.
    pub async fn refresh(&self) -> Result<(), Error> {
        let token = self.current_token()?;
        self.refresh_after(&token).await.map(|_| ())
    }

    /// Clear the session and all persisted keys.
    pub fn logout(&self) {
        self.invalidate();
        tracing::info!("Logged out");
    }

    fn current_token(&self) -> Result<String, Error> {
        self.lock()
            .access_token()
            .map(str::to_owned)
            .ok_or(Error::NotAuthenticated)
    }

    /// Refresh unless someone already replaced `stale` while we waited for
    /// the gate. Returns the access token to retry with.
    async fn refresh_after(&self, stale: &str) -> Result<String, Error> {
        let _gate = self.refresh_gate.lock().await;

        let refresh_token = {
            let session = self.lock();
            match session.access_token() {
                // A session that vanished while we waited was cleared by a
                // failed refresh.
                None => return Err(Error::SessionExpired),
                Some(current) if current != stale => return Ok(current.to_owned()),
                Some(_) => session.refresh_token().map(str::to_owned),
            }
        };

        let Some(refresh_token) = refresh_token else {
            tracing::warn!("No refresh token available, clearing session");
            self.invalidate();
            return Err(Error::SessionExpired);
        };

        let generation = {
            let mut session = self.lock();
            session.set_pending_refresh(true);
            session.generation()
        };
        let result = self.gateway.refresh_token(&refresh_token).await;
        self.lock().set_pending_refresh(false);

        match result {
            Ok(tokens) => {
                {
                    let mut session = self.lock();
                    if session.generation() != generation {
                        tracing::info!("Session cleared during refresh, discarding new token");
                        return Err(Error::SessionExpired);
                    }
                    // Persist under the session lock, like `invalidate`.
                    self.persist(&tokens);
                    session.apply_refresh(tokens.access_token.clone(), tokens.refresh_token.clone());
                }
                tracing::info!("Access token refreshed");
                Ok(tokens.access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, clearing session");
                self.invalidate();
                Err(Error::SessionExpired)
            }
        }
    }

    fn persist(&self, tokens: &TokenResponse) {
        self.store.set(ACCESS_TOKEN_KEY, &tokens.access_token);
        if let Some(refresh) = &tokens.refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, refresh);
        }
    }

    fn invalidate(&self) {
        let mut session = self.lock();
        for key in ALL_KEYS {
            self.store.remove(key);
        }
        session.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
