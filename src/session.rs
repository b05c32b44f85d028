/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    /// A handshake is persisted and the user is at the consent page.
    Authorizing,
    /// The callback arrived; the code is being exchanged.
    Exchanging,
    Authenticated,
    /// A refresh is in flight. Callers hitting a 401 wait for it.
    Refreshing,
}

/// The current token pair plus lifecycle flags.
///
/// Plain state; [`SessionManager`](crate::auth::SessionManager) owns the only
/// instance and performs every transition.
#[derive(Clone, Default)]
pub struct Session {
    access_token: Option<String>,
    refresh_token: Option<String>,
    pending_refresh: bool,
    authorizing: bool,
    exchanging: bool,
    /// Bumped by every clear; a refresh started under an older generation
    /// must not write its result back.
    generation: u64,
}

impl Session {
    pub(crate) fn restored(access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    #[must_use]
    pub fn pending_refresh(&self) -> bool {
        self.pending_refresh
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.pending_refresh {
            SessionState::Refreshing
        } else if self.exchanging {
            SessionState::Exchanging
        } else if self.access_token.is_some() {
            SessionState::Authenticated
        } else if self.authorizing {
            SessionState::Authorizing
        } else {
            SessionState::Unauthenticated
        }
    }

    pub(crate) fn begin_authorizing(&mut self) {
        self.authorizing = true;
    }

    pub(crate) fn set_exchanging(&mut self, exchanging: bool) {
        self.exchanging = exchanging;
        if exchanging {
            self.authorizing = false;
        }
    }

    /// Drop out of `Authorizing`/`Exchanging` after a failed callback.
    pub(crate) fn abandon_authorization(&mut self) {
        self.authorizing = false;
        self.exchanging = false;
    }

    pub(crate) fn set_pending_refresh(&mut self, pending: bool) {
        self.pending_refresh = pending;
    }

    /// Install a freshly exchanged token pair.
    pub(crate) fn establish(&mut self, access_token: String, refresh_token: Option<String>) {
        self.access_token = Some(access_token);
        self.refresh_token = refresh_token;
        self.authorizing = false;
        self.exchanging = false;
    }

    /// Apply a refresh result. The refresh token is only replaced when the
    /// service rotated it.
    pub(crate) fn apply_refresh(&mut self, access_token: String, refresh_token: Option<String>) {
        self.access_token = Some(access_token);
        if let Some(rotated) = refresh_token {
            self.refresh_token = Some(rotated);
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn clear(&mut self) {
        *self = Self {
            generation: self.generation.wrapping_add(1),
            ..Self::default()
        };
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("state", &self.state())
            .finish()
    }
}
