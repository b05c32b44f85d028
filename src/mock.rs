//! In-memory [`Gateway`] for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::GatewayError;
use crate::gateway::{ADD_TRACKS_LIMIT, Gateway, TokenResponse};
use crate::types::{NewPlaylist, PlaylistId, PlaylistSummary, Track, UserId, UserProfile};

#[derive(Default)]
struct MockState {
    valid_token: Option<String>,
    fail_exchange: bool,
    fail_refresh: bool,
    fail_current_user: bool,
    expire_on_add: bool,
    exchanged: Vec<(String, String)>,
    playlists: HashMap<PlaylistId, (PlaylistSummary, Vec<Option<Track>>)>,
    created: Vec<(PlaylistId, NewPlaylist)>,
    added: HashMap<PlaylistId, Vec<String>>,
    fail_create_for: HashSet<String>,
    fail_add_for: HashSet<String>,
}

/// Accepts only the token it issued most recently.
#[derive(Default)]
pub(crate) struct MockGateway {
    state: Mutex<MockState>,
    refresh_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl MockGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Gateway that already accepts `token`.
    pub(crate) fn accepting(token: &str) -> Self {
        let gateway = Self::new();
        gateway.state.lock().unwrap().valid_token = Some(token.to_owned());
        gateway
    }

    pub(crate) fn with_playlist(self, name: &str, id: &str, items: Vec<Option<Track>>) -> Self {
        let summary = PlaylistSummary {
            id: id.into(),
            name: name.to_owned(),
            description: None,
            image_url: None,
            track_count: u32::try_from(items.len()).unwrap_or(u32::MAX),
        };
        self.state
            .lock()
            .unwrap()
            .playlists
            .insert(summary.id.clone(), (summary, items));
        self
    }

    pub(crate) fn fail_exchange(&self) {
        self.state.lock().unwrap().fail_exchange = true;
    }

    pub(crate) fn fail_refresh(&self) {
        self.state.lock().unwrap().fail_refresh = true;
    }

    pub(crate) fn fail_current_user(&self) {
        self.state.lock().unwrap().fail_current_user = true;
    }

    /// Revoke the current token on the next add-tracks call.
    pub(crate) fn expire_on_add(&self) {
        self.state.lock().unwrap().expire_on_add = true;
    }

    pub(crate) fn fail_create_for(&self, name: &str) {
        self.state.lock().unwrap().fail_create_for.insert(name.to_owned());
    }

    pub(crate) fn fail_add_for(&self, name: &str) {
        self.state.lock().unwrap().fail_add_for.insert(name.to_owned());
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn exchanged_verifiers(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().exchanged.clone()
    }

    pub(crate) fn created(&self) -> Vec<(PlaylistId, NewPlaylist)> {
        self.state.lock().unwrap().created.clone()
    }

    pub(crate) fn added(&self, playlist_id: &PlaylistId) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .added
            .get(playlist_id)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self, token: &str) -> Result<(), GatewayError> {
        match &self.state.lock().unwrap().valid_token {
            Some(valid) if valid == token => Ok(()),
            _ => Err(GatewayError::Unauthorized),
        }
    }

    fn not_found(operation: &'static str) -> GatewayError {
        GatewayError::Status {
            operation,
            status: 404,
            detail: "not found".into(),
        }
    }
}

impl Gateway for MockGateway {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.exchanged.push((code.to_owned(), code_verifier.to_owned()));
        if state.fail_exchange {
            return Err(GatewayError::Status {
                operation: "token exchange",
                status: 400,
                detail: r#"{"error":"invalid_grant"}"#.into(),
            });
        }
        state.valid_token = Some("access-initial".into());
        Ok(TokenResponse::new("access-initial").with_refresh_token("refresh-initial"))
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenResponse, GatewayError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        if state.fail_refresh {
            return Err(GatewayError::Status {
                operation: "token refresh",
                status: 400,
                detail: r#"{"error":"invalid_grant"}"#.into(),
            });
        }
        let token = format!("access-{n}");
        state.valid_token = Some(token.clone());
        Ok(TokenResponse::new(token))
    }

    async fn current_user(&self, access_token: &str) -> Result<UserProfile, GatewayError> {
        self.check(access_token)?;
        if self.state.lock().unwrap().fail_current_user {
            return Err(GatewayError::Status {
                operation: "current user",
                status: 503,
                detail: "unavailable".into(),
            });
        }
        Ok(UserProfile {
            id: UserId("user-1".into()),
            display_name: Some("Test User".into()),
            avatar_url: None,
        })
    }

    async fn current_user_playlists(
        &self,
        access_token: &str,
    ) -> Result<Vec<PlaylistSummary>, GatewayError> {
        self.check(access_token)?;
        let mut playlists: Vec<PlaylistSummary> = self
            .state
            .lock()
            .unwrap()
            .playlists
            .values()
            .map(|(summary, _)| summary.clone())
            .collect();
        playlists.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(playlists)
    }

    async fn playlist(
        &self,
        access_token: &str,
        playlist_id: &PlaylistId,
    ) -> Result<PlaylistSummary, GatewayError> {
        self.check(access_token)?;
        self.state
            .lock()
            .unwrap()
            .playlists
            .get(playlist_id)
            .map(|(summary, _)| summary.clone())
            .ok_or_else(|| Self::not_found("playlist"))
    }

    async fn playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &PlaylistId,
    ) -> Result<Vec<Option<Track>>, GatewayError> {
        self.check(access_token)?;
        self.state
            .lock()
            .unwrap()
            .playlists
            .get(playlist_id)
            .map(|(_, items)| items.clone())
            .ok_or_else(|| Self::not_found("playlist tracks"))
    }

    async fn create_playlist(
        &self,
        access_token: &str,
        _user_id: &UserId,
        playlist: &NewPlaylist,
    ) -> Result<PlaylistId, GatewayError> {
        tokio::task::yield_now().await;
        self.check(access_token)?;
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock().unwrap();
        if state.fail_create_for.contains(&playlist.name) {
            return Err(GatewayError::Status {
                operation: "create playlist",
                status: 500,
                detail: "boom".into(),
            });
        }
        let id = PlaylistId(format!("new-{}", state.created.len() + 1));
        state.created.push((id.clone(), playlist.clone()));
        Ok(id)
    }

    async fn add_tracks(
        &self,
        access_token: &str,
        playlist_id: &PlaylistId,
        uris: &[String],
    ) -> Result<(), GatewayError> {
        tokio::task::yield_now().await;
        {
            let mut state = self.state.lock().unwrap();
            if state.expire_on_add {
                state.expire_on_add = false;
                state.valid_token = None;
            }
        }
        self.check(access_token)?;
        if uris.len() > ADD_TRACKS_LIMIT {
            return Err(GatewayError::Status {
                operation: "add tracks",
                status: 400,
                detail: "too many uris".into(),
            });
        }

        let mut state = self.state.lock().unwrap();
        let name = state
            .created
            .iter()
            .find(|(id, _)| id == playlist_id)
            .map(|(_, p)| p.name.clone())
            .ok_or_else(|| Self::not_found("add tracks"))?;
        if state.fail_add_for.contains(&name) {
            return Err(GatewayError::Status {
                operation: "add tracks",
                status: 502,
                detail: "bad gateway".into(),
            });
        }
        state
            .added
            .entry(playlist_id.clone())
            .or_default()
            .extend(uris.iter().cloned());
        Ok(())
    }
}
