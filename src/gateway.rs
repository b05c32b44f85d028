use std::future::Future;

use serde::Deserialize;

use crate::error::GatewayError;
use crate::types::{NewPlaylist, PlaylistId, PlaylistSummary, Track, UserId, UserProfile};

/// Maximum URIs accepted by one [`Gateway::add_tracks`] call.
pub const ADD_TRACKS_LIMIT: usize = 100;

/// Token response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: Some("Bearer".into()),
            expires_in: None,
            refresh_token: None,
            scope: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

/// The remote music service.
///
/// Authenticated calls take the bearer token explicitly; attaching and
/// refreshing it is the session manager's job. Implementations must report
/// a rejected token as [`GatewayError::Unauthorized`].
///
/// `playlist_tracks` returns `None` for entries without a usable track
/// (removed from the catalogue, local files).
pub trait Gateway: Send + Sync + 'static {
    fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> impl Future<Output = Result<TokenResponse, GatewayError>> + Send;

    fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<TokenResponse, GatewayError>> + Send;

    fn current_user(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<UserProfile, GatewayError>> + Send;

    fn current_user_playlists(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Vec<PlaylistSummary>, GatewayError>> + Send;

    fn playlist(
        &self,
        access_token: &str,
        playlist_id: &PlaylistId,
    ) -> impl Future<Output = Result<PlaylistSummary, GatewayError>> + Send;

    fn playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &PlaylistId,
    ) -> impl Future<Output = Result<Vec<Option<Track>>, GatewayError>> + Send;

    fn create_playlist(
        &self,
        access_token: &str,
        user_id: &UserId,
        playlist: &NewPlaylist,
    ) -> impl Future<Output = Result<PlaylistId, GatewayError>> + Send;

    /// Append `uris` to the playlist in one request, preserving order.
    ///
    /// Callers pass at most [`ADD_TRACKS_LIMIT`] URIs.
    fn add_tracks(
        &self,
        access_token: &str,
        playlist_id: &PlaylistId,
        uris: &[String],
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
