use std::sync::Arc;

use crate::auth::SessionManager;
use crate::error::Error;
use crate::gateway::{ADD_TRACKS_LIMIT, Gateway};
use crate::storage::KeyValueStore;
use crate::types::{NewPlaylist, PlaylistId, PlaylistSummary, Track, TrackId, UserId, UserProfile};

/// Authenticated remote operations.
///
/// Every call goes through [`SessionManager::authorized_request`], so an
/// expired token is refreshed once and shared by all concurrent callers.
pub struct Catalog<G, S> {
    session: Arc<SessionManager<G, S>>,
}

// Manual Clone: avoid derive adding `G: Clone, S: Clone` bounds.
impl<G, S> Clone for Catalog<G, S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
        }
    }
}

impl<G: Gateway, S: KeyValueStore> Catalog<G, S> {
    #[must_use]
    pub fn new(session: Arc<SessionManager<G, S>>) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager<G, S> {
        &self.session
    }

    /// # Errors
    ///
    /// See [`SessionManager::authorized_request`].
    pub async fn current_user(&self) -> Result<UserProfile, Error> {
        let gateway = self.session.gateway();
        self.session
            .authorized_request(|token| async move { gateway.current_user(&token).await })
            .await
    }

    /// The current user's playlists, for the picker screen.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::authorized_request`].
    pub async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>, Error> {
        let gateway = self.session.gateway();
        self.session
            .authorized_request(|token| async move { gateway.current_user_playlists(&token).await })
            .await
    }

    /// # Errors
    ///
    /// See [`SessionManager::authorized_request`].
    pub async fn playlist(&self, playlist_id: &PlaylistId) -> Result<PlaylistSummary, Error> {
        let gateway = self.session.gateway();
        self.session
            .authorized_request(|token| async move { gateway.playlist(&token, playlist_id).await })
            .await
    }

    /// # Errors
    ///
    /// See [`SessionManager::authorized_request`].
    pub async fn playlist_tracks(
        &self,
        playlist_id: &PlaylistId,
    ) -> Result<Vec<Option<Track>>, Error> {
        let gateway = self.session.gateway();
        self.session
            .authorized_request(|token| async move {
                gateway.playlist_tracks(&token, playlist_id).await
            })
            .await
    }

    /// # Errors
    ///
    /// See [`SessionManager::authorized_request`].
    pub async fn create_playlist(
        &self,
        user_id: &UserId,
        playlist: &NewPlaylist,
    ) -> Result<PlaylistId, Error> {
        let gateway = self.session.gateway();
        self.session
            .authorized_request(|token| async move {
                gateway.create_playlist(&token, user_id, playlist).await
            })
            .await
    }

    /// Append tracks in the given order.
    ///
    /// Sent in chunks of [`ADD_TRACKS_LIMIT`], each authorized on its own, so
    /// a token refresh between chunks retries only the rejected chunk.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::authorized_request`]. Chunks sent before a
    /// failure stay in the playlist.
    pub async fn add_tracks(&self, playlist_id: &PlaylistId, tracks: &[TrackId]) -> Result<(), Error> {
        let uris: Vec<String> = tracks.iter().map(TrackId::uri).collect();
        let gateway = self.session.gateway();
        for chunk in uris.chunks(ADD_TRACKS_LIMIT) {
            self.session
                .authorized_request(|token| async move { gateway.add_tracks(&token, playlist_id, chunk).await })
                .await?;
        }
        Ok(())
    }
}
