use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::OAuthConfig;
use crate::error::GatewayError;
use crate::gateway::{Gateway, TokenResponse};
use crate::types::{NewPlaylist, PlaylistId, PlaylistSummary, Track, UserId, UserProfile};

/// Upper bound on followed `next` links (100 pages of 100 covers the
/// service's playlist size limit).
const MAX_PAGES: usize = 100;

/// [`Gateway`] backed by the Spotify Web API.
pub struct SpotifyGateway {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl SpotifyGateway {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.config.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                GatewayError::Decode(format!("API base URL cannot take a path: {}", self.config.api_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn token_request(
        &self,
        mut params: Vec<(&str, &str)>,
        operation: &'static str,
    ) -> Result<TokenResponse, GatewayError> {
        let mut request = self.http.post(self.config.token_url.clone());
        match self.config.client_secret.as_deref() {
            Some(secret) => request = request.basic_auth(&self.config.client_id, Some(secret)),
            None => params.push(("client_id", self.config.client_id.as_str())),
        }

        let response = request.form(&params).send().await?;
        if !response.status().is_success() {
            return Err(Self::status_error(response, operation).await);
        }
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        url: Url,
        operation: &'static str,
    ) -> Result<T, GatewayError> {
        tracing::debug!(operation, url = %url, "Spotify GET");
        let response = self.http.get(url).bearer_auth(access_token).send().await?;
        let response = Self::ensure_success(response, operation).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(format!("{operation}: {e}")))
    }

    /// Follows `next` links until exhausted or [`MAX_PAGES`] is reached.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        access_token: &str,
        first: Url,
        operation: &'static str,
    ) -> Result<Vec<T>, GatewayError> {
        let mut items = Vec::new();
        let mut next = Some(first);
        let mut pages = 0;

        while let Some(url) = next {
            if pages >= MAX_PAGES {
                tracing::warn!(operation, pages, "Stopped following pagination");
                break;
            }
            let page: Page<T> = self.get_json(access_token, url, operation).await?;
            items.extend(page.items);
            next = page
                .next
                .map(|href| {
                    Url::parse(&href).map_err(|e| GatewayError::Decode(format!("{operation}: next link: {e}")))
                })
                .transpose()?;
            pages += 1;
        }

        Ok(items)
    }

    /// Checks HTTP status; 401 becomes [`GatewayError::Unauthorized`].
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, GatewayError> {
        if response.status().is_success() {
            return Ok(response);
        }
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Unauthorized);
        }
        Err(Self::status_error(response, operation).await)
    }

    async fn status_error(response: reqwest::Response, operation: &'static str) -> GatewayError {
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        GatewayError::Status {
            operation,
            status,
            detail,
        }
    }
}

impl Gateway for SpotifyGateway {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, GatewayError> {
        let params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", code_verifier),
        ];
        self.token_request(params, "token exchange").await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, GatewayError> {
        let params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.token_request(params, "token refresh").await
    }

    async fn current_user(&self, access_token: &str) -> Result<UserProfile, GatewayError> {
        let url = self.endpoint(&["me"])?;
        let user: RawUser = self.get_json(access_token, url, "current user").await?;
        Ok(user.into())
    }

    async fn current_user_playlists(
        &self,
        access_token: &str,
    ) -> Result<Vec<PlaylistSummary>, GatewayError> {
        let mut url = self.endpoint(&["me", "playlists"])?;
        url.query_pairs_mut().append_pair("limit", "50");
        let playlists: Vec<RawPlaylist> = self.get_paged(access_token, url, "user playlists").await?;
        Ok(playlists.into_iter().map(Into::into).collect())
    }

    async fn playlist(
        &self,
        access_token: &str,
        playlist_id: &PlaylistId,
    ) -> Result<PlaylistSummary, GatewayError> {
        let mut url = self.endpoint(&["playlists", playlist_id.as_str()])?;
        url.query_pairs_mut()
            .append_pair("fields", "id,name,description,images,tracks.total");
        let playlist: RawPlaylist = self.get_json(access_token, url, "playlist").await?;
        Ok(playlist.into())
    }

    async fn playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &PlaylistId,
    ) -> Result<Vec<Option<Track>>, GatewayError> {
        let mut url = self.endpoint(&["playlists", playlist_id.as_str(), "tracks"])?;
        url.query_pairs_mut().append_pair("limit", "100");
        let items: Vec<RawPlaylistItem> =
            self.get_paged(access_token, url, "playlist tracks").await?;
        Ok(items
            .into_iter()
            .map(|item| item.track.and_then(RawTrack::into_track))
            .collect())
    }

    async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &UserId,
        playlist: &NewPlaylist,
    ) -> Result<PlaylistId, GatewayError> {
        let url = self.endpoint(&["users", user_id.as_str(), "playlists"])?;
        tracing::debug!(name = %playlist.name, "Spotify create playlist");
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(playlist)
            .send()
            .await?;
        let response = Self::ensure_success(response, "create playlist").await?;
        let created: RawCreated = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("create playlist: {e}")))?;
        Ok(PlaylistId(created.id))
    }

    async fn add_tracks(
        &self,
        access_token: &str,
        playlist_id: &PlaylistId,
        uris: &[String],
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(&["playlists", playlist_id.as_str(), "tracks"])?;
        tracing::debug!(playlist = %playlist_id, count = uris.len(), "Spotify add tracks");
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "uris": uris }))
            .send()
            .await?;
        Self::ensure_success(response, "add tracks").await?;
        Ok(())
    }
}

// ── Wire format ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Page<T> {
    items: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct RawImage {
    url: String,
}

fn first_image(images: Option<Vec<RawImage>>) -> Option<String> {
    images.and_then(|images| images.into_iter().next()).map(|i| i.url)
}

#[derive(Deserialize)]
struct RawUser {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    images: Option<Vec<RawImage>>,
}

impl From<RawUser> for UserProfile {
    fn from(raw: RawUser) -> Self {
        Self {
            id: UserId(raw.id),
            display_name: raw.display_name,
            avatar_url: first_image(raw.images),
        }
    }
}

#[derive(Deserialize)]
struct RawTrackCount {
    #[serde(default)]
    total: u32,
}

#[derive(Deserialize)]
struct RawPlaylist {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    images: Option<Vec<RawImage>>,
    #[serde(default)]
    tracks: Option<RawTrackCount>,
}

impl From<RawPlaylist> for PlaylistSummary {
    fn from(raw: RawPlaylist) -> Self {
        Self {
            id: PlaylistId(raw.id),
            name: raw.name,
            description: raw.description.filter(|d| !d.is_empty()),
            image_url: first_image(raw.images),
            track_count: raw.tracks.map_or(0, |t| t.total),
        }
    }
}

#[derive(Deserialize)]
struct RawPlaylistItem {
    #[serde(default)]
    track: Option<RawTrack>,
}

#[derive(Deserialize)]
struct RawArtist {
    name: String,
}

#[derive(Deserialize)]
struct RawAlbum {
    #[serde(default)]
    images: Option<Vec<RawImage>>,
}

#[derive(Deserialize)]
struct RawTrack {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    artists: Vec<RawArtist>,
    #[serde(default)]
    album: Option<RawAlbum>,
}

impl RawTrack {
    /// Local files have no id and episodes cannot be added as tracks.
    fn into_track(self) -> Option<Track> {
        if self.kind.as_deref().is_some_and(|k| k != "track") {
            return None;
        }
        let id = self.id?;
        Some(Track {
            id: id.into(),
            title: self.name,
            artist_names: self.artists.into_iter().map(|a| a.name).collect(),
            album_art_url: self.album.and_then(|a| first_image(a.images)),
        })
    }
}

#[derive(Deserialize)]
struct RawCreated {
    id: String,
}
