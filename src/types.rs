use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Remote track identifier (base-62 Spotify id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    /// The remote reference used when adding this track to a playlist.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("spotify:track:{}", self.0)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Remote playlist identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct PlaylistId(pub String);

impl PlaylistId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlaylistId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Remote user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 1-based destination slot number.
///
/// Range checking happens against the organizer's configured slot count,
/// not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
pub struct Slot(pub u8);

/// An immutable track. Identity is [`Track::id`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist_names: Vec<String>,
    #[serde(default)]
    pub album_art_url: Option<String>,
}

impl Track {
    #[must_use]
    pub fn new(id: impl Into<TrackId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist_names: Vec::new(),
            album_art_url: None,
        }
    }

    #[must_use]
    pub fn with_artist(mut self, name: impl Into<String>) -> Self {
        self.artist_names.push(name.into());
        self
    }

    #[must_use]
    pub fn with_album_art(mut self, url: impl Into<String>) -> Self {
        self.album_art_url = Some(url.into());
        self
    }

    /// Artist names joined for display, e.g. `"Daft Punk, Pharrell Williams"`.
    #[must_use]
    pub fn artists_display(&self) -> String {
        self.artist_names.join(", ")
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

impl std::hash::Hash for Track {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Playlist metadata as listed by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: PlaylistId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub track_count: u32,
}

/// Current user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Parameters for creating a remote playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPlaylist {
    pub name: String,
    pub description: String,
    #[serde(rename = "public")]
    pub is_public: bool,
}
