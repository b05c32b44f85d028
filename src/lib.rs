#![doc = include_str!("../README.md")]

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod organizer;
pub mod pkce;
pub mod session;
#[cfg(feature = "spotify")]
pub mod spotify;
pub mod storage;
pub mod types;

#[cfg(test)]
mod mock;

// Re-exports for convenient access
pub use auth::{CallbackParams, SessionManager};
pub use catalog::Catalog;
pub use config::OAuthConfig;
pub use error::{Error, GatewayError};
pub use gateway::{Gateway, TokenResponse};
pub use organizer::{
    BucketOutcome, CommitReport, CommitSummary, OrganizationSession, OrganizeError,
    OrganizerSettings,
};
pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state};
pub use session::{Session, SessionState};
#[cfg(feature = "spotify")]
pub use spotify::SpotifyGateway;
pub use storage::{KeyValueStore, MemoryStore};
pub use types::{
    NewPlaylist, PlaylistId, PlaylistSummary, Slot, Track, TrackId, UserId, UserProfile,
};
