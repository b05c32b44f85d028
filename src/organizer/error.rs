use crate::types::{Slot, TrackId};

/// Errors from the track distribution engine.
///
/// Everything except [`LoadFailed`](OrganizeError::LoadFailed) rejects a
/// single local action and leaves the session untouched.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OrganizeError {
    /// Fetching the source playlist or its tracks failed.
    #[error("failed to load playlist: {0}")]
    LoadFailed(#[from] crate::error::Error),

    /// Slot number outside `1..=slot_count`.
    #[error("no destination slot {0}")]
    InvalidSlot(u8),

    #[error("slot {0} already has a playlist")]
    SlotAlreadyCreated(Slot),

    /// Bucket name is empty after trimming.
    #[error("playlist name must not be empty")]
    InvalidName,

    #[error("slot {0} has no playlist yet")]
    BucketNotCreated(Slot),

    /// The track is not in the pool (already assigned, or unknown).
    #[error("track {0} is not available")]
    TrackNotAvailable(TrackId),

    #[error("track {track} is not in slot {slot}")]
    TrackNotInBucket { track: TrackId, slot: Slot },
}

impl OrganizeError {
    /// Whether the user has to log in again before retrying.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::LoadFailed(e) if e.requires_reauthentication())
    }
}
