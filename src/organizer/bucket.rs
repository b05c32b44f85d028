use rand::seq::IndexedRandom;

use crate::types::{Slot, Track, TrackId};

/// Decorative gradient tags. Purely cosmetic.
pub const GRADIENTS: &[&str] = &[
    "from-green-500 to-blue-500",
    "from-purple-500 to-pink-500",
    "from-yellow-500 to-red-500",
    "from-indigo-500 to-purple-500",
    "from-blue-500 to-teal-500",
];

fn random_gradient() -> &'static str {
    GRADIENTS.choose(&mut rand::rng()).copied().unwrap_or(GRADIENTS[0])
}

/// Metadata fixed when a bucket is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketMeta {
    pub name: String,
    /// Empty means "use the generated description at commit time".
    pub description: String,
    pub is_public: bool,
    pub gradient: &'static str,
}

/// One destination slot: uncreated, or created with metadata and tracks.
#[derive(Debug, Clone)]
pub struct DestinationBucket {
    slot: Slot,
    meta: Option<BucketMeta>,
    tracks: Vec<Track>,
}

impl DestinationBucket {
    pub(crate) fn uncreated(slot: Slot) -> Self {
        Self {
            slot,
            meta: None,
            tracks: Vec::new(),
        }
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        self.slot
    }

    #[must_use]
    pub fn is_created(&self) -> bool {
        self.meta.is_some()
    }

    #[must_use]
    pub fn meta(&self) -> Option<&BucketMeta> {
        self.meta.as_ref()
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.meta.as_ref().map(|m| m.name.as_str())
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Caller has already validated and trimmed `name`.
    pub(crate) fn create(&mut self, name: String, description: String, is_public: bool) {
        self.meta = Some(BucketMeta {
            name,
            description,
            is_public,
            gradient: random_gradient(),
        });
    }

    pub(crate) fn push(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub(crate) fn remove(&mut self, id: &TrackId) -> Option<Track> {
        let index = self.tracks.iter().position(|t| &t.id == id)?;
        Some(self.tracks.remove(index))
    }
}
