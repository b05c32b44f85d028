use std::collections::HashSet;

use crate::types::{Track, TrackId};

/// Tracks not yet assigned to a bucket, plus the carousel cursor.
///
/// Ids are unique within the pool.
#[derive(Debug, Clone, Default)]
pub struct TrackPool {
    tracks: Vec<Track>,
    cursor: usize,
}

impl TrackPool {
    /// Build a pool, keeping the first occurrence of any repeated id.
    #[must_use]
    pub fn new(tracks: impl IntoIterator<Item = Track>) -> Self {
        let mut seen = HashSet::new();
        let tracks = tracks
            .into_iter()
            .filter(|t| seen.insert(t.id.clone()))
            .collect();
        Self { tracks, cursor: 0 }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn contains(&self, id: &TrackId) -> bool {
        self.position(id).is_some()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Up to `count` tracks starting at the cursor, wrapping around.
    ///
    /// Never yields the same index twice, so the window is at most
    /// `len()` long. Pool order is not changed.
    pub fn visible_window(&self, count: usize) -> impl Iterator<Item = &Track> + '_ {
        let n = self.tracks.len();
        let start = self.cursor;
        (0..count.min(n)).map(move |i| &self.tracks[(start + i) % n])
    }

    pub fn advance(&mut self) {
        if !self.tracks.is_empty() {
            self.cursor = (self.cursor + 1) % self.tracks.len();
        }
    }

    pub fn retreat(&mut self) {
        if !self.tracks.is_empty() {
            let n = self.tracks.len();
            self.cursor = (self.cursor + n - 1) % n;
        }
    }

    /// Remove a track by id. The track under the cursor stays in front
    /// unless it is the one removed.
    pub(crate) fn take(&mut self, id: &TrackId) -> Option<Track> {
        let index = self.position(id)?;
        let track = self.tracks.remove(index);

        if self.tracks.is_empty() {
            self.cursor = 0;
        } else {
            if index < self.cursor {
                self.cursor -= 1;
            }
            self.cursor %= self.tracks.len();
        }
        Some(track)
    }

    pub(crate) fn push_back(&mut self, track: Track) {
        self.tracks.push(track);
    }

    fn position(&self, id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| &t.id == id)
    }
}
