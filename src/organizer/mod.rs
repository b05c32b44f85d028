//! Track distribution engine.
//!
//! An [`OrganizationSession`] holds one source playlist's tracks split
//! between a pool and a fixed number of destination buckets. Every track
//! is in exactly one place at all times.
//!
//! ```rust,ignore
//! let mut session = OrganizationSession::load(&catalog, &source_id, OrganizerSettings::default()).await?;
//! session.create_bucket(Slot(1), "Chill", "", false)?;
//! let front = session.window().next().map(|t| t.id.clone());
//! if let Some(id) = front {
//!     session.assign_track(&id, Slot(1))?;
//! }
//! let report = session.commit(&catalog).await;
//! ```

mod bucket;
mod commit;
mod error;
mod pool;

pub use bucket::{BucketMeta, DestinationBucket, GRADIENTS};
pub use commit::{BucketOutcome, CommitReport, CommitResult, CommitSummary};
pub use error::OrganizeError;
pub use pool::TrackPool;

use crate::catalog::Catalog;
use crate::gateway::Gateway;
use crate::storage::KeyValueStore;
use crate::types::{PlaylistId, PlaylistSummary, Slot, Track, TrackId};

/// Engine settings.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct OrganizerSettings {
    pub slot_count: u8,
    pub window_size: usize,
}

impl Default for OrganizerSettings {
    fn default() -> Self {
        Self {
            slot_count: 4,
            window_size: 6,
        }
    }
}

impl OrganizerSettings {
    #[must_use]
    pub fn with_slot_count(mut self, slot_count: u8) -> Self {
        self.slot_count = slot_count;
        self
    }

    /// Number of cards [`OrganizationSession::window`] shows.
    #[must_use]
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }
}

/// One source playlist being split into buckets.
#[derive(Debug, Clone)]
pub struct OrganizationSession {
    source: PlaylistSummary,
    pool: TrackPool,
    buckets: Vec<DestinationBucket>,
    /// Sorted ids of everything loaded; the pool and buckets always
    /// partition this set.
    loaded: Vec<TrackId>,
    settings: OrganizerSettings,
}

impl OrganizationSession {
    /// Start a session from already-fetched playlist entries.
    ///
    /// `None` entries (unavailable tracks) are dropped, as are repeated ids.
    #[must_use]
    pub fn new(
        source: PlaylistSummary,
        items: impl IntoIterator<Item = Option<Track>>,
        settings: OrganizerSettings,
    ) -> Self {
        let pool = TrackPool::new(items.into_iter().flatten());
        let mut loaded: Vec<TrackId> = pool.tracks().iter().map(|t| t.id.clone()).collect();
        loaded.sort_unstable();

        let buckets = (1..=settings.slot_count)
            .map(|n| DestinationBucket::uncreated(Slot(n)))
            .collect();

        Self {
            source,
            pool,
            buckets,
            loaded,
            settings,
        }
    }

    /// Fetch the source playlist and its tracks.
    ///
    /// # Errors
    ///
    /// [`OrganizeError::LoadFailed`] if either fetch fails after the session
    /// manager's refresh-and-retry.
    pub async fn load<G: Gateway, S: KeyValueStore>(
        catalog: &Catalog<G, S>,
        source_id: &PlaylistId,
        settings: OrganizerSettings,
    ) -> Result<Self, OrganizeError> {
        let (source, items) = futures_util::future::try_join(
            catalog.playlist(source_id),
            catalog.playlist_tracks(source_id),
        )
        .await
        .inspect_err(|e| tracing::warn!(playlist = %source_id, error = %e, "Playlist load failed"))?;

        let fetched = items.len();
        let session = Self::new(source, items, settings);
        tracing::info!(
            playlist = %source_id,
            fetched,
            available = session.pool.len(),
            "Playlist loaded for organizing"
        );
        Ok(session)
    }

    #[must_use]
    pub fn source(&self) -> &PlaylistSummary {
        &self.source
    }

    #[must_use]
    pub fn pool(&self) -> &TrackPool {
        &self.pool
    }

    #[must_use]
    pub fn buckets(&self) -> &[DestinationBucket] {
        &self.buckets
    }

    #[must_use]
    pub fn settings(&self) -> OrganizerSettings {
        self.settings
    }

    /// # Errors
    ///
    /// [`OrganizeError::InvalidSlot`] for an out-of-range slot.
    pub fn bucket(&self, slot: Slot) -> Result<&DestinationBucket, OrganizeError> {
        Ok(&self.buckets[self.index(slot)?])
    }

    /// True once every track has been assigned.
    #[must_use]
    pub fn is_fully_organized(&self) -> bool {
        self.pool.is_empty()
    }

    /// See [`TrackPool::visible_window`].
    pub fn visible_window(&self, count: usize) -> impl Iterator<Item = &Track> + '_ {
        self.pool.visible_window(count)
    }

    /// The carousel at the configured width.
    pub fn window(&self) -> impl Iterator<Item = &Track> + '_ {
        self.pool.visible_window(self.settings.window_size)
    }

    pub fn advance(&mut self) {
        self.pool.advance();
    }

    pub fn retreat(&mut self) {
        self.pool.retreat();
    }

    /// Give an uncreated slot its playlist metadata.
    ///
    /// # Errors
    ///
    /// [`OrganizeError::SlotAlreadyCreated`] or [`OrganizeError::InvalidName`];
    /// [`OrganizeError::InvalidSlot`] for an out-of-range slot.
    pub fn create_bucket(
        &mut self,
        slot: Slot,
        name: &str,
        description: &str,
        is_public: bool,
    ) -> Result<&DestinationBucket, OrganizeError> {
        let index = self.index(slot)?;
        let bucket = &mut self.buckets[index];
        if bucket.is_created() {
            return Err(OrganizeError::SlotAlreadyCreated(slot));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(OrganizeError::InvalidName);
        }

        bucket.create(name.to_owned(), description.trim().to_owned(), is_public);
        Ok(&self.buckets[index])
    }

    /// Move a track from the pool to the end of a created bucket.
    ///
    /// Checked synchronously: a second drop of the same track fails with
    /// [`OrganizeError::TrackNotAvailable`] instead of duplicating it.
    ///
    /// # Errors
    ///
    /// [`OrganizeError::BucketNotCreated`], [`OrganizeError::TrackNotAvailable`],
    /// [`OrganizeError::InvalidSlot`].
    pub fn assign_track(&mut self, track_id: &TrackId, slot: Slot) -> Result<(), OrganizeError> {
        let index = self.index(slot)?;
        if !self.buckets[index].is_created() {
            return Err(OrganizeError::BucketNotCreated(slot));
        }
        let track = self
            .pool
            .take(track_id)
            .ok_or_else(|| OrganizeError::TrackNotAvailable(track_id.clone()))?;
        self.buckets[index].push(track);

        debug_assert!(self.check_invariant());
        Ok(())
    }

    /// Move a track from a bucket back to the end of the pool.
    ///
    /// # Errors
    ///
    /// [`OrganizeError::BucketNotCreated`], [`OrganizeError::TrackNotInBucket`],
    /// [`OrganizeError::InvalidSlot`].
    pub fn unassign_track(&mut self, track_id: &TrackId, slot: Slot) -> Result<(), OrganizeError> {
        let index = self.index(slot)?;
        let bucket = &mut self.buckets[index];
        if !bucket.is_created() {
            return Err(OrganizeError::BucketNotCreated(slot));
        }
        let track = bucket
            .remove(track_id)
            .ok_or_else(|| OrganizeError::TrackNotInBucket {
                track: track_id.clone(),
                slot,
            })?;
        self.pool.push_back(track);

        debug_assert!(self.check_invariant());
        Ok(())
    }

    /// Whether pool plus buckets hold exactly the loaded tracks, each once.
    #[must_use]
    pub fn check_invariant(&self) -> bool {
        let mut ids: Vec<&TrackId> = self
            .pool
            .tracks()
            .iter()
            .chain(self.buckets.iter().flat_map(|b| b.tracks()))
            .map(|t| &t.id)
            .collect();
        ids.sort_unstable();
        ids.len() == self.loaded.len() && ids.iter().zip(&self.loaded).all(|(a, b)| *a == b)
    }

    fn index(&self, slot: Slot) -> Result<usize, OrganizeError> {
        let n = usize::from(slot.0);
        if n == 0 || n > self.buckets.len() {
            return Err(OrganizeError::InvalidSlot(slot.0));
        }
        Ok(n - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> PlaylistSummary {
        PlaylistSummary {
            id: "src".into(),
            name: "Everything".into(),
            description: None,
            image_url: None,
            track_count: 3,
        }
    }

    fn session(ids: &[&str]) -> OrganizationSession {
        OrganizationSession::new(
            source(),
            ids.iter().map(|id| Some(Track::new(*id, format!("Song {id}")))),
            OrganizerSettings::default(),
        )
    }

    fn pool_ids(session: &OrganizationSession) -> Vec<&str> {
        session.pool().tracks().iter().map(|t| t.id.as_str()).collect()
    }

    fn bucket_ids(session: &OrganizationSession, slot: u8) -> Vec<&str> {
        session
            .bucket(Slot(slot))
            .unwrap()
            .tracks()
            .iter()
            .map(|t| t.id.as_str())
            .collect()
    }

    #[test]
    fn new_filters_unavailable_entries_and_seeds_uncreated_buckets() {
        let session = OrganizationSession::new(
            source(),
            vec![Some(Track::new("t1", "One")), None, Some(Track::new("t2", "Two"))],
            OrganizerSettings::default(),
        );

        assert_eq!(pool_ids(&session), vec!["t1", "t2"]);
        assert_eq!(session.buckets().len(), 4);
        assert!(session.buckets().iter().all(|b| !b.is_created()));
        assert!(session.check_invariant());
    }

    #[test]
    fn assign_scenario() {
        let mut session = session(&["T1", "T2", "T3"]);
        session.create_bucket(Slot(1), "Chill", "", false).unwrap();

        session.assign_track(&"T1".into(), Slot(1)).unwrap();
        session.assign_track(&"T3".into(), Slot(1)).unwrap();

        assert_eq!(pool_ids(&session), vec!["T2"]);
        assert_eq!(bucket_ids(&session, 1), vec!["T1", "T3"]);
        assert!(session.check_invariant());
    }

    #[test]
    fn assign_to_uncreated_bucket_fails() {
        let mut session = session(&["T1", "T2", "T3"]);

        let err = session.assign_track(&"T1".into(), Slot(2)).unwrap_err();

        assert!(matches!(err, OrganizeError::BucketNotCreated(Slot(2))));
        assert_eq!(pool_ids(&session), vec!["T1", "T2", "T3"]);
    }

    #[test]
    fn second_drop_of_same_track_is_rejected() {
        let mut session = session(&["T1", "T2"]);
        session.create_bucket(Slot(1), "A", "", false).unwrap();
        session.create_bucket(Slot(2), "B", "", false).unwrap();

        session.assign_track(&"T1".into(), Slot(1)).unwrap();
        let err = session.assign_track(&"T1".into(), Slot(2)).unwrap_err();

        assert!(matches!(err, OrganizeError::TrackNotAvailable(ref id) if id.as_str() == "T1"));
        assert_eq!(bucket_ids(&session, 1), vec!["T1"]);
        assert!(bucket_ids(&session, 2).is_empty());
    }

    #[test]
    fn unknown_track_not_available() {
        let mut session = session(&["T1"]);
        session.create_bucket(Slot(1), "A", "", false).unwrap();
        assert!(matches!(
            session.assign_track(&"nope".into(), Slot(1)),
            Err(OrganizeError::TrackNotAvailable(_))
        ));
    }

    #[test]
    fn create_bucket_rules() {
        let mut session = session(&["T1"]);

        assert!(matches!(
            session.create_bucket(Slot(1), "   ", "", false),
            Err(OrganizeError::InvalidName)
        ));
        assert!(!session.bucket(Slot(1)).unwrap().is_created());

        let bucket = session.create_bucket(Slot(1), "  Chill  ", " late night ", true).unwrap();
        assert_eq!(bucket.name(), Some("Chill"));
        assert_eq!(bucket.meta().unwrap().description, "late night");
        assert!(bucket.meta().unwrap().is_public);

        assert!(matches!(
            session.create_bucket(Slot(1), "Again", "", false),
            Err(OrganizeError::SlotAlreadyCreated(Slot(1)))
        ));
        assert_eq!(session.bucket(Slot(1)).unwrap().name(), Some("Chill"));
    }

    #[test]
    fn slots_outside_configured_range_are_invalid() {
        let mut session = session(&["T1"]);
        assert!(matches!(
            session.create_bucket(Slot(0), "X", "", false),
            Err(OrganizeError::InvalidSlot(0))
        ));
        assert!(matches!(
            session.assign_track(&"T1".into(), Slot(5)),
            Err(OrganizeError::InvalidSlot(5))
        ));

        let wide = OrganizationSession::new(
            source(),
            vec![Some(Track::new("T1", "One"))],
            OrganizerSettings::default().with_slot_count(6),
        );
        assert_eq!(wide.buckets().len(), 6);
        assert!(wide.bucket(Slot(6)).is_ok());
    }

    #[test]
    fn unassign_returns_track_to_pool_end() {
        let mut session = session(&["T1", "T2", "T3"]);
        session.create_bucket(Slot(3), "Later", "", false).unwrap();
        session.assign_track(&"T1".into(), Slot(3)).unwrap();

        session.unassign_track(&"T1".into(), Slot(3)).unwrap();

        assert_eq!(pool_ids(&session), vec!["T2", "T3", "T1"]);
        assert!(bucket_ids(&session, 3).is_empty());
        assert!(matches!(
            session.unassign_track(&"T1".into(), Slot(3)),
            Err(OrganizeError::TrackNotInBucket { .. })
        ));
        assert!(matches!(
            session.unassign_track(&"T2".into(), Slot(4)),
            Err(OrganizeError::BucketNotCreated(Slot(4)))
        ));
    }

    #[test]
    fn window_uses_configured_width() {
        let ids: Vec<String> = (0..10).map(|i| format!("t{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut session = session(&refs);

        assert_eq!(session.window().count(), 6);
        session.advance();
        assert_eq!(session.window().next().unwrap().id.as_str(), "t1");
        session.retreat();
        session.retreat();
        assert_eq!(session.window().next().unwrap().id.as_str(), "t9");
    }

    #[test]
    fn fully_organized_when_pool_empty() {
        let mut session = session(&["T1"]);
        assert!(!session.is_fully_organized());
        session.create_bucket(Slot(1), "All", "", false).unwrap();
        session.assign_track(&"T1".into(), Slot(1)).unwrap();
        assert!(session.is_fully_organized());
        assert_eq!(session.visible_window(6).count(), 0);
    }
}
