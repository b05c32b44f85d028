use futures_util::future::join_all;

use super::{BucketMeta, DestinationBucket, OrganizationSession};
use crate::catalog::Catalog;
use crate::error::Error;
use crate::gateway::Gateway;
use crate::storage::KeyValueStore;
use crate::types::{NewPlaylist, PlaylistId, Slot, TrackId, UserId};

/// What happened to one created bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketOutcome {
    Created(PlaylistId),
    /// No tracks; nothing was sent.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResult {
    pub slot: Slot,
    pub name: String,
    pub outcome: BucketOutcome,
}

/// Overall result to show the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitSummary {
    /// At least one playlist was created.
    Saved,
    /// Every created bucket was empty (or none were created).
    NothingToSave,
    Failed,
}

/// Per-bucket results of [`OrganizationSession::commit`], in slot order.
#[derive(Debug, Clone, Default)]
pub struct CommitReport {
    results: Vec<CommitResult>,
    session_expired: bool,
}

impl CommitReport {
    #[must_use]
    pub fn results(&self) -> &[CommitResult] {
        &self.results
    }

    #[must_use]
    pub fn result(&self, slot: Slot) -> Option<&CommitResult> {
        self.results.iter().find(|r| r.slot == slot)
    }

    #[must_use]
    pub fn summary(&self) -> CommitSummary {
        let outcomes = || self.results.iter().map(|r| &r.outcome);
        if outcomes().any(|o| matches!(o, BucketOutcome::Created(_))) {
            CommitSummary::Saved
        } else if outcomes().all(|o| matches!(o, BucketOutcome::Skipped)) {
            CommitSummary::NothingToSave
        } else {
            CommitSummary::Failed
        }
    }

    /// Created playlists, by slot.
    pub fn created(&self) -> impl Iterator<Item = (Slot, &PlaylistId)> + '_ {
        self.results.iter().filter_map(|r| match &r.outcome {
            BucketOutcome::Created(id) => Some((r.slot, id)),
            _ => None,
        })
    }

    /// Failed buckets with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (Slot, &str)> + '_ {
        self.results.iter().filter_map(|r| match &r.outcome {
            BucketOutcome::Failed(reason) => Some((r.slot, reason.as_str())),
            _ => None,
        })
    }

    /// A failure was caused by an unrecoverable session; the user must log
    /// in again before retrying.
    #[must_use]
    pub fn session_expired(&self) -> bool {
        self.session_expired
    }
}

impl OrganizationSession {
    /// Create a remote playlist for every created, non-empty bucket and add
    /// its tracks.
    ///
    /// Buckets run concurrently and fail independently. Playlists already
    /// created are not rolled back when a later step fails. Never returns an
    /// error: inspect the report.
    pub async fn commit<G: Gateway, S: KeyValueStore>(&self, catalog: &Catalog<G, S>) -> CommitReport {
        let mut report = CommitReport::default();

        let mut pending = Vec::new();
        for bucket in &self.buckets {
            match bucket.meta() {
                None => {}
                Some(_) if bucket.is_empty() => report.push(bucket, BucketOutcome::Skipped),
                Some(meta) => pending.push((bucket, meta)),
            }
        }

        if !pending.is_empty() {
            match catalog.current_user().await {
                Ok(user) => {
                    let default_description = format!("Organized from {}", self.source.name);
                    let outcomes = join_all(pending.iter().map(|(bucket, meta)| {
                        commit_bucket(catalog, &user.id, bucket, meta, &default_description)
                    }))
                    .await;
                    for ((bucket, _), outcome) in pending.iter().zip(outcomes) {
                        match outcome {
                            Ok(id) => report.created_playlist(bucket, id),
                            Err(e) => report.fail(bucket, &e),
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not resolve current user for commit");
                    for (bucket, _) in &pending {
                        report.fail(bucket, &e);
                    }
                }
            }
        }

        report.results.sort_by_key(|r| r.slot);
        tracing::info!(
            created = report.created().count(),
            failed = report.failures().count(),
            "Commit finished"
        );
        report
    }
}

impl CommitReport {
    fn push(&mut self, bucket: &DestinationBucket, outcome: BucketOutcome) {
        self.results.push(CommitResult {
            slot: bucket.slot(),
            name: bucket.name().unwrap_or_default().to_owned(),
            outcome,
        });
    }

    fn created_playlist(&mut self, bucket: &DestinationBucket, id: PlaylistId) {
        tracing::info!(slot = %bucket.slot(), playlist = %id, "Playlist saved");
        self.push(bucket, BucketOutcome::Created(id));
    }

    fn fail(&mut self, bucket: &DestinationBucket, e: &Error) {
        tracing::warn!(slot = %bucket.slot(), error = %e, "Playlist save failed");
        self.session_expired |= e.requires_reauthentication();
        self.push(bucket, BucketOutcome::Failed(e.to_string()));
    }
}

async fn commit_bucket<G: Gateway, S: KeyValueStore>(
    catalog: &Catalog<G, S>,
    user_id: &UserId,
    bucket: &DestinationBucket,
    meta: &BucketMeta,
    default_description: &str,
) -> Result<PlaylistId, Error> {
    let description = if meta.description.is_empty() {
        default_description.to_owned()
    } else {
        meta.description.clone()
    };
    let request = NewPlaylist {
        name: meta.name.clone(),
        description,
        is_public: meta.is_public,
    };

    let playlist_id = catalog.create_playlist(user_id, &request).await?;
    let track_ids: Vec<TrackId> = bucket.tracks().iter().map(|t| t.id.clone()).collect();
    catalog.add_tracks(&playlist_id, &track_ids).await?;
    Ok(playlist_id)
}
