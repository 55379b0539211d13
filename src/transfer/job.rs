use std::path::PathBuf;

use crate::{
    error::{CatalogError, TransferError},
    info,
    management::{ProgressStore, TransferCheckpoint},
    transfer::{
        DestinationCatalog, FailedBatch, QuotaProbe, WriterOptions, detect_quota_exhaustion,
        filter_existing, get_or_create_playlist, resolve, write_all,
    },
    types::{DestinationId, PlaylistHandle, TrackRef, TransferKind},
    warning,
};

/// Source items of one transfer. `name` is both the destination playlist
/// title and the checkpoint key.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub name: String,
    pub kind: TransferKind,
    pub tracks: Vec<TrackRef>,
}

impl TransferJob {
    pub fn playlist(name: impl Into<String>, tracks: Vec<TrackRef>) -> Self {
        Self {
            name: name.into(),
            kind: TransferKind::Playlist,
            tracks,
        }
    }

    pub fn liked_songs(name: impl Into<String>, tracks: Vec<TrackRef>) -> Self {
        Self {
            name: name.into(),
            kind: TransferKind::LikedSongs,
            tracks,
        }
    }
}

/// Progress notifications emitted while a transfer runs.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Resuming {
        resolution_cursor: usize,
        total: usize,
        write_cursor: usize,
    },
    PlaylistReady {
        playlist_id: String,
        pre_existed: bool,
    },
    Resolving {
        index: usize,
        total: usize,
        track: TrackRef,
    },
    NotFound {
        track: TrackRef,
    },
    Deduplicated {
        skipped: usize,
    },
    Writing {
        total: usize,
        start_batch: usize,
        batch_size: usize,
    },
    Written {
        attempted: usize,
        total: usize,
    },
}

pub type Observer<'a> = &'a (dyn Fn(TransferEvent) + Send + Sync);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolving,
    Writing,
}

/// A transfer stopped by an expired destination session. The checkpoint
/// holds everything needed to continue.
#[derive(Debug, Clone, PartialEq)]
pub struct Interruption {
    pub name: String,
    pub phase: Phase,
    pub batch_index: usize,
    pub checkpoint: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    pub name: String,
    pub kind: TransferKind,
    pub playlist_id: String,
    pub total_tracks: usize,
    /// Ids handed to the writer, after dedup.
    pub to_write: usize,
    pub skipped_existing: usize,
    pub confirmed: usize,
    pub failed_batches: Vec<FailedBatch>,
    pub not_found: Vec<TrackRef>,
    pub verified: bool,
    pub quota_exhausted: bool,
    pub resumed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferStatus {
    Completed(TransferReport),
    Interrupted(Interruption),
}

/// Drives one transfer through resolution, dedup and writing, resuming
/// from and saving to the progress store.
pub struct Transfer<'a, D: DestinationCatalog + ?Sized> {
    dest: &'a D,
    store: &'a ProgressStore,
    options: WriterOptions,
    probe: QuotaProbe,
    observer: Option<Observer<'a>>,
}

impl<'a, D: DestinationCatalog + ?Sized> Transfer<'a, D> {
    pub fn new(dest: &'a D, store: &'a ProgressStore, options: WriterOptions) -> Self {
        Self {
            dest,
            store,
            options,
            probe: QuotaProbe::default(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Observer<'a>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_probe(mut self, probe: QuotaProbe) -> Self {
        self.probe = probe;
        self
    }

    fn emit(&self, event: TransferEvent) {
        if let Some(observer) = self.observer {
            observer(event);
        }
    }

    /// Runs the transfer.
    ///
    /// An expired destination session is not an error: the state is saved
    /// and [`TransferStatus::Interrupted`] is returned. Errors are limited to
    /// failures outside the write loop (listing or creating the playlist)
    /// and checkpoint writes.
    pub async fn run(&self, job: &TransferJob) -> Result<TransferStatus, TransferError> {
        let checkpoint = self.store.load(&job.name).await;
        let total = job.tracks.len();

        if checkpoint.is_none() && total == 0 {
            warning!("No tracks in '{}', nothing to transfer", job.name);
            return Ok(TransferStatus::Completed(TransferReport {
                name: job.name.clone(),
                kind: job.kind,
                playlist_id: String::new(),
                total_tracks: 0,
                to_write: 0,
                skipped_existing: 0,
                confirmed: 0,
                failed_batches: Vec::new(),
                not_found: Vec::new(),
                verified: false,
                quota_exhausted: false,
                resumed: false,
            }));
        }

        let resumed = checkpoint.is_some();
        let (cursor, mut resolved, mut unresolved, saved_write_cursor) = match checkpoint {
            Some(cp) => {
                if cp.total != total {
                    warning!(
                        "Saved progress for '{}' covers {} tracks, source now has {}",
                        job.name,
                        cp.total,
                        total
                    );
                }
                if cp.kind != job.kind {
                    warning!(
                        "Saved progress for '{}' was a {} transfer, continuing as {}",
                        job.name,
                        cp.kind,
                        job.kind
                    );
                }
                self.emit(TransferEvent::Resuming {
                    resolution_cursor: cp.resolution_cursor,
                    total: cp.total,
                    write_cursor: cp.write_cursor,
                });
                let write_cursor = if cp.resolution_complete() {
                    cp.write_cursor
                } else {
                    0
                };
                (
                    cp.resolution_cursor,
                    cp.resolved_ids,
                    cp.unresolved,
                    write_cursor,
                )
            }
            None => (0, Vec::new(), Vec::new(), 0),
        };

        let playlist = get_or_create_playlist(self.dest, &job.name).await?;
        self.emit(TransferEvent::PlaylistReady {
            playlist_id: playlist.id.clone(),
            pre_existed: playlist.pre_existed,
        });

        for (index, track) in job.tracks.iter().enumerate().skip(cursor) {
            self.emit(TransferEvent::Resolving {
                index,
                total,
                track: track.clone(),
            });

            match resolve(self.dest, track).await {
                Ok(Some(id)) => resolved.push(id),
                Ok(None) => {
                    self.emit(TransferEvent::NotFound {
                        track: track.clone(),
                    });
                    unresolved.push(track.clone());
                }
                Err(e) => {
                    let cp = TransferCheckpoint::new(
                        &job.name,
                        index,
                        total,
                        resolved,
                        unresolved,
                        job.kind,
                        0,
                    );
                    return self.interrupt(job, Phase::Resolving, 0, cp, &e).await;
                }
            }
        }

        let resolution_cursor = cursor.max(total);
        let mut skipped_existing = 0;
        if saved_write_cursor == 0 && playlist.pre_existed {
            match filter_existing(self.dest, &playlist, resolved.clone()).await {
                Ok(filtered) => {
                    skipped_existing = resolved.len() - filtered.len();
                    if skipped_existing > 0 {
                        info!(
                            "Skipping {} tracks already in '{}'",
                            skipped_existing, job.name
                        );
                    }
                    self.emit(TransferEvent::Deduplicated {
                        skipped: skipped_existing,
                    });
                    resolved = filtered;
                }
                Err(e) if e.is_unauthorized() => {
                    let cp = TransferCheckpoint::new(
                        &job.name,
                        resolution_cursor,
                        total,
                        resolved,
                        unresolved,
                        job.kind,
                        0,
                    );
                    return self.interrupt(job, Phase::Writing, 0, cp, &e).await;
                }
                Err(e) => {
                    warning!("Could not read existing tracks, writing unfiltered: {}", e);
                }
            }
        }

        let start = WriteStart {
            resolution_cursor,
            write_cursor: saved_write_cursor,
            skipped_existing,
            resumed,
        };
        self.write(job, playlist, resolved, unresolved, start).await
    }

    async fn write(
        &self,
        job: &TransferJob,
        playlist: PlaylistHandle,
        ids: Vec<DestinationId>,
        unresolved: Vec<TrackRef>,
        start: WriteStart,
    ) -> Result<TransferStatus, TransferError> {
        let to_write = ids.len();
        self.emit(TransferEvent::Writing {
            total: to_write,
            start_batch: start.write_cursor,
            batch_size: self.options.effective_batch_size(),
        });

        let report_progress = |attempted: usize| {
            self.emit(TransferEvent::Written {
                attempted,
                total: to_write,
            });
        };

        let outcome = match write_all(
            self.dest,
            &playlist.id,
            &ids,
            &self.options,
            start.write_cursor,
            Some(&report_progress),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(expired) => {
                let cp = TransferCheckpoint::new(
                    &job.name,
                    start.resolution_cursor,
                    job.tracks.len(),
                    ids,
                    unresolved,
                    job.kind,
                    expired.batch_index,
                );
                let reason = CatalogError::unauthorized(expired.to_string());
                return self
                    .interrupt(job, Phase::Writing, expired.batch_index, cp, &reason)
                    .await;
            }
        };

        let quota_exhausted = detect_quota_exhaustion(self.dest, &outcome, &self.probe).await;
        if quota_exhausted {
            let cp = TransferCheckpoint::new(
                &job.name,
                start.resolution_cursor,
                job.tracks.len(),
                ids,
                unresolved.clone(),
                job.kind,
                0,
            );
            let path = self.store.save(&cp).await?;
            warning!(
                "Destination stopped accepting writes, progress kept at {}",
                path.display()
            );
        } else {
            self.store.delete(&job.name).await;
        }

        Ok(TransferStatus::Completed(TransferReport {
            name: job.name.clone(),
            kind: job.kind,
            playlist_id: playlist.id,
            total_tracks: job.tracks.len(),
            to_write,
            skipped_existing: start.skipped_existing,
            confirmed: outcome.confirmed.len(),
            failed_batches: outcome.failed_batches,
            not_found: unresolved,
            verified: outcome.verified,
            quota_exhausted,
            resumed: start.resumed,
        }))
    }

    async fn interrupt(
        &self,
        job: &TransferJob,
        phase: Phase,
        batch_index: usize,
        checkpoint: TransferCheckpoint,
        cause: &CatalogError,
    ) -> Result<TransferStatus, TransferError> {
        let path = self.store.save(&checkpoint).await?;
        warning!(
            "Destination session expired during '{}', progress saved to {}",
            job.name,
            path.display()
        );

        Ok(TransferStatus::Interrupted(Interruption {
            name: job.name.clone(),
            phase,
            batch_index,
            checkpoint: path,
            reason: cause.to_string(),
        }))
    }
}

struct WriteStart {
    resolution_cursor: usize,
    write_cursor: usize,
    skipped_existing: usize,
    resumed: bool,
}
