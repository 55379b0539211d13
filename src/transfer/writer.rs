//! Batch writer with verification.
//!
//! Appends a list of destination ids to a playlist in fixed-size batches.
//! The destination can silently drop adds, report benign duplicates as
//! conflicts, lag behind its own writes and expire the session mid-run, so
//! each batch goes through a probe, add and classify cycle with a bounded
//! number of attempts, and the run ends with a single membership check
//! against the complete id list.
//!
//! ```text
//! RESOLVING -> WRITING -> VERIFYING -> DONE
//!                 |           |
//!                 +-----------+--> HeaderExpired (batch index)
//! ```
//!
//! A batch that exhausts its attempts is recorded as failed and the run
//! continues. Only [`HeaderExpired`] aborts the loop.

use std::{collections::HashSet, time::Duration};

use tokio::time::sleep;

use crate::{
    config,
    error::{CatalogError, HeaderExpired},
    info,
    transfer::{DestinationCatalog, member_ids},
    types::DestinationId,
    warning,
};

/// Cumulative number of ids attempted so far, reported after every batch.
pub type ProgressFn<'a> = &'a (dyn Fn(usize) + Send + Sync);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Ids per add call, clamped to `1..=20`.
    pub batch_size: usize,
    /// Add attempts per batch.
    pub retry_attempts: u32,
    /// Pause after every batch, and the unit of the linear backoff.
    pub batch_delay: Duration,
    /// Pause before the final membership check.
    pub verification_delay: Duration,
    /// Check membership after every acknowledged add and retry only the
    /// missing ids.
    pub verify_each_batch: bool,
    pub verify_retries: u32,
    pub verify_retry_delay: Duration,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            batch_size: config::DEFAULT_BATCH_SIZE,
            retry_attempts: config::DEFAULT_RETRY_ATTEMPTS,
            batch_delay: Duration::from_secs(config::DEFAULT_BATCH_DELAY_SECS),
            verification_delay: Duration::from_secs(config::DEFAULT_VERIFICATION_DELAY_SECS),
            verify_each_batch: false,
            verify_retries: 3,
            verify_retry_delay: Duration::from_secs(3),
        }
    }
}

impl WriterOptions {
    pub fn from_config() -> Self {
        Self {
            batch_size: config::batch_size(),
            retry_attempts: config::retry_attempts(),
            batch_delay: config::batch_delay(),
            verification_delay: config::verification_delay(),
            ..Self::default()
        }
    }

    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, config::MAX_BATCH_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedBatch {
    pub index: usize,
    pub ids: Vec<DestinationId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Ids of the full input list found in the playlist at the end, in
    /// input order.
    pub confirmed: Vec<DestinationId>,
    pub failed_batches: Vec<FailedBatch>,
    /// Ids whose add the destination acknowledged during this run.
    pub acknowledged: usize,
    /// Whether `confirmed` comes from a membership read rather than from
    /// the acknowledgements.
    pub verified: bool,
}

impl WriteOutcome {
    pub fn failed_count(&self) -> usize {
        self.failed_batches.iter().map(|b| b.ids.len()).sum()
    }
}

/// Splits ids into consecutive batches; the last one may be short.
pub fn partition(ids: &[DestinationId], batch_size: usize) -> Vec<&[DestinationId]> {
    ids.chunks(batch_size.max(1)).collect()
}

pub fn batch_count(len: usize, batch_size: usize) -> usize {
    len.div_ceil(batch_size.max(1))
}

/// Writes `ids` to the playlist, skipping batches before `start_batch_index`.
///
/// After the last batch the writer waits `verification_delay`, reads the
/// playlist once and reports which ids of the whole list (including those
/// written by an earlier, interrupted run) are present.
///
/// # Errors
///
/// Returns [`HeaderExpired`] with the current batch index as soon as the
/// session probe or an add call reports an unauthorized-class error. No
/// later batch is touched. An unauthorized final read reports the batch
/// count as index, so a resumed run only repeats the verification.
pub async fn write_all<D>(
    dest: &D,
    playlist_id: &str,
    ids: &[DestinationId],
    options: &WriterOptions,
    start_batch_index: usize,
    progress: Option<ProgressFn<'_>>,
) -> Result<WriteOutcome, HeaderExpired>
where
    D: DestinationCatalog + ?Sized,
{
    let batch_size = options.effective_batch_size();
    let batches = partition(ids, batch_size);
    let total_batches = batches.len();

    let mut acknowledged: Vec<DestinationId> = Vec::new();
    let mut failed_batches = Vec::new();

    for (index, batch) in batches.into_iter().enumerate() {
        if index < start_batch_index {
            continue;
        }

        info!(
            "Adding batch {}/{}: {} tracks",
            index + 1,
            total_batches,
            batch.len()
        );

        let result = write_batch(dest, playlist_id, index, batch, options).await?;
        acknowledged.extend(result.written);
        if !result.missing.is_empty() {
            warning!(
                "Batch {} failed after {} attempts",
                index + 1,
                options.retry_attempts.max(1)
            );
            failed_batches.push(FailedBatch {
                index,
                ids: result.missing,
            });
        }

        if let Some(report) = progress {
            report(index * batch_size + batch.len());
        }

        sleep(options.batch_delay).await;
    }

    if acknowledged.is_empty() && start_batch_index == 0 {
        return Ok(WriteOutcome {
            confirmed: Vec::new(),
            failed_batches,
            acknowledged: 0,
            verified: false,
        });
    }

    info!(
        "Waiting {}s before final verification...",
        options.verification_delay.as_secs()
    );
    sleep(options.verification_delay).await;

    let acknowledged_count = acknowledged.len();
    let (confirmed, verified) = match member_ids(dest, playlist_id).await {
        Ok(members) => (
            ids.iter()
                .filter(|id| members.contains(*id))
                .cloned()
                .collect(),
            true,
        ),
        Err(e) if e.is_unauthorized() => {
            return Err(HeaderExpired {
                batch_index: total_batches,
            });
        }
        Err(e) => {
            warning!("Final verification failed: {}", e);
            (acknowledged, false)
        }
    };

    Ok(WriteOutcome {
        confirmed,
        failed_batches,
        acknowledged: acknowledged_count,
        verified,
    })
}

struct BatchResult {
    written: Vec<DestinationId>,
    missing: Vec<DestinationId>,
}

impl BatchResult {
    fn written(batch: &[DestinationId]) -> Self {
        Self {
            written: batch.to_vec(),
            missing: Vec::new(),
        }
    }
}

async fn write_batch<D>(
    dest: &D,
    playlist_id: &str,
    batch_index: usize,
    batch: &[DestinationId],
    options: &WriterOptions,
) -> Result<BatchResult, HeaderExpired>
where
    D: DestinationCatalog + ?Sized,
{
    let attempts = options.retry_attempts.max(1);
    let mut pending: Vec<DestinationId> = batch.to_vec();
    let mut attempt: u32 = 0;

    while attempt < attempts {
        if let Err(e) = dest.probe_session().await {
            if e.is_unauthorized() {
                return Err(HeaderExpired { batch_index });
            }
        }

        match dest.add_items(playlist_id, &pending).await {
            Ok(()) if !options.verify_each_batch => return Ok(BatchResult::written(batch)),
            Ok(()) => {
                let missing = poll_missing(
                    dest,
                    playlist_id,
                    &pending,
                    options.verify_retries,
                    options.verify_retry_delay,
                )
                .await
                .map_err(|_| HeaderExpired { batch_index })?;
                if missing.is_empty() {
                    return Ok(BatchResult::written(batch));
                }
                attempt += 1;
                warning!(
                    "Batch {}: {}/{} tracks missing after add",
                    batch_index + 1,
                    missing.len(),
                    pending.len()
                );
                pending = missing;
            }
            Err(e) if e.is_conflict() => {
                info!(
                    "Conflict for batch {}, treating tracks as present",
                    batch_index + 1
                );
                return Ok(BatchResult::written(batch));
            }
            Err(e) if e.is_unauthorized() => return Err(HeaderExpired { batch_index }),
            Err(e) => {
                attempt += 1;
                warning!("Batch {} attempt {} failed: {}", batch_index + 1, attempt, e);
            }
        }

        if attempt < attempts {
            sleep(options.batch_delay * attempt).await;
        }
    }

    let missing: HashSet<&DestinationId> = pending.iter().collect();
    let written = batch
        .iter()
        .filter(|id| !missing.contains(id))
        .cloned()
        .collect();

    Ok(BatchResult {
        written,
        missing: pending,
    })
}

/// Polls playlist membership until all `expected` ids show up.
///
/// Reads up to `max_retries` times (at least once) with `delay` between
/// reads and stops early once nothing is missing. Returns whether all ids
/// are present and the ids still missing according to the last read; a
/// failed read counts every id as missing.
pub async fn verify_batch_added<D>(
    dest: &D,
    playlist_id: &str,
    expected: &[DestinationId],
    max_retries: u32,
    delay: Duration,
) -> (bool, Vec<DestinationId>)
where
    D: DestinationCatalog + ?Sized,
{
    match poll_missing(dest, playlist_id, expected, max_retries, delay).await {
        Ok(missing) => (missing.is_empty(), missing),
        Err(e) => {
            warning!("Verification stopped: {}", e);
            (false, expected.to_vec())
        }
    }
}

/// Ids of `expected` absent from the playlist after the last read. An
/// unauthorized-class read ends polling with the error.
async fn poll_missing<D>(
    dest: &D,
    playlist_id: &str,
    expected: &[DestinationId],
    max_retries: u32,
    delay: Duration,
) -> Result<Vec<DestinationId>, CatalogError>
where
    D: DestinationCatalog + ?Sized,
{
    let reads = max_retries.max(1);
    let mut missing = expected.to_vec();

    for attempt in 0..reads {
        match member_ids(dest, playlist_id).await {
            Ok(members) => {
                missing = expected
                    .iter()
                    .filter(|id| !members.contains(*id))
                    .cloned()
                    .collect();
                if missing.is_empty() {
                    return Ok(missing);
                }
            }
            Err(e) if e.is_unauthorized() => return Err(e),
            Err(e) => {
                warning!("Verification attempt {} failed: {}", attempt + 1, e);
                missing = expected.to_vec();
            }
        }

        if attempt + 1 < reads {
            sleep(delay).await;
        }
    }

    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::CatalogError,
        transfer::MockDestinationCatalog,
        types::PlaylistContents,
    };

    fn ids(n: usize) -> Vec<DestinationId> {
        (0..n).map(|i| DestinationId::from(format!("v{i:02}"))).collect()
    }

    fn instant() -> WriterOptions {
        WriterOptions {
            batch_size: 10,
            batch_delay: Duration::ZERO,
            verification_delay: Duration::ZERO,
            verify_retry_delay: Duration::ZERO,
            ..WriterOptions::default()
        }
    }

    #[test]
    fn partition_is_lossless_and_ordered() {
        for n in [0, 1, 7, 20, 23, 41] {
            let list = ids(n);
            for size in 1..=20 {
                let batches = partition(&list, size);
                assert_eq!(batches.len(), batch_count(n, size));
                assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= size));
                assert_eq!(batches.concat(), list);
            }
        }
    }

    #[test]
    fn batch_size_is_clamped() {
        let mut options = instant();
        options.batch_size = 0;
        assert_eq!(options.effective_batch_size(), 1);
        options.batch_size = 500;
        assert_eq!(options.effective_batch_size(), 20);
    }

    #[tokio::test]
    async fn probe_failure_aborts_before_writing() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_probe_session()
            .times(1)
            .returning(|| Err(CatalogError::unauthorized("401")));
        dest.expect_add_items().never();

        let err = write_all(&dest, "PL", &ids(5), &instant(), 0, None)
            .await
            .unwrap_err();
        assert_eq!(err.batch_index, 0);
    }

    #[tokio::test]
    async fn non_auth_probe_failure_is_ignored() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_probe_session()
            .returning(|| Err(CatalogError::transient("timeout")));
        dest.expect_add_items().times(1).returning(|_, _| Ok(()));
        dest.expect_playlist().returning(|_| {
            Ok(PlaylistContents {
                item_ids: ids(3),
                track_count: Some(3),
            })
        });

        let outcome = write_all(&dest, "PL", &ids(3), &instant(), 0, None)
            .await
            .unwrap();
        assert_eq!(outcome.confirmed, ids(3));
        assert!(outcome.verified);
    }

    #[tokio::test]
    async fn conflict_counts_as_written_without_retry() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_probe_session().returning(|| Ok(()));
        dest.expect_add_items()
            .times(1)
            .returning(|_, _| Err(CatalogError::conflict("409")));
        dest.expect_playlist().returning(|_| {
            Ok(PlaylistContents {
                item_ids: ids(4),
                track_count: Some(4),
            })
        });

        let outcome = write_all(&dest, "PL", &ids(4), &instant(), 0, None)
            .await
            .unwrap();
        assert_eq!(outcome.acknowledged, 4);
        assert!(outcome.failed_batches.is_empty());
    }

    #[tokio::test]
    async fn exhausted_batch_is_recorded_and_skips_verification_when_nothing_written() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_probe_session().returning(|| Ok(()));
        dest.expect_add_items()
            .times(3)
            .returning(|_, _| Err(CatalogError::transient("500")));
        dest.expect_playlist().never();

        let outcome = write_all(&dest, "PL", &ids(2), &instant(), 0, None)
            .await
            .unwrap();
        assert!(outcome.confirmed.is_empty());
        assert_eq!(
            outcome.failed_batches,
            vec![FailedBatch {
                index: 0,
                ids: ids(2)
            }]
        );
    }

    #[tokio::test]
    async fn verify_each_batch_retries_only_missing_ids() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_probe_session().returning(|| Ok(()));
        dest.expect_add_items()
            .withf(|_, batch| batch.len() == 3)
            .times(1)
            .returning(|_, _| Ok(()));
        dest.expect_add_items()
            .withf(|_, batch| batch.len() == 1 && batch[0].as_str() == "v02")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut reads = 0;
        dest.expect_playlist().returning(move |_| {
            reads += 1;
            let present = if reads <= 3 { ids(2) } else { ids(3) };
            Ok(PlaylistContents {
                item_ids: present,
                track_count: None,
            })
        });

        let options = WriterOptions {
            verify_each_batch: true,
            ..instant()
        };
        let outcome = write_all(&dest, "PL", &ids(3), &options, 0, None)
            .await
            .unwrap();
        assert!(outcome.failed_batches.is_empty());
        assert_eq!(outcome.confirmed, ids(3));
    }

    #[tokio::test]
    async fn expiry_while_verifying_a_batch_keeps_its_index() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_probe_session().returning(|| Ok(()));
        dest.expect_add_items()
            .withf(|_, batch| batch.len() == 2 && batch[0].as_str() == "v00")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut reads = 0;
        dest.expect_playlist().times(2).returning(move |_| {
            reads += 1;
            if reads == 1 {
                Ok(PlaylistContents {
                    item_ids: Vec::new(),
                    track_count: Some(0),
                })
            } else {
                Err(CatalogError::unauthorized("401"))
            }
        });

        let options = WriterOptions {
            batch_size: 2,
            retry_attempts: 1,
            verify_each_batch: true,
            ..instant()
        };
        let err = write_all(&dest, "PL", &ids(4), &options, 0, None)
            .await
            .unwrap_err();
        assert_eq!(err.batch_index, 0);
    }

    #[tokio::test]
    async fn verify_batch_added_treats_expiry_as_all_missing() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_playlist()
            .times(1)
            .returning(|_| Err(CatalogError::unauthorized("401")));

        let (ok, missing) =
            verify_batch_added(&dest, "PL", &ids(2), 3, Duration::ZERO).await;
        assert!(!ok);
        assert_eq!(missing, ids(2));
    }

    #[tokio::test]
    async fn verify_batch_added_stops_early() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_playlist().times(1).returning(|_| {
            Ok(PlaylistContents {
                item_ids: ids(5),
                track_count: Some(5),
            })
        });

        let (ok, missing) =
            verify_batch_added(&dest, "PL", &ids(5), 3, Duration::ZERO).await;
        assert!(ok);
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn verify_batch_added_reports_last_read() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_playlist().times(3).returning(|_| {
            Ok(PlaylistContents {
                item_ids: ids(1),
                track_count: Some(1),
            })
        });

        let (ok, missing) =
            verify_batch_added(&dest, "PL", &ids(3), 3, Duration::ZERO).await;
        assert!(!ok);
        assert_eq!(missing, ids(3)[1..].to_vec());
    }
}
