//! The transfer engine.
//!
//! A transfer resolves every source track to a destination id by search,
//! drops ids already present in a pre-existing destination playlist and
//! hands the rest to the batch writer. An expired destination session
//! interrupts the run and leaves a checkpoint behind; the next run with the
//! same name picks up where it stopped.

mod artists;
mod catalog;
mod dedup;
mod job;
mod quota;
mod resolver;
mod writer;

pub use artists::{ArtistReport, subscribe_artists};
pub use catalog::*;
pub use dedup::{PLAYLIST_DESCRIPTION, filter_existing, get_or_create_playlist, subtract_members};
pub use job::{
    Interruption, Observer, Phase, Transfer, TransferEvent, TransferJob, TransferReport,
    TransferStatus,
};
pub use quota::{
    DestinationQuota, PROBE_PLAYLIST_TITLE, QuotaProbe, SourceQuota, check_destination_quota,
    check_source_quota, classify_probe, detect_quota_exhaustion,
};
pub use resolver::{resolve, resolve_artist};
pub use writer::{
    FailedBatch, ProgressFn, WriteOutcome, WriterOptions, batch_count, partition,
    verify_batch_added, write_all,
};
