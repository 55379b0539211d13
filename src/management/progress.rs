use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::Utc;
use futures_util::TryStreamExt;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    config,
    error::CheckpointError,
    types::{DestinationId, TrackRef, TransferKind},
    warning,
};

const KEY_PREFIX: &str = "progress_";

/// Longest slug kept in a checkpoint file name, in bytes.
pub const MAX_SLUG_BYTES: usize = 200;

/// Durable state of an interrupted transfer.
///
/// `resolved_ids` holds the destination ids found so far (in source order,
/// already filtered against the destination playlist), `unresolved` the
/// source tracks the search did not find. `write_cursor` is the next batch to
/// attempt and is only meaningful once resolution is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferCheckpoint {
    #[serde(rename = "playlist_name")]
    pub transfer_name: String,
    #[serde(rename = "current_track_index")]
    pub resolution_cursor: usize,
    #[serde(rename = "total_tracks")]
    pub total: usize,
    #[serde(rename = "ytm_video_ids")]
    pub resolved_ids: Vec<DestinationId>,
    #[serde(rename = "not_found_tracks")]
    pub unresolved: Vec<TrackRef>,
    #[serde(rename = "operation_type")]
    pub kind: TransferKind,
    #[serde(
        rename = "current_batch_index",
        default,
        deserialize_with = "null_as_zero"
    )]
    pub write_cursor: usize,
    #[serde(default)]
    pub timestamp: f64,
}

impl TransferCheckpoint {
    /// Builds a checkpoint stamped with the current time. A write cursor
    /// given while resolution is still incomplete is reset to 0.
    pub fn new(
        transfer_name: &str,
        resolution_cursor: usize,
        total: usize,
        resolved_ids: Vec<DestinationId>,
        unresolved: Vec<TrackRef>,
        kind: TransferKind,
        write_cursor: usize,
    ) -> Self {
        let write_cursor = if resolution_cursor >= total {
            write_cursor
        } else {
            0
        };

        Self {
            transfer_name: transfer_name.to_string(),
            resolution_cursor,
            total,
            resolved_ids,
            unresolved,
            kind,
            write_cursor,
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        }
    }

    pub fn resolution_complete(&self) -> bool {
        self.resolution_cursor >= self.total
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<usize>::deserialize(deserializer)?.unwrap_or_default())
}

/// Derives the file stem of the checkpoint for a transfer name.
///
/// Spaces and slashes become underscores behind a `progress_` prefix. Since
/// that replacement is lossy, names containing a space, slash or underscore
/// additionally get a short digest of the original name appended, so two
/// distinct names never share a key. Slugs longer than [`MAX_SLUG_BYTES`]
/// are cut at a char boundary and always carry the digest, which keeps the
/// file name under the usual 255 byte limit.
pub fn checkpoint_key(transfer_name: &str) -> String {
    let lossy = &[' ', '/', '_'][..];
    let mut slug = transfer_name.replace(&[' ', '/'][..], "_");

    let truncated = slug.len() > MAX_SLUG_BYTES;
    if truncated {
        let cut = (0..=MAX_SLUG_BYTES)
            .rev()
            .find(|&i| slug.is_char_boundary(i))
            .unwrap_or(0);
        slug.truncate(cut);
    }

    if truncated || transfer_name.contains(lossy) {
        let digest = Sha256::digest(transfer_name.as_bytes());
        let suffix: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
        format!("{KEY_PREFIX}{slug}_{suffix}")
    } else {
        format!("{KEY_PREFIX}{slug}")
    }
}

/// File-backed checkpoint store, one JSON file per transfer name.
pub struct ProgressStore {
    dir: PathBuf,
}

impl ProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the configured progress directory.
    pub fn from_config() -> Self {
        Self::new(config::progress_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, transfer_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", checkpoint_key(transfer_name)))
    }

    /// Writes the checkpoint, replacing any earlier one for the same name.
    pub async fn save(&self, checkpoint: &TransferCheckpoint) -> Result<PathBuf, CheckpointError> {
        async_fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(&checkpoint.transfer_name);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(checkpoint)?;
        async_fs::write(&tmp, json).await?;
        async_fs::rename(&tmp, &path).await?;

        Ok(path)
    }

    /// Loads the checkpoint for a transfer name.
    ///
    /// Missing, unreadable and corrupt files all yield `None`; only the
    /// latter two are reported.
    pub async fn load(&self, transfer_name: &str) -> Option<TransferCheckpoint> {
        let path = self.path_for(transfer_name);
        let content = match async_fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warning!("Cannot read progress file {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<TransferCheckpoint>(&content) {
            Ok(checkpoint) if checkpoint.transfer_name == transfer_name => Some(checkpoint),
            Ok(checkpoint) => {
                warning!(
                    "Progress file {} belongs to '{}', not '{}'. Ignoring it.",
                    path.display(),
                    checkpoint.transfer_name,
                    transfer_name
                );
                None
            }
            Err(e) => {
                warning!("Ignoring corrupt progress file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Removes the checkpoint. Never fails; an absent file is fine.
    pub async fn delete(&self, transfer_name: &str) {
        let path = self.path_for(transfer_name);
        match async_fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warning!("Cannot remove progress file {}: {}", path.display(), e),
        }
    }

    /// All readable checkpoints in the store, sorted by transfer name.
    pub async fn list(&self) -> Vec<TransferCheckpoint> {
        let mut checkpoints = Vec::new();
        let mut entries = match async_fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return checkpoints,
            Err(e) => {
                warning!("Cannot read progress directory {}: {}", self.dir.display(), e);
                return checkpoints;
            }
        };

        loop {
            let entry = match entries.try_next().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warning!("Cannot list progress directory {}: {}", self.dir.display(), e);
                    break;
                }
            };
            let path = entry.path();
            let is_checkpoint = path.extension().is_some_and(|ext| ext == "json")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(KEY_PREFIX));
            if !is_checkpoint {
                continue;
            }

            let content = match async_fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    warning!("Cannot read progress file {}: {}", path.display(), e);
                    continue;
                }
            };
            match serde_json::from_str::<TransferCheckpoint>(&content) {
                Ok(checkpoint) => checkpoints.push(checkpoint),
                Err(e) => warning!("Ignoring corrupt progress file {}: {}", path.display(), e),
            }
        }

        checkpoints.sort_by(|a, b| a.transfer_name.cmp(&b.transfer_name));
        checkpoints
    }
}
