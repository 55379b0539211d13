use std::{fmt, slice, time::Duration};

use tokio::time::sleep;

use crate::{
    error::{CatalogError, ErrorKind},
    info,
    transfer::{DestinationCatalog, SourceCatalog, WriteOutcome},
    types::{DestinationId, PlaylistContents},
    warning,
};

/// Title of the throwaway playlist created by the destination probe.
pub const PROBE_PLAYLIST_TITLE: &str = "API_QUOTA_TEST_DELETE_ME";
const PROBE_PLAYLIST_DESCRIPTION: &str = "Testing API quota - will be deleted";

/// Parameters of the synthetic write+read+delete cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaProbe {
    /// A track id known to exist on the destination.
    pub track_id: DestinationId,
    /// Pause between the add and the read back.
    pub settle_delay: Duration,
}

impl Default for QuotaProbe {
    fn default() -> Self {
        Self {
            track_id: DestinationId::from("lYBUbBu4W08"),
            settle_delay: Duration::from_secs(2),
        }
    }
}

impl QuotaProbe {
    pub async fn check_destination<D>(&self, dest: &D) -> DestinationQuota
    where
        D: DestinationCatalog + ?Sized,
    {
        check_destination_quota(dest, self).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationQuota {
    /// The probe track was found and the playlist reports a non-zero count.
    Available,
    /// The track is listed but the reported count is still zero. Usually a
    /// cache lag on the destination side; not a reason to abort.
    PropagationDelay,
    /// Writes are being rejected or dropped, or the session is invalid.
    Exhausted(String),
}

impl DestinationQuota {
    pub fn allows_transfer(&self) -> bool {
        !matches!(self, DestinationQuota::Exhausted(_))
    }
}

impl fmt::Display for DestinationQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationQuota::Available => f.write_str("write quota available"),
            DestinationQuota::PropagationDelay => f.write_str(
                "probe track is present but the track count is still 0 (cache delay), proceeding",
            ),
            DestinationQuota::Exhausted(reason) => write!(f, "{reason}"),
        }
    }
}

/// Classifies the read back of the probe playlist. A missing track count
/// is taken as zero.
pub fn classify_probe(contents: &PlaylistContents, track_id: &DestinationId) -> DestinationQuota {
    let present = contents.item_ids.contains(track_id);
    let count = contents.track_count.unwrap_or(0);

    match (present, count > 0) {
        (true, true) => DestinationQuota::Available,
        (true, false) => DestinationQuota::PropagationDelay,
        (false, _) => DestinationQuota::Exhausted(
            "probe track not found after add, quota likely exhausted or headers invalid"
                .to_string(),
        ),
    }
}

/// Creates a throwaway playlist, adds one known track, waits, reads it back
/// and deletes the playlist again whatever the result.
pub async fn check_destination_quota<D>(dest: &D, probe: &QuotaProbe) -> DestinationQuota
where
    D: DestinationCatalog + ?Sized,
{
    let playlist_id = match dest
        .create_playlist(PROBE_PLAYLIST_TITLE, PROBE_PLAYLIST_DESCRIPTION)
        .await
    {
        Ok(id) => id,
        Err(e) => return DestinationQuota::Exhausted(format!("cannot create test playlist: {e}")),
    };

    let verdict = probe_playlist(dest, &playlist_id, probe).await;

    if let Err(e) = dest.delete_playlist(&playlist_id).await {
        warning!("Could not delete test playlist {}: {}", playlist_id, e);
    }

    verdict
}

async fn probe_playlist<D>(dest: &D, playlist_id: &str, probe: &QuotaProbe) -> DestinationQuota
where
    D: DestinationCatalog + ?Sized,
{
    match dest
        .add_items(playlist_id, slice::from_ref(&probe.track_id))
        .await
    {
        Ok(()) => {}
        Err(e) if e.is_conflict() => {}
        Err(e) => return DestinationQuota::Exhausted(format!("cannot add test track: {e}")),
    }

    sleep(probe.settle_delay).await;

    match dest.playlist(playlist_id).await {
        Ok(contents) => classify_probe(&contents, &probe.track_id),
        Err(e) => DestinationQuota::Exhausted(format!("cannot read test playlist: {e}")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceQuota {
    Available,
    RateLimited(String),
    Unauthorized(String),
    Forbidden(String),
    Failed(String),
}

impl SourceQuota {
    pub fn is_available(&self) -> bool {
        matches!(self, SourceQuota::Available)
    }

    fn from_error(err: CatalogError) -> Self {
        let message = err.message().to_string();
        match err.kind() {
            ErrorKind::RateLimited => SourceQuota::RateLimited(message),
            ErrorKind::Unauthorized => SourceQuota::Unauthorized(message),
            ErrorKind::Forbidden => SourceQuota::Forbidden(message),
            _ => SourceQuota::Failed(message),
        }
    }
}

impl fmt::Display for SourceQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceQuota::Available => f.write_str("API available"),
            SourceQuota::RateLimited(m) => write!(f, "rate limit exceeded: {m}"),
            SourceQuota::Unauthorized(m) => {
                write!(f, "authentication failed, check credentials: {m}")
            }
            SourceQuota::Forbidden(m) => write!(f, "access denied, check permissions: {m}"),
            SourceQuota::Failed(m) => write!(f, "API error: {m}"),
        }
    }
}

/// One cheap authenticated read against the source.
pub async fn check_source_quota<S>(source: &S) -> SourceQuota
where
    S: SourceCatalog + ?Sized,
{
    match source.current_user().await {
        Ok(_) => SourceQuota::Available,
        Err(e) => SourceQuota::from_error(e),
    }
}

/// Decides whether an empty write result means the destination stopped
/// accepting writes.
///
/// Only a run that had adds acknowledged, a successful verification read
/// and not a single confirmed id is suspicious. In that case the probe is
/// run and an `Exhausted` verdict is the answer; anything else (including
/// a propagation delay) is not quota exhaustion.
pub async fn detect_quota_exhaustion<D>(dest: &D, outcome: &WriteOutcome, probe: &QuotaProbe) -> bool
where
    D: DestinationCatalog + ?Sized,
{
    if outcome.acknowledged == 0 || !outcome.verified || !outcome.confirmed.is_empty() {
        return false;
    }

    info!("No written tracks are visible yet, probing destination quota...");
    match probe.check_destination(dest).await {
        DestinationQuota::Exhausted(reason) => {
            warning!("Destination quota exhausted: {}", reason);
            true
        }
        verdict => {
            info!("Destination probe: {}", verdict);
            false
        }
    }
}
