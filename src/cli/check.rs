use crate::{
    cli::{destination_client, source_client, spinner},
    error, success,
    transfer::{
        DestinationCatalog, DestinationQuota, QuotaProbe, SourceCatalog, check_source_quota,
    },
    warning,
};

/// Runs both quota probes and reports the verdicts.
pub async fn check() {
    let source = source_client().await;
    let destination = destination_client().await;

    if !quota_gate(&source, &destination).await {
        error!("API quota check failed. Wait a while or refresh your credentials.");
    }
}

/// Probes both services. Returns false when either one cannot take a
/// transfer right now; the propagation-delay verdict only warns.
pub(crate) async fn quota_gate<S, D>(source: &S, destination: &D) -> bool
where
    S: SourceCatalog + ?Sized,
    D: DestinationCatalog + ?Sized,
{
    let pb = spinner("Checking Spotify API...");
    let source_quota = check_source_quota(source).await;
    pb.finish_and_clear();

    if source_quota.is_available() {
        success!("Spotify: {}", source_quota);
    } else {
        warning!("Spotify: {}", source_quota);
        return false;
    }

    let pb = spinner("Checking YouTube Music write quota...");
    let destination_quota = QuotaProbe::default().check_destination(destination).await;
    pb.finish_and_clear();

    match destination_quota {
        DestinationQuota::Available => {
            success!("YouTube Music: {}", destination_quota);
            true
        }
        DestinationQuota::PropagationDelay => {
            warning!("YouTube Music: {}", destination_quota);
            true
        }
        DestinationQuota::Exhausted(_) => {
            warning!("YouTube Music: {}", destination_quota);
            false
        }
    }
}
