use crate::{
    error::CatalogError,
    info,
    transfer::{DestinationCatalog, resolve_artist},
    warning,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistReport {
    pub subscribed: Vec<String>,
    pub not_found: Vec<String>,
    pub failed: Vec<String>,
}

/// Subscribes to the first artist hit for each name, one at a time.
///
/// A name without hits lands in `not_found`, a failed subscribe call in
/// `failed`. Only an unauthorized-class error stops the run.
pub async fn subscribe_artists<D>(
    dest: &D,
    names: &[String],
    progress: Option<&(dyn Fn(usize) + Send + Sync)>,
) -> Result<ArtistReport, CatalogError>
where
    D: DestinationCatalog + ?Sized,
{
    let mut report = ArtistReport::default();

    for (index, name) in names.iter().enumerate() {
        match resolve_artist(dest, name).await? {
            Some(artist_id) => match dest.subscribe_artist(&artist_id).await {
                Ok(()) => {
                    info!("Subscribed to artist: {} ({})", name, artist_id);
                    report.subscribed.push(name.clone());
                }
                Err(e) if e.is_unauthorized() => return Err(e),
                Err(e) => {
                    warning!("Failed to subscribe to artist {}: {}", name, e);
                    report.failed.push(name.clone());
                }
            },
            None => {
                warning!("No results found for artist: {}", name);
                report.not_found.push(name.clone());
            }
        }

        if let Some(report_progress) = progress {
            report_progress(index + 1);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{transfer::MockDestinationCatalog, types::SearchKind};

    #[tokio::test]
    async fn sorts_names_into_outcomes() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_search()
            .withf(|_, kind| *kind == SearchKind::Artist)
            .returning(|query, _| match query {
                "Air" => Ok(vec!["UCair".to_string()]),
                "Broken" => Ok(vec!["UCbroken".to_string()]),
                _ => Ok(Vec::new()),
            });
        dest.expect_subscribe_artist().returning(|id| {
            if id == "UCbroken" {
                Err(CatalogError::transient("500"))
            } else {
                Ok(())
            }
        });

        let names = vec!["Air".to_string(), "Nobody".to_string(), "Broken".to_string()];
        let report = subscribe_artists(&dest, &names, None).await.unwrap();

        assert_eq!(report.subscribed, vec!["Air"]);
        assert_eq!(report.not_found, vec!["Nobody"]);
        assert_eq!(report.failed, vec!["Broken"]);
    }

    #[tokio::test]
    async fn expired_session_stops_the_run() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_search()
            .times(1)
            .returning(|_, _| Err(CatalogError::unauthorized("401")));

        let names = vec!["Air".to_string(), "Moby".to_string()];
        let err = subscribe_artists(&dest, &names, None).await.unwrap_err();
        assert!(err.is_unauthorized());
    }
}
