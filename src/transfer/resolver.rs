use crate::{
    error::CatalogError,
    transfer::DestinationCatalog,
    types::{DestinationId, SearchKind, TrackRef},
    warning,
};

/// Maps a source track onto a destination track id.
///
/// Issues one song search and takes the first hit. An empty result, and any
/// failure outside the unauthorized class, resolve to `None`; only an
/// unauthorized-class error is returned so the caller can checkpoint.
/// Results are whatever the destination ranks first at the time, so they
/// are not guaranteed to be stable across runs.
pub async fn resolve<D>(dest: &D, track: &TrackRef) -> Result<Option<DestinationId>, CatalogError>
where
    D: DestinationCatalog + ?Sized,
{
    match dest.search(track.as_str(), SearchKind::Song).await {
        Ok(hits) => Ok(hits.into_iter().next().map(DestinationId::from)),
        Err(e) if e.is_unauthorized() => Err(e),
        Err(e) => {
            warning!("Search failed for '{}': {}", track, e);
            Ok(None)
        }
    }
}

/// Resolves an artist name to the id of the first artist hit.
pub async fn resolve_artist<D>(dest: &D, name: &str) -> Result<Option<String>, CatalogError>
where
    D: DestinationCatalog + ?Sized,
{
    match dest.search(name, SearchKind::Artist).await {
        Ok(hits) => Ok(hits.into_iter().next()),
        Err(e) if e.is_unauthorized() => Err(e),
        Err(e) => {
            warning!("Search failed for artist '{}': {}", name, e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, transfer::MockDestinationCatalog};

    #[tokio::test]
    async fn takes_first_song_hit() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_search()
            .withf(|query, kind| query == "Daft Punk - One More Time" && *kind == SearchKind::Song)
            .times(1)
            .returning(|_, _| Ok(vec!["first".to_string(), "second".to_string()]));

        let track = TrackRef::new("Daft Punk", "One More Time");
        let id = resolve(&dest, &track).await.unwrap();
        assert_eq!(id, Some(DestinationId::from("first")));
    }

    #[tokio::test]
    async fn no_hits_is_not_found() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_search().returning(|_, _| Ok(Vec::new()));

        let id = resolve(&dest, &TrackRef::from("Nobody - Nothing")).await.unwrap();
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn transient_failure_is_not_found() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_search()
            .returning(|_, _| Err(CatalogError::new(ErrorKind::Transient, "502")));

        let id = resolve(&dest, &TrackRef::from("A - B")).await.unwrap();
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn unauthorized_failure_is_returned() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_search()
            .returning(|_, _| Err(CatalogError::new(ErrorKind::Forbidden, "403")));

        let err = resolve(&dest, &TrackRef::from("A - B")).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn artist_search_uses_artist_filter() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_search()
            .withf(|query, kind| query == "Björk" && *kind == SearchKind::Artist)
            .returning(|_, _| Ok(vec!["UCabc".to_string()]));

        let id = resolve_artist(&dest, "Björk").await.unwrap();
        assert_eq!(id.as_deref(), Some("UCabc"));
    }
}
