//! Interfaces of the two remote catalogs the engine bridges.
//!
//! The engine only talks to these traits. [`crate::spotify::SpotifyClient`]
//! implements [`SourceCatalog`] and [`crate::ytmusic::YtMusicClient`]
//! implements [`DestinationCatalog`]; tests substitute in-memory fakes or
//! mocks. Both adapters classify their failures into
//! [`crate::error::ErrorKind`] so nothing here inspects error text.

use std::{collections::HashSet, future::Future};

use async_trait::async_trait;

use crate::{
    error::CatalogError,
    types::{
        DestinationId, DestinationPlaylist, Page, PlaylistContents, SearchKind, SourcePlaylist,
        TrackRef,
    },
};

/// Read-only access to the library being migrated.
///
/// Every listing is cursor paged: pass `None` for the first page and the
/// previous page's `next` for the following ones.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Cheap authenticated read, returns the user's id.
    async fn current_user(&self) -> Result<String, CatalogError>;

    async fn playlists_page(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<SourcePlaylist>, CatalogError>;

    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<TrackRef>, CatalogError>;

    async fn liked_tracks_page(&self, cursor: Option<String>)
    -> Result<Page<TrackRef>, CatalogError>;

    /// Names of the followed artists.
    async fn followed_artists_page(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<String>, CatalogError>;
}

/// Write access to the catalog receiving the library.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DestinationCatalog: Send + Sync {
    /// Cheap read used as a session health check before each write.
    async fn probe_session(&self) -> Result<(), CatalogError>;

    /// The user's playlists, unpaged within a generous cap.
    async fn playlists(&self) -> Result<Vec<DestinationPlaylist>, CatalogError>;

    /// Member ids and reported track count of a playlist, unpaged within
    /// [`PLAYLIST_ITEM_CAP`].
    async fn playlist(&self, playlist_id: &str) -> Result<PlaylistContents, CatalogError>;

    async fn create_playlist(&self, title: &str, description: &str)
    -> Result<String, CatalogError>;

    /// Appends the ids in order. A `Conflict` error means the items are
    /// already present.
    async fn add_items(&self, playlist_id: &str, ids: &[DestinationId])
    -> Result<(), CatalogError>;

    /// Ordered ids of the search hits of the given kind.
    async fn search(&self, query: &str, kind: SearchKind) -> Result<Vec<String>, CatalogError>;

    async fn delete_playlist(&self, playlist_id: &str) -> Result<(), CatalogError>;

    async fn subscribe_artist(&self, artist_id: &str) -> Result<(), CatalogError>;
}

/// Upper bound of items read from a single destination playlist.
pub const PLAYLIST_ITEM_CAP: usize = 10_000;

/// Current member set of a destination playlist.
pub async fn member_ids<D>(dest: &D, playlist_id: &str) -> Result<HashSet<DestinationId>, CatalogError>
where
    D: DestinationCatalog + ?Sized,
{
    let contents = dest.playlist(playlist_id).await?;
    Ok(contents.item_ids.into_iter().collect())
}

/// Follows `next` cursors until the last page and concatenates the items.
/// An empty page ends the listing even when it carries a cursor.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, CatalogError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, CatalogError>>,
{
    let mut items = Vec::new();
    let mut cursor = None;

    loop {
        let page = fetch(cursor.take()).await?;
        let exhausted = page.items.is_empty();
        items.extend(page.items);

        match page.next {
            Some(next) if !exhausted => cursor = Some(next),
            _ => break,
        }
    }

    Ok(items)
}

pub async fn all_playlists<S>(source: &S) -> Result<Vec<SourcePlaylist>, CatalogError>
where
    S: SourceCatalog + ?Sized,
{
    collect_pages(|cursor| source.playlists_page(cursor)).await
}

pub async fn all_playlist_tracks<S>(source: &S, playlist_id: &str) -> Result<Vec<TrackRef>, CatalogError>
where
    S: SourceCatalog + ?Sized,
{
    collect_pages(|cursor| source.playlist_tracks_page(playlist_id, cursor)).await
}

pub async fn all_liked_tracks<S>(source: &S) -> Result<Vec<TrackRef>, CatalogError>
where
    S: SourceCatalog + ?Sized,
{
    collect_pages(|cursor| source.liked_tracks_page(cursor)).await
}

pub async fn all_followed_artists<S>(source: &S) -> Result<Vec<String>, CatalogError>
where
    S: SourceCatalog + ?Sized,
{
    collect_pages(|cursor| source.followed_artists_page(cursor)).await
}
