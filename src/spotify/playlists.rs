use crate::{
    error::CatalogError,
    spotify::SpotifyClient,
    types::{Page, PagingResponse, Playlist, SourcePlaylist, TrackItem, TrackRef},
};

const PLAYLISTS_LIMIT: u32 = 50;
const PLAYLIST_TRACKS_LIMIT: u32 = 100;

impl SpotifyClient {
    pub(crate) async fn fetch_playlists_page(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<SourcePlaylist>, CatalogError> {
        let url = cursor.unwrap_or_else(|| self.url(&format!("/me/playlists?limit={PLAYLISTS_LIMIT}")));
        let res: PagingResponse<Playlist> = self.get_json(&url).await?;

        Ok(Page {
            items: res.items.into_iter().map(SourcePlaylist::from).collect(),
            next: res.next,
        })
    }

    pub(crate) async fn fetch_playlist_tracks_page(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<TrackRef>, CatalogError> {
        let url = cursor.unwrap_or_else(|| {
            self.url(&format!(
                "/playlists/{playlist_id}/tracks?limit={PLAYLIST_TRACKS_LIMIT}"
            ))
        });
        let res: PagingResponse<TrackItem> = self.get_json(&url).await?;

        Ok(track_page(res))
    }
}

/// Drops items without track data (local files, removed tracks).
pub(crate) fn track_page(res: PagingResponse<TrackItem>) -> Page<TrackRef> {
    Page {
        items: res
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .map(|track| track.track_ref())
            .collect(),
        next: res.next,
    }
}

impl From<Playlist> for SourcePlaylist {
    fn from(p: Playlist) -> Self {
        SourcePlaylist {
            id: p.id,
            name: p.name,
            track_count: p.tracks.map(|t| t.total).unwrap_or_default(),
        }
    }
}
