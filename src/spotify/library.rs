use crate::{
    error::CatalogError,
    spotify::{SpotifyClient, playlists::track_page},
    types::{Page, PagingResponse, TrackItem, TrackRef},
};

const SAVED_TRACKS_LIMIT: u32 = 50;

impl SpotifyClient {
    pub(crate) async fn fetch_liked_tracks_page(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<TrackRef>, CatalogError> {
        let url =
            cursor.unwrap_or_else(|| self.url(&format!("/me/tracks?limit={SAVED_TRACKS_LIMIT}")));
        let res: PagingResponse<TrackItem> = self.get_json(&url).await?;

        Ok(track_page(res))
    }
}
