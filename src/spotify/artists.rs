use crate::{
    error::CatalogError,
    spotify::SpotifyClient,
    types::{FollowedArtistsResponse, Page},
};

const FOLLOWED_ARTISTS_LIMIT: u32 = 50;

impl SpotifyClient {
    /// One page of followed artists. Unlike the other listings this one is
    /// paged by the `after` cursor, which is also what `next` carries here.
    pub(crate) async fn fetch_followed_artists_page(
        &self,
        after: Option<String>,
    ) -> Result<Page<String>, CatalogError> {
        let mut url = self.url(&format!(
            "/me/following?type=artist&limit={FOLLOWED_ARTISTS_LIMIT}"
        ));
        if let Some(after) = &after {
            url.push_str(&format!("&after={after}"));
        }

        let res: FollowedArtistsResponse = self.get_json(&url).await?;
        Ok(followed_page(res))
    }
}

fn followed_page(res: FollowedArtistsResponse) -> Page<String> {
    let next = match res.artists.next {
        Some(_) => res.artists.cursors.and_then(|c| c.after),
        None => None,
    };

    Page {
        items: res.artists.items.into_iter().map(|a| a.name).collect(),
        next,
    }
}
