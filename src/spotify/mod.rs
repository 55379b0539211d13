//! Spotify Web API client, the source side of a transfer.
//!
//! [`SpotifyClient`] implements [`SourceCatalog`] on top of five read-only
//! endpoints:
//!
//! - `GET /me` - current user, used as the quota/health check
//! - `GET /me/playlists` - the user's playlists
//! - `GET /playlists/{id}/tracks` - items of one playlist
//! - `GET /me/tracks` - saved ("liked") tracks
//! - `GET /me/following?type=artist` - followed artists, cursor paged
//!
//! Offset-paged listings use the absolute `next` URL Spotify returns as the
//! cursor. All requests share one retry loop: a 502 is retried after ten
//! seconds and a 429 after the `Retry-After` delay when that stays below two
//! minutes. Everything else is classified into a [`CatalogError`].

mod artists;
mod library;
mod playlists;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::{sync::Mutex, time::sleep};

use crate::{
    config,
    error::CatalogError,
    management::TokenManager,
    transfer::SourceCatalog,
    types::{Page, SourcePlaylist, SpotifyUser, TrackRef},
    warning,
};

/// Retries per request for 502 and short 429 responses.
const MAX_RETRIES: u32 = 3;
/// Longest `Retry-After` the client waits for.
const MAX_RETRY_AFTER_SECS: u64 = 120;

pub struct SpotifyClient {
    http: Client,
    api_url: String,
    tokens: Mutex<TokenManager>,
}

impl SpotifyClient {
    pub fn new(tokens: TokenManager) -> Self {
        Self::with_api_url(tokens, config::spotify_apiurl())
    }

    pub fn with_api_url(tokens: TokenManager, api_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            tokens: Mutex::new(tokens),
        }
    }

    /// Loads the cached token and builds a client against the configured
    /// API url.
    pub async fn from_cache() -> Result<Self, String> {
        let tokens = TokenManager::load().await?;
        Ok(Self::new(tokens))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        let mut retries = 0;

        loop {
            let token = self.tokens.lock().await.get_valid_token().await;
            let response = self.http.get(url).bearer_auth(token).send().await?;
            let status = response.status();

            if status == StatusCode::BAD_GATEWAY && retries < MAX_RETRIES {
                retries += 1;
                sleep(Duration::from_secs(10)).await;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(0);
                if retry_after <= MAX_RETRY_AFTER_SECS {
                    retries += 1;
                    sleep(Duration::from_secs(retry_after)).await;
                    continue;
                }
                warning!(
                    "Retry after has reached an abnormal high of {} seconds. Try again later.",
                    retry_after
                );
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(CatalogError::from_status(
                    status,
                    format!("GET {url} returned {status}: {body}"),
                ));
            }

            return Ok(response.json::<T>().await?);
        }
    }
}

#[async_trait]
impl SourceCatalog for SpotifyClient {
    async fn current_user(&self) -> Result<String, CatalogError> {
        let user: SpotifyUser = self.get_json(&self.url("/me")).await?;
        Ok(user.id)
    }

    async fn playlists_page(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<SourcePlaylist>, CatalogError> {
        self.fetch_playlists_page(cursor).await
    }

    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<TrackRef>, CatalogError> {
        self.fetch_playlist_tracks_page(playlist_id, cursor).await
    }

    async fn liked_tracks_page(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<TrackRef>, CatalogError> {
        self.fetch_liked_tracks_page(cursor).await
    }

    async fn followed_artists_page(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<String>, CatalogError> {
        self.fetch_followed_artists_page(cursor).await
    }
}
