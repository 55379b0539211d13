//! YouTube Music client, the destination side of a transfer.
//!
//! Talks to the innertube endpoints of `music.youtube.com` the way the web
//! client does, authenticated by headers copied from a logged-in browser
//! session (see [`BrowserHeaders`]). Those sessions expire after roughly
//! half an hour; the server then answers 401/403, which surfaces as an
//! unauthorized-class [`CatalogError`] and makes the engine checkpoint.

mod headers;
pub mod parse;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, header::CONTENT_TYPE};
use serde_json::{Value, json};

use crate::{
    config,
    error::CatalogError,
    transfer::{DestinationCatalog, PLAYLIST_ITEM_CAP},
    types::{DestinationId, DestinationPlaylist, PlaylistContents, SearchKind},
};

pub use headers::{BrowserHeaders, ORIGIN, sapisid_hash, validate_raw};

const API_URL: &str = "https://music.youtube.com/youtubei/v1";
const CLIENT_NAME: &str = "WEB_REMIX";
const CLIENT_VERSION: &str = "1.20240918.01.00";
const LIBRARY_PLAYLISTS: &str = "FEmusic_liked_playlists";
const SONGS_FILTER: &str = "EgWKAQIIAWoMEA4QChADEAQQCRAF";
const ARTISTS_FILTER: &str = "EgWKAQIgAWoMEA4QChADEAQQCRAF";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct YtMusicClient {
    http: Client,
    api_url: String,
    headers: BrowserHeaders,
}

impl YtMusicClient {
    pub fn new(headers: BrowserHeaders) -> Result<Self, CatalogError> {
        Self::with_api_url(headers, API_URL)
    }

    pub fn with_api_url(
        headers: BrowserHeaders,
        api_url: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            headers,
        })
    }

    /// Builds a client from the headers file named by the configuration.
    pub async fn from_config() -> Result<Self, String> {
        let headers = BrowserHeaders::from_file(&config::ytmusic_headers_file()).await?;
        Self::new(headers).map_err(|e| e.to_string())
    }

    fn context() -> Value {
        json!({
            "client": {
                "clientName": CLIENT_NAME,
                "clientVersion": CLIENT_VERSION,
                "hl": "en"
            },
            "user": {}
        })
    }

    async fn post(&self, endpoint: &str, query: &[(&str, &str)], body: Value) -> Result<Value, CatalogError> {
        let mut payload = body;
        payload["context"] = Self::context();

        let mut request = self
            .http
            .post(format!("{}/{}", self.api_url, endpoint))
            .query(&[("alt", "json")])
            .query(query)
            .header(CONTENT_TYPE, "application/json")
            .header("origin", ORIGIN)
            .header("x-origin", ORIGIN)
            .header("x-goog-authuser", self.headers.auth_user())
            .json(&payload);

        for name in ["cookie", "user-agent", "accept-language"] {
            if let Some(value) = self.headers.get(name) {
                request = request.header(name, value);
            }
        }
        if let Some(auth) = self.headers.authorization(Utc::now().timestamp()) {
            request = request.header("authorization", auth);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::from_status(
                status,
                format!("{endpoint} returned {status}: {body}"),
            ));
        }

        Ok(response.json::<Value>().await?)
    }

    async fn browse(&self, browse_id: &str) -> Result<Value, CatalogError> {
        self.post("browse", &[], json!({ "browseId": browse_id })).await
    }

    async fn browse_continuation(&self, token: &str) -> Result<Value, CatalogError> {
        self.post(
            "browse",
            &[("ctoken", token), ("continuation", token), ("type", "next")],
            json!({ "continuation": token }),
        )
        .await
    }
}

fn bare_playlist_id(playlist_id: &str) -> &str {
    playlist_id.strip_prefix("VL").unwrap_or(playlist_id)
}

#[async_trait]
impl DestinationCatalog for YtMusicClient {
    async fn probe_session(&self) -> Result<(), CatalogError> {
        self.browse(LIBRARY_PLAYLISTS).await.map(|_| ())
    }

    async fn playlists(&self) -> Result<Vec<DestinationPlaylist>, CatalogError> {
        let mut response = self.browse(LIBRARY_PLAYLISTS).await?;
        let mut playlists = parse::library_playlists(&response);

        while playlists.len() < PLAYLIST_ITEM_CAP {
            let Some(token) = parse::continuation_token(&response) else {
                break;
            };
            response = self.browse_continuation(&token).await?;
            let page = parse::library_playlists(&response);
            if page.is_empty() {
                break;
            }
            playlists.extend(page);
        }

        Ok(playlists)
    }

    async fn playlist(&self, playlist_id: &str) -> Result<PlaylistContents, CatalogError> {
        let browse_id = format!("VL{}", bare_playlist_id(playlist_id));
        let mut response = self.browse(&browse_id).await?;
        let track_count = parse::track_count(&response);
        let mut item_ids: Vec<DestinationId> = parse::playlist_video_ids(&response)
            .into_iter()
            .map(DestinationId::from)
            .collect();

        while item_ids.len() < PLAYLIST_ITEM_CAP {
            let Some(token) = parse::continuation_token(&response) else {
                break;
            };
            response = self.browse_continuation(&token).await?;
            let page = parse::playlist_video_ids(&response);
            if page.is_empty() {
                break;
            }
            item_ids.extend(page.into_iter().map(DestinationId::from));
        }
        item_ids.truncate(PLAYLIST_ITEM_CAP);

        Ok(PlaylistContents {
            item_ids,
            track_count,
        })
    }

    async fn create_playlist(&self, title: &str, description: &str) -> Result<String, CatalogError> {
        let response = self
            .post(
                "playlist/create",
                &[],
                json!({
                    "title": title,
                    "description": description,
                    "privacyStatus": "PRIVATE"
                }),
            )
            .await?;

        parse::find_first(&response, "playlistId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CatalogError::other("playlist/create returned no playlist id"))
    }

    async fn add_items(&self, playlist_id: &str, ids: &[DestinationId]) -> Result<(), CatalogError> {
        let actions: Vec<Value> = ids
            .iter()
            .map(|id| {
                json!({
                    "action": "ACTION_ADD_VIDEO",
                    "addedVideoId": id.as_str(),
                    "dedupeOption": "DEDUPE_OPTION_SKIP"
                })
            })
            .collect();

        let response = self
            .post(
                "browse/edit_playlist",
                &[],
                json!({
                    "playlistId": bare_playlist_id(playlist_id),
                    "actions": actions
                }),
            )
            .await?;

        if parse::status_succeeded(&response) {
            Ok(())
        } else {
            let status = response
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("no status");
            Err(CatalogError::transient(format!(
                "edit_playlist answered {status}"
            )))
        }
    }

    async fn search(&self, query: &str, kind: SearchKind) -> Result<Vec<String>, CatalogError> {
        let params = match kind {
            SearchKind::Song => SONGS_FILTER,
            SearchKind::Artist => ARTISTS_FILTER,
        };
        let response = self
            .post("search", &[], json!({ "query": query, "params": params }))
            .await?;

        Ok(match kind {
            SearchKind::Song => parse::song_results(&response),
            SearchKind::Artist => parse::artist_results(&response),
        })
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<(), CatalogError> {
        self.post(
            "playlist/delete",
            &[],
            json!({ "playlistId": bare_playlist_id(playlist_id) }),
        )
        .await
        .map(|_| ())
    }

    async fn subscribe_artist(&self, artist_id: &str) -> Result<(), CatalogError> {
        self.post(
            "subscription/subscribe",
            &[],
            json!({ "channelIds": [artist_id] }),
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_ids_lose_browse_prefix() {
        assert_eq!(bare_playlist_id("VLPL123"), "PL123");
        assert_eq!(bare_playlist_id("PL123"), "PL123");
    }

    #[test]
    fn context_names_web_client() {
        let context = YtMusicClient::context();
        assert_eq!(context["client"]["clientName"], CLIENT_NAME);
    }
}
