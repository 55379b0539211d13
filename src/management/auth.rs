use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::Client;

use crate::{config, types::Token, warning};

/// Seconds before the reported expiry at which a token is refreshed.
const REFRESH_MARGIN_SECS: u64 = 240;

/// Cached Spotify access token with refresh-on-demand.
///
/// The first token is obtained outside this tool and stored at
/// [`TokenManager::token_path`]; from then on the refresh grant keeps it
/// alive.
pub struct TokenManager {
    token: Token,
}

impl TokenManager {
    pub fn new(token: Token) -> Self {
        TokenManager { token }
    }

    pub async fn load() -> Result<Self, String> {
        let path = Self::token_path();
        let content = async_fs::read_to_string(&path)
            .await
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        let token: Token = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self { token })
    }

    async fn persist_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("{}: {}", parent.display(), e))?;
        }

        let json = serde_json::to_string_pretty(&self.token).map_err(|e| e.to_string())?;
        async_fs::write(path, json)
            .await
            .map_err(|e| format!("{}: {}", path.display(), e))
    }

    /// Swaps in a refreshed token and caches it at `path`. A failed write
    /// keeps the new token in memory and is reported.
    async fn adopt(&mut self, token: Token, path: &Path) -> bool {
        self.token = token;
        match self.persist_to(path).await {
            Ok(()) => true,
            Err(e) => {
                warning!("Refreshed token could not be cached: {}", e);
                false
            }
        }
    }

    /// Returns an access token, refreshing and persisting it first when it
    /// is about to expire. A failed refresh hands out the old token; the
    /// API call will then fail as unauthorized.
    pub async fn get_valid_token(&mut self) -> String {
        if self.is_expired() {
            if let Ok(new_token) = self.refresh_token().await {
                self.adopt(new_token, &Self::token_path()).await;
            }
        }

        self.token.access_token.clone()
    }

    fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as u64;
        now + REFRESH_MARGIN_SECS >= self.token.obtained_at + self.token.expires_in
    }

    async fn refresh_token(&self) -> Result<Token, String> {
        let client_id = config::spotify_client_id()?;
        let client = Client::new();
        let res = client
            .post(config::spotify_apitoken_url())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.token.refresh_token.as_str()),
                ("client_id", client_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;

        let json: serde_json::Value = res.json().await.map_err(|e| e.to_string())?;

        // Spotify may omit the refresh token when it does not rotate it.
        let refresh_token = json["refresh_token"]
            .as_str()
            .unwrap_or(&self.token.refresh_token)
            .to_string();

        Ok(Token {
            access_token: json["access_token"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            refresh_token,
            scope: json["scope"].as_str().unwrap_or_default().to_string(),
            expires_in: json["expires_in"].as_i64().unwrap_or(3600) as u64,
            obtained_at: Utc::now().timestamp() as u64,
        })
    }

    pub fn token_path() -> PathBuf {
        let mut path = config::data_dir();
        path.push("cache/token.json");
        path
    }

    pub fn current_token(&self) -> &Token {
        &self.token
    }
}
