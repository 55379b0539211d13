//! Configuration management for spotyt.
//!
//! This module handles loading and accessing configuration values from
//! environment variables and `.env` files. It covers the Spotify API
//! endpoints and credentials, the location of the YouTube Music browser
//! headers, and the tuning knobs of the batch writer.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Command-line flags (for the transfer tuning values)
//! 2. Environment variables
//! 3. `.env` file in the local data directory
//! 4. Application defaults

use std::{env, path::PathBuf, str::FromStr, time::Duration};

const APP_DIR: &str = "spotyt";

const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_SPOTIFY_API_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const MAX_BATCH_SIZE: usize = 20;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_BATCH_DELAY_SECS: u64 = 5;
pub const DEFAULT_VERIFICATION_DELAY_SECS: u64 = 30;

/// Loads environment variables from a `.env` file in the local data directory.
///
/// The file lives under `spotyt/.env` in the platform-specific local data
/// directory:
/// - Linux: `~/.local/share/spotyt/.env`
/// - macOS: `~/Library/Application Support/spotyt/.env`
/// - Windows: `%LOCALAPPDATA%/spotyt/.env`
///
/// A missing file is not an error, variables may come from the real
/// environment instead. Variables already set in the environment are never
/// overridden.
///
/// # Errors
///
/// Returns an error if the data directory cannot be created or an existing
/// `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if !path.is_file() {
        return Ok(());
    }

    dotenv::from_path(&path).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Returns the application's local data directory.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// Returns the Spotify Web API base URL (`SPOTIFY_API_URL`).
pub fn spotify_apiurl() -> String {
    env::var("SPOTIFY_API_URL").unwrap_or_else(|_| DEFAULT_SPOTIFY_API_URL.to_string())
}

/// Returns the Spotify OAuth token URL used for refreshing (`SPOTIFY_API_TOKEN_URL`).
pub fn spotify_apitoken_url() -> String {
    env::var("SPOTIFY_API_TOKEN_URL")
        .unwrap_or_else(|_| DEFAULT_SPOTIFY_API_TOKEN_URL.to_string())
}

/// Returns the Spotify API client ID (`SPOTIFY_API_AUTH_CLIENT_ID`).
///
/// # Errors
///
/// Returns an error message when the variable is not set. It is only needed
/// once the cached access token has to be refreshed.
pub fn spotify_client_id() -> Result<String, String> {
    env::var("SPOTIFY_API_AUTH_CLIENT_ID")
        .map_err(|_| "SPOTIFY_API_AUTH_CLIENT_ID must be set".to_string())
}

/// Path of the raw YouTube Music browser request headers (`YTMUSIC_HEADERS_FILE`).
///
/// Defaults to `headers.txt` in the data directory.
pub fn ytmusic_headers_file() -> PathBuf {
    env::var("YTMUSIC_HEADERS_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir().join("headers.txt"))
}

/// Directory holding the transfer checkpoints (`SPOTYT_PROGRESS_DIR`).
pub fn progress_dir() -> PathBuf {
    env::var("SPOTYT_PROGRESS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir().join("progress"))
}

/// Tracks per add call (`TRANSFER_BATCH_SIZE`), clamped to `1..=20`.
pub fn batch_size() -> usize {
    env_or("TRANSFER_BATCH_SIZE", DEFAULT_BATCH_SIZE).clamp(1, MAX_BATCH_SIZE)
}

/// Attempts per batch before it is recorded as failed (`TRANSFER_RETRY_ATTEMPTS`).
pub fn retry_attempts() -> u32 {
    env_or("TRANSFER_RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS).max(1)
}

/// Pause between batches and backoff unit (`TRANSFER_BATCH_DELAY_SECS`).
pub fn batch_delay() -> Duration {
    Duration::from_secs(env_or("TRANSFER_BATCH_DELAY_SECS", DEFAULT_BATCH_DELAY_SECS))
}

/// Pause before the final membership check (`TRANSFER_VERIFICATION_DELAY_SECS`).
pub fn verification_delay() -> Duration {
    Duration::from_secs(env_or(
        "TRANSFER_VERIFICATION_DELAY_SECS",
        DEFAULT_VERIFICATION_DELAY_SECS,
    ))
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
