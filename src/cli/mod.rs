//! Command implementations.
//!
//! Each command builds the catalog clients it needs, drives the transfer
//! engine and renders its events with indicatif and the colored log macros.
//! This is the only layer that terminates the process on errors.

mod check;
mod copy;
mod playlists;
mod progress;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config, error,
    spotify::SpotifyClient,
    transfer::WriterOptions,
    ytmusic::YtMusicClient,
};

pub use check::check;
pub use copy::{Selection, copy_artists, copy_liked, copy_playlists};
pub use playlists::list_playlists;
pub use progress::{clear_progress, list_progress};

/// Tuning flags shared by the copy commands. Unset values fall back to the
/// configuration.
#[derive(Debug, Clone, Default)]
pub struct CopySettings {
    pub batch_size: Option<usize>,
    pub retries: Option<u32>,
    pub batch_delay: Option<u64>,
    pub verification_delay: Option<u64>,
    pub verify_each_batch: bool,
    pub skip_quota_check: bool,
}

impl CopySettings {
    pub fn writer_options(&self) -> WriterOptions {
        let mut options = WriterOptions::from_config();
        if let Some(size) = self.batch_size {
            options.batch_size = size.clamp(1, config::MAX_BATCH_SIZE);
        }
        if let Some(retries) = self.retries {
            options.retry_attempts = retries.max(1);
        }
        if let Some(secs) = self.batch_delay {
            options.batch_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = self.verification_delay {
            options.verification_delay = Duration::from_secs(secs);
        }
        options.verify_each_batch = self.verify_each_batch;
        options
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}

fn bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("{bar:30.blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}

async fn source_client() -> SpotifyClient {
    match SpotifyClient::from_cache().await {
        Ok(client) => client,
        Err(e) => error!(
            "Failed to load Spotify token from {}. Err: {}",
            crate::management::TokenManager::token_path().display(),
            e
        ),
    }
}

async fn destination_client() -> YtMusicClient {
    match YtMusicClient::from_config().await {
        Ok(client) => client,
        Err(e) => error!(
            "Failed to load YouTube Music headers from {}. Err: {}",
            config::ytmusic_headers_file().display(),
            e
        ),
    }
}
