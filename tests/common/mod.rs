#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use spotyt::{
    error::CatalogError,
    management::ProgressStore,
    transfer::{DestinationCatalog, QuotaProbe, WriterOptions},
    types::{DestinationId, DestinationPlaylist, PlaylistContents, SearchKind, TrackRef},
};

/// In-memory destination with scriptable failures.
#[derive(Default)]
pub struct FakeDestination {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    playlists: BTreeMap<String, FakePlaylist>,
    created: usize,
    catalog: HashMap<String, String>,
    artists: HashMap<String, String>,
    subscriptions: Vec<String>,
    add_calls: Vec<Vec<DestinationId>>,
    searches: usize,
    reads: usize,
    expired: bool,
    expire_at_add: Option<usize>,
    expire_at_search: Option<usize>,
    expire_at_read: Option<usize>,
    fail_ids: HashSet<DestinationId>,
    drop_ids: HashSet<DestinationId>,
    drop_all: bool,
    zero_count: bool,
}

struct FakePlaylist {
    title: String,
    items: Vec<DestinationId>,
}

impl FakeDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `query` resolve to `video_id`.
    pub fn with_song(self, query: &str, video_id: &str) -> Self {
        self.lock()
            .catalog
            .insert(query.to_string(), video_id.to_string());
        self
    }

    pub fn with_playlist(self, id: &str, title: &str, items: &[DestinationId]) -> Self {
        self.lock().playlists.insert(
            id.to_string(),
            FakePlaylist {
                title: title.to_string(),
                items: items.to_vec(),
            },
        );
        self
    }

    /// Session expires on the `n`th add call (1-based) and stays expired.
    pub fn expire_at_add(&self, n: usize) {
        self.lock().expire_at_add = Some(n);
    }

    /// Session expires on the `n`th search (1-based) and stays expired.
    pub fn expire_at_search(&self, n: usize) {
        self.lock().expire_at_search = Some(n);
    }

    /// Session expires on the `n`th playlist read (1-based) and stays expired.
    pub fn expire_at_read(&self, n: usize) {
        self.lock().expire_at_read = Some(n);
    }

    /// A fresh session, as after pasting new browser headers.
    pub fn refresh_session(&self) {
        let mut state = self.lock();
        state.expired = false;
        state.expire_at_add = None;
        state.expire_at_search = None;
        state.expire_at_read = None;
    }

    /// Any add call containing one of these ids fails as transient.
    pub fn fail_ids(&self, ids: &[DestinationId]) {
        self.lock().fail_ids.extend(ids.iter().cloned());
    }

    /// These ids are acknowledged but never stored.
    pub fn drop_ids(&self, ids: &[DestinationId]) {
        self.lock().drop_ids.extend(ids.iter().cloned());
    }

    /// Every add is acknowledged and nothing is stored.
    pub fn drop_everything(&self) {
        self.lock().drop_all = true;
    }

    /// Playlists report a track count of 0 whatever they hold.
    pub fn report_zero_count(&self) {
        self.lock().zero_count = true;
    }

    pub fn add_calls(&self) -> Vec<Vec<DestinationId>> {
        self.lock().add_calls.clone()
    }

    pub fn items(&self, playlist_id: &str) -> Vec<DestinationId> {
        self.lock()
            .playlists
            .get(playlist_id)
            .map(|p| p.items.clone())
            .unwrap_or_default()
    }

    pub fn playlist_count(&self) -> usize {
        self.lock().playlists.len()
    }

    pub fn with_artist(self, name: &str, channel_id: &str) -> Self {
        self.lock()
            .artists
            .insert(name.to_string(), channel_id.to_string());
        self
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.lock().subscriptions.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

fn expired() -> CatalogError {
    CatalogError::unauthorized("session expired")
}

#[async_trait]
impl DestinationCatalog for FakeDestination {
    async fn probe_session(&self) -> Result<(), CatalogError> {
        if self.lock().expired {
            return Err(expired());
        }
        Ok(())
    }

    async fn playlists(&self) -> Result<Vec<DestinationPlaylist>, CatalogError> {
        let state = self.lock();
        if state.expired {
            return Err(expired());
        }
        Ok(state
            .playlists
            .iter()
            .map(|(id, p)| DestinationPlaylist {
                id: id.clone(),
                title: p.title.clone(),
            })
            .collect())
    }

    async fn playlist(&self, playlist_id: &str) -> Result<PlaylistContents, CatalogError> {
        let mut state = self.lock();
        state.reads += 1;
        if state.expire_at_read == Some(state.reads) {
            state.expired = true;
        }
        if state.expired {
            return Err(expired());
        }
        let playlist = state
            .playlists
            .get(playlist_id)
            .ok_or_else(|| CatalogError::new(spotyt::error::ErrorKind::NotFound, playlist_id))?;
        let count = if state.zero_count {
            0
        } else {
            playlist.items.len() as u64
        };
        Ok(PlaylistContents {
            item_ids: playlist.items.clone(),
            track_count: Some(count),
        })
    }

    async fn create_playlist(&self, title: &str, _description: &str) -> Result<String, CatalogError> {
        let mut state = self.lock();
        if state.expired {
            return Err(expired());
        }
        state.created += 1;
        let id = format!("PL{}", state.created);
        state.playlists.insert(
            id.clone(),
            FakePlaylist {
                title: title.to_string(),
                items: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn add_items(&self, playlist_id: &str, ids: &[DestinationId]) -> Result<(), CatalogError> {
        let mut state = self.lock();
        state.add_calls.push(ids.to_vec());

        if state.expire_at_add == Some(state.add_calls.len()) {
            state.expired = true;
        }
        if state.expired {
            return Err(expired());
        }
        if ids.iter().any(|id| state.fail_ids.contains(id)) {
            return Err(CatalogError::transient("HTTP 500"));
        }
        if state.drop_all {
            return Ok(());
        }

        let dropped = state.drop_ids.clone();
        let playlist = state
            .playlists
            .get_mut(playlist_id)
            .ok_or_else(|| CatalogError::new(spotyt::error::ErrorKind::NotFound, playlist_id))?;
        for id in ids {
            if !dropped.contains(id) && !playlist.items.contains(id) {
                playlist.items.push(id.clone());
            }
        }
        Ok(())
    }

    async fn search(&self, query: &str, kind: SearchKind) -> Result<Vec<String>, CatalogError> {
        let mut state = self.lock();
        state.searches += 1;
        if state.expire_at_search == Some(state.searches) {
            state.expired = true;
        }
        if state.expired {
            return Err(expired());
        }

        let hit = match kind {
            SearchKind::Song => state.catalog.get(query),
            SearchKind::Artist => state.artists.get(query),
        };
        Ok(hit.cloned().into_iter().collect())
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<(), CatalogError> {
        self.lock().playlists.remove(playlist_id);
        Ok(())
    }

    async fn subscribe_artist(&self, artist_id: &str) -> Result<(), CatalogError> {
        let mut state = self.lock();
        if state.expired {
            return Err(expired());
        }
        state.subscriptions.push(artist_id.to_string());
        Ok(())
    }
}

pub fn track(i: usize) -> TrackRef {
    TrackRef::new(&format!("Artist {i}"), &format!("Song {i}"))
}

pub fn video(i: usize) -> DestinationId {
    DestinationId::from(format!("vid{i:03}"))
}

pub fn videos(range: std::ops::Range<usize>) -> Vec<DestinationId> {
    range.map(video).collect()
}

/// Destination whose catalog knows tracks `0..n`.
pub fn catalog_of(n: usize) -> FakeDestination {
    (0..n).fold(FakeDestination::new(), |dest, i| {
        dest.with_song(track(i).as_str(), video(i).as_str())
    })
}

pub fn instant_options(batch_size: usize) -> WriterOptions {
    WriterOptions {
        batch_size,
        batch_delay: Duration::ZERO,
        verification_delay: Duration::ZERO,
        verify_retry_delay: Duration::ZERO,
        ..WriterOptions::default()
    }
}

pub fn instant_probe() -> QuotaProbe {
    QuotaProbe {
        settle_delay: Duration::ZERO,
        ..QuotaProbe::default()
    }
}

/// Empty progress store in a per-test temporary directory.
pub fn temp_store(tag: &str) -> ProgressStore {
    let dir: PathBuf =
        std::env::temp_dir().join(format!("spotyt-test-{}-{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    ProgressStore::new(dir)
}
