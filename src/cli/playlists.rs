use tabled::Table;

use crate::{
    cli::{source_client, spinner},
    error,
    transfer::all_playlists,
    types::{PlaylistTableRow, SourcePlaylist},
    warning,
};

pub async fn list_playlists() {
    let source = source_client().await;
    let playlists = fetch_playlists(&source).await;

    if playlists.is_empty() {
        warning!("No playlists found on Spotify.");
        return;
    }

    println!("{}", playlist_table(&playlists));
}

pub(crate) async fn fetch_playlists(source: &crate::spotify::SpotifyClient) -> Vec<SourcePlaylist> {
    let pb = spinner("Fetching Spotify playlists...");
    let result = all_playlists(source).await;
    pb.finish_and_clear();

    match result {
        Ok(playlists) => playlists,
        Err(e) => error!("Failed to fetch playlists. Err: {}", e),
    }
}

pub(crate) fn playlist_table(playlists: &[SourcePlaylist]) -> Table {
    let rows: Vec<PlaylistTableRow> = playlists
        .iter()
        .enumerate()
        .map(|(i, p)| PlaylistTableRow {
            index: i + 1,
            name: p.name.clone(),
            tracks: p.track_count,
        })
        .collect();

    Table::new(rows)
}
