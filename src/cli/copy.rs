use std::io::{self, Write};

use indicatif::ProgressBar;

use crate::{
    cli::{
        CopySettings, bar, check::quota_gate, destination_client,
        playlists::{fetch_playlists, playlist_table},
        source_client, spinner,
    },
    config, error, info,
    management::ProgressStore,
    spotify::SpotifyClient,
    success,
    transfer::{
        Interruption, Transfer, TransferEvent, TransferJob, TransferReport, TransferStatus,
        WriterOptions, all_followed_artists, all_liked_tracks, all_playlist_tracks,
        subscribe_artists,
    },
    utils, warning,
    ytmusic::YtMusicClient,
};

/// Destination playlist receiving the saved tracks.
pub const LIKED_SONGS_PLAYLIST: &str = "Liked Songs from Spotify";

/// Which source playlists to copy.
#[derive(Debug, Clone)]
pub enum Selection {
    /// Show the list and ask.
    Prompt,
    All,
    /// A selection like `1,3-5`.
    Indices(String),
}

pub async fn copy_playlists(selection: Selection, settings: CopySettings) {
    let source = source_client().await;
    let destination = destination_client().await;
    gate(&source, &destination, &settings).await;

    let playlists = fetch_playlists(&source).await;
    if playlists.is_empty() {
        warning!("No playlists found on Spotify.");
        return;
    }

    let indices = match selection {
        Selection::All => (0..playlists.len()).collect(),
        Selection::Indices(input) => utils::parse_playlist_selection(&input, playlists.len()),
        Selection::Prompt => {
            println!("{}", playlist_table(&playlists));
            let input = prompt("Select playlists (e.g. 1,3-5 or 'all'): ");
            if input.trim().eq_ignore_ascii_case("all") {
                (0..playlists.len()).collect()
            } else {
                utils::parse_playlist_selection(&input, playlists.len())
            }
        }
    };

    if indices.is_empty() {
        warning!("No valid playlists selected.");
        return;
    }

    let store = ProgressStore::from_config();
    let options = settings.writer_options();
    let mut reports = Vec::new();

    for index in indices {
        let playlist = &playlists[index];
        info!("Copying playlist '{}'", playlist.name);

        let pb = spinner(&format!("Fetching tracks of '{}'...", playlist.name));
        let tracks = all_playlist_tracks(&source, &playlist.id).await;
        pb.finish_and_clear();

        let tracks = match tracks {
            Ok(tracks) => tracks,
            Err(e) => {
                warning!("Failed to fetch tracks of '{}': {}", playlist.name, e);
                continue;
            }
        };

        let job = TransferJob::playlist(&playlist.name, tracks);
        if let Some(report) = run_job(&destination, &store, &options, &job).await {
            reports.push(report);
        }
    }

    if reports.len() > 1 {
        let confirmed: usize = reports.iter().map(|r| r.confirmed).sum();
        let to_write: usize = reports.iter().map(|r| r.to_write).sum();
        success!(
            "Copied {} playlists, {}/{} tracks confirmed",
            reports.len(),
            confirmed,
            to_write
        );
    }
}

pub async fn copy_liked(settings: CopySettings) {
    let source = source_client().await;
    let destination = destination_client().await;
    gate(&source, &destination, &settings).await;

    let pb = spinner("Fetching liked songs...");
    let tracks = all_liked_tracks(&source).await;
    pb.finish_and_clear();

    let tracks = match tracks {
        Ok(tracks) => tracks,
        Err(e) => error!("Failed to fetch liked songs. Err: {}", e),
    };
    info!("Found {} liked songs", tracks.len());

    let store = ProgressStore::from_config();
    let job = TransferJob::liked_songs(LIKED_SONGS_PLAYLIST, tracks);
    run_job(&destination, &store, &settings.writer_options(), &job).await;
}

pub async fn copy_artists() {
    let source = source_client().await;
    let destination = destination_client().await;

    let pb = spinner("Fetching followed artists...");
    let names = all_followed_artists(&source).await;
    pb.finish_and_clear();

    let names = match names {
        Ok(names) => names,
        Err(e) => error!("Failed to fetch followed artists. Err: {}", e),
    };
    if names.is_empty() {
        warning!("You don't follow any artists on Spotify.");
        return;
    }

    let pb = bar(names.len() as u64);
    let progress = {
        let pb = pb.clone();
        move |done: usize| pb.set_position(done as u64)
    };
    let result = subscribe_artists(&destination, &names, Some(&progress)).await;
    pb.finish_and_clear();

    match result {
        Ok(report) => {
            success!(
                "Subscribed to {}/{} artists",
                report.subscribed.len(),
                names.len()
            );
            if !report.not_found.is_empty() {
                warning!("Not found on YouTube Music: {}", report.not_found.join(", "));
            }
            if !report.failed.is_empty() {
                warning!("Subscription failed: {}", report.failed.join(", "));
            }
        }
        Err(e) => error!(
            "YouTube Music session expired. Refresh {} and run again. Err: {}",
            config::ytmusic_headers_file().display(),
            e
        ),
    }
}

async fn gate(source: &SpotifyClient, destination: &YtMusicClient, settings: &CopySettings) {
    if settings.skip_quota_check {
        return;
    }
    if !quota_gate(source, destination).await {
        error!("Aborting: API quota check failed. Use --skip-quota-check to force.");
    }
}

/// Runs one transfer with a progress bar. Exits the process when the
/// destination session expired, since every following transfer would fail
/// the same way.
async fn run_job(
    destination: &YtMusicClient,
    store: &ProgressStore,
    options: &WriterOptions,
    job: &TransferJob,
) -> Option<TransferReport> {
    let pb = bar(job.tracks.len() as u64);
    let observer = {
        let pb = pb.clone();
        move |event: TransferEvent| render(&pb, event)
    };

    let result = Transfer::new(destination, store, options.clone())
        .with_observer(&observer)
        .run(job)
        .await;
    pb.finish_and_clear();

    match result {
        Ok(TransferStatus::Completed(report)) => {
            print_report(&report);
            Some(report)
        }
        Ok(TransferStatus::Interrupted(interruption)) => interrupted(&interruption),
        Err(e) => {
            warning!("Transfer of '{}' failed: {}", job.name, e);
            None
        }
    }
}

fn render(pb: &ProgressBar, event: TransferEvent) {
    match event {
        TransferEvent::Resuming {
            resolution_cursor,
            total,
            write_cursor,
        } => pb.println(format!(
            "Resuming: {}/{} tracks searched, next batch {}",
            resolution_cursor.min(total),
            total,
            write_cursor + 1
        )),
        TransferEvent::PlaylistReady { pre_existed, .. } => {
            if pre_existed {
                pb.println("Adding to the existing playlist");
            }
        }
        TransferEvent::Resolving { index, total, track } => {
            pb.set_length(total as u64);
            pb.set_position(index as u64 + 1);
            pb.set_message(format!("Searching {track}"));
        }
        TransferEvent::NotFound { track } => pb.println(format!("  not found: {track}")),
        TransferEvent::Deduplicated { skipped } => {
            if skipped > 0 {
                pb.println(format!("{skipped} tracks are already in the playlist"));
            }
        }
        TransferEvent::Writing {
            total,
            start_batch,
            batch_size,
        } => {
            pb.set_length(total as u64);
            pb.set_position((start_batch * batch_size).min(total) as u64);
            pb.set_message("Adding tracks");
        }
        TransferEvent::Written { attempted, .. } => pb.set_position(attempted as u64),
    }
}

fn print_report(report: &TransferReport) {
    if report.total_tracks == 0 && !report.resumed {
        return;
    }

    success!(
        "'{}': {}/{} tracks confirmed ({:.1}%)",
        report.name,
        report.confirmed,
        report.to_write,
        utils::success_rate(report.confirmed, report.to_write)
    );

    if report.skipped_existing > 0 {
        info!("{} tracks were already in the playlist", report.skipped_existing);
    }
    if !report.verified && report.to_write > 0 {
        warning!("Could not re-read the playlist; counts are based on acknowledged adds");
    }

    let failed: usize = report.failed_batches.iter().map(|b| b.ids.len()).sum();
    if failed > 0 {
        warning!(
            "{} tracks in {} batches could not be added",
            failed,
            report.failed_batches.len()
        );
    }

    if !report.not_found.is_empty() {
        warning!("{} tracks not found on YouTube Music:", report.not_found.len());
        for track in &report.not_found {
            println!("  - {track}");
        }
    }

    if report.quota_exhausted {
        warning!(
            "YouTube Music stopped accepting writes. Progress was kept; run the same command again later."
        );
    }
}

fn interrupted(interruption: &Interruption) -> ! {
    warning!(
        "Progress for '{}' saved to {}",
        interruption.name,
        interruption.checkpoint.display()
    );
    error!(
        "YouTube Music session expired ({}). Refresh {} and run the same command again to resume.",
        interruption.reason,
        config::ytmusic_headers_file().display()
    )
}

fn prompt(message: &str) -> String {
    print!("{message}");
    if let Err(e) = io::stdout().flush() {
        error!("Cannot write to stdout. Err: {}", e);
    }

    let mut input = String::new();
    if let Err(e) = io::stdin().read_line(&mut input) {
        error!("Cannot read selection. Err: {}", e);
    }
    input
}
