use std::collections::BTreeSet;

use chrono::{DateTime, Local};

use crate::warning;

/// Longest playlist title the destination accepts.
pub const MAX_TITLE_CHARS: usize = 150;

/// Parses a playlist selection like `"1,3-5"` against a list of
/// `max_playlists` entries.
///
/// Numbers are 1-based; the result holds sorted, de-duplicated 0-based
/// indices. Parts that are not a number or an in-bounds ascending range are
/// reported and skipped.
pub fn parse_playlist_selection(input: &str, max_playlists: usize) -> Vec<usize> {
    let mut selected = BTreeSet::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((start, end)) = part.split_once('-') {
            let (Ok(start), Ok(end)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>())
            else {
                warning!("Invalid range format: {}", part);
                continue;
            };
            if start < 1 || end > max_playlists || start > end {
                warning!("Invalid range: {}. Valid range is 1-{}.", part, max_playlists);
                continue;
            }
            selected.extend(start - 1..end);
        } else {
            match part.parse::<usize>() {
                Ok(n) if (1..=max_playlists).contains(&n) => {
                    selected.insert(n - 1);
                }
                Ok(_) => warning!("Invalid playlist number: {}", part),
                Err(_) => warning!("Invalid input: {}", part),
            }
        }
    }

    selected.into_iter().collect()
}

/// Cuts a title to [`MAX_TITLE_CHARS`] characters.
pub fn truncate_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_CHARS).collect()
}

/// Percentage of `part` in `total`, 0 for an empty total.
pub fn success_rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / total as f64
}

/// Renders a checkpoint timestamp (seconds since the epoch) in local time.
pub fn format_timestamp(seconds: f64) -> String {
    DateTime::from_timestamp_millis((seconds * 1000.0) as i64)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
