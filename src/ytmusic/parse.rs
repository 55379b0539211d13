//! Extraction of the few fields the engine needs from innertube responses.
//!
//! The response trees are deep and change shape between clients, so instead
//! of typed payloads the parsers search for the renderer keys they care
//! about anywhere in the tree.

use serde_json::Value;

use crate::types::DestinationPlaylist;

/// Every value stored under `key`, depth first. Array order is kept.
pub fn find_all<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    let mut found = Vec::new();
    collect(value, key, &mut found);
    found
}

fn collect<'a>(value: &'a Value, key: &str, found: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    found.push(v);
                }
                collect(v, key, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, key, found);
            }
        }
        _ => {}
    }
}

pub fn find_first<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    find_all(value, key).into_iter().next()
}

fn first_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    find_all(value, key).into_iter().find_map(Value::as_str)
}

/// Video ids of the playlist items, in playlist order.
pub fn playlist_video_ids(response: &Value) -> Vec<String> {
    find_all(response, "playlistItemData")
        .into_iter()
        .filter_map(|data| data.get("videoId").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// Token of the next item page, if the response has one.
pub fn continuation_token(response: &Value) -> Option<String> {
    let legacy = find_all(response, "nextContinuationData")
        .into_iter()
        .find_map(|d| d.get("continuation").and_then(Value::as_str));
    let command = || {
        find_all(response, "continuationCommand")
            .into_iter()
            .find_map(|c| c.get("token").and_then(Value::as_str))
    };
    legacy.or_else(command).map(str::to_string)
}

/// Track count from the playlist header, e.g. `"1,204 songs"`.
pub fn track_count(response: &Value) -> Option<u64> {
    find_all(response, "secondSubtitle")
        .into_iter()
        .flat_map(|subtitle| find_all(subtitle, "text"))
        .filter_map(Value::as_str)
        .find_map(leading_number)
}

fn leading_number(text: &str) -> Option<u64> {
    let text = text.trim();
    let end = text
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
        .unwrap_or(text.len());
    let (number, rest) = text.split_at(end);
    let rest = rest.to_lowercase();
    if !(rest.contains("song") || rest.contains("track")) {
        return None;
    }

    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Playlists of the library page. Browse ids carry a `VL` prefix that the
/// playlist id itself does not.
pub fn library_playlists(response: &Value) -> Vec<DestinationPlaylist> {
    find_all(response, "musicTwoRowItemRenderer")
        .into_iter()
        .filter_map(|item| {
            let browse_id = first_str(item.get("navigationEndpoint")?, "browseId")?;
            let id = browse_id.strip_prefix("VL")?;
            let title = first_str(item.get("title")?, "text")?;
            Some(DestinationPlaylist {
                id: id.to_string(),
                title: title.to_string(),
            })
        })
        .collect()
}

/// Video ids of song search results, best match first.
pub fn song_results(response: &Value) -> Vec<String> {
    find_all(response, "musicResponsiveListItemRenderer")
        .into_iter()
        .filter_map(|item| first_str(item, "videoId"))
        .map(str::to_string)
        .collect()
}

/// Channel ids of artist search results, best match first.
pub fn artist_results(response: &Value) -> Vec<String> {
    find_all(response, "musicResponsiveListItemRenderer")
        .into_iter()
        .filter_map(|item| {
            find_all(item, "browseId")
                .into_iter()
                .filter_map(Value::as_str)
                .find(|id| id.starts_with("UC"))
        })
        .map(str::to_string)
        .collect()
}

pub fn status_succeeded(response: &Value) -> bool {
    response.get("status").and_then(Value::as_str) == Some("STATUS_SUCCEEDED")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn collects_video_ids_and_continuation() {
        let response = json!({
            "contents": {"sectionListRenderer": {"contents": [{
                "musicPlaylistShelfRenderer": {
                    "contents": [
                        {"musicResponsiveListItemRenderer": {"playlistItemData": {"videoId": "a1", "playlistSetVideoId": "s1"}}},
                        {"musicResponsiveListItemRenderer": {"playlistItemData": {"videoId": "b2"}}},
                        {"continuationItemRenderer": {"continuationEndpoint": {"continuationCommand": {"token": "NEXT"}}}}
                    ]
                }
            }]}},
            "header": {"musicResponsiveHeaderRenderer": {
                "secondSubtitle": {"runs": [{"text": "1,204 songs"}, {"text": " • "}, {"text": "70+ hours"}]}
            }}
        });

        assert_eq!(playlist_video_ids(&response), vec!["a1", "b2"]);
        assert_eq!(continuation_token(&response).as_deref(), Some("NEXT"));
        assert_eq!(track_count(&response), Some(1204));
    }

    #[test]
    fn missing_header_has_no_count() {
        assert_eq!(track_count(&json!({"contents": {}})), None);
        assert_eq!(leading_number("2 hours"), None);
        assert_eq!(leading_number("1 song"), Some(1));
    }

    #[test]
    fn library_playlists_strip_prefix() {
        let response = json!({"items": [
            {"musicTwoRowItemRenderer": {
                "title": {"runs": [{"text": "Road Trip"}]},
                "navigationEndpoint": {"browseEndpoint": {"browseId": "VLPL123"}}
            }},
            {"musicTwoRowItemRenderer": {
                "title": {"runs": [{"text": "New playlist"}]},
                "navigationEndpoint": {"createPlaylistEndpoint": {}}
            }}
        ]});

        assert_eq!(
            library_playlists(&response),
            vec![DestinationPlaylist {
                id: "PL123".to_string(),
                title: "Road Trip".to_string()
            }]
        );
    }

    #[test]
    fn search_results_in_order() {
        let response = json!({"contents": [
            {"musicResponsiveListItemRenderer": {"overlay": {"watchEndpoint": {"videoId": "v1"}},
                "menu": {"browseEndpoint": {"browseId": "MPREb"}}}},
            {"musicResponsiveListItemRenderer": {"navigationEndpoint": {"browseEndpoint": {"browseId": "UCxyz"}}}},
            {"musicResponsiveListItemRenderer": {"playlistItemData": {"videoId": "v2"}}}
        ]});

        assert_eq!(song_results(&response), vec!["v1", "v2"]);
        assert_eq!(artist_results(&response), vec!["UCxyz"]);
    }

    #[test]
    fn edit_status() {
        assert!(status_succeeded(&json!({"status": "STATUS_SUCCEEDED"})));
        assert!(!status_succeeded(&json!({"status": "STATUS_FAILED"})));
        assert!(!status_succeeded(&json!({})));
    }
}
