use std::collections::HashSet;

use crate::{
    error::CatalogError,
    info,
    transfer::{DestinationCatalog, member_ids},
    types::{DestinationId, PlaylistHandle},
    utils,
};

/// Description given to playlists created by a transfer.
pub const PLAYLIST_DESCRIPTION: &str = "Copied from Spotify";

/// Drops candidates already present in a pre-existing destination playlist.
///
/// Playlists created by this run are known to be empty, so they are never
/// queried. Order and duplicates among the remaining candidates are kept.
pub async fn filter_existing<D>(
    dest: &D,
    playlist: &PlaylistHandle,
    candidates: Vec<DestinationId>,
) -> Result<Vec<DestinationId>, CatalogError>
where
    D: DestinationCatalog + ?Sized,
{
    if !playlist.pre_existed {
        return Ok(candidates);
    }

    let members = member_ids(dest, &playlist.id).await?;
    Ok(subtract_members(candidates, &members))
}

/// `candidates` minus `members`, preserving candidate order.
pub fn subtract_members(
    candidates: Vec<DestinationId>,
    members: &HashSet<DestinationId>,
) -> Vec<DestinationId> {
    candidates
        .into_iter()
        .filter(|id| !members.contains(id))
        .collect()
}

/// Finds the destination playlist whose title matches (trimmed,
/// case-insensitive) or creates it.
pub async fn get_or_create_playlist<D>(dest: &D, title: &str) -> Result<PlaylistHandle, CatalogError>
where
    D: DestinationCatalog + ?Sized,
{
    let title = utils::truncate_title(title);
    let wanted = title.trim().to_lowercase();

    let existing = dest
        .playlists()
        .await?
        .into_iter()
        .find(|p| p.title.trim().to_lowercase() == wanted);

    if let Some(playlist) = existing {
        info!("Found existing playlist '{}' ({})", title, playlist.id);
        return Ok(PlaylistHandle {
            id: playlist.id,
            pre_existed: true,
        });
    }

    let id = dest.create_playlist(&title, PLAYLIST_DESCRIPTION).await?;
    info!("Created playlist '{}' ({})", title, id);
    Ok(PlaylistHandle {
        id,
        pre_existed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        transfer::MockDestinationCatalog,
        types::{DestinationPlaylist, PlaylistContents},
    };

    fn ids(raw: &[&str]) -> Vec<DestinationId> {
        raw.iter().map(|s| DestinationId::from(*s)).collect()
    }

    #[tokio::test]
    async fn new_playlist_is_never_queried() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_playlist().never();

        let handle = PlaylistHandle {
            id: "PL1".to_string(),
            pre_existed: false,
        };
        let out = filter_existing(&dest, &handle, ids(&["a", "b"])).await.unwrap();
        assert_eq!(out, ids(&["a", "b"]));
    }

    #[tokio::test]
    async fn existing_members_are_dropped_in_order() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_playlist()
            .withf(|id| id == "PL1")
            .times(1)
            .returning(|_| {
                Ok(PlaylistContents {
                    item_ids: ids(&["b", "d"]),
                    track_count: Some(2),
                })
            });

        let handle = PlaylistHandle {
            id: "PL1".to_string(),
            pre_existed: true,
        };
        let out = filter_existing(&dest, &handle, ids(&["a", "b", "c", "d", "e"]))
            .await
            .unwrap();
        assert_eq!(out, ids(&["a", "c", "e"]));
    }

    #[test]
    fn subtraction_is_idempotent() {
        let members: HashSet<DestinationId> = ids(&["x", "y"]).into_iter().collect();
        let once = subtract_members(ids(&["x", "a", "y", "b", "a"]), &members);
        let twice = subtract_members(once.clone(), &members);
        assert_eq!(once, ids(&["a", "b", "a"]));
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn matches_existing_title_loosely() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_playlists().returning(|| {
            Ok(vec![DestinationPlaylist {
                id: "PL9".to_string(),
                title: "  road TRIP ".to_string(),
            }])
        });
        dest.expect_create_playlist().never();

        let handle = get_or_create_playlist(&dest, "Road Trip").await.unwrap();
        assert_eq!(
            handle,
            PlaylistHandle {
                id: "PL9".to_string(),
                pre_existed: true
            }
        );
    }

    #[tokio::test]
    async fn creates_missing_playlist() {
        let mut dest = MockDestinationCatalog::new();
        dest.expect_playlists().returning(|| Ok(Vec::new()));
        dest.expect_create_playlist()
            .withf(|title, description| title == "Road Trip" && description == PLAYLIST_DESCRIPTION)
            .times(1)
            .returning(|_, _| Ok("PLnew".to_string()));

        let handle = get_or_create_playlist(&dest, "Road Trip").await.unwrap();
        assert_eq!(handle.id, "PLnew");
        assert!(!handle.pre_existed);
    }
}
