use tabled::Table;

use crate::{
    info,
    management::ProgressStore,
    success,
    types::CheckpointTableRow,
    utils, warning,
};

/// Shows the saved checkpoints of interrupted transfers.
pub async fn list_progress() {
    let store = ProgressStore::from_config();
    let checkpoints = store.list().await;

    if checkpoints.is_empty() {
        info!("No saved progress in {}", store.dir().display());
        return;
    }

    let rows: Vec<CheckpointTableRow> = checkpoints
        .into_iter()
        .map(|cp| CheckpointTableRow {
            resolved: format!("{}/{}", cp.resolution_cursor.min(cp.total), cp.total),
            name: cp.transfer_name,
            kind: cp.kind.to_string(),
            batch: cp.write_cursor,
            saved: utils::format_timestamp(cp.timestamp),
        })
        .collect();

    println!("{}", Table::new(rows));
}

/// Deletes the checkpoint of one transfer, or all of them.
pub async fn clear_progress(name: Option<String>, all: bool) {
    let store = ProgressStore::from_config();

    if all {
        let checkpoints = store.list().await;
        for cp in &checkpoints {
            store.delete(&cp.transfer_name).await;
        }
        success!("Cleared {} saved transfers.", checkpoints.len());
        return;
    }

    match name {
        Some(name) => {
            if !store.path_for(&name).exists() {
                warning!("No saved progress for '{}'", name);
                return;
            }
            store.delete(&name).await;
            success!("Cleared saved progress for '{}'", name);
        }
        None => warning!("Name a transfer or pass --all."),
    }
}
