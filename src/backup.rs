use std::collections::HashMap;

use chrono::Utc;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::backup::Backup;
use crate::models::generate_id;

/// Entity families included in a snapshot: the raw contents of each
/// family's primary hash, plus the settings document.
const FAMILIES: &[&str] = &[
    "posts",
    "projects",
    "skills",
    "media",
    "templates",
    "achievements",
];

const SETTINGS_KEY: &str = "settings:site";

/// The serialized snapshot: family name → (id → raw record JSON), and the
/// settings document verbatim. Records are carried as opaque strings so a
/// backup taken by one build restores cleanly under another.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    families: HashMap<String, HashMap<String, String>>,
    settings: Option<String>,
}

/// Take a snapshot of every entity family into one JSON blob.
///
/// A `pending` record is written first, then rewritten as `completed` with
/// the blob (and `size` = blob length) or as `failed` with the error text
/// in `data`. The function itself never fails; callers read the outcome
/// off the returned record's `status`.
pub fn create_backup(kv: &dyn Kv, name: &str, kind: &str, description: &str) -> Backup {
    let mut backup = Backup {
        id: generate_id("backup"),
        name: name.to_string(),
        description: description.to_string(),
        kind: kind.to_string(),
        status: "pending".to_string(),
        size: 0,
        created_at: Utc::now(),
        data: None,
    };
    if let Err(e) = Backup::save(kv, &backup) {
        error!("backup {}: could not write pending record: {}", backup.id, e);
    }

    match snapshot(kv) {
        Ok(blob) => {
            backup.status = "completed".to_string();
            backup.size = blob.len() as u64;
            backup.data = Some(blob);
        }
        Err(e) => {
            error!("backup {} failed: {}", backup.id, e);
            backup.status = "failed".to_string();
            backup.data = Some(format!("{{\"error\":{}}}", serde_json::json!(e)));
        }
    }

    if let Err(e) = Backup::save(kv, &backup) {
        error!("backup {}: could not persist outcome: {}", backup.id, e);
    } else {
        info!("backup {} {} ({} bytes)", backup.id, backup.status, backup.size);
    }
    backup
}

fn snapshot(kv: &dyn Kv) -> Result<String, String> {
    let mut families = HashMap::new();
    for family in FAMILIES {
        families.insert((*family).to_string(), kv.hash_get_all(family));
    }
    let snapshot = Snapshot {
        families,
        settings: kv.get(SETTINGS_KEY),
    };
    serde_json::to_string(&snapshot).map_err(|e| e.to_string())
}

/// Replace every family present in the blob with its snapshotted contents:
/// current members are deleted, then the blob's members written back field
/// by field. This is destructive and non-atomic; a crash mid-restore
/// leaves some families (or some members) restored and others not.
pub fn restore_backup(kv: &dyn Kv, id: &str) -> Result<bool, String> {
    let backup = match Backup::get_by_id(kv, id) {
        Some(b) => b,
        None => return Ok(false),
    };
    if backup.status != "completed" {
        return Ok(false);
    }
    let blob = backup.data.ok_or("backup record has no data")?;
    let snapshot: Snapshot =
        serde_json::from_str(&blob).map_err(|e| format!("unreadable backup data: {}", e))?;

    for (family, records) in &snapshot.families {
        let existing = kv.hash_get_all(family);
        let fields: Vec<&str> = existing.keys().map(String::as_str).collect();
        kv.hash_delete(family, &fields)?;
        for (id, raw) in records {
            kv.hash_set(family, id, raw)?;
        }
    }
    if let Some(settings) = &snapshot.settings {
        kv.set(SETTINGS_KEY, settings)?;
    }

    info!("restored backup {}", id);
    Ok(true)
}
