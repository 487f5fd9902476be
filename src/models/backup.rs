use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::{load_family, load_record, store_record};

const BACKUPS: &str = "backups";

/// A backup record. `data` carries the serialized snapshot blob inline and
/// can be large, so listings strip it and return metadata only.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// pending | completed | failed
    pub status: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<String>,
}

impl Backup {
    pub(crate) fn save(kv: &dyn Kv, backup: &Backup) -> Result<(), String> {
        store_record(kv, BACKUPS, &backup.id, backup)
    }

    /// Full record including the blob.
    pub fn get_by_id(kv: &dyn Kv, id: &str) -> Option<Backup> {
        load_record(kv, BACKUPS, id)
    }

    /// Metadata only, newest first. The blob never rides along on a list.
    pub fn get_all(kv: &dyn Kv) -> Vec<Backup> {
        let mut backups = load_family::<Backup>(kv, BACKUPS);
        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        for backup in &mut backups {
            backup.data = None;
        }
        backups
    }

    /// Removes only the backup's own record, never the entities it
    /// snapshotted.
    pub fn delete(kv: &dyn Kv, id: &str) -> Result<bool, String> {
        if Self::get_by_id(kv, id).is_none() {
            return Ok(false);
        }
        kv.hash_delete(BACKUPS, &[id])?;
        Ok(true)
    }
}
