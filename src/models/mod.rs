use chrono::Utc;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::kv::Kv;

pub mod achievement;
pub mod backup;
pub mod chat;
pub mod media;
pub mod message;
pub mod portfolio;
pub mod post;
pub mod settings;
pub mod skill;
pub mod template;
pub mod user;

/// Generate a record id: `{prefix}_{unixMillis}_{randomBase36}`.
/// Uniqueness rests on collision improbability; there is no registry check.
pub(crate) fn generate_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| std::char::from_digit(rng.gen_range(0..36u32), 36).unwrap_or('0'))
        .collect();
    format!("{}_{}_{}", prefix, millis, suffix)
}

// ── Record codec ────────────────────────────────────────────────────
// Every entity family is one hash: field = record id, value = the record
// as a JSON string. A record that fails to parse is skipped, not fatal.

pub(crate) fn encode<T: Serialize>(record: &T) -> Result<String, String> {
    serde_json::to_string(record).map_err(|e| e.to_string())
}

pub(crate) fn decode<T: DeserializeOwned>(raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(record) => Some(record),
        Err(e) => {
            log::error!("skipping corrupt record: {}", e);
            None
        }
    }
}

pub(crate) fn load_record<T: DeserializeOwned>(kv: &dyn Kv, family: &str, id: &str) -> Option<T> {
    kv.hash_get(family, id).and_then(|raw| decode(&raw))
}

pub(crate) fn load_family<T: DeserializeOwned>(kv: &dyn Kv, family: &str) -> Vec<T> {
    kv.hash_get_all(family)
        .values()
        .filter_map(|raw| decode(raw))
        .collect()
}

pub(crate) fn store_record<T: Serialize>(
    kv: &dyn Kv,
    family: &str,
    id: &str,
    record: &T,
) -> Result<(), String> {
    kv.hash_set(family, id, &encode(record)?)
}

// ── Index reconciliation ────────────────────────────────────────────
// Every update/delete path routes its set-index maintenance through these
// two helpers so the logic exists once. A stale entry makes a record
// unreachable under its new value, or doubly listed under the old one.

/// Make `member`'s presence in the set at `key` match `should_be_member`.
pub(crate) fn reconcile_membership(
    kv: &dyn Kv,
    key: &str,
    member: &str,
    should_be_member: bool,
) -> Result<(), String> {
    if should_be_member {
        kv.set_add(key, &[member])
    } else {
        kv.set_remove(key, &[member])
    }
}

/// Move `id` between per-value index sets (tags, categories) when the
/// indexed field changes: removed from sets for values no longer present,
/// added to sets for values newly present.
pub(crate) fn reconcile_value_sets(
    kv: &dyn Kv,
    key_for: impl Fn(&str) -> String,
    id: &str,
    old_values: &[String],
    new_values: &[String],
) -> Result<(), String> {
    for value in old_values {
        if !new_values.contains(value) {
            kv.set_remove(&key_for(value), &[id])?;
        }
    }
    for value in new_values {
        if !old_values.contains(value) {
            kv.set_add(&key_for(value), &[id])?;
        }
    }
    Ok(())
}
