use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::{generate_id, load_family, load_record, store_record};

const MEDIA: &str = "media";
const TAGS: &str = "media:tags";

/// An uploaded media item's metadata (the bytes live in object storage,
/// outside this core). Tag names are additionally tracked in one global
/// set so the library UI can offer a tag filter without a full scan.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub filename: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct MediaForm {
    pub filename: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaPatch {
    pub filename: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl MediaItem {
    pub fn create(kv: &dyn Kv, form: &MediaForm) -> Result<MediaItem, String> {
        let now = Utc::now();
        let item = MediaItem {
            id: generate_id("media"),
            filename: form.filename.clone(),
            url: form.url.clone(),
            kind: form.kind.clone(),
            size: form.size,
            tags: form.tags.clone(),
            created_at: now,
            updated_at: now,
        };
        store_record(kv, MEDIA, &item.id, &item)?;
        let tag_refs: Vec<&str> = item.tags.iter().map(String::as_str).collect();
        kv.set_add(TAGS, &tag_refs)?;
        Ok(item)
    }

    pub fn get_by_id(kv: &dyn Kv, id: &str) -> Option<MediaItem> {
        load_record(kv, MEDIA, id)
    }

    pub fn get_all(kv: &dyn Kv, tag: Option<&str>) -> Vec<MediaItem> {
        let mut items = load_family::<MediaItem>(kv, MEDIA);
        if let Some(tag) = tag {
            items.retain(|i| i.tags.iter().any(|t| t == tag));
        }
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    /// Every tag name in use across the library.
    pub fn all_tags(kv: &dyn Kv) -> Vec<String> {
        let mut tags = kv.set_members(TAGS);
        tags.sort();
        tags
    }

    pub fn update(kv: &dyn Kv, id: &str, patch: &MediaPatch) -> Result<Option<MediaItem>, String> {
        let mut item = match Self::get_by_id(kv, id) {
            Some(i) => i,
            None => return Ok(None),
        };
        let old_tags = item.tags.clone();

        if let Some(filename) = &patch.filename {
            item.filename = filename.clone();
        }
        if let Some(tags) = &patch.tags {
            item.tags = tags.clone();
        }
        item.updated_at = Utc::now();

        store_record(kv, MEDIA, &item.id, &item)?;

        if patch.tags.is_some() {
            let new_refs: Vec<&str> = item.tags.iter().map(String::as_str).collect();
            kv.set_add(TAGS, &new_refs)?;
            let dropped: Vec<String> = old_tags
                .into_iter()
                .filter(|t| !item.tags.contains(t))
                .collect();
            prune_unused_tags(kv, &dropped)?;
        }

        Ok(Some(item))
    }

    pub fn delete(kv: &dyn Kv, id: &str) -> Result<bool, String> {
        let item = match Self::get_by_id(kv, id) {
            Some(i) => i,
            None => return Ok(false),
        };
        kv.hash_delete(MEDIA, &[id])?;
        prune_unused_tags(kv, &item.tags)?;
        Ok(true)
    }
}

/// Drop tag names from the global set once no remaining item carries them.
fn prune_unused_tags(kv: &dyn Kv, candidates: &[String]) -> Result<(), String> {
    if candidates.is_empty() {
        return Ok(());
    }
    let remaining = load_family::<MediaItem>(kv, MEDIA);
    for tag in candidates {
        if !remaining.iter().any(|i| i.tags.contains(tag)) {
            kv.set_remove(TAGS, &[tag])?;
        }
    }
    Ok(())
}
