use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::{generate_id, load_family, load_record, store_record};

const ACHIEVEMENTS: &str = "achievements";

fn user_key(email: &str) -> String {
    format!("user:achievements:{}", email)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: i64,
    pub current_value: i64,
}

/// An unlockable achievement. Unlocked ids are additionally recorded in a
/// per-user membership set under `user:achievements:{email}`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    pub criteria: Criteria,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AchievementForm {
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub criteria: Criteria,
}

impl Achievement {
    pub fn create(kv: &dyn Kv, form: &AchievementForm) -> Result<Achievement, String> {
        let now = Utc::now();
        let achievement = Achievement {
            id: generate_id("ach"),
            title: form.title.clone(),
            description: form.description.clone().unwrap_or_default(),
            icon: form.icon.clone(),
            criteria: Criteria {
                kind: form.criteria.kind.clone(),
                target: form.criteria.target,
                current_value: form.criteria.current_value,
            },
            unlocked: false,
            unlocked_at: None,
            created_at: now,
            updated_at: now,
        };
        store_record(kv, ACHIEVEMENTS, &achievement.id, &achievement)?;
        Ok(achievement)
    }

    pub fn get_by_id(kv: &dyn Kv, id: &str) -> Option<Achievement> {
        load_record(kv, ACHIEVEMENTS, id)
    }

    pub fn get_all(kv: &dyn Kv) -> Vec<Achievement> {
        let mut all = load_family::<Achievement>(kv, ACHIEVEMENTS);
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }

    /// Advance progress toward the target. Crossing the target unlocks the
    /// achievement and records it in the user's membership set.
    pub fn update_progress(
        kv: &dyn Kv,
        id: &str,
        email: &str,
        value: i64,
    ) -> Result<Option<Achievement>, String> {
        let mut achievement = match Self::get_by_id(kv, id) {
            Some(a) => a,
            None => return Ok(None),
        };

        achievement.criteria.current_value = value;
        achievement.updated_at = Utc::now();

        if !achievement.unlocked && value >= achievement.criteria.target {
            achievement.unlocked = true;
            achievement.unlocked_at = Some(achievement.updated_at);
            kv.set_add(&user_key(email), &[&achievement.id])?;
        }

        store_record(kv, ACHIEVEMENTS, &achievement.id, &achievement)?;
        Ok(Some(achievement))
    }

    /// Ids this user has unlocked.
    pub fn unlocked_for(kv: &dyn Kv, email: &str) -> Vec<String> {
        kv.set_members(&user_key(email))
    }

    pub fn delete(kv: &dyn Kv, id: &str) -> Result<bool, String> {
        if Self::get_by_id(kv, id).is_none() {
            return Ok(false);
        }
        // Scrub per-user membership sets before dropping the record
        for key in kv.keys("user:achievements:*") {
            kv.set_remove(&key, &[id])?;
        }
        kv.hash_delete(ACHIEVEMENTS, &[id])?;
        Ok(true)
    }
}
