use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::{generate_id, load_family, load_record, store_record};

const SKILLS: &str = "skills";

fn category_key(category: &str) -> String {
    format!("skills:category:{}", category)
}

/// A skill entry (e.g. "Rust", category "Backend", proficiency 85).
/// Indexed by a per-category id set.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub category: String,
    pub proficiency: u8,
    pub featured: bool,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SkillForm {
    pub name: String,
    pub category: String,
    pub proficiency: u8,
    pub featured: bool,
    pub order: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SkillPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub proficiency: Option<u8>,
    pub featured: Option<bool>,
    pub order: Option<i64>,
}

impl Skill {
    pub fn create(kv: &dyn Kv, form: &SkillForm) -> Result<Skill, String> {
        let now = Utc::now();
        let skill = Skill {
            id: generate_id("skill"),
            name: form.name.clone(),
            category: form.category.clone(),
            proficiency: form.proficiency.min(100),
            featured: form.featured,
            order: form.order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        store_record(kv, SKILLS, &skill.id, &skill)?;
        kv.set_add(&category_key(&skill.category), &[&skill.id])?;
        Ok(skill)
    }

    pub fn get_by_id(kv: &dyn Kv, id: &str) -> Option<Skill> {
        load_record(kv, SKILLS, id)
    }

    /// Skills sorted by the stored `order`, filtered by category via the
    /// category index set when given.
    pub fn get_all(kv: &dyn Kv, category: Option<&str>) -> Vec<Skill> {
        let mut skills: Vec<Skill> = match category {
            Some(cat) => kv
                .set_members(&category_key(cat))
                .iter()
                .filter_map(|id| Self::get_by_id(kv, id))
                .collect(),
            None => load_family::<Skill>(kv, SKILLS),
        };
        skills.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        skills
    }

    pub fn update(kv: &dyn Kv, id: &str, patch: &SkillPatch) -> Result<Option<Skill>, String> {
        let mut skill = match Self::get_by_id(kv, id) {
            Some(s) => s,
            None => return Ok(None),
        };
        let old_category = skill.category.clone();

        if let Some(name) = &patch.name {
            skill.name = name.clone();
        }
        if let Some(category) = &patch.category {
            skill.category = category.clone();
        }
        if let Some(proficiency) = patch.proficiency {
            skill.proficiency = proficiency.min(100);
        }
        if let Some(featured) = patch.featured {
            skill.featured = featured;
        }
        if let Some(order) = patch.order {
            skill.order = order;
        }
        skill.updated_at = Utc::now();

        store_record(kv, SKILLS, &skill.id, &skill)?;

        // Category changed: move the id between category sets
        if skill.category != old_category {
            kv.set_remove(&category_key(&old_category), &[&skill.id])?;
            kv.set_add(&category_key(&skill.category), &[&skill.id])?;
        }

        Ok(Some(skill))
    }

    pub fn delete(kv: &dyn Kv, id: &str) -> Result<bool, String> {
        let skill = match Self::get_by_id(kv, id) {
            Some(s) => s,
            None => return Ok(false),
        };
        kv.set_remove(&category_key(&skill.category), &[&skill.id])?;
        kv.hash_delete(SKILLS, &[id])?;
        Ok(true)
    }
}
