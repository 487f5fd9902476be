use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::{generate_id, load_family, load_record, reconcile_value_sets, store_record};

const TEMPLATES: &str = "templates";

fn category_key(category: &str) -> String {
    format!("templates:category:{}", category)
}

fn tag_key(tag: &str) -> String {
    format!("templates:tag:{}", tag)
}

/// A reusable content template (post scaffolds, project blurbs). Indexed
/// by per-category and per-tag id sets; listings are alphabetical by name.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ContentTemplate {
    pub id: String,
    pub name: String,
    pub category: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TemplateForm {
    pub name: String,
    pub category: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl ContentTemplate {
    pub fn create(kv: &dyn Kv, form: &TemplateForm) -> Result<ContentTemplate, String> {
        let now = Utc::now();
        let template = ContentTemplate {
            id: generate_id("tmpl"),
            name: form.name.clone(),
            category: form.category.clone(),
            content: form.content.clone(),
            tags: form.tags.clone(),
            created_at: now,
            updated_at: now,
        };
        store_record(kv, TEMPLATES, &template.id, &template)?;
        kv.set_add(&category_key(&template.category), &[&template.id])?;
        for tag in &template.tags {
            kv.set_add(&tag_key(tag), &[&template.id])?;
        }
        Ok(template)
    }

    pub fn get_by_id(kv: &dyn Kv, id: &str) -> Option<ContentTemplate> {
        load_record(kv, TEMPLATES, id)
    }

    pub fn get_all(kv: &dyn Kv, category: Option<&str>) -> Vec<ContentTemplate> {
        let mut templates: Vec<ContentTemplate> = match category {
            Some(cat) => kv
                .set_members(&category_key(cat))
                .iter()
                .filter_map(|id| Self::get_by_id(kv, id))
                .collect(),
            None => load_family::<ContentTemplate>(kv, TEMPLATES),
        };
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        templates
    }

    pub fn update(
        kv: &dyn Kv,
        id: &str,
        patch: &TemplatePatch,
    ) -> Result<Option<ContentTemplate>, String> {
        let mut template = match Self::get_by_id(kv, id) {
            Some(t) => t,
            None => return Ok(None),
        };
        let old_category = template.category.clone();
        let old_tags = template.tags.clone();

        if let Some(name) = &patch.name {
            template.name = name.clone();
        }
        if let Some(category) = &patch.category {
            template.category = category.clone();
        }
        if let Some(content) = &patch.content {
            template.content = content.clone();
        }
        if let Some(tags) = &patch.tags {
            template.tags = tags.clone();
        }
        template.updated_at = Utc::now();

        store_record(kv, TEMPLATES, &template.id, &template)?;

        if template.category != old_category {
            kv.set_remove(&category_key(&old_category), &[&template.id])?;
            kv.set_add(&category_key(&template.category), &[&template.id])?;
        }
        if patch.tags.is_some() {
            reconcile_value_sets(kv, tag_key, &template.id, &old_tags, &template.tags)?;
        }

        Ok(Some(template))
    }

    pub fn delete(kv: &dyn Kv, id: &str) -> Result<bool, String> {
        let template = match Self::get_by_id(kv, id) {
            Some(t) => t,
            None => return Ok(false),
        };
        kv.set_remove(&category_key(&template.category), &[&template.id])?;
        for tag in &template.tags {
            kv.set_remove(&tag_key(tag), &[&template.id])?;
        }
        kv.hash_delete(TEMPLATES, &[id])?;
        Ok(true)
    }
}
