use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::{generate_id, load_family, load_record, store_record};

const PROJECTS: &str = "projects";

/// A portfolio project. Primary hash only, no secondary indexes; display
/// position is the stored `order` integer and listings sort on it.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub image_url: Option<String>,
    pub live_url: Option<String>,
    pub repo_url: Option<String>,
    pub featured: bool,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectForm {
    pub title: String,
    pub description: Option<String>,
    pub technologies: Vec<String>,
    pub image_url: Option<String>,
    pub live_url: Option<String>,
    pub repo_url: Option<String>,
    pub featured: bool,
    pub order: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub live_url: Option<String>,
    pub repo_url: Option<String>,
    pub featured: Option<bool>,
    pub order: Option<i64>,
}

impl Project {
    pub fn create(kv: &dyn Kv, form: &ProjectForm) -> Result<Project, String> {
        let now = Utc::now();
        let project = Project {
            id: generate_id("proj"),
            title: form.title.clone(),
            description: form.description.clone().unwrap_or_default(),
            technologies: form.technologies.clone(),
            image_url: form.image_url.clone(),
            live_url: form.live_url.clone(),
            repo_url: form.repo_url.clone(),
            featured: form.featured,
            order: form.order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        store_record(kv, PROJECTS, &project.id, &project)?;
        Ok(project)
    }

    pub fn get_by_id(kv: &dyn Kv, id: &str) -> Option<Project> {
        load_record(kv, PROJECTS, id)
    }

    /// All projects, sorted by the stored `order`, newest first on ties.
    pub fn get_all(kv: &dyn Kv, featured_only: bool) -> Vec<Project> {
        let mut projects = load_family::<Project>(kv, PROJECTS);
        if featured_only {
            projects.retain(|p| p.featured);
        }
        projects.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        projects
    }

    pub fn update(kv: &dyn Kv, id: &str, patch: &ProjectPatch) -> Result<Option<Project>, String> {
        let mut project = match Self::get_by_id(kv, id) {
            Some(p) => p,
            None => return Ok(None),
        };

        if let Some(title) = &patch.title {
            project.title = title.clone();
        }
        if let Some(description) = &patch.description {
            project.description = description.clone();
        }
        if let Some(technologies) = &patch.technologies {
            project.technologies = technologies.clone();
        }
        if let Some(image_url) = &patch.image_url {
            project.image_url = Some(image_url.clone());
        }
        if let Some(live_url) = &patch.live_url {
            project.live_url = Some(live_url.clone());
        }
        if let Some(repo_url) = &patch.repo_url {
            project.repo_url = Some(repo_url.clone());
        }
        if let Some(featured) = patch.featured {
            project.featured = featured;
        }
        if let Some(order) = patch.order {
            project.order = order;
        }
        project.updated_at = Utc::now();

        store_record(kv, PROJECTS, &project.id, &project)?;
        Ok(Some(project))
    }

    pub fn delete(kv: &dyn Kv, id: &str) -> Result<bool, String> {
        if Self::get_by_id(kv, id).is_none() {
            return Ok(false);
        }
        kv.hash_delete(PROJECTS, &[id])?;
        Ok(true)
    }
}
