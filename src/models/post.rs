use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::{
    generate_id, load_family, load_record, reconcile_membership, reconcile_value_sets,
    store_record,
};

const POSTS: &str = "posts";
const SLUGS: &str = "posts:slugs";
const PUBLISHED: &str = "posts:published";
const DRAFTS: &str = "posts:drafts";
const TIMELINE: &str = "posts:published:timeline";

fn tag_key(tag: &str) -> String {
    format!("posts:tag:{}", tag)
}

/// A blog post. Lives in the `posts` hash; indexed by the slug set, the
/// published/drafts partition, per-tag id sets, and the published timeline
/// sorted set (score = publish millis). Partition invariant: a post is in
/// exactly one of {published, drafts}, and the timeline holds exactly the
/// members of the published set.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub published: bool,
    pub tags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub published: bool,
    pub tags: Vec<String>,
}

/// Partial update. `None` fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub published: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct PostFilter {
    pub only_published: bool,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl Post {
    pub fn create(kv: &dyn Kv, form: &PostForm) -> Result<Post, String> {
        let now = Utc::now();
        let post = Post {
            id: generate_id("post"),
            slug: unique_slug(kv, &form.title),
            title: form.title.clone(),
            content: form.content.clone(),
            excerpt: form.excerpt.clone().unwrap_or_default(),
            published: form.published,
            tags: form.tags.clone(),
            published_at: form.published.then_some(now),
            created_at: now,
            updated_at: now,
        };

        store_record(kv, POSTS, &post.id, &post)?;
        kv.set_add(SLUGS, &[&post.slug])?;

        if post.published {
            kv.set_add(PUBLISHED, &[&post.id])?;
            kv.zset_add(TIMELINE, now.timestamp_millis() as f64, &post.id)?;
        } else {
            kv.set_add(DRAFTS, &[&post.id])?;
        }
        for tag in &post.tags {
            kv.set_add(&tag_key(tag), &[&post.id])?;
        }

        Ok(post)
    }

    pub fn get_by_id(kv: &dyn Kv, id: &str) -> Option<Post> {
        load_record(kv, POSTS, id)
    }

    pub fn get_by_slug(kv: &dyn Kv, slug: &str) -> Option<Post> {
        load_family::<Post>(kv, POSTS)
            .into_iter()
            .find(|p| p.slug == slug)
    }

    /// Filtered listing. Published-only listings come back in timeline
    /// order (newest publish first); everything else sorts by `created_at`
    /// descending.
    pub fn get_all(kv: &dyn Kv, filter: &PostFilter) -> Vec<Post> {
        let mut posts: Vec<Post> = if filter.only_published {
            kv.zset_range_desc(TIMELINE, 0, -1)
                .iter()
                .filter_map(|id| Self::get_by_id(kv, id))
                .collect()
        } else {
            let mut all = load_family::<Post>(kv, POSTS);
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            all
        };

        if let Some(tag) = &filter.tag {
            let tagged = kv.set_members(&tag_key(tag));
            posts.retain(|p| tagged.contains(&p.id));
        }

        if let Some(search) = &filter.search {
            let needle = search.to_lowercase();
            posts.retain(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.content.to_lowercase().contains(&needle)
                    || p.excerpt.to_lowercase().contains(&needle)
            });
        }

        posts
    }

    /// Merge a partial update and reconcile every index the change touches.
    /// Writing only the new record and skipping the reconciliation is the
    /// classic corruption here: stale tag entries, or a post sitting in
    /// both the published and drafts sets.
    pub fn update(kv: &dyn Kv, id: &str, patch: &PostPatch) -> Result<Option<Post>, String> {
        let mut post = match Self::get_by_id(kv, id) {
            Some(p) => p,
            None => return Ok(None),
        };
        let old_tags = post.tags.clone();
        let was_published = post.published;

        if let Some(title) = &patch.title {
            post.title = title.clone();
        }
        if let Some(content) = &patch.content {
            post.content = content.clone();
        }
        if let Some(excerpt) = &patch.excerpt {
            post.excerpt = excerpt.clone();
        }
        if let Some(published) = patch.published {
            post.published = published;
        }
        if let Some(tags) = &patch.tags {
            post.tags = tags.clone();
        }
        post.updated_at = Utc::now();

        if post.published && !was_published && post.published_at.is_none() {
            post.published_at = Some(post.updated_at);
        }

        store_record(kv, POSTS, &post.id, &post)?;

        if post.published != was_published {
            reconcile_membership(kv, PUBLISHED, &post.id, post.published)?;
            reconcile_membership(kv, DRAFTS, &post.id, !post.published)?;
            if post.published {
                let millis = post
                    .published_at
                    .unwrap_or(post.updated_at)
                    .timestamp_millis();
                kv.zset_add(TIMELINE, millis as f64, &post.id)?;
            } else {
                kv.zset_remove(TIMELINE, &post.id)?;
            }
        }

        if patch.tags.is_some() {
            reconcile_value_sets(kv, tag_key, &post.id, &old_tags, &post.tags)?;
        }

        Ok(Some(post))
    }

    /// Remove the record and every index membership that referenced it.
    /// The record is fetched first; its current slug, tags, and publish
    /// state say what needs cleaning up.
    pub fn delete(kv: &dyn Kv, id: &str) -> Result<bool, String> {
        let post = match Self::get_by_id(kv, id) {
            Some(p) => p,
            None => return Ok(false),
        };

        kv.set_remove(SLUGS, &[&post.slug])?;
        kv.set_remove(PUBLISHED, &[&post.id])?;
        kv.set_remove(DRAFTS, &[&post.id])?;
        kv.zset_remove(TIMELINE, &post.id)?;
        for tag in &post.tags {
            kv.set_remove(&tag_key(tag), &[&post.id])?;
        }
        kv.hash_delete(POSTS, &[&post.id])?;

        Ok(true)
    }
}

/// Slugify the title and disambiguate against the slug set with a numeric
/// suffix (`my-post`, `my-post-2`, ...). The suffix lands on the slug, not
/// the title.
fn unique_slug(kv: &dyn Kv, title: &str) -> String {
    let base = slug::slugify(title);
    let base = if base.is_empty() {
        "post".to_string()
    } else {
        base
    };
    if !kv.set_contains(SLUGS, &base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !kv.set_contains(SLUGS, &candidate) {
            return candidate;
        }
        n += 1;
    }
}
