use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::{decode, encode};

/// The whole settings document lives under this one scalar key.
const SETTINGS_KEY: &str = "settings:site";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinks {
    pub github: String,
    pub linkedin: String,
    pub twitter: String,
    pub instagram: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSettings {
    pub mode: String,
    pub accent_color: String,
    pub font: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeoSettings {
    pub meta_title: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
}

/// Site-wide settings singleton: one JSON document, lazily seeded with
/// defaults on first read (the first read after a fresh deployment has a
/// write side effect).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub site_name: String,
    pub tagline: String,
    pub about: String,
    pub contact_email: String,
    pub social_links: SocialLinks,
    pub theme: ThemeSettings,
    pub seo: SeoSettings,
    pub updated_at: DateTime<Utc>,
}

/// Partial update. The `social_links`, `theme`, and `seo` sub-objects are
/// merged field-by-field, never replaced wholesale; everything else merges
/// shallowly.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub site_name: Option<String>,
    pub tagline: Option<String>,
    pub about: Option<String>,
    pub contact_email: Option<String>,
    pub social_links: Option<SocialLinksPatch>,
    pub theme: Option<ThemePatch>,
    pub seo: Option<SeoPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinksPatch {
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePatch {
    pub mode: Option<String>,
    pub accent_color: Option<String>,
    pub font: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoPatch {
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Option<Vec<String>>,
}

impl SiteSettings {
    fn defaults() -> SiteSettings {
        SiteSettings {
            site_name: "Portfolio".to_string(),
            tagline: String::new(),
            about: String::new(),
            contact_email: String::new(),
            social_links: SocialLinks::default(),
            theme: ThemeSettings {
                mode: "dark".to_string(),
                accent_color: "#D4A017".to_string(),
                font: "Inter".to_string(),
            },
            seo: SeoSettings::default(),
            updated_at: Utc::now(),
        }
    }

    pub fn get(kv: &dyn Kv) -> SiteSettings {
        if let Some(raw) = kv.get(SETTINGS_KEY) {
            if let Some(settings) = decode(&raw) {
                return settings;
            }
        }
        let defaults = Self::defaults();
        if let Ok(raw) = encode(&defaults) {
            let _ = kv.set(SETTINGS_KEY, &raw);
        }
        defaults
    }

    pub fn update(kv: &dyn Kv, patch: &SettingsPatch) -> Result<SiteSettings, String> {
        let mut settings = Self::get(kv);

        if let Some(site_name) = &patch.site_name {
            settings.site_name = site_name.clone();
        }
        if let Some(tagline) = &patch.tagline {
            settings.tagline = tagline.clone();
        }
        if let Some(about) = &patch.about {
            settings.about = about.clone();
        }
        if let Some(contact_email) = &patch.contact_email {
            settings.contact_email = contact_email.clone();
        }

        if let Some(links) = &patch.social_links {
            if let Some(github) = &links.github {
                settings.social_links.github = github.clone();
            }
            if let Some(linkedin) = &links.linkedin {
                settings.social_links.linkedin = linkedin.clone();
            }
            if let Some(twitter) = &links.twitter {
                settings.social_links.twitter = twitter.clone();
            }
            if let Some(instagram) = &links.instagram {
                settings.social_links.instagram = instagram.clone();
            }
        }
        if let Some(theme) = &patch.theme {
            if let Some(mode) = &theme.mode {
                settings.theme.mode = mode.clone();
            }
            if let Some(accent_color) = &theme.accent_color {
                settings.theme.accent_color = accent_color.clone();
            }
            if let Some(font) = &theme.font {
                settings.theme.font = font.clone();
            }
        }
        if let Some(seo) = &patch.seo {
            if let Some(meta_title) = &seo.meta_title {
                settings.seo.meta_title = meta_title.clone();
            }
            if let Some(meta_description) = &seo.meta_description {
                settings.seo.meta_description = meta_description.clone();
            }
            if let Some(keywords) = &seo.keywords {
                settings.seo.keywords = keywords.clone();
            }
        }

        settings.updated_at = Utc::now();
        kv.set(SETTINGS_KEY, &encode(&settings)?)?;
        Ok(settings)
    }
}
