use std::env;
use std::sync::Arc;

use log::{info, warn};

use crate::kv::memory::MemoryKv;
use crate::kv::redis::RedisKv;
use crate::kv::Kv;
use crate::models::settings::SiteSettings;

/// Accepted environment aliases for the key-value endpoint. First defined
/// wins, checked in this order.
const URL_ALIASES: &[&str] = &["UPSTASH_REDIS_REST_URL", "KV_URL", "REDIS_URL"];
const TOKEN_ALIASES: &[&str] = &["UPSTASH_REDIS_REST_TOKEN", "KV_REST_API_TOKEN", "REDIS_TOKEN"];

fn first_defined(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.is_empty())
}

/// Build the connection URL from whatever aliases are set. A REST-style
/// `https://` endpoint is rewritten as a TLS redis URL with the token as
/// the password.
fn connection_url() -> Option<String> {
    let url = first_defined(URL_ALIASES)?;
    if url.starts_with("redis://") || url.starts_with("rediss://") {
        return Some(url);
    }
    let token = first_defined(TOKEN_ALIASES)?;
    let host = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    Some(format!("rediss://default:{}@{}:6379", token, host))
}

/// Construct the process-wide store. Never fails: missing or broken
/// configuration degrades to the in-process memory backend (contents are
/// lost on restart) with a logged warning.
pub fn init_store() -> Arc<dyn Kv> {
    match connection_url() {
        Some(url) => match RedisKv::connect(&url) {
            Ok(kv) => Arc::new(kv),
            Err(e) => {
                warn!("key-value store misconfigured ({}); using memory store", e);
                Arc::new(MemoryKv::new())
            }
        },
        None => {
            warn!("no key-value store configured; using memory store (data is ephemeral)");
            Arc::new(MemoryKv::new())
        }
    }
}

/// Boot check: probe connectivity (bounded at 3s inside the adapter) and
/// seed the settings document. Call before Rocket launches.
pub fn run(kv: &dyn Kv) {
    info!("Atelier boot check starting...");

    if kv.ping() {
        info!("  Store reachable ({})", kv.backend());
    } else {
        warn!("  Store unreachable ({}); reads degrade to empty results", kv.backend());
    }

    // First read persists defaults on a fresh deployment
    let settings = SiteSettings::get(kv);
    info!("  Site: {}", settings.site_name);

    info!("Boot check done.");
}
