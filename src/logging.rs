use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::generate_id;

const LOGS: &str = "logs";
const LOGS_ALL: &str = "logs:all";

/// Bound on the in-process fallback buffer; oldest entries evict first.
pub const MEMORY_BUFFER_CAP: usize = 100;

const LEVELS: &[&str] = &["info", "warning", "error", "success"];

fn level_key(level: &str) -> String {
    format!("logs:level:{}", level)
}

fn source_key(source: &str) -> String {
    format!("logs:source:{}", source)
}

fn timestamp_key(millis: i64, id: &str) -> String {
    format!("log:timestamp:{}:{}", millis, id)
}

/// One application log entry. `timestamp` is epoch millis, `created_at`
/// the same instant as an ISO string.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub id: String,
    pub level: String,
    pub message: String,
    pub source: String,
    pub created_at: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogFilter {
    pub level: Option<String>,
    pub source: Option<String>,
    pub search: Option<String>,
    /// "24h" | "7d" | "30d" | "all"
    pub window: Option<String>,
}

/// Logging facade. Every entry goes into the bounded in-process buffer
/// first, then to the remote store best-effort, so the caller's local
/// view of "what was logged" stays consistent when the store is down, and
/// a log call never surfaces a failure.
pub struct LogStore {
    kv: Arc<dyn Kv>,
    buffer: Mutex<VecDeque<LogEntry>>,
}

impl LogStore {
    pub fn new(kv: Arc<dyn Kv>) -> Self {
        Self {
            kv,
            buffer: Mutex::new(VecDeque::with_capacity(MEMORY_BUFFER_CAP)),
        }
    }

    pub fn log(&self, level: &str, message: &str, source: &str) -> LogEntry {
        self.log_full(level, message, source, None, None)
    }

    pub fn log_full(
        &self,
        level: &str,
        message: &str,
        source: &str,
        user_email: Option<&str>,
        details: Option<&str>,
    ) -> LogEntry {
        let now = Utc::now();
        let entry = LogEntry {
            id: generate_id("log"),
            level: level.to_string(),
            message: message.to_string(),
            source: source.to_string(),
            created_at: now.to_rfc3339(),
            timestamp: now.timestamp_millis(),
            user_email: user_email.map(str::to_string),
            details: details.map(str::to_string),
        };

        // Memory first: the buffer is the source of truth when the remote
        // store is down.
        {
            let mut buffer = self.buffer.lock().unwrap_or_else(|p| p.into_inner());
            if buffer.len() >= MEMORY_BUFFER_CAP {
                buffer.pop_front();
            }
            buffer.push_back(entry.clone());
        }

        // Remote write is best-effort; failures are noted and swallowed.
        if let Err(e) = self.write_remote(&entry) {
            log::warn!("log entry {} kept in memory only: {}", entry.id, e);
        }

        entry
    }

    fn write_remote(&self, entry: &LogEntry) -> Result<(), String> {
        let raw = serde_json::to_string(entry).map_err(|e| e.to_string())?;
        self.kv.hash_set(LOGS, &entry.id, &raw)?;
        self.kv.set_add(LOGS_ALL, &[&entry.id])?;
        self.kv.set_add(&level_key(&entry.level), &[&entry.id])?;
        self.kv.set_add(&source_key(&entry.source), &[&entry.id])?;
        self.kv
            .set(&timestamp_key(entry.timestamp, &entry.id), &entry.id)?;
        Ok(())
    }

    /// Read logs, newest first. The remote store is preferred; an
    /// unreachable store (or one holding nothing) falls back to the
    /// memory buffer, with the same filter semantics either way.
    pub fn get_logs(&self, filter: &LogFilter) -> Vec<LogEntry> {
        let ids = self.kv.set_members(LOGS_ALL);
        let mut entries: Vec<LogEntry> = ids
            .iter()
            .filter_map(|id| self.kv.hash_get(LOGS, id))
            .filter_map(|raw| serde_json::from_str(&raw).ok())
            .collect();

        if entries.is_empty() {
            let buffer = self.buffer.lock().unwrap_or_else(|p| p.into_inner());
            entries = buffer.iter().cloned().collect();
        }

        apply_filters(&mut entries, filter);
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    /// Clear the remote indexes and the memory buffer. The memory side
    /// always succeeds, so the operation reports success even when the
    /// remote store is unreachable.
    pub fn clear(&self) -> bool {
        let mut remote_ok = true;

        for key in self.kv.keys("log:timestamp:*") {
            remote_ok &= self.kv.delete(&key).is_ok();
        }
        for level in LEVELS {
            remote_ok &= self.kv.delete(&level_key(level)).is_ok();
        }
        for key in self.kv.keys("logs:source:*") {
            remote_ok &= self.kv.delete(&key).is_ok();
        }
        remote_ok &= self.kv.delete(LOGS_ALL).is_ok();
        remote_ok &= self.kv.delete(LOGS).is_ok();

        if !remote_ok {
            log::warn!("remote log clear incomplete; memory buffer cleared regardless");
        }

        let mut buffer = self.buffer.lock().unwrap_or_else(|p| p.into_inner());
        buffer.clear();
        true
    }
}

fn apply_filters(entries: &mut Vec<LogEntry>, filter: &LogFilter) {
    if let Some(level) = &filter.level {
        entries.retain(|e| &e.level == level);
    }
    if let Some(source) = &filter.source {
        entries.retain(|e| &e.source == source);
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        entries.retain(|e| e.message.to_lowercase().contains(&needle));
    }
    if let Some(window) = &filter.window {
        let hours = match window.as_str() {
            "24h" => Some(24),
            "7d" => Some(24 * 7),
            "30d" => Some(24 * 30),
            _ => None, // "all"
        };
        if let Some(hours) = hours {
            let cutoff = Utc::now().timestamp_millis() - hours * 60 * 60 * 1000;
            entries.retain(|e| e.timestamp >= cutoff);
        }
    }
}
