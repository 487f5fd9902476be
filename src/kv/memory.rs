use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::Kv;

#[derive(Default)]
struct MemState {
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, HashSet<String>>,
    zsets: HashMap<String, HashMap<String, f64>>,
    scalars: HashMap<String, String>,
    expiries: HashMap<String, Instant>,
}

impl MemState {
    /// Drop a key from every namespace. Expiry in the remote store is
    /// per-key, independent of the value type, so mirror that here.
    fn purge(&mut self, key: &str) {
        self.hashes.remove(key);
        self.sets.remove(key);
        self.zsets.remove(key);
        self.scalars.remove(key);
        self.expiries.remove(key);
    }

    /// Evict the key if its deadline has passed. Called before every access.
    fn check_expiry(&mut self, key: &str) {
        if let Some(deadline) = self.expiries.get(key) {
            if Instant::now() >= *deadline {
                self.purge(key);
            }
        }
    }
}

/// Process-local implementation of the `Kv` trait.
///
/// Backs the test suite and the unconfigured-deployment fallback. All state
/// sits behind one mutex; contents are lost when the process exits.
pub struct MemoryKv {
    state: Mutex<MemState>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

/// Glob match supporting only the `*` wildcard, which is all the key
/// namespace ever needs (e.g. `log:timestamp:*`).
fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }
    let mut rest = key;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    // Pattern ended with '*'
    true
}

impl Kv for MemoryKv {
    fn backend(&self) -> &str {
        "memory"
    }

    fn ping(&self) -> bool {
        true
    }

    // ── Hashes ──────────────────────────────────────────────────────

    fn hash_get(&self, key: &str, field: &str) -> Option<String> {
        let mut state = self.lock();
        state.check_expiry(key);
        state.hashes.get(key).and_then(|h| h.get(field)).cloned()
    }

    fn hash_get_all(&self, key: &str) -> HashMap<String, String> {
        let mut state = self.lock();
        state.check_expiry(key);
        state.hashes.get(key).cloned().unwrap_or_default()
    }

    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), String> {
        let mut state = self.lock();
        state.check_expiry(key);
        state
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    fn hash_delete(&self, key: &str, fields: &[&str]) -> Result<(), String> {
        let mut state = self.lock();
        state.check_expiry(key);
        if let Some(h) = state.hashes.get_mut(key) {
            for field in fields {
                h.remove(*field);
            }
            if h.is_empty() {
                state.hashes.remove(key);
            }
        }
        Ok(())
    }

    // ── Sets ────────────────────────────────────────────────────────

    fn set_add(&self, key: &str, members: &[&str]) -> Result<(), String> {
        if members.is_empty() {
            return Ok(());
        }
        let mut state = self.lock();
        state.check_expiry(key);
        let set = state.sets.entry(key.to_string()).or_default();
        for member in members {
            set.insert((*member).to_string());
        }
        Ok(())
    }

    fn set_remove(&self, key: &str, members: &[&str]) -> Result<(), String> {
        if members.is_empty() {
            return Ok(());
        }
        let mut state = self.lock();
        state.check_expiry(key);
        if let Some(set) = state.sets.get_mut(key) {
            for member in members {
                set.remove(*member);
            }
            if set.is_empty() {
                state.sets.remove(key);
            }
        }
        Ok(())
    }

    fn set_members(&self, key: &str) -> Vec<String> {
        let mut state = self.lock();
        state.check_expiry(key);
        state
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn set_contains(&self, key: &str, member: &str) -> bool {
        let mut state = self.lock();
        state.check_expiry(key);
        state.sets.get(key).map(|s| s.contains(member)).unwrap_or(false)
    }

    // ── Sorted sets ─────────────────────────────────────────────────

    fn zset_add(&self, key: &str, score: f64, member: &str) -> Result<(), String> {
        let mut state = self.lock();
        state.check_expiry(key);
        state
            .zsets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    fn zset_remove(&self, key: &str, member: &str) -> Result<(), String> {
        let mut state = self.lock();
        state.check_expiry(key);
        if let Some(z) = state.zsets.get_mut(key) {
            z.remove(member);
            if z.is_empty() {
                state.zsets.remove(key);
            }
        }
        Ok(())
    }

    fn zset_range_desc(&self, key: &str, start: isize, stop: isize) -> Vec<String> {
        let mut state = self.lock();
        state.check_expiry(key);
        let z = match state.zsets.get(key) {
            Some(z) => z,
            None => return vec![],
        };
        let mut entries: Vec<(&String, &f64)> = z.iter().collect();
        // Descending by score; ties broken by member, like ZREVRANGE
        entries.sort_by(|a, b| {
            b.1.partial_cmp(a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.cmp(a.0))
        });
        let len = entries.len() as isize;
        let norm = |i: isize| -> isize {
            if i < 0 {
                (len + i).max(0)
            } else {
                i
            }
        };
        let from = norm(start).min(len);
        let to = (norm(stop) + 1).min(len);
        if from >= to {
            return vec![];
        }
        entries[from as usize..to as usize]
            .iter()
            .map(|(m, _)| (*m).clone())
            .collect()
    }

    // ── Scalars ─────────────────────────────────────────────────────

    fn get(&self, key: &str) -> Option<String> {
        let mut state = self.lock();
        state.check_expiry(key);
        state.scalars.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let mut state = self.lock();
        state.expiries.remove(key);
        state.scalars.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), String> {
        let mut state = self.lock();
        state.purge(key);
        Ok(())
    }

    fn keys(&self, pattern: &str) -> Vec<String> {
        let mut state = self.lock();
        let expired: Vec<String> = state
            .expiries
            .iter()
            .filter(|(_, deadline)| Instant::now() >= **deadline)
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            state.purge(&key);
        }
        let mut found: Vec<String> = Vec::new();
        for key in state
            .scalars
            .keys()
            .chain(state.hashes.keys())
            .chain(state.sets.keys())
            .chain(state.zsets.keys())
        {
            if glob_match(pattern, key) {
                found.push(key.clone());
            }
        }
        found.sort();
        found.dedup();
        found
    }

    fn expire(&self, key: &str, seconds: i64) -> Result<(), String> {
        let mut state = self.lock();
        if seconds <= 0 {
            state.purge(key);
        } else {
            state
                .expiries
                .insert(key.to_string(), Instant::now() + Duration::from_secs(seconds as u64));
        }
        Ok(())
    }
}
