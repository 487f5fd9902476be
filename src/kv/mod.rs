use std::collections::HashMap;

pub mod memory;
pub mod redis;

/// Unified key-value access trait. Every storage operation goes through here.
/// Implementations: `RedisKv` (wraps a remote Redis-compatible service) and
/// `MemoryKv` (process-local, used for tests and as the unconfigured fallback).
///
/// The primitives mirror what the remote service offers: hashes for records,
/// sets for secondary indexes, sorted sets for timelines, scalars for
/// singletons and pointer keys. There is no multi-key transaction; callers
/// issue their index writes sequentially and accept that a crash between two
/// of them leaves a stale entry.
pub trait Kv: Send + Sync {
    /// Backend name: "redis" or "memory"
    fn backend(&self) -> &str;

    /// Connectivity probe. Must return (true or false) within ~3 seconds;
    /// callers never hang on a down store.
    fn ping(&self) -> bool;

    // ── Hashes ──────────────────────────────────────────────────────
    fn hash_get(&self, key: &str, field: &str) -> Option<String>;
    fn hash_get_all(&self, key: &str) -> HashMap<String, String>;
    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), String>;
    fn hash_delete(&self, key: &str, fields: &[&str]) -> Result<(), String>;

    // ── Sets ────────────────────────────────────────────────────────
    fn set_add(&self, key: &str, members: &[&str]) -> Result<(), String>;
    fn set_remove(&self, key: &str, members: &[&str]) -> Result<(), String>;
    fn set_members(&self, key: &str) -> Vec<String>;
    fn set_contains(&self, key: &str, member: &str) -> bool;

    // ── Sorted sets ─────────────────────────────────────────────────
    fn zset_add(&self, key: &str, score: f64, member: &str) -> Result<(), String>;
    fn zset_remove(&self, key: &str, member: &str) -> Result<(), String>;
    /// Members ordered by descending score. `start`/`stop` are inclusive
    /// ranks; negative values count from the end (0, -1 = everything).
    fn zset_range_desc(&self, key: &str, start: isize, stop: isize) -> Vec<String>;

    // ── Scalars ─────────────────────────────────────────────────────
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn delete(&self, key: &str) -> Result<(), String>;
    fn keys(&self, pattern: &str) -> Vec<String>;

    /// Set a time-to-live on a key. The key vanishes after `seconds`.
    fn expire(&self, key: &str, seconds: i64) -> Result<(), String>;
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryKv;
    use super::Kv;

    fn test_kv() -> MemoryKv {
        MemoryKv::new()
    }

    // ── Hashes ──────────────────────────────────────────────────────

    #[test]
    fn test_hash_set_get() {
        let kv = test_kv();
        assert!(kv.hash_get("h", "f").is_none());
        kv.hash_set("h", "f", "v").unwrap();
        assert_eq!(kv.hash_get("h", "f"), Some("v".to_string()));
    }

    #[test]
    fn test_hash_get_all() {
        let kv = test_kv();
        kv.hash_set("h", "a", "1").unwrap();
        kv.hash_set("h", "b", "2").unwrap();
        let all = kv.hash_get_all("h");
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("a").unwrap(), "1");
        assert_eq!(all.get("b").unwrap(), "2");
    }

    #[test]
    fn test_hash_delete() {
        let kv = test_kv();
        kv.hash_set("h", "a", "1").unwrap();
        kv.hash_set("h", "b", "2").unwrap();
        kv.hash_delete("h", &["a"]).unwrap();
        assert!(kv.hash_get("h", "a").is_none());
        assert_eq!(kv.hash_get("h", "b"), Some("2".to_string()));
    }

    #[test]
    fn test_hash_overwrite() {
        let kv = test_kv();
        kv.hash_set("h", "f", "old").unwrap();
        kv.hash_set("h", "f", "new").unwrap();
        assert_eq!(kv.hash_get("h", "f"), Some("new".to_string()));
    }

    // ── Sets ────────────────────────────────────────────────────────

    #[test]
    fn test_set_add_members() {
        let kv = test_kv();
        kv.set_add("s", &["a", "b"]).unwrap();
        kv.set_add("s", &["b", "c"]).unwrap();
        let mut members = kv.set_members("s");
        members.sort();
        assert_eq!(members, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_set_contains_remove() {
        let kv = test_kv();
        kv.set_add("s", &["x"]).unwrap();
        assert!(kv.set_contains("s", "x"));
        assert!(!kv.set_contains("s", "y"));
        kv.set_remove("s", &["x"]).unwrap();
        assert!(!kv.set_contains("s", "x"));
        assert!(kv.set_members("s").is_empty());
    }

    #[test]
    fn test_set_empty_slice_is_noop() {
        let kv = test_kv();
        kv.set_add("s", &[]).unwrap();
        kv.set_remove("s", &[]).unwrap();
        assert!(kv.set_members("s").is_empty());
    }

    // ── Sorted sets ─────────────────────────────────────────────────

    #[test]
    fn test_zset_range_desc() {
        let kv = test_kv();
        kv.zset_add("z", 1.0, "one").unwrap();
        kv.zset_add("z", 3.0, "three").unwrap();
        kv.zset_add("z", 2.0, "two").unwrap();
        assert_eq!(kv.zset_range_desc("z", 0, -1), vec!["three", "two", "one"]);
        assert_eq!(kv.zset_range_desc("z", 0, 1), vec!["three", "two"]);
        assert_eq!(kv.zset_range_desc("z", 1, 1), vec!["two"]);
    }

    #[test]
    fn test_zset_add_updates_score() {
        let kv = test_kv();
        kv.zset_add("z", 1.0, "m").unwrap();
        kv.zset_add("z", 9.0, "m").unwrap();
        kv.zset_add("z", 5.0, "other").unwrap();
        assert_eq!(kv.zset_range_desc("z", 0, -1), vec!["m", "other"]);
    }

    #[test]
    fn test_zset_remove() {
        let kv = test_kv();
        kv.zset_add("z", 1.0, "m").unwrap();
        kv.zset_remove("z", "m").unwrap();
        assert!(kv.zset_range_desc("z", 0, -1).is_empty());
    }

    // ── Scalars ─────────────────────────────────────────────────────

    #[test]
    fn test_scalar_set_get_delete() {
        let kv = test_kv();
        assert!(kv.get("k").is_none());
        kv.set("k", "v").unwrap();
        assert_eq!(kv.get("k"), Some("v".to_string()));
        kv.delete("k").unwrap();
        assert!(kv.get("k").is_none());
    }

    #[test]
    fn test_keys_pattern() {
        let kv = test_kv();
        kv.set("log:timestamp:1:a", "a").unwrap();
        kv.set("log:timestamp:2:b", "b").unwrap();
        kv.set("other", "c").unwrap();
        let mut found = kv.keys("log:timestamp:*");
        found.sort();
        assert_eq!(found, vec!["log:timestamp:1:a", "log:timestamp:2:b"]);
        assert_eq!(kv.keys("nomatch:*"), Vec::<String>::new());
    }

    // ── Expiry ──────────────────────────────────────────────────────

    #[test]
    fn test_expire_removes_key() {
        let kv = test_kv();
        kv.set("ttl", "v").unwrap();
        kv.expire("ttl", 0).unwrap();
        assert!(kv.get("ttl").is_none());
    }

    #[test]
    fn test_expire_future_keeps_key() {
        let kv = test_kv();
        kv.set("ttl", "v").unwrap();
        kv.expire("ttl", 3600).unwrap();
        assert_eq!(kv.get("ttl"), Some("v".to_string()));
    }

    #[test]
    fn test_ping() {
        let kv = test_kv();
        assert!(kv.ping());
        assert_eq!(kv.backend(), "memory");
    }
}
