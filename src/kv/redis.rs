use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use log::{error, warn};
use redis::{Commands, Connection};

use super::Kv;

/// Bound on the connectivity probe and on individual socket operations.
/// A down remote store must never hang a request handler.
const IO_TIMEOUT: Duration = Duration::from_secs(3);

/// Remote implementation of the `Kv` trait over a Redis-compatible service.
///
/// One client is constructed per process and shared by every repository. A
/// single connection is cached behind a mutex and re-established lazily; any
/// command error drops it so the next call reconnects. Per-operation failures
/// are logged and degraded (`None`, empty, `Err`); they never panic and
/// never hang past the socket timeout.
pub struct RedisKv {
    client: redis::Client,
    conn: Mutex<Option<Connection>>,
}

impl RedisKv {
    /// Construct from a connection URL (`redis://` or `rediss://`). Fails
    /// only on an unparseable URL; no network I/O happens here.
    pub fn connect(url: &str) -> Result<Self, String> {
        let client = redis::Client::open(url).map_err(|e| e.to_string())?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
        })
    }

    fn with_conn<T>(
        &self,
        op: &str,
        f: impl FnOnce(&mut Connection) -> redis::RedisResult<T>,
    ) -> Option<T> {
        let mut guard = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if guard.is_none() {
            match self.client.get_connection_with_timeout(IO_TIMEOUT) {
                Ok(conn) => {
                    let _ = conn.set_read_timeout(Some(IO_TIMEOUT));
                    let _ = conn.set_write_timeout(Some(IO_TIMEOUT));
                    *guard = Some(conn);
                }
                Err(e) => {
                    warn!("kv: connect failed ({}): {}", op, e);
                    return None;
                }
            }
        }

        let conn = guard.as_mut().unwrap();
        match f(conn) {
            Ok(value) => Some(value),
            Err(e) => {
                error!("kv: {} failed: {}", op, e);
                // Drop the cached connection; the next call reconnects.
                *guard = None;
                None
            }
        }
    }

    fn write<T>(
        &self,
        op: &str,
        f: impl FnOnce(&mut Connection) -> redis::RedisResult<T>,
    ) -> Result<(), String> {
        match self.with_conn(op, f) {
            Some(_) => Ok(()),
            None => Err(format!("key-value store unavailable ({})", op)),
        }
    }
}

impl Kv for RedisKv {
    fn backend(&self) -> &str {
        "redis"
    }

    fn ping(&self) -> bool {
        self.with_conn("ping", |conn| redis::cmd("PING").query::<String>(conn))
            .map(|reply| reply == "PONG")
            .unwrap_or(false)
    }

    // ── Hashes ──────────────────────────────────────────────────────

    fn hash_get(&self, key: &str, field: &str) -> Option<String> {
        self.with_conn("hget", |conn| conn.hget(key, field)).flatten()
    }

    fn hash_get_all(&self, key: &str) -> HashMap<String, String> {
        self.with_conn("hgetall", |conn| conn.hgetall(key))
            .unwrap_or_default()
    }

    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), String> {
        self.write("hset", |conn| conn.hset::<_, _, _, ()>(key, field, value))
    }

    fn hash_delete(&self, key: &str, fields: &[&str]) -> Result<(), String> {
        if fields.is_empty() {
            return Ok(());
        }
        self.write("hdel", |conn| conn.hdel::<_, _, ()>(key, fields.to_vec()))
    }

    // ── Sets ────────────────────────────────────────────────────────

    fn set_add(&self, key: &str, members: &[&str]) -> Result<(), String> {
        if members.is_empty() {
            return Ok(());
        }
        self.write("sadd", |conn| conn.sadd::<_, _, ()>(key, members.to_vec()))
    }

    fn set_remove(&self, key: &str, members: &[&str]) -> Result<(), String> {
        if members.is_empty() {
            return Ok(());
        }
        self.write("srem", |conn| conn.srem::<_, _, ()>(key, members.to_vec()))
    }

    fn set_members(&self, key: &str) -> Vec<String> {
        self.with_conn("smembers", |conn| conn.smembers(key))
            .unwrap_or_default()
    }

    fn set_contains(&self, key: &str, member: &str) -> bool {
        self.with_conn("sismember", |conn| conn.sismember(key, member))
            .unwrap_or(false)
    }

    // ── Sorted sets ─────────────────────────────────────────────────

    fn zset_add(&self, key: &str, score: f64, member: &str) -> Result<(), String> {
        self.write("zadd", |conn| conn.zadd::<_, _, _, ()>(key, member, score))
    }

    fn zset_remove(&self, key: &str, member: &str) -> Result<(), String> {
        self.write("zrem", |conn| conn.zrem::<_, _, ()>(key, member))
    }

    fn zset_range_desc(&self, key: &str, start: isize, stop: isize) -> Vec<String> {
        self.with_conn("zrevrange", |conn| conn.zrevrange(key, start, stop))
            .unwrap_or_default()
    }

    // ── Scalars ─────────────────────────────────────────────────────

    fn get(&self, key: &str) -> Option<String> {
        self.with_conn("get", |conn| conn.get(key)).flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.write("set", |conn| conn.set::<_, _, ()>(key, value))
    }

    fn delete(&self, key: &str) -> Result<(), String> {
        self.write("del", |conn| conn.del::<_, ()>(key))
    }

    fn keys(&self, pattern: &str) -> Vec<String> {
        self.with_conn("keys", |conn| conn.keys(pattern))
            .unwrap_or_default()
    }

    fn expire(&self, key: &str, seconds: i64) -> Result<(), String> {
        self.write("expire", |conn| conn.expire::<_, ()>(key, seconds))
    }
}
