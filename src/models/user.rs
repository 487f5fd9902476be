use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::{decode, encode, load_record, store_record};
use crate::security::auth::{generate_salt, generate_token, hash_password};

const USERS: &str = "users";

/// Fixed session lifetime: 7 days from creation, not sliding.
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

/// An admin user, keyed by email. The password is never stored, only a
/// per-user random salt and the salted PBKDF2-SHA512 digest.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub role: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn create(
        kv: &dyn Kv,
        email: &str,
        password: &str,
        display_name: &str,
        role: &str,
    ) -> Result<User, String> {
        let salt = generate_salt();
        let user = User {
            email: email.to_string(),
            password_hash: hash_password(password, &salt),
            salt,
            role: role.to_string(),
            display_name: display_name.to_string(),
            created_at: Utc::now(),
            last_login: None,
        };
        store_record(kv, USERS, &user.email, &user)?;
        Ok(user)
    }

    pub fn get_by_email(kv: &dyn Kv, email: &str) -> Option<User> {
        load_record(kv, USERS, email)
    }

    pub fn update_password(kv: &dyn Kv, email: &str, password: &str) -> Result<bool, String> {
        let mut user = match Self::get_by_email(kv, email) {
            Some(u) => u,
            None => return Ok(false),
        };
        user.salt = generate_salt();
        user.password_hash = hash_password(password, &user.salt);
        store_record(kv, USERS, &user.email, &user)?;
        Ok(true)
    }

    pub fn delete(kv: &dyn Kv, email: &str) -> Result<bool, String> {
        if Self::get_by_email(kv, email).is_none() {
            return Ok(false);
        }
        kv.hash_delete(USERS, &[email])?;
        Ok(true)
    }

    /// Verify credentials and mint a session token. Any failure (unknown
    /// email, wrong password, store trouble) is `None`; callers learn
    /// nothing about which part was wrong.
    pub fn authenticate(kv: &dyn Kv, email: &str, password: &str) -> Option<String> {
        let mut user = Self::get_by_email(kv, email)?;
        if hash_password(password, &user.salt) != user.password_hash {
            return None;
        }

        let token = generate_token();
        let record = SessionRecord {
            email: user.email.clone(),
            created_at: Utc::now(),
        };
        let key = session_key(&token);
        kv.set(&key, &encode(&record).ok()?).ok()?;
        let _ = kv.expire(&key, SESSION_TTL_SECS);

        user.last_login = Some(record.created_at);
        let _ = store_record(kv, USERS, &user.email, &user);

        Some(token)
    }

    /// Resolve token → email → user. The TTL is checked here as well as
    /// enforced by the key expiry, so it holds on backends without native
    /// expiry. Absent token and absent user both read as "not
    /// authenticated", never an error.
    pub fn validate_session(kv: &dyn Kv, token: &str) -> Option<User> {
        let key = session_key(token);
        let record: SessionRecord = decode(&kv.get(&key)?)?;
        if Utc::now() - record.created_at > Duration::seconds(SESSION_TTL_SECS) {
            let _ = kv.delete(&key);
            return None;
        }
        Self::get_by_email(kv, &record.email)
    }

    pub fn destroy_session(kv: &dyn Kv, token: &str) -> Result<(), String> {
        kv.delete(&session_key(token))
    }
}
