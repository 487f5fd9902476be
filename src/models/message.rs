use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::{generate_id, load_family, load_record, store_record};

const MESSAGES: &str = "messages";

/// A contact-form message. No secondary indexes; the inbox is small and
/// sorted by timestamp at read time.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
    pub read: bool,
    pub replied: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub body: String,
}

impl ContactMessage {
    pub fn create(kv: &dyn Kv, form: &MessageForm) -> Result<ContactMessage, String> {
        let message = ContactMessage {
            id: generate_id("msg"),
            name: form.name.clone(),
            email: form.email.clone(),
            subject: form.subject.clone().unwrap_or_default(),
            body: form.body.clone(),
            read: false,
            replied: false,
            timestamp: Utc::now(),
        };
        store_record(kv, MESSAGES, &message.id, &message)?;
        Ok(message)
    }

    pub fn get_by_id(kv: &dyn Kv, id: &str) -> Option<ContactMessage> {
        load_record(kv, MESSAGES, id)
    }

    /// Newest first; `unread_only` narrows to unread.
    pub fn get_all(kv: &dyn Kv, unread_only: bool) -> Vec<ContactMessage> {
        let mut messages = load_family::<ContactMessage>(kv, MESSAGES);
        if unread_only {
            messages.retain(|m| !m.read);
        }
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        messages
    }

    pub fn mark_read(kv: &dyn Kv, id: &str) -> Result<Option<ContactMessage>, String> {
        Self::set_flags(kv, id, Some(true), None)
    }

    pub fn mark_replied(kv: &dyn Kv, id: &str) -> Result<Option<ContactMessage>, String> {
        // Replying implies the message was read
        Self::set_flags(kv, id, Some(true), Some(true))
    }

    fn set_flags(
        kv: &dyn Kv,
        id: &str,
        read: Option<bool>,
        replied: Option<bool>,
    ) -> Result<Option<ContactMessage>, String> {
        let mut message = match Self::get_by_id(kv, id) {
            Some(m) => m,
            None => return Ok(None),
        };
        if let Some(read) = read {
            message.read = read;
        }
        if let Some(replied) = replied {
            message.replied = replied;
        }
        store_record(kv, MESSAGES, &message.id, &message)?;
        Ok(Some(message))
    }

    pub fn delete(kv: &dyn Kv, id: &str) -> Result<bool, String> {
        if Self::get_by_id(kv, id).is_none() {
            return Ok(false);
        }
        kv.hash_delete(MESSAGES, &[id])?;
        Ok(true)
    }
}
