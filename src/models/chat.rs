use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::Kv;
use crate::models::{decode, encode, generate_id, load_family, load_record, store_record};

const SESSIONS: &str = "chats";

fn messages_key(session_id: &str) -> String {
    format!("chat:messages:{}", session_id)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Chatbot session metadata. The transcript is NOT inlined; messages live
/// in a sibling hash keyed by session id and are merged in (sorted by
/// timestamp ascending) when the session is read.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub visitor: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn create(kv: &dyn Kv, visitor: &str) -> Result<ChatSession, String> {
        let now = Utc::now();
        let session = ChatSession {
            id: generate_id("chat"),
            visitor: visitor.to_string(),
            created_at: now,
            updated_at: now,
            messages: vec![],
        };
        store_record(kv, SESSIONS, &session.id, &session)?;
        Ok(session)
    }

    /// Session with its transcript merged in, oldest message first.
    pub fn get_by_id(kv: &dyn Kv, id: &str) -> Option<ChatSession> {
        let mut session: ChatSession = load_record(kv, SESSIONS, id)?;
        let mut messages: Vec<ChatMessage> = kv
            .hash_get_all(&messages_key(id))
            .values()
            .filter_map(|raw| decode(raw))
            .collect();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        session.messages = messages;
        Some(session)
    }

    /// Session metadata only, newest activity first. Transcripts are not
    /// loaded here; a listing should not pull every message hash.
    pub fn get_all(kv: &dyn Kv) -> Vec<ChatSession> {
        let mut sessions = load_family::<ChatSession>(kv, SESSIONS);
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }

    pub fn append_message(
        kv: &dyn Kv,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<Option<ChatMessage>, String> {
        let mut session: ChatSession = match load_record(kv, SESSIONS, session_id) {
            Some(s) => s,
            None => return Ok(None),
        };

        let message = ChatMessage {
            id: generate_id("chatmsg"),
            role: role.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        kv.hash_set(&messages_key(session_id), &message.id, &encode(&message)?)?;

        session.updated_at = message.timestamp;
        store_record(kv, SESSIONS, &session.id, &session)?;

        Ok(Some(message))
    }

    /// Deletes the session record and its entire message hash.
    pub fn delete(kv: &dyn Kv, id: &str) -> Result<bool, String> {
        if load_record::<ChatSession>(kv, SESSIONS, id).is_none() {
            return Ok(false);
        }
        kv.delete(&messages_key(id))?;
        kv.hash_delete(SESSIONS, &[id])?;
        Ok(true)
    }
}
