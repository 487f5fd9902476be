use std::sync::Arc;

use rocket::http::{Cookie, CookieJar, Header};
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::Value;

use crate::backup::{create_backup, restore_backup};
use crate::kv::Kv;
use crate::logging::{LogFilter, LogStore};
use crate::models::backup::Backup;
use crate::models::user::User;
use crate::security::auth::{session_cookie_name, AdminUser, SessionToken};

pub fn routes() -> Vec<rocket::Route> {
    routes![
        health,
        login,
        logout,
        ingest_log,
        list_logs,
        clear_logs,
        list_backups,
        new_backup,
        restore,
        remove_backup,
        download_backup,
    ]
}

// ── Health ────────────────────────────────────────────

#[get("/health")]
pub fn health(kv: &State<Arc<dyn Kv>>) -> Json<Value> {
    let families = [
        "posts",
        "projects",
        "skills",
        "media",
        "templates",
        "achievements",
        "messages",
        "chats",
        "backups",
    ];
    let counts: Value = families
        .iter()
        .map(|f| ((*f).to_string(), Value::from(kv.hash_get_all(f).len())))
        .collect::<serde_json::Map<String, Value>>()
        .into();

    Json(serde_json::json!({
        "backend": kv.backend(),
        "ping": kv.ping(),
        "counts": counts,
    }))
}

// ── Auth ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[post("/auth/login", data = "<body>")]
pub fn login(
    kv: &State<Arc<dyn Kv>>,
    logs: &State<LogStore>,
    cookies: &CookieJar<'_>,
    body: Json<LoginBody>,
) -> Json<Value> {
    match User::authenticate(kv.inner().as_ref(), &body.email, &body.password) {
        Some(token) => {
            let mut cookie = Cookie::new(session_cookie_name(), token.clone());
            cookie.set_http_only(true);
            cookie.set_same_site(rocket::http::SameSite::Strict);
            cookie.set_path("/");
            cookies.add_private(cookie);

            logs.log_full("info", "Admin login", "auth", Some(&body.email), None);
            Json(serde_json::json!({ "ok": true, "token": token }))
        }
        // One answer for every failure mode; no hints about which part was wrong
        None => Json(serde_json::json!({ "ok": false, "error": "invalid credentials" })),
    }
}

#[post("/auth/logout")]
pub fn logout(
    kv: &State<Arc<dyn Kv>>,
    cookies: &CookieJar<'_>,
    token: SessionToken,
) -> Json<Value> {
    let _ = User::destroy_session(kv.inner().as_ref(), &token.0);
    cookies.remove_private(Cookie::from(session_cookie_name()));
    Json(serde_json::json!({ "ok": true }))
}

// ── Logs ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LogBody {
    pub level: String,
    pub message: String,
    pub source: String,
    pub user_email: Option<String>,
}

/// Fire-and-forget ingestion. Always acknowledges; a logging call must
/// never surface a failure to the caller.
#[post("/logs", data = "<body>")]
pub fn ingest_log(logs: &State<LogStore>, body: Json<LogBody>) -> Json<Value> {
    let entry = logs.log_full(
        &body.level,
        &body.message,
        &body.source,
        body.user_email.as_deref(),
        None,
    );
    Json(serde_json::json!({ "ok": true, "id": entry.id }))
}

#[get("/logs?<level>&<source>&<search>&<window>")]
pub fn list_logs(
    _admin: AdminUser,
    logs: &State<LogStore>,
    level: Option<String>,
    source: Option<String>,
    search: Option<String>,
    window: Option<String>,
) -> Json<Value> {
    let entries = logs.get_logs(&LogFilter {
        level,
        source,
        search,
        window,
    });
    Json(serde_json::json!({ "ok": true, "logs": entries }))
}

/// Privileged wipe. The action is logged before it executes, so the
/// audit entry goes down with everything else.
#[post("/logs/clear")]
pub fn clear_logs(admin: AdminUser, logs: &State<LogStore>) -> Json<Value> {
    logs.log_full(
        "warning",
        "Clearing all logs",
        "admin",
        Some(&admin.user.email),
        None,
    );
    let ok = logs.clear();
    Json(serde_json::json!({ "ok": ok }))
}

// ── Backups ───────────────────────────────────────────

#[get("/backups")]
pub fn list_backups(_admin: AdminUser, kv: &State<Arc<dyn Kv>>) -> Json<Value> {
    let backups = Backup::get_all(kv.inner().as_ref());
    Json(serde_json::json!({ "ok": true, "backups": backups }))
}

#[derive(Debug, Deserialize)]
pub struct BackupBody {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
}

#[post("/backups", data = "<body>")]
pub fn new_backup(
    admin: AdminUser,
    kv: &State<Arc<dyn Kv>>,
    logs: &State<LogStore>,
    body: Json<BackupBody>,
) -> Json<Value> {
    let mut backup = create_backup(
        kv.inner().as_ref(),
        &body.name,
        body.kind.as_deref().unwrap_or("full"),
        body.description.as_deref().unwrap_or(""),
    );

    let level = if backup.status == "completed" { "success" } else { "error" };
    logs.log_full(
        level,
        &format!("Backup '{}' {}", backup.name, backup.status),
        "backup",
        Some(&admin.user.email),
        None,
    );

    backup.data = None;
    Json(serde_json::json!({ "ok": backup.status == "completed", "backup": backup }))
}

#[post("/backups/<id>/restore")]
pub fn restore(
    admin: AdminUser,
    kv: &State<Arc<dyn Kv>>,
    logs: &State<LogStore>,
    id: &str,
) -> Json<Value> {
    match restore_backup(kv.inner().as_ref(), id) {
        Ok(true) => {
            logs.log_full(
                "warning",
                &format!("Restored backup {}", id),
                "backup",
                Some(&admin.user.email),
                None,
            );
            Json(serde_json::json!({ "ok": true }))
        }
        Ok(false) => Json(serde_json::json!({ "ok": false, "error": "backup not restorable" })),
        Err(e) => Json(serde_json::json!({ "ok": false, "error": e })),
    }
}

#[delete("/backups/<id>")]
pub fn remove_backup(
    admin: AdminUser,
    kv: &State<Arc<dyn Kv>>,
    logs: &State<LogStore>,
    id: &str,
) -> Json<Value> {
    match Backup::delete(kv.inner().as_ref(), id) {
        Ok(true) => {
            logs.log_full(
                "info",
                &format!("Deleted backup {}", id),
                "backup",
                Some(&admin.user.email),
                None,
            );
            Json(serde_json::json!({ "ok": true }))
        }
        Ok(false) => Json(serde_json::json!({ "ok": false, "error": "backup not found" })),
        Err(e) => Json(serde_json::json!({ "ok": false, "error": e })),
    }
}

/// The serialized blob as a downloadable JSON document.
#[derive(Responder)]
#[response(content_type = "json")]
pub struct BackupDownload {
    blob: String,
    disposition: Header<'static>,
}

#[get("/backups/<id>/download")]
pub fn download_backup(
    _admin: AdminUser,
    kv: &State<Arc<dyn Kv>>,
    id: &str,
) -> Option<BackupDownload> {
    let backup = Backup::get_by_id(kv.inner().as_ref(), id)?;
    if backup.status != "completed" {
        return None;
    }
    let blob = backup.data?;
    Some(BackupDownload {
        blob,
        disposition: Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"backup-{}.json\"", id),
        ),
    })
}
