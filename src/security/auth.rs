use std::sync::Arc;

use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use sha2::Sha512;

use crate::kv::Kv;
use crate::models::user::User;

const SESSION_COOKIE: &str = "atelier_session";

/// PBKDF2-HMAC-SHA512 parameters. 64-byte output, hex-encoded to a fixed
/// 128-character digest.
const PBKDF2_ROUNDS: u32 = 100_000;

// ── Password utilities ──

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut out = [0u8; 64];
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut out);
    hex::encode(out)
}

pub fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

// ── Authenticated admin guard ──

/// Guard: a valid session belonging to an admin user. The token comes from
/// the `Authorization: Bearer` header or the session cookie.
pub struct AdminUser {
    pub user: User,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_session_user(request).await {
            Some(user) if user.role == "admin" => Outcome::Success(AdminUser { user }),
            Some(_) => Outcome::Forward(Status::Forbidden),
            None => Outcome::Forward(Status::Unauthorized),
        }
    }
}

/// Guard: the raw session token from the request, wherever it came from.
/// Used by logout, which needs the token itself, not the resolved user.
pub struct SessionToken(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionToken {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request_token(request) {
            Some(token) => Outcome::Success(SessionToken(token)),
            None => Outcome::Forward(Status::Unauthorized),
        }
    }
}

async fn resolve_session_user(request: &Request<'_>) -> Option<User> {
    let kv = request.guard::<&State<Arc<dyn Kv>>>().await.succeeded()?;
    let token = request_token(request)?;
    User::validate_session(kv.inner().as_ref(), &token)
}

fn request_token(request: &Request<'_>) -> Option<String> {
    bearer_token(request).or_else(|| {
        request
            .cookies()
            .get_private(SESSION_COOKIE)
            .map(|c| c.value().to_string())
    })
}

fn bearer_token(request: &Request<'_>) -> Option<String> {
    request
        .headers()
        .get_one("Authorization")?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn session_cookie_name() -> &'static str {
    SESSION_COOKIE
}
