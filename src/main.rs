#[macro_use]
extern crate rocket;

use std::sync::Arc;

use rocket::serde::json::Json;
use serde_json::Value;

mod backup;
mod boot;
mod kv;
mod logging;
mod models;
mod routes;
mod security;

#[cfg(test)]
mod tests;

use kv::Kv;
use logging::LogStore;

#[catch(404)]
fn not_found() -> Json<Value> {
    Json(serde_json::json!({ "ok": false, "error": "not found" }))
}

#[catch(401)]
fn unauthorized() -> Json<Value> {
    Json(serde_json::json!({ "ok": false, "error": "not authenticated" }))
}

#[catch(403)]
fn forbidden() -> Json<Value> {
    Json(serde_json::json!({ "ok": false, "error": "forbidden" }))
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    let kv: Arc<dyn Kv> = boot::init_store();
    boot::run(kv.as_ref());

    let logs = LogStore::new(kv.clone());

    rocket::build()
        .manage(kv)
        .manage(logs)
        .mount("/api", routes::api::routes())
        .register("/", catchers![not_found, unauthorized, forbidden])
}
