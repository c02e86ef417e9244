//! Request translation for a CRUD front end.
//!
//! Protocol-agnostic: each helper runs the store calls for one request and
//! returns a [`StoreResponse`] that a transport (HTTP or otherwise) maps onto
//! its own status codes. Mutating helpers commit after a successful change.

use crate::Store;
use litekv_core::Value;
use serde_json::json;

/// Outcome of a façade request
#[derive(Debug, Clone, PartialEq)]
pub enum StoreResponse {
    /// Request succeeded; body to send back
    Ok(Value),
    /// Key does not exist
    NotFound {
        /// The requested key
        key: String,
    },
    /// Store is gated after a failed load
    Unavailable,
    /// Change applied in memory but the commit failed
    Failed(String),
}

impl StoreResponse {
    /// HTTP-style status code for this response
    pub fn status_code(&self) -> u16 {
        match self {
            StoreResponse::Ok(_) => 200,
            StoreResponse::NotFound { .. } => 404,
            StoreResponse::Unavailable => 503,
            StoreResponse::Failed(_) => 500,
        }
    }

    /// Response body
    pub fn body(&self) -> Value {
        match self {
            StoreResponse::Ok(body) => body.clone(),
            StoreResponse::NotFound { key } => json!({"detail": "Key not found", "key": key}),
            StoreResponse::Unavailable => json!({"detail": "Store unavailable"}),
            StoreResponse::Failed(msg) => json!({"detail": msg}),
        }
    }
}

/// Health/landing response
pub fn home(store: &Store) -> StoreResponse {
    if !store.is_usable() {
        return StoreResponse::Unavailable;
    }
    StoreResponse::Ok(json!({"message": "LiteKV store is running"}))
}

/// Fetch one key
pub fn get_item(store: &Store, key: &str) -> StoreResponse {
    if !store.is_usable() {
        return StoreResponse::Unavailable;
    }
    match store.get(key) {
        Some(value) => StoreResponse::Ok(json!({"key": key, "value": value})),
        None => StoreResponse::NotFound { key: key.to_string() },
    }
}

/// Set one key and commit
pub fn set_item(store: &mut Store, key: &str, value: Value) -> StoreResponse {
    if !store.is_usable() {
        return StoreResponse::Unavailable;
    }
    if !store.set(key, value.clone()) {
        return StoreResponse::Failed(last_error_text(store, "key rejected"));
    }
    if !store.save() {
        return StoreResponse::Failed(last_error_text(store, "failed to save"));
    }
    StoreResponse::Ok(json!({"message": "Data saved", "key": key, "value": value}))
}

/// Delete one key and commit
pub fn delete_item(store: &mut Store, key: &str) -> StoreResponse {
    if !store.is_usable() {
        return StoreResponse::Unavailable;
    }
    if !store.remove(key) {
        return StoreResponse::NotFound { key: key.to_string() };
    }
    if !store.save() {
        return StoreResponse::Failed(last_error_text(store, "failed to save"));
    }
    StoreResponse::Ok(json!({"message": "Key deleted", "key": key}))
}

/// List every key
pub fn list_keys(store: &Store) -> StoreResponse {
    if !store.is_usable() {
        return StoreResponse::Unavailable;
    }
    StoreResponse::Ok(json!({"keys": store.all()}))
}

fn last_error_text(store: &Store, fallback: &str) -> String {
    store
        .last_error()
        .map(|e| e.to_string())
        .unwrap_or_else(|| fallback.to_string())
}
