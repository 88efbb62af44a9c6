//! Document store seam.
//!
//! Backends keep JSON documents in named collections, generate the primary
//! identifier on insert and answer top-level equality filters. `*_one`
//! operations act on the first match in storage order.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::err::Error;
use crate::ident::StorageId;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type Document = Map<String, Value>;
/// Top-level field equality constraints. Empty matches everything.
pub type Filter = Map<String, Value>;

pub const TESTS: &str = "tests";
pub const STUDENTS: &str = "students";
pub const COURSES: &str = "courses";
pub const OAUTH_STATES: &str = "oauthStates";
pub const SESSIONS: &str = "sessions";

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<StorageId, Error>;

    /// Inserts in order; a failure leaves the earlier documents in place.
    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<StorageId>, Error>;

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, Error>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, Error>;

    /// Sets every field of `fields` on the first match in a single write.
    /// Returns the number of documents modified (0 or 1).
    async fn update_one(&self, collection: &str, filter: &Filter, fields: Document) -> Result<u64, Error>;

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, Error>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, Error>;
}

/// Field values as stored: numbers compare by value, so `3` equals `3.0`.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

pub(crate) fn matches(doc: &Document, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(key, expected)| doc.get(key).map_or(false, |actual| values_equal(actual, expected)))
}
