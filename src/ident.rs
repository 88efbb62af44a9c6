//! Conversion of entity identifiers between the wire and the store.
//!
//! Requests carry identifiers as opaque strings. Stored documents carry the
//! store-generated [`StorageId`] under [`PRIMARY_KEY`]. Nothing reaches a
//! storage lookup without going through [`decode_ref`], and nothing leaves
//! a repository without going through [`encode_outbound`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::err::Error;
use crate::store::{Document, Filter};

/// Field holding the storage identifier inside a stored document.
pub const PRIMARY_KEY: &str = "_id";
/// Field holding the identifier in records sent to clients.
pub const PUBLIC_KEY: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(pub Uuid);

/// A Test or Course pointing at a Student.
pub type StudentRef = StorageId;

impl StorageId {
    pub fn generate() -> Self {
        StorageId(Uuid::new_v4())
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

/// Parses a wire string into a storage identifier.
pub fn decode_ref(wire: &str) -> Result<StorageId, Error> {
    if wire.is_empty() {
        return Err(Error::InvalidIdentifier {
            message: "identifier was empty".to_string(),
        });
    }
    let uuid = Uuid::parse_str(wire).map_err(|err| Error::InvalidIdentifier {
        message: format!("`{}` is not a valid identifier: {}", wire, err),
    })?;
    Ok(StorageId(uuid))
}

/// Decodes every reference or none of them.
pub fn decode_refs<S: AsRef<str>>(wires: &[S]) -> Result<Vec<StorageId>, Error> {
    wires.iter().map(|wire| decode_ref(wire.as_ref())).collect()
}

/// Renames the storage identifier to the public `id` string field.
pub fn encode_outbound(mut doc: Document) -> Value {
    if let Some(old_id) = doc.remove(PRIMARY_KEY) {
        let id = match old_id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        doc.insert(PUBLIC_KEY.to_string(), Value::String(id));
    }
    Value::Object(doc)
}

/// Equality filter selecting exactly one record by identifier.
pub fn by_id(id: StorageId) -> Filter {
    let mut filter = Filter::new();
    filter.insert(PRIMARY_KEY.to_string(), Value::String(id.to_string()));
    filter
}
