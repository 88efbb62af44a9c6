use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::err::Error;
use crate::ident::{StorageId, PRIMARY_KEY};
use crate::store::{matches, Document, DocumentStore, Filter};

/// Process-local store. Each collection is guarded by its map shard, so every
/// operation is atomic with respect to other operations on that collection.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn stamp(mut doc: Document) -> (StorageId, Document) {
    let id = StorageId::generate();
    doc.insert(PRIMARY_KEY.to_string(), Value::String(id.to_string()));
    (id, doc)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<StorageId, Error> {
        let (id, doc) = stamp(doc);
        self.collections.entry(collection.to_string()).or_default().push(doc);
        Ok(id)
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<StorageId>, Error> {
        let mut entry = self.collections.entry(collection.to_string()).or_default();
        let mut ids = Vec::with_capacity(docs.len());
        for doc in docs {
            let (id, doc) = stamp(doc);
            entry.push(doc);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, Error> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| matches(doc, filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, Error> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| matches(doc, filter)).cloned()))
    }

    async fn update_one(&self, collection: &str, filter: &Filter, fields: Document) -> Result<u64, Error> {
        let mut docs = match self.collections.get_mut(collection) {
            Some(docs) => docs,
            None => return Ok(0),
        };
        let target = match docs.iter_mut().find(|doc| matches(doc, filter)) {
            Some(doc) => doc,
            None => return Ok(0),
        };
        for (key, value) in fields {
            if key != PRIMARY_KEY {
                target.insert(key, value);
            }
        }
        Ok(1)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, Error> {
        let mut docs = match self.collections.get_mut(collection) {
            Some(docs) => docs,
            None => return Ok(0),
        };
        match docs.iter().position(|doc| matches(doc, filter)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, Error> {
        let mut docs = match self.collections.get_mut(collection) {
            Some(docs) => docs,
            None => return Ok(0),
        };
        let before = docs.len();
        docs.retain(|doc| !matches(doc, filter));
        Ok((before - docs.len()) as u64)
    }
}
