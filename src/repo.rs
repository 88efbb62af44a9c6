//! One repository shape shared by Tests, Students and Courses.

use std::collections::HashMap;
use std::iter::Map;
use std::marker::PhantomData;
use std::sync::Arc;
use std::vec;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::err::Error;
use crate::filter::{filter_from_query, QueryParam};
use crate::ident::{by_id, decode_ref, encode_outbound, StorageId};
use crate::models::to_document;
use crate::store::{Document, DocumentStore};
use crate::validate::{self, Schema};

/// A collection of records with its request schemas and reference rules.
pub trait Resource: Send + Sync + 'static {
    const COLLECTION: &'static str;
    const CREATE: &'static Schema;
    const UPDATE: &'static Schema;
    const QUERY: &'static [QueryParam];

    type Create: DeserializeOwned + Send;
    type Update: DeserializeOwned + Send;
    type Record: Serialize + Send;

    /// Rewrites a raw payload before validation (field aliases and the like).
    fn normalize(payload: Value) -> Value {
        payload
    }

    /// Builds the record to insert, resolving embedded references.
    fn from_create(payload: Self::Create) -> Result<Self::Record, Error>;

    /// Builds the replacement record and the id it applies to.
    fn from_update(payload: Self::Update) -> Result<(StorageId, Self::Record), Error>;
}

/// Outbound records in storage order.
pub type Records = Map<vec::IntoIter<Document>, fn(Document) -> Value>;

pub struct Repository<R> {
    store: Arc<dyn DocumentStore>,
    _resource: PhantomData<R>,
}

#[derive(Deserialize)]
struct IdPayload {
    #[serde(rename = "_id")]
    id: String,
}

/// Deserializes an already-validated payload.
pub(crate) fn parse<T: DeserializeOwned>(payload: Value) -> Result<T, Error> {
    serde_json::from_value(payload).map_err(|err| Error::validation(err.to_string()))
}

impl<R: Resource> Repository<R> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _resource: PhantomData,
        }
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub async fn create(&self, payload: Value) -> Result<StorageId, Error> {
        let mut payload = R::normalize(payload);
        validate::validate(R::CREATE, &mut payload)?;
        let record = R::from_create(parse(payload)?)?;
        let id = self.store.insert_one(R::COLLECTION, to_document(&record)?).await?;
        log::debug!("created {} record {}", R::COLLECTION, id);
        Ok(id)
    }

    /// Removes at most one record. Unknown ids are not an error.
    pub async fn delete(&self, mut payload: Value) -> Result<(), Error> {
        validate::validate(&validate::ID_ONLY, &mut payload)?;
        let IdPayload { id } = parse(payload)?;
        let id = decode_ref(&id)?;
        let removed = self.store.delete_one(R::COLLECTION, &by_id(id)).await?;
        if removed == 0 {
            log::debug!("delete of unknown {} record {} ignored", R::COLLECTION, id);
        }
        Ok(())
    }

    /// Replaces every field of a record in one write. Unknown ids are not an error.
    pub async fn update(&self, payload: Value) -> Result<(), Error> {
        let mut payload = R::normalize(payload);
        validate::validate(R::UPDATE, &mut payload)?;
        let (id, record) = R::from_update(parse(payload)?)?;
        let modified = self
            .store
            .update_one(R::COLLECTION, &by_id(id), to_document(&record)?)
            .await?;
        if modified == 0 {
            log::debug!("update of unknown {} record {} ignored", R::COLLECTION, id);
        }
        Ok(())
    }

    /// Records matching every supplied query parameter, encoded as they are pulled.
    pub async fn find(&self, query: &HashMap<String, String>) -> Result<Records, Error> {
        let filter = filter_from_query(R::QUERY, query)?;
        let docs = self.store.find(R::COLLECTION, &filter).await?;
        Ok(docs.into_iter().map(encode_outbound as fn(Document) -> Value))
    }
}
