use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::err::Error;
use crate::ident::{StorageId, PRIMARY_KEY};
use crate::store::{Document, DocumentStore, Filter};

/// Documents live in one JSONB table keyed by collection; equality filters
/// are answered with JSONB containment (`@>`), which compares numbers by value.
#[derive(Clone)]
pub struct PgStore {
    pg: PgPool,
}

impl PgStore {
    pub fn new(pg: PgPool) -> Self {
        Self { pg }
    }

    pub async fn prepare(&self) -> Result<(), Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                seq BIGSERIAL PRIMARY KEY,
                collection TEXT NOT NULL,
                id UUID NOT NULL UNIQUE,
                body JSONB NOT NULL
            )",
        )
        .execute(&self.pg)
        .await
        .map_err(Error::from)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS documents_collection_idx ON documents (collection, seq)")
            .execute(&self.pg)
            .await
            .map_err(Error::from)?;
        Ok(())
    }
}

fn without_id(mut fields: Document) -> Document {
    fields.remove(PRIMARY_KEY);
    fields
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert_one(&self, collection: &str, mut doc: Document) -> Result<StorageId, Error> {
        let uuid = Uuid::new_v4();
        doc.insert(PRIMARY_KEY.to_string(), Value::String(uuid.to_string()));

        let res = sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(uuid)
            .bind(Json(doc))
            .execute(&self.pg)
            .await
            .map_err(Error::from)?;

        if res.rows_affected() < 1 {
            return Err(Error::InternalError {
                kind: "DatabaseError",
                message: "Could not save document to database!".to_string(),
            });
        }
        Ok(StorageId(uuid))
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<StorageId>, Error> {
        let mut ids = Vec::with_capacity(docs.len());
        for doc in docs {
            ids.push(self.insert_one(collection, doc).await?);
        }
        Ok(ids)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, Error> {
        let rows = sqlx::query_as::<_, (Json<Document>,)>(
            "SELECT body FROM documents WHERE collection = $1 AND body @> $2 ORDER BY seq",
        )
        .bind(collection)
        .bind(Json(filter))
        .fetch_all(&self.pg)
        .await
        .map_err(Error::from)?;

        Ok(rows.into_iter().map(|(Json(doc),)| doc).collect())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, Error> {
        let row = sqlx::query_as::<_, (Json<Document>,)>(
            "SELECT body FROM documents WHERE collection = $1 AND body @> $2 ORDER BY seq LIMIT 1",
        )
        .bind(collection)
        .bind(Json(filter))
        .fetch_optional(&self.pg)
        .await
        .map_err(Error::from)?;

        Ok(row.map(|(Json(doc),)| doc))
    }

    async fn update_one(&self, collection: &str, filter: &Filter, fields: Document) -> Result<u64, Error> {
        let affected = sqlx::query(
            "UPDATE documents SET body = body || $3 WHERE seq = (
                SELECT seq FROM documents WHERE collection = $1 AND body @> $2 ORDER BY seq LIMIT 1
            )",
        )
        .bind(collection)
        .bind(Json(filter))
        .bind(Json(without_id(fields)))
        .execute(&self.pg)
        .await
        .map_err(Error::from)?;

        Ok(affected.rows_affected())
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, Error> {
        let affected = sqlx::query(
            "DELETE FROM documents WHERE seq = (
                SELECT seq FROM documents WHERE collection = $1 AND body @> $2 ORDER BY seq LIMIT 1
            )",
        )
        .bind(collection)
        .bind(Json(filter))
        .execute(&self.pg)
        .await
        .map_err(Error::from)?;

        Ok(affected.rows_affected())
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, Error> {
        let affected = sqlx::query("DELETE FROM documents WHERE collection = $1 AND body @> $2")
            .bind(collection)
            .bind(Json(filter))
            .execute(&self.pg)
            .await
            .map_err(Error::from)?;

        Ok(affected.rows_affected())
    }
}
