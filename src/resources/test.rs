use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Number, Value};

use crate::err::Error;
use crate::filter::{param, ParamKind, QueryParam};
use crate::ident::{by_id, decode_ref, decode_refs, StorageId};
use crate::models::TestData;
use crate::repo::{parse, Repository, Resource};
use crate::store::{Document, TESTS};
use crate::validate::{self, Schema, TEST_CREATE, TEST_START_TIME, TEST_UPDATE};

pub struct Tests;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTest {
    pub test_name: String,
    pub course_code: String,
    pub calculator: bool,
    pub test_length: Number,
    pub notes: String,
    pub students: Vec<String>,
    pub date: NaiveDate,
    pub period: Number,
    pub teacher_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTest {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: CreateTest,
    pub start_time: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStartTime {
    #[serde(rename = "_id")]
    pub id: String,
    pub start_time: Vec<String>,
}

fn record(fields: CreateTest, start_time: Option<Vec<String>>) -> Result<TestData, Error> {
    let students = decode_refs(&fields.students)?;
    let start_time = start_time.unwrap_or_else(|| vec![String::new(); students.len()]);
    Ok(TestData {
        test_name: fields.test_name,
        course_code: fields.course_code,
        calculator: fields.calculator,
        test_length: fields.test_length,
        notes: fields.notes,
        students,
        date: fields.date,
        period: fields.period,
        start_time,
        teacher_name: fields.teacher_name,
    })
}

impl Resource for Tests {
    const COLLECTION: &'static str = TESTS;
    const CREATE: &'static Schema = &TEST_CREATE;
    const UPDATE: &'static Schema = &TEST_UPDATE;
    const QUERY: &'static [QueryParam] = &[
        param("testName", ParamKind::Text),
        param("courseCode", ParamKind::Text),
        param("date", ParamKind::Text),
        param("period", ParamKind::Number),
        param("_id", ParamKind::Id),
    ];

    type Create = CreateTest;
    type Update = UpdateTest;
    type Record = TestData;

    fn from_create(payload: CreateTest) -> Result<TestData, Error> {
        record(payload, None)
    }

    fn from_update(payload: UpdateTest) -> Result<(StorageId, TestData), Error> {
        let id = decode_ref(&payload.id)?;
        Ok((id, record(payload.fields, Some(payload.start_time))?))
    }
}

impl Repository<Tests> {
    /// Replaces the whole start-time list of one test.
    pub async fn update_start_time(&self, mut payload: Value) -> Result<(), Error> {
        validate::validate(&TEST_START_TIME, &mut payload)?;
        let UpdateStartTime { id, start_time } = parse(payload)?;
        let id = decode_ref(&id)?;

        let mut fields = Document::new();
        fields.insert("startTime".to_string(), Value::from(start_time));
        let modified = self.store().update_one(TESTS, &by_id(id), fields).await?;
        if modified == 0 {
            log::debug!("start time update for unknown test {} ignored", id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, Filter, MemoryStore};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn repo() -> (Arc<MemoryStore>, Repository<Tests>) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), Repository::new(store))
    }

    fn payload(students: &[String]) -> Value {
        json!({
            "testName": "Kinematics",
            "courseCode": "SPH4U",
            "calculator": true,
            "testLength": 70,
            "notes": "formula sheet allowed",
            "students": students,
            "date": "2024-04-12",
            "period": 3,
            "teacherName": "Mr. Patel"
        })
    }

    #[tokio::test]
    async fn create_resolves_students_and_blanks_start_times() {
        let (store, repo) = repo();
        let s1 = StorageId::generate().to_string();
        let s2 = StorageId::generate().to_string();

        repo.create(payload(&[s1.clone(), s2.clone()])).await.unwrap();

        let docs = store.find(TESTS, &Filter::new()).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["students"], json!([s1, s2]));
        assert_eq!(docs[0]["startTime"], json!(["", ""]));
    }

    #[tokio::test]
    async fn create_with_bad_reference_stores_nothing() {
        let (store, repo) = repo();
        let err = repo.create(payload(&["s1".to_string()])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier { .. }));
        assert!(store.find(TESTS, &Filter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_missing_a_field_changes_nothing() {
        let (store, repo) = repo();
        let id = repo.create(payload(&[])).await.unwrap();

        let mut update = payload(&[]);
        update["_id"] = json!(id.to_string());
        update["testName"] = json!("Renamed");
        // startTime omitted
        let err = repo.update(update).await.unwrap_err();
        assert!(matches!(err, Error::ValidationError { .. }));

        let doc = store.find_one(TESTS, &by_id(id)).await.unwrap().unwrap();
        assert_eq!(doc["testName"], json!("Kinematics"));
    }

    #[tokio::test]
    async fn update_replaces_all_fields() {
        let (store, repo) = repo();
        let s1 = StorageId::generate().to_string();
        let id = repo.create(payload(&[s1.clone()])).await.unwrap();

        let mut update = payload(&[s1]);
        update["_id"] = json!(id.to_string());
        update["period"] = json!(4);
        update["startTime"] = json!(["10:15"]);
        repo.update(update).await.unwrap();

        let doc = store.find_one(TESTS, &by_id(id)).await.unwrap().unwrap();
        assert_eq!(doc["period"], json!(4));
        assert_eq!(doc["startTime"], json!(["10:15"]));
        assert_eq!(doc["_id"], json!(id.to_string()));
    }

    #[tokio::test]
    async fn start_time_update_touches_only_start_time() {
        let (store, repo) = repo();
        let s1 = StorageId::generate().to_string();
        let id = repo.create(payload(&[s1])).await.unwrap();

        repo.update_start_time(json!({ "_id": id.to_string(), "startTime": ["09:05"] }))
            .await
            .unwrap();
        let doc = store.find_one(TESTS, &by_id(id)).await.unwrap().unwrap();
        assert_eq!(doc["startTime"], json!(["09:05"]));
        assert_eq!(doc["testName"], json!("Kinematics"));

        let err = repo
            .update_start_time(json!({ "_id": id.to_string(), "startTime": "09:05" }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ValidationError { .. }));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (store, repo) = repo();
        let id = repo.create(payload(&[])).await.unwrap();
        let body = json!({ "_id": id.to_string() });

        repo.delete(body.clone()).await.unwrap();
        repo.delete(body).await.unwrap();
        assert!(store.find(TESTS, &Filter::new()).await.unwrap().is_empty());

        let err = repo.delete(json!({})).await.unwrap_err();
        assert!(matches!(err, Error::ValidationError { .. }));
    }

    #[tokio::test]
    async fn find_filters_and_encodes() {
        let (_, repo) = repo();
        repo.create(payload(&[])).await.unwrap();
        let mut other = payload(&[]);
        other["testName"] = json!("Optics");
        other["period"] = json!(1);
        repo.create(other).await.unwrap();

        let mut query = HashMap::new();
        query.insert("period".to_string(), "3".to_string());
        let found: Vec<Value> = repo.find(&query).await.unwrap().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["testName"], json!("Kinematics"));
        assert!(found[0]["id"].is_string());
        assert!(found[0].get("_id").is_none());

        let all: Vec<Value> = repo.find(&HashMap::new()).await.unwrap().collect();
        assert_eq!(all.len(), 2);
    }
}
