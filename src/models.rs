use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use uuid::Uuid;

use crate::err::Error;
use crate::ident::StudentRef;
use crate::store::Document;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestData {
    pub test_name: String,
    pub course_code: String,
    pub calculator: bool,
    pub test_length: Number,
    pub notes: String,
    pub students: Vec<StudentRef>,
    pub date: NaiveDate,
    pub period: Number,
    /// One slot per entry of `students`.
    pub start_time: Vec<String>,
    pub teacher_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentData {
    pub name: String,
    pub email: String,
    pub extra_time: Number,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseData {
    pub course_name: String,
    pub students: Vec<StudentRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateStatus {
    Pending,
    Used,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthState {
    pub state: Uuid,
    pub status: StateStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSession {
    pub session: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Serializes a record into the document shape the store keeps.
pub fn to_document<T: Serialize>(record: &T) -> Result<Document, Error> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(doc) => Ok(doc),
        other => Err(Error::InternalError {
            kind: "SerializationError",
            message: format!("record serialized to a non-object: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::StorageId;
    use serde_json::json;

    #[test]
    fn test_records_use_wire_field_names() {
        let s = StorageId::generate();
        let doc = to_document(&TestData {
            test_name: "Quiz".into(),
            course_code: "SPH3U".into(),
            calculator: false,
            test_length: 30.into(),
            notes: "".into(),
            students: vec![s],
            date: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            period: 1.into(),
            start_time: vec!["".into()],
            teacher_name: "Mr. K".into(),
        })
        .unwrap();

        assert_eq!(doc["testName"], json!("Quiz"));
        assert_eq!(doc["testLength"], json!(30));
        assert_eq!(doc["date"], json!("2024-02-29"));
        assert_eq!(doc["students"], json!([s.to_string()]));
        assert_eq!(doc["startTime"], json!([""]));
    }

    #[test]
    fn statuses_and_roles_are_lowercase() {
        assert_eq!(serde_json::to_value(StateStatus::Pending).unwrap(), json!("pending"));
        assert_eq!(serde_json::to_value(Role::Teacher).unwrap(), json!("teacher"));
    }
}
