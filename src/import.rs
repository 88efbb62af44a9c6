//! Bulk upload of the student/course roster.
//!
//! The upload is a dataset reset: every Student, Test and Course is deleted
//! before the deduplicated roster is inserted. Nothing guards the window
//! between the reset and the inserts, so concurrent requests can observe an
//! empty or half-filled dataset, and a failed insert is not rolled back.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;

use crate::err::Error;
use crate::models::{to_document, CourseData, StudentData};
use crate::repo::parse;
use crate::store::{DocumentStore, Filter, COURSES, STUDENTS, TESTS};
use crate::validate::{validate, UPLOAD};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRow {
    pub student_name: String,
    pub email: String,
    pub course_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub array_students: Vec<UploadRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub students: usize,
    pub courses: usize,
}

pub async fn import(store: &dyn DocumentStore, mut payload: Value) -> Result<ImportSummary, Error> {
    validate(&UPLOAD, &mut payload)?;
    let Upload { array_students: rows } = parse(payload)?;

    let everything = Filter::new();
    let mut removed = 0;
    for collection in [STUDENTS, TESTS, COURSES] {
        removed += store
            .delete_many(collection, &everything)
            .await
            .map_err(|err| partial("reset", err))?;
    }
    log::info!("upload reset the dataset ({} records removed)", removed);

    let students: BTreeSet<(&str, &str)> = rows
        .iter()
        .map(|row| (row.student_name.as_str(), row.email.as_str()))
        .collect();
    let student_docs = students
        .iter()
        .map(|(name, email)| {
            to_document(&StudentData {
                name: name.to_string(),
                email: email.to_string(),
                extra_time: 0.into(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    store
        .insert_many(STUDENTS, student_docs)
        .await
        .map_err(|err| partial("students", err))?;

    let courses: BTreeSet<&str> = rows.iter().map(|row| row.course_name.as_str()).collect();
    let course_docs = courses
        .iter()
        .map(|name| {
            to_document(&CourseData {
                course_name: name.to_string(),
                students: Vec::new(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    store
        .insert_many(COURSES, course_docs)
        .await
        .map_err(|err| partial("courses", err))?;

    let summary = ImportSummary {
        students: students.len(),
        courses: courses.len(),
    };
    log::info!(
        "upload inserted {} students and {} courses from {} rows",
        summary.students,
        summary.courses,
        rows.len()
    );
    Ok(summary)
}

fn partial(stage: &'static str, err: Error) -> Error {
    log::error!("upload failed during {} after the dataset reset: {:?}", stage, err);
    Error::StoragePartialFailure {
        stage,
        message: format!("{:?}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::StorageId;
    use crate::store::{Document, MemoryStore};
    use async_trait::async_trait;
    use serde_json::json;

    fn rows() -> Value {
        json!({ "arrayStudents": [
            { "studentName": "A", "email": "a@x.com", "courseName": "Math" },
            { "studentName": "A", "email": "a@x.com", "courseName": "Bio" }
        ]})
    }

    async fn names(store: &MemoryStore, collection: &str, key: &str) -> Vec<Value> {
        store
            .find(collection, &Filter::new())
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc[key].clone())
            .collect()
    }

    #[tokio::test]
    async fn duplicate_rows_collapse() {
        let store = MemoryStore::new();
        let summary = import(&store, rows()).await.unwrap();
        assert_eq!(summary, ImportSummary { students: 1, courses: 2 });

        let students = store.find(STUDENTS, &Filter::new()).await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0]["name"], json!("A"));
        assert_eq!(students[0]["extraTime"], json!(0));

        let courses = store.find(COURSES, &Filter::new()).await.unwrap();
        assert_eq!(courses.len(), 2);
        for course in &courses {
            assert_eq!(course["students"], json!([]));
        }
        let mut course_names = names(&store, COURSES, "courseName").await;
        course_names.sort_by_key(|v| v.to_string());
        assert_eq!(course_names, vec![json!("Bio"), json!("Math")]);
    }

    #[tokio::test]
    async fn rerun_is_idempotent_and_drops_tests() {
        let store = MemoryStore::new();
        import(&store, rows()).await.unwrap();
        let first_students = names(&store, STUDENTS, "name").await;

        let mut test = Document::new();
        test.insert("testName".into(), json!("Quiz"));
        store.insert_one(TESTS, test).await.unwrap();

        import(&store, rows()).await.unwrap();
        assert_eq!(names(&store, STUDENTS, "name").await, first_students);
        assert_eq!(store.find(COURSES, &Filter::new()).await.unwrap().len(), 2);
        assert!(store.find(TESTS, &Filter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_row_leaves_dataset_untouched() {
        let store = MemoryStore::new();
        import(&store, rows()).await.unwrap();

        let bad = json!({ "arrayStudents": [
            { "studentName": "B", "email": "b@x.com", "courseName": "Art" },
            { "studentName": "C", "courseName": "Art" }
        ]});
        assert!(matches!(import(&store, bad).await, Err(Error::ValidationError { .. })));
        assert_eq!(names(&store, STUDENTS, "name").await, vec![json!("A")]);
    }

    #[tokio::test]
    async fn same_name_different_email_are_distinct() {
        let store = MemoryStore::new();
        import(
            &store,
            json!({ "arrayStudents": [
                { "studentName": "A", "email": "a@x.com", "courseName": "Math" },
                { "studentName": "A", "email": "a2@x.com", "courseName": "Math" }
            ]}),
        )
        .await
        .unwrap();
        assert_eq!(store.find(STUDENTS, &Filter::new()).await.unwrap().len(), 2);
    }

    /// Accepts everything except course inserts.
    struct CoursesDown(MemoryStore);

    #[async_trait]
    impl DocumentStore for CoursesDown {
        async fn insert_one(&self, c: &str, doc: Document) -> Result<StorageId, Error> {
            self.0.insert_one(c, doc).await
        }
        async fn insert_many(&self, c: &str, docs: Vec<Document>) -> Result<Vec<StorageId>, Error> {
            if c == COURSES {
                return Err(Error::StorageUnavailable { message: "connection reset".into() });
            }
            self.0.insert_many(c, docs).await
        }
        async fn find(&self, c: &str, f: &Filter) -> Result<Vec<Document>, Error> {
            self.0.find(c, f).await
        }
        async fn find_one(&self, c: &str, f: &Filter) -> Result<Option<Document>, Error> {
            self.0.find_one(c, f).await
        }
        async fn update_one(&self, c: &str, f: &Filter, d: Document) -> Result<u64, Error> {
            self.0.update_one(c, f, d).await
        }
        async fn delete_one(&self, c: &str, f: &Filter) -> Result<u64, Error> {
            self.0.delete_one(c, f).await
        }
        async fn delete_many(&self, c: &str, f: &Filter) -> Result<u64, Error> {
            self.0.delete_many(c, f).await
        }
    }

    #[tokio::test]
    async fn failed_course_batch_is_not_rolled_back() {
        let store = CoursesDown(MemoryStore::new());
        let err = import(&store, rows()).await.unwrap_err();
        assert!(matches!(err, Error::StoragePartialFailure { stage: "courses", .. }));

        assert_eq!(store.find(STUDENTS, &Filter::new()).await.unwrap().len(), 1);
        assert!(store.find(COURSES, &Filter::new()).await.unwrap().is_empty());
    }
}
