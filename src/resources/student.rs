use serde::Deserialize;
use serde_json::{Number, Value};

use crate::err::Error;
use crate::filter::{param, ParamKind, QueryParam};
use crate::ident::{decode_ref, StorageId};
use crate::models::StudentData;
use crate::repo::{parse, Repository, Resource};
use crate::store::{Document, Filter, STUDENTS};
use crate::validate::{self, Schema, EXTRA_TIME_BATCH, STUDENT_CREATE, STUDENT_UPDATE};

pub struct Students;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudent {
    pub name: String,
    pub email: String,
    pub extra_time: Number,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStudent {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: CreateStudent,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraTimeRow {
    pub student_name: String,
    pub extra_time: Number,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraTimeBatch {
    pub array_students: Vec<ExtraTimeRow>,
}

impl Resource for Students {
    const COLLECTION: &'static str = STUDENTS;
    const CREATE: &'static Schema = &STUDENT_CREATE;
    const UPDATE: &'static Schema = &STUDENT_UPDATE;
    const QUERY: &'static [QueryParam] = &[
        param("name", ParamKind::Text),
        param("email", ParamKind::Text),
        param("extraTime", ParamKind::Number),
        param("_id", ParamKind::Id),
    ];

    type Create = CreateStudent;
    type Update = UpdateStudent;
    type Record = StudentData;

    /// Older clients send `studentName`; stored records use `name`.
    fn normalize(mut payload: Value) -> Value {
        if let Some(object) = payload.as_object_mut() {
            if !object.contains_key("name") {
                if let Some(name) = object.remove("studentName") {
                    object.insert("name".to_string(), name);
                }
            }
        }
        payload
    }

    fn from_create(payload: CreateStudent) -> Result<StudentData, Error> {
        Ok(StudentData {
            name: payload.name,
            email: payload.email,
            extra_time: payload.extra_time,
        })
    }

    fn from_update(payload: UpdateStudent) -> Result<(StorageId, StudentData), Error> {
        let id = decode_ref(&payload.id)?;
        Ok((id, Self::from_create(payload.fields)?))
    }
}

impl Repository<Students> {
    /// Sets extra time on the first student whose name matches each row.
    /// The whole batch is validated before anything is written.
    pub async fn update_extra_time(&self, mut payload: Value) -> Result<(), Error> {
        validate::validate(&EXTRA_TIME_BATCH, &mut payload)?;
        let ExtraTimeBatch { array_students } = parse(payload)?;

        for row in array_students {
            let mut filter = Filter::new();
            filter.insert("name".to_string(), Value::String(row.student_name));
            let mut fields = Document::new();
            fields.insert("extraTime".to_string(), Value::Number(row.extra_time));

            if self.store().update_one(STUDENTS, &filter, fields).await? == 0 {
                log::debug!("extra time for unknown student {:?} ignored", filter["name"]);
            }
        }
        Ok(())
    }
}
