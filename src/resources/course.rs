use serde::Deserialize;

use crate::err::Error;
use crate::filter::{param, ParamKind, QueryParam};
use crate::ident::{decode_ref, decode_refs, StorageId};
use crate::models::CourseData;
use crate::repo::Resource;
use crate::store::COURSES;
use crate::validate::{Schema, COURSE_CREATE, COURSE_UPDATE};

pub struct Courses;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourse {
    pub course_name: String,
    pub students: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCourse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: CreateCourse,
}

impl Resource for Courses {
    const COLLECTION: &'static str = COURSES;
    const CREATE: &'static Schema = &COURSE_CREATE;
    const UPDATE: &'static Schema = &COURSE_UPDATE;
    const QUERY: &'static [QueryParam] = &[
        param("courseName", ParamKind::Text),
        param("_id", ParamKind::Id),
    ];

    type Create = CreateCourse;
    type Update = UpdateCourse;
    type Record = CourseData;

    // Duplicate references are kept as sent.
    fn from_create(payload: CreateCourse) -> Result<CourseData, Error> {
        Ok(CourseData {
            course_name: payload.course_name,
            students: decode_refs(&payload.students)?,
        })
    }

    fn from_update(payload: UpdateCourse) -> Result<(StorageId, CourseData), Error> {
        let id = decode_ref(&payload.id)?;
        Ok((id, Self::from_create(payload.fields)?))
    }
}
