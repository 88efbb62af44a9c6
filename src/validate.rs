//! Declarative request schemas, checked before any storage side effect.
//!
//! A payload is accepted only when every required field is present with the
//! expected kind. Fields a schema does not name are ignored.

use chrono::NaiveDate;
use serde_json::{Map, Number, Value};

use crate::err::Error;

#[derive(Debug, Clone, Copy)]
pub enum Kind {
    Str,
    Bool,
    Number,
    /// ISO `YYYY-MM-DD` string.
    Date,
    StrList,
    /// List of objects, each checked against the inner schema.
    Nested(&'static Schema),
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
}

const fn field(name: &'static str, kind: Kind) -> Field {
    Field { name, kind }
}

#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [Field],
}

pub const ID_ONLY: Schema = Schema {
    name: "identifier",
    fields: &[field("_id", Kind::Str)],
};

pub const TEST_CREATE: Schema = Schema {
    name: "test creation",
    fields: &[
        field("testName", Kind::Str),
        field("courseCode", Kind::Str),
        field("calculator", Kind::Bool),
        field("testLength", Kind::Number),
        field("notes", Kind::Str),
        field("students", Kind::StrList),
        field("date", Kind::Date),
        field("period", Kind::Number),
        field("teacherName", Kind::Str),
    ],
};

pub const TEST_UPDATE: Schema = Schema {
    name: "test update",
    fields: &[
        field("_id", Kind::Str),
        field("testName", Kind::Str),
        field("courseCode", Kind::Str),
        field("calculator", Kind::Bool),
        field("testLength", Kind::Number),
        field("notes", Kind::Str),
        field("students", Kind::StrList),
        field("date", Kind::Date),
        field("period", Kind::Number),
        field("startTime", Kind::StrList),
        field("teacherName", Kind::Str),
    ],
};

pub const TEST_START_TIME: Schema = Schema {
    name: "test start time",
    fields: &[field("_id", Kind::Str), field("startTime", Kind::StrList)],
};

pub const STUDENT_CREATE: Schema = Schema {
    name: "student creation",
    fields: &[
        field("name", Kind::Str),
        field("email", Kind::Str),
        field("extraTime", Kind::Number),
    ],
};

pub const STUDENT_UPDATE: Schema = Schema {
    name: "student update",
    fields: &[
        field("_id", Kind::Str),
        field("name", Kind::Str),
        field("email", Kind::Str),
        field("extraTime", Kind::Number),
    ],
};

pub const EXTRA_TIME_ROW: Schema = Schema {
    name: "student extra time",
    fields: &[
        field("studentName", Kind::Str),
        field("extraTime", Kind::Number),
    ],
};

pub const EXTRA_TIME_BATCH: Schema = Schema {
    name: "student extra time batch",
    fields: &[field("arrayStudents", Kind::Nested(&EXTRA_TIME_ROW))],
};

pub const COURSE_CREATE: Schema = Schema {
    name: "course creation",
    fields: &[
        field("courseName", Kind::Str),
        field("students", Kind::StrList),
    ],
};

pub const COURSE_UPDATE: Schema = Schema {
    name: "course update",
    fields: &[
        field("_id", Kind::Str),
        field("courseName", Kind::Str),
        field("students", Kind::StrList),
    ],
};

pub const UPLOAD_ROW: Schema = Schema {
    name: "upload row",
    fields: &[
        field("studentName", Kind::Str),
        field("email", Kind::Str),
        field("courseName", Kind::Str),
    ],
};

pub const UPLOAD: Schema = Schema {
    name: "upload",
    fields: &[field("arrayStudents", Kind::Nested(&UPLOAD_ROW))],
};

pub const OAUTH_CALLBACK: Schema = Schema {
    name: "login callback",
    fields: &[field("state", Kind::Str), field("code", Kind::Str)],
};

/// Checks `payload` against `schema`, reporting every problem at once.
/// Checks `payload` against `schema`. Numbers and booleans sent as strings
/// are accepted and rewritten in place to their JSON kind.
pub fn validate(schema: &Schema, payload: &mut Value) -> Result<(), Error> {
    let mut problems = Vec::new();
    match payload.as_object_mut() {
        Some(object) => check_object(schema, object, "", &mut problems),
        None => problems.push("payload must be a JSON object".to_string()),
    }

    if problems.is_empty() {
        Ok(())
    } else {
        log::debug!("rejected {} payload: {:?}", schema.name, problems);
        Err(Error::validation(format!(
            "invalid {} payload: {}",
            schema.name,
            problems.join("; ")
        )))
    }
}

fn check_object(schema: &Schema, object: &mut Map<String, Value>, path: &str, out: &mut Vec<String>) {
    for field in schema.fields {
        let at = format!("{}{}", path, field.name);
        match object.get_mut(field.name) {
            None => out.push(format!("`{}` is required", at)),
            Some(value) => check_value(field.kind, value, &at, out),
        }
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) if n.as_f64() == Some(1.0) => Some(true),
        Value::Number(n) if n.as_f64() == Some(0.0) => Some(false),
        Value::String(s) => match s.as_str() {
            "t" | "T" | "true" | "True" | "TRUE" | "on" | "On" | "ON" | "y" | "Y" | "yes" | "Yes"
            | "YES" | "1" => Some(true),
            "f" | "F" | "false" | "False" | "FALSE" | "off" | "Off" | "OFF" | "n" | "N" | "no"
            | "No" | "NO" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => serde_json::from_str::<Number>(s.trim()).ok(),
        _ => None,
    }
}

fn check_value(kind: Kind, value: &mut Value, at: &str, out: &mut Vec<String>) {
    match kind {
        Kind::Str => {
            if !value.is_string() {
                out.push(format!("`{}` must be a string", at));
            }
        }
        Kind::Bool => match as_bool(value) {
            Some(b) => *value = Value::Bool(b),
            None => out.push(format!("`{}` must be a boolean", at)),
        },
        Kind::Number => match as_number(value) {
            Some(n) => *value = Value::Number(n),
            None => out.push(format!("`{}` must be a number", at)),
        },
        Kind::Date => match value.as_str() {
            Some(s) if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() => {}
            _ => out.push(format!("`{}` must be a date (YYYY-MM-DD)", at)),
        },
        Kind::StrList => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        out.push(format!("`{}.{}` must be a string", at, i));
                    }
                }
            }
            None => out.push(format!("`{}` must be a list of strings", at)),
        },
        Kind::Nested(inner) => match value.as_array_mut() {
            Some(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    match item.as_object_mut() {
                        Some(object) => check_object(inner, object, &format!("{}.{}.", at, i), out),
                        None => out.push(format!("`{}.{}` must be an object", at, i)),
                    }
                }
            }
            None => out.push(format!("`{}` must be a list", at)),
        },
    }
}
