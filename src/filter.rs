//! Query parameters to equality filters.

use std::collections::HashMap;

use serde_json::{Number, Value};

use crate::err::Error;
use crate::ident::{decode_ref, PRIMARY_KEY};
use crate::store::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    /// Compared numerically when the supplied string parses as a number.
    Number,
    /// Decoded as a storage identifier.
    Id,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryParam {
    pub name: &'static str,
    pub kind: ParamKind,
}

pub const fn param(name: &'static str, kind: ParamKind) -> QueryParam {
    QueryParam { name, kind }
}

/// Builds a filter from the supplied parameters only. `None` imposes no
/// constraint; `Some("")` is supplied and matches the empty string exactly.
pub fn build_filter<'a, I>(params: I) -> Result<Filter, Error>
where
    I: IntoIterator<Item = (QueryParam, Option<&'a str>)>,
{
    let mut filter = Filter::new();
    for (param, value) in params {
        let value = match value {
            Some(value) => value,
            None => continue,
        };
        let (key, value) = match param.kind {
            ParamKind::Text => (param.name, Value::String(value.to_string())),
            ParamKind::Number => (param.name, number_or_text(value)),
            ParamKind::Id => (PRIMARY_KEY, Value::String(decode_ref(value)?.to_string())),
        };
        filter.insert(key.to_string(), value);
    }
    Ok(filter)
}

/// Picks the declared parameters out of a raw query string map.
pub fn filter_from_query(params: &[QueryParam], query: &HashMap<String, String>) -> Result<Filter, Error> {
    build_filter(
        params
            .iter()
            .map(|param| (*param, query.get(param.name).map(String::as_str))),
    )
}

fn number_or_text(value: &str) -> Value {
    match serde_json::from_str::<Number>(value.trim()) {
        Ok(number) if !value.trim().is_empty() => Value::Number(number),
        _ => Value::String(value.to_string()),
    }
}
