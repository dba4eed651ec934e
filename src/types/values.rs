//! Runtime value types

use crate::engine::{Completion, Thenable, Thunk};
use crate::errors::{self, ErrorInfo};
use super::computation::{Coroutine, Factory};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Key under which a record's name is kept when it is converted to JSON
const RECORD_NAME_KEY: &str = "$record";

/// Largest integer an f64 represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/* ===================== Val ===================== */

/// Runtime value type
///
/// Everything a computation yields, receives, or returns is a `Val`. The
/// variants double as the classification the normalizer dispatches on:
/// `List` and `Map` are the only plain collections, and `Record` is object-like
/// without being plain, so yielding one is an error rather than a fan-out.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<Val>),
    Map(BTreeMap<String, Val>),
    Record(Record),
    /// Callback-style function: call it with a completion
    Thunk(Thunk),
    /// Promise-like value
    Promise(Thenable),
    /// Suspended computation instance
    Computation(Coroutine),
    /// Function producing a suspended computation
    Factory(Factory),
    /// A completion callback passed around as a value
    Callback(Completion),
}

/// Named structured value that is not a plain collection
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub fields: BTreeMap<String, Val>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Val>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

impl Val {
    /// Short name of the variant, used in error messages and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Val::Null => "null",
            Val::Bool(_) => "bool",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
            Val::List(_) => "list",
            Val::Map(_) => "map",
            Val::Record(_) => "record",
            Val::Thunk(_) => "thunk",
            Val::Promise(_) => "promise",
            Val::Computation(_) => "computation",
            Val::Factory(_) => "factory",
            Val::Callback(_) => "callback",
        }
    }

    /* ===================== JSON ===================== */

    /// Convert to JSON
    ///
    /// Fails for values holding live handles (thunks, promises, computations,
    /// factories, callbacks), which have no data representation.
    pub fn to_json(&self) -> Result<JsonValue, ErrorInfo> {
        Ok(match self {
            Val::Null => JsonValue::Null,
            Val::Bool(b) => JsonValue::Bool(*b),
            Val::Num(n) => num_to_json(*n),
            Val::Str(s) => JsonValue::String(s.clone()),
            Val::List(items) => JsonValue::Array(
                items
                    .iter()
                    .map(Val::to_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Val::Map(entries) => JsonValue::Object(map_to_json(entries)?),
            Val::Record(record) => {
                let mut object = map_to_json(&record.fields)?;
                object.insert(
                    RECORD_NAME_KEY.to_string(),
                    JsonValue::String(record.name.clone()),
                );
                JsonValue::Object(object)
            }
            other => {
                return Err(ErrorInfo::new(
                    errors::NOT_SERIALIZABLE,
                    format!("Cannot convert a {} to JSON", other.kind()),
                ))
            }
        })
    }
}

/// Integral numbers come back out as JSON integers
fn num_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

fn map_to_json(
    entries: &BTreeMap<String, Val>,
) -> Result<serde_json::Map<String, JsonValue>, ErrorInfo> {
    entries
        .iter()
        .map(|(k, v)| Ok((k.clone(), v.to_json()?)))
        .collect()
}

impl From<JsonValue> for Val {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Val::Null,
            JsonValue::Bool(b) => Val::Bool(b),
            JsonValue::Number(n) => Val::Num(n.as_f64().unwrap_or(0.0)),
            JsonValue::String(s) => Val::Str(s),
            JsonValue::Array(items) => Val::List(items.into_iter().map(Val::from).collect()),
            JsonValue::Object(mut object) => match object.remove(RECORD_NAME_KEY) {
                Some(JsonValue::String(name)) => Val::Record(Record {
                    name,
                    fields: object.into_iter().map(|(k, v)| (k, Val::from(v))).collect(),
                }),
                other => {
                    if let Some(value) = other {
                        object.insert(RECORD_NAME_KEY.to_string(), value);
                    }
                    Val::Map(object.into_iter().map(|(k, v)| (k, Val::from(v))).collect())
                }
            },
        }
    }
}

/* ===================== Conversions ===================== */

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Self {
        Val::Num(n)
    }
}

impl From<i32> for Val {
    fn from(n: i32) -> Self {
        Val::Num(n as f64)
    }
}

impl From<i64> for Val {
    fn from(n: i64) -> Self {
        Val::Num(n as f64)
    }
}

impl From<usize> for Val {
    fn from(n: usize) -> Self {
        Val::Num(n as f64)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::Str(s.to_string())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::Str(s)
    }
}

impl From<Vec<Val>> for Val {
    fn from(items: Vec<Val>) -> Self {
        Val::List(items)
    }
}

impl From<BTreeMap<String, Val>> for Val {
    fn from(entries: BTreeMap<String, Val>) -> Self {
        Val::Map(entries)
    }
}

impl From<Record> for Val {
    fn from(record: Record) -> Self {
        Val::Record(record)
    }
}

impl From<Thunk> for Val {
    fn from(thunk: Thunk) -> Self {
        Val::Thunk(thunk)
    }
}

impl From<Thenable> for Val {
    fn from(promise: Thenable) -> Self {
        Val::Promise(promise)
    }
}

impl From<Coroutine> for Val {
    fn from(computation: Coroutine) -> Self {
        Val::Computation(computation)
    }
}

impl From<Factory> for Val {
    fn from(factory: Factory) -> Self {
        Val::Factory(factory)
    }
}

impl From<Completion> for Val {
    fn from(completion: Completion) -> Self {
        Val::Callback(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;
    use serde_json::json;

    #[test]
    fn test_json_round_trip_of_nested_data() {
        let json = json!({"a": [1, "two", null], "b": {"c": true}});
        let val = Val::from(json.clone());

        assert_eq!(
            val,
            Val::Map(btreemap! {
                "a".to_string() => Val::List(vec![Val::Num(1.0), Val::from("two"), Val::Null]),
                "b".to_string() => Val::Map(btreemap! { "c".to_string() => Val::Bool(true) }),
            })
        );
        assert_eq!(val.to_json().unwrap(), json);
    }

    #[test]
    fn test_record_keeps_its_name_through_json() {
        let record = Record::new("Point").field("x", 1).field("y", 2);
        let json = Val::from(record.clone()).to_json().unwrap();

        assert_eq!(json, json!({"$record": "Point", "x": 1, "y": 2}));
        assert_eq!(Val::from(json), Val::Record(record));
    }

    #[test]
    fn test_handles_are_not_serializable() {
        let thunk = Thunk::new(|done| {
            done.ok(Val::Null);
            Ok(())
        });

        let err = Val::List(vec![Val::Thunk(thunk)]).to_json().unwrap_err();
        assert_eq!(err.code, errors::NOT_SERIALIZABLE);
        assert!(err.message.contains("thunk"));
    }
}
