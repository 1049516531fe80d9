//! JSON builtins: json_parse, json_stringify
//!
//! `Value` carries `Rc`/`RefCell` and a bare builtin name, so it does not
//! derive `serde::{Serialize, Deserialize}` directly; these builtins
//! convert explicitly to and from `serde_json::Value` instead.

use crate::error::{RuntimeError, ARITY_ONE};
use crate::value::Value;
use flow_macros::builtin;
use serde_json::Value as Json;

fn to_json(v: &Value) -> Result<Json, RuntimeError> {
    Ok(match v {
        Value::Int(n) => Json::from(*n),
        Value::Float(n) => serde_json::Number::from_f64(*n)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Bool(b) => Json::Bool(*b),
        Value::Str(s) => Json::String(s.to_string()),
        Value::Nil => Json::Null,
        Value::List(items) => Json::Array(
            items
                .borrow()
                .iter()
                .map(to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Tuple(items) => {
            Json::Array(items.iter().map(to_json).collect::<Result<Vec<_>, _>>()?)
        }
        other => {
            return Err(RuntimeError::type_error(
                "json_stringify",
                "serializable value",
                other.type_name(),
            ))
        }
    })
}

fn from_json(j: &Json) -> Value {
    match j {
        Json::Null => Value::Nil,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        Json::String(s) => Value::str(s.clone()),
        Json::Array(items) => Value::list(items.iter().map(from_json).collect()),
        Json::Object(map) => Value::list(
            map.iter()
                .map(|(k, v)| Value::tuple(vec![Value::str(k.clone()), from_json(v)]))
                .collect(),
        ),
    }
}

#[builtin(name = "json_parse", category = "serialize")]
pub fn builtin_json_parse(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("json_parse", ARITY_ONE, args.len()));
    }
    let text = match &args[0] {
        Value::Str(s) => s,
        other => {
            return Err(RuntimeError::type_error(
                "json_parse",
                "string",
                other.type_name(),
            ))
        }
    };
    let parsed: Json = serde_json::from_str(text)
        .map_err(|e| RuntimeError::value("json_parse", e.to_string()))?;
    Ok(from_json(&parsed))
}

#[builtin(name = "json_stringify", category = "serialize")]
pub fn builtin_json_stringify(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("json_stringify", ARITY_ONE, args.len()));
    }
    let json = to_json(&args[0])?;
    Ok(Value::str(json.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_list_of_numbers() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let json = builtin_json_stringify(&[list]).unwrap();
        assert_eq!(json.to_string(), "[1,2,3]");
        let parsed = builtin_json_parse(&[json]).unwrap();
        assert_eq!(parsed.to_string(), "[1, 2, 3]");
    }

    #[test]
    fn invalid_json_is_a_value_error() {
        let err = builtin_json_parse(&[Value::str("not json")]).unwrap_err();
        assert!(matches!(err, RuntimeError::Value { .. }));
    }

    #[test]
    fn object_becomes_a_list_of_tuples() {
        let parsed = builtin_json_parse(&[Value::str(r#"{"a": 1}"#)]).unwrap();
        assert_eq!(parsed.to_string(), "[(a, 1)]");
    }
}
