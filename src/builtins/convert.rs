//! Conversion builtins: str, int, float, bool, type_of

use crate::error::{RuntimeError, ARITY_ONE};
use crate::value::Value;
use flow_macros::builtin;

#[builtin(name = "str", category = "conversion")]
pub fn builtin_str(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("str", ARITY_ONE, args.len()));
    }
    Ok(Value::str(args[0].to_string()))
}

#[builtin(name = "int", category = "conversion")]
pub fn builtin_int(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("int", ARITY_ONE, args.len()));
    }
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(n) => Ok(Value::Int(*n as i64)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| RuntimeError::value("int", format!("cannot parse '{}' as int", s))),
        other => Err(RuntimeError::type_error("int", "number, bool, or string", other.type_name())),
    }
}

#[builtin(name = "float", category = "conversion")]
pub fn builtin_float(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("float", ARITY_ONE, args.len()));
    }
    match &args[0] {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(n) => Ok(Value::Float(*n)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| RuntimeError::value("float", format!("cannot parse '{}' as float", s))),
        other => Err(RuntimeError::type_error("float", "number or string", other.type_name())),
    }
}

#[builtin(name = "bool", category = "conversion")]
pub fn builtin_bool(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("bool", ARITY_ONE, args.len()));
    }
    Ok(Value::Bool(args[0].is_truthy()))
}

#[builtin(name = "type", category = "conversion")]
pub fn builtin_type_of(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("type", ARITY_ONE, args.len()));
    }
    Ok(Value::str(args[0].type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_parses_numeric_string() {
        assert!(matches!(
            builtin_int(&[Value::str("42")]).unwrap(),
            Value::Int(42)
        ));
    }

    #[test]
    fn int_parse_failure_is_value_error() {
        let err = builtin_int(&[Value::str("not a number")]).unwrap_err();
        assert!(matches!(err, RuntimeError::Value { .. }));
    }

    #[test]
    fn type_of_reports_type_name() {
        assert_eq!(
            builtin_type_of(&[Value::Int(1)]).unwrap().to_string(),
            "int"
        );
    }
}
