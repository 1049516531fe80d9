//! Shared implementation for `map`/`filter`/`reduce`.
//!
//! These are parsed as dedicated AST nodes (`Expr::MapCall` etc.), not name
//! dispatched through the builtin registry, because they need to call back
//! into a Flow function value mid-evaluation — something the plain
//! `fn(&[Value]) -> Result<Value, RuntimeError>` builtin shape can't
//! express. Both `interpreter::Interpreter` and `vm::Vm` implement `Host`
//! and call these helpers directly.

use crate::builtins::Host;
use crate::error::RuntimeError;
use crate::value::Value;

fn iterable_items(v: &Value, function: &str) -> Result<Vec<Value>, RuntimeError> {
    match v {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Tuple(items) => Ok(items.to_vec()),
        other => Err(RuntimeError::type_error(
            function,
            "list or tuple",
            other.type_name(),
        )),
    }
}

pub fn map_values(
    func: &Value,
    iterable: &Value,
    host: &mut dyn Host,
) -> Result<Value, RuntimeError> {
    let items = iterable_items(iterable, "map")?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(host.call_value(func, vec![item])?);
    }
    Ok(Value::list(out))
}

pub fn filter_values(
    func: &Value,
    iterable: &Value,
    host: &mut dyn Host,
) -> Result<Value, RuntimeError> {
    let items = iterable_items(iterable, "filter")?;
    let mut out = Vec::new();
    for item in items {
        if host.call_value(func, vec![item.clone()])?.is_truthy() {
            out.push(item);
        }
    }
    Ok(Value::list(out))
}

pub fn reduce_values(
    func: &Value,
    iterable: &Value,
    initial: Value,
    host: &mut dyn Host,
) -> Result<Value, RuntimeError> {
    let items = iterable_items(iterable, "reduce")?;
    let mut acc = initial;
    for item in items {
        acc = host.call_value(func, vec![acc, item])?;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DoubleHost;
    impl Host for DoubleHost {
        fn call_value(&mut self, _callee: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
            match &args[0] {
                Value::Int(n) => Ok(Value::Int(n * 2)),
                other => Ok(other.clone()),
            }
        }
    }

    #[test]
    fn map_doubles_every_element() {
        let mut host = DoubleHost;
        let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let result = map_values(&Value::Builtin("double"), &list, &mut host).unwrap();
        assert_eq!(result.to_string(), "[2, 4, 6]");
    }
}
