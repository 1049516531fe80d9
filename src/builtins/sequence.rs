//! Sequence builtins: append, pop, range, len, reverse, sort, sum
//!
//! `List` is the language's only mutable sequence type, so `append`/`pop`
//! mutate the argument in place (through its shared `Rc<RefCell<..>>`
//! storage) and also return the mutated value, mirroring the original
//! source's `list.append`/`list.pop` bindings.

use crate::error::{RuntimeError, ARITY_ONE, ARITY_ONE_OR_TWO, ARITY_TWO};
use crate::value::Value;
use flow_macros::builtin;

fn expect_list<'a>(v: &'a Value, function: &str) -> Result<&'a std::cell::RefCell<Vec<Value>>, RuntimeError> {
    match v {
        Value::List(items) => Ok(items),
        other => Err(RuntimeError::type_error(function, "list", other.type_name())),
    }
}

#[builtin(name = "append", category = "sequence")]
pub fn builtin_append(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 2 {
        return Err(RuntimeError::arity("append", ARITY_TWO, args.len()));
    }
    let items = expect_list(&args[0], "append")?;
    items.borrow_mut().push(args[1].clone());
    Ok(args[0].clone())
}

#[builtin(name = "pop", category = "sequence")]
pub fn builtin_pop(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("pop", ARITY_ONE, args.len()));
    }
    let items = expect_list(&args[0], "pop")?;
    items
        .borrow_mut()
        .pop()
        .ok_or_else(|| RuntimeError::value("pop", "cannot pop from an empty list"))
}

/// Pops the front of a list, binding `nil` on an empty list instead of
/// raising — backs channel `receive`, which is specified as a diagnostic
/// no-op rather than a failure on an empty buffer. Not reachable by a Flow
/// identifier call; `receive` is the only caller, via `CALL_BUILTIN`.
#[builtin(name = "shift", category = "sequence")]
pub fn builtin_shift(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("shift", ARITY_ONE, args.len()));
    }
    let items = expect_list(&args[0], "shift")?;
    let mut items = items.borrow_mut();
    if items.is_empty() {
        Ok(Value::Nil)
    } else {
        Ok(items.remove(0))
    }
}

#[builtin(name = "range", category = "sequence")]
pub fn builtin_range(args: &[Value]) -> Result<Value, RuntimeError> {
    let (start, end) = match args.len() {
        1 => (
            0,
            match &args[0] {
                Value::Int(n) => *n,
                other => {
                    return Err(RuntimeError::type_error("range", "int", other.type_name()))
                }
            },
        ),
        2 => {
            let start = match &args[0] {
                Value::Int(n) => *n,
                other => {
                    return Err(RuntimeError::type_error("range", "int", other.type_name()))
                }
            };
            let end = match &args[1] {
                Value::Int(n) => *n,
                other => {
                    return Err(RuntimeError::type_error("range", "int", other.type_name()))
                }
            };
            (start, end)
        }
        n => return Err(RuntimeError::arity("range", ARITY_ONE_OR_TWO, n)),
    };
    Ok(Value::list((start..end).map(Value::Int).collect()))
}

#[builtin(name = "len", category = "sequence")]
pub fn builtin_len(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("len", ARITY_ONE, args.len()));
    }
    let n = match &args[0] {
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        Value::Str(s) => s.chars().count(),
        other => return Err(RuntimeError::type_error("len", "sequence", other.type_name())),
    };
    Ok(Value::Int(n as i64))
}

#[builtin(name = "reverse", category = "sequence")]
pub fn builtin_reverse(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("reverse", ARITY_ONE, args.len()));
    }
    let items = expect_list(&args[0], "reverse")?;
    items.borrow_mut().reverse();
    Ok(args[0].clone())
}

fn cmp_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    let fa = match a {
        Value::Int(n) => *n as f64,
        Value::Float(n) => *n,
        _ => f64::NAN,
    };
    let fb = match b {
        Value::Int(n) => *n as f64,
        Value::Float(n) => *n,
        _ => f64::NAN,
    };
    fa.partial_cmp(&fb).unwrap_or(std::cmp::Ordering::Equal)
}

#[builtin(name = "sort", category = "sequence")]
pub fn builtin_sort(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("sort", ARITY_ONE, args.len()));
    }
    let items = expect_list(&args[0], "sort")?;
    items.borrow_mut().sort_by(cmp_values);
    Ok(args[0].clone())
}

#[builtin(name = "sum", category = "sequence")]
pub fn builtin_sum(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("sum", ARITY_ONE, args.len()));
    }
    let items = expect_list(&args[0], "sum")?;
    let items = items.borrow();
    let mut int_sum: i64 = 0;
    let mut float_sum: f64 = 0.0;
    let mut is_float = false;
    for item in items.iter() {
        match item {
            Value::Int(n) => {
                int_sum += n;
                float_sum += *n as f64;
            }
            Value::Float(n) => {
                is_float = true;
                float_sum += n;
            }
            other => {
                return Err(RuntimeError::type_error("sum", "number", other.type_name()))
            }
        }
    }
    Ok(if is_float {
        Value::Float(float_sum)
    } else {
        Value::Int(int_sum)
    })
}

#[builtin(name = "contains", category = "sequence")]
pub fn builtin_contains(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 2 {
        return Err(RuntimeError::arity("contains", ARITY_TWO, args.len()));
    }
    let found = match &args[0] {
        Value::List(items) => items.borrow().iter().any(|v| v.runtime_eq(&args[1])),
        Value::Tuple(items) => items.iter().any(|v| v.runtime_eq(&args[1])),
        Value::Str(s) => match &args[1] {
            Value::Str(needle) => s.contains(needle.as_ref()),
            other => return Err(RuntimeError::type_error("contains", "string", other.type_name())),
        },
        other => return Err(RuntimeError::type_error("contains", "sequence", other.type_name())),
    };
    Ok(Value::Bool(found))
}

/// Backs the `alloc` statement with a list of `size` `nil`s. Not reachable
/// by a Flow identifier call (absent from `BUILTIN_NAMES`); `alloc` is the
/// only caller, via a dedicated `CALL_BUILTIN`, matching `shift`'s pattern
/// for `receive`.
#[builtin(name = "alloc_buffer", category = "sequence")]
pub fn builtin_alloc_buffer(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("alloc_buffer", ARITY_ONE, args.len()));
    }
    let size = match &args[0] {
        Value::Int(n) if *n >= 0 => *n as usize,
        Value::Int(_) => return Err(RuntimeError::value("alloc", "size must be non-negative")),
        other => return Err(RuntimeError::type_error("alloc", "int", other.type_name())),
    };
    Ok(Value::list(vec![Value::Nil; size]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_with_one_arg_starts_at_zero() {
        let result = builtin_range(&[Value::Int(3)]).unwrap();
        assert_eq!(result.to_string(), "[0, 1, 2]");
    }

    #[test]
    fn append_mutates_shared_storage() {
        let list = Value::list(vec![Value::Int(1)]);
        builtin_append(&[list.clone(), Value::Int(2)]).unwrap();
        assert_eq!(list.to_string(), "[1, 2]");
    }

    #[test]
    fn pop_empty_list_is_a_value_error() {
        let list = Value::list(vec![]);
        let err = builtin_pop(&[list]).unwrap_err();
        assert!(matches!(err, RuntimeError::Value { .. }));
    }

    #[test]
    fn sum_promotes_to_float_when_mixed() {
        let list = Value::list(vec![Value::Int(1), Value::Float(2.5)]);
        let result = builtin_sum(&[list]).unwrap();
        assert!(matches!(result, Value::Float(_)));
    }

    #[test]
    fn contains_finds_list_member() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert!(matches!(
            builtin_contains(&[list, Value::Int(2)]).unwrap(),
            Value::Bool(true)
        ));
    }

    #[test]
    fn alloc_buffer_fills_with_nil() {
        let result = builtin_alloc_buffer(&[Value::Int(3)]).unwrap();
        assert_eq!(result.to_string(), "[nil, nil, nil]");
    }

    #[test]
    fn sort_orders_ascending() {
        let list = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        builtin_sort(&[list.clone()]).unwrap();
        assert_eq!(list.to_string(), "[1, 2, 3]");
    }
}
