//! Numeric builtins: sqrt, pow, abs, floor, ceil, round, log, sin, cos, tan, min, max
//!
//! Mixing `Int` and `Float` arguments promotes the result to `Float`,
//! matching the arithmetic-promotion rule applied to the `+`/`-`/`*`/`/`
//! operators the compiler lowers directly to bytecode.

use crate::error::{RuntimeError, ARITY_ONE, ARITY_TWO};
use crate::value::Value;
use flow_macros::builtin;

fn as_f64(v: &Value, function: &str) -> Result<f64, RuntimeError> {
    match v {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(n) => Ok(*n),
        other => Err(RuntimeError::type_error(function, "number", other.type_name())),
    }
}

fn one_arg_f64(args: &[Value], function: &str) -> Result<f64, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity(function, ARITY_ONE, args.len()));
    }
    as_f64(&args[0], function)
}

/// Returns the square root of its argument.
///
/// # Examples
///
/// ```flow
/// sqrt(16) => 4.0
/// ```
#[builtin(name = "sqrt", category = "numeric")]
pub fn builtin_sqrt(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Float(one_arg_f64(args, "sqrt")?.sqrt()))
}

/// Raises the first argument to the power of the second.
#[builtin(name = "pow", category = "numeric")]
pub fn builtin_pow(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 2 {
        return Err(RuntimeError::arity("pow", ARITY_TWO, args.len()));
    }
    match (&args[0], &args[1]) {
        (Value::Int(base), Value::Int(exp)) if *exp >= 0 => {
            Ok(Value::Int(base.pow(*exp as u32)))
        }
        _ => {
            let base = as_f64(&args[0], "pow")?;
            let exp = as_f64(&args[1], "pow")?;
            Ok(Value::Float(base.powf(exp)))
        }
    }
}

/// Returns the absolute value, preserving `Int`/`Float` distinction.
#[builtin(name = "abs", category = "numeric")]
pub fn builtin_abs(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("abs", ARITY_ONE, args.len()));
    }
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.abs())),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        other => Err(RuntimeError::type_error("abs", "number", other.type_name())),
    }
}

#[builtin(name = "floor", category = "numeric")]
pub fn builtin_floor(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(one_arg_f64(args, "floor")?.floor() as i64))
}

#[builtin(name = "ceil", category = "numeric")]
pub fn builtin_ceil(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(one_arg_f64(args, "ceil")?.ceil() as i64))
}

#[builtin(name = "round", category = "numeric")]
pub fn builtin_round(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(one_arg_f64(args, "round")?.round() as i64))
}

#[builtin(name = "log", category = "numeric")]
pub fn builtin_log(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Float(one_arg_f64(args, "log")?.ln()))
}

#[builtin(name = "sin", category = "numeric")]
pub fn builtin_sin(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Float(one_arg_f64(args, "sin")?.sin()))
}

#[builtin(name = "cos", category = "numeric")]
pub fn builtin_cos(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Float(one_arg_f64(args, "cos")?.cos()))
}

#[builtin(name = "tan", category = "numeric")]
pub fn builtin_tan(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Float(one_arg_f64(args, "tan")?.tan()))
}

/// `min`/`max` follow the teacher's variadic-or-sequence dispatch: a single
/// `List` argument is unpacked, otherwise every argument is compared
/// directly.
fn variadic_or_list(args: &[Value], function: &str) -> Result<Vec<Value>, RuntimeError> {
    if args.len() == 1 {
        if let Value::List(items) = &args[0] {
            return Ok(items.borrow().clone());
        }
    }
    if args.is_empty() {
        return Err(RuntimeError::arity(function, ARITY_ONE, 0));
    }
    Ok(args.to_vec())
}

fn extremum(args: &[Value], function: &str, pick_max: bool) -> Result<Value, RuntimeError> {
    let items = variadic_or_list(args, function)?;
    let mut best = items[0].clone();
    let mut best_f = as_f64(&best, function)?;
    for item in &items[1..] {
        let f = as_f64(item, function)?;
        if (pick_max && f > best_f) || (!pick_max && f < best_f) {
            best = item.clone();
            best_f = f;
        }
    }
    Ok(best)
}

#[builtin(name = "min", category = "numeric")]
pub fn builtin_min(args: &[Value]) -> Result<Value, RuntimeError> {
    extremum(args, "min", false)
}

#[builtin(name = "max", category = "numeric")]
pub fn builtin_max(args: &[Value]) -> Result<Value, RuntimeError> {
    extremum(args, "max", true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_of_sixteen_is_four() {
        assert_eq!(builtin_sqrt(&[Value::Int(16)]).unwrap().to_string(), "4.0");
    }

    #[test]
    fn pow_of_two_ints_stays_int() {
        let result = builtin_pow(&[Value::Int(2), Value::Int(10)]).unwrap();
        assert!(matches!(result, Value::Int(1024)));
    }

    #[test]
    fn min_max_over_a_list() {
        let list = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert!(matches!(
            builtin_min(std::slice::from_ref(&list)).unwrap(),
            Value::Int(1)
        ));
        assert!(matches!(
            builtin_max(std::slice::from_ref(&list)).unwrap(),
            Value::Int(3)
        ));
    }

    #[test]
    fn abs_rejects_non_numeric() {
        let err = builtin_abs(&[Value::str("x")]).unwrap_err();
        assert!(matches!(err, RuntimeError::Type { .. }));
    }
}
