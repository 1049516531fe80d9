//! Random builtins: random, randint, shuffle
//!
//! Grounded in the `rand` crate, enriching this codebase's builtin set the
//! way another example repository in the same retrieval pack reaches for
//! `rand` for similar sampling needs.

use crate::error::{RuntimeError, ARITY_TWO, ARITY_ZERO_OR_ONE};
use crate::value::Value;
use flow_macros::builtin;
use rand::seq::SliceRandom;
use rand::Rng;

/// Returns a random float in `[0.0, 1.0)`.
#[builtin(name = "random", category = "random")]
pub fn builtin_random(args: &[Value]) -> Result<Value, RuntimeError> {
    if !args.is_empty() {
        return Err(RuntimeError::arity("random", ARITY_ZERO_OR_ONE, args.len()));
    }
    Ok(Value::Float(rand::thread_rng().gen::<f64>()))
}

/// Returns a random integer in `[low, high]` inclusive.
#[builtin(name = "randint", category = "random")]
pub fn builtin_randint(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 2 {
        return Err(RuntimeError::arity("randint", ARITY_TWO, args.len()));
    }
    let low = match &args[0] {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_error("randint", "int", other.type_name())),
    };
    let high = match &args[1] {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_error("randint", "int", other.type_name())),
    };
    if low > high {
        return Err(RuntimeError::value(
            "randint",
            format!("low ({low}) must not exceed high ({high})"),
        ));
    }
    Ok(Value::Int(rand::thread_rng().gen_range(low..=high)))
}

/// Shuffles a list in place and returns it.
#[builtin(name = "shuffle", category = "random")]
pub fn builtin_shuffle(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity(
            "shuffle",
            crate::error::ARITY_ONE,
            args.len(),
        ));
    }
    match &args[0] {
        Value::List(items) => {
            items.borrow_mut().shuffle(&mut rand::thread_rng());
            Ok(args[0].clone())
        }
        other => Err(RuntimeError::type_error("shuffle", "list", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_is_within_unit_interval() {
        let result = builtin_random(&[]).unwrap();
        if let Value::Float(n) = result {
            assert!((0.0..1.0).contains(&n));
        } else {
            panic!("expected float");
        }
    }

    #[test]
    fn randint_respects_bounds() {
        for _ in 0..20 {
            let result = builtin_randint(&[Value::Int(1), Value::Int(3)]).unwrap();
            if let Value::Int(n) = result {
                assert!((1..=3).contains(&n));
            } else {
                panic!("expected int");
            }
        }
    }

    #[test]
    fn randint_rejects_inverted_range() {
        let err = builtin_randint(&[Value::Int(5), Value::Int(1)]).unwrap_err();
        assert!(matches!(err, RuntimeError::Value { .. }));
    }

    #[test]
    fn shuffle_preserves_length() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        builtin_shuffle(&[list.clone()]).unwrap();
        if let Value::List(items) = &list {
            assert_eq!(items.borrow().len(), 3);
        }
    }
}
