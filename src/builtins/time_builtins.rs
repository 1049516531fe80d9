//! Time builtins: time, sleep
//!
//! `sleep` performs a real blocking `std::thread::sleep` — Flow's
//! concurrency model is synchronous (§5), so there is no scheduler to
//! preempt.

use crate::error::{RuntimeError, ARITY_ONE, ARITY_ZERO_OR_ONE};
use crate::value::Value;
use flow_macros::builtin;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[builtin(name = "time", category = "time")]
pub fn builtin_time(args: &[Value]) -> Result<Value, RuntimeError> {
    if !args.is_empty() {
        return Err(RuntimeError::arity("time", ARITY_ZERO_OR_ONE, args.len()));
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| RuntimeError::other("time", e.to_string()))?;
    Ok(Value::Float(now.as_secs_f64()))
}

#[builtin(name = "sleep", category = "time")]
pub fn builtin_sleep(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("sleep", ARITY_ONE, args.len()));
    }
    let secs = match &args[0] {
        Value::Int(n) => *n as f64,
        Value::Float(n) => *n,
        other => return Err(RuntimeError::type_error("sleep", "number", other.type_name())),
    };
    if secs < 0.0 {
        return Err(RuntimeError::value("sleep", "duration must not be negative"));
    }
    std::thread::sleep(Duration::from_secs_f64(secs));
    Ok(Value::Nil)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_returns_a_positive_float() {
        let result = builtin_time(&[]).unwrap();
        if let Value::Float(n) = result {
            assert!(n > 0.0);
        } else {
            panic!("expected float");
        }
    }

    #[test]
    fn sleep_rejects_negative_duration() {
        let err = builtin_sleep(&[Value::Float(-1.0)]).unwrap_err();
        assert!(matches!(err, RuntimeError::Value { .. }));
    }

    #[test]
    fn sleep_zero_returns_nil_immediately() {
        assert!(matches!(builtin_sleep(&[Value::Int(0)]).unwrap(), Value::Nil));
    }
}
