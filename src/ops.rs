// ABOUTME: Arithmetic, comparison, and unary operator semantics shared by the interpreter and VM

use crate::ast::{BinOp, CompareOp, UnaryOp};
use crate::error::RuntimeError;
use crate::value::Value;

fn op_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::Shl => "<<",
        BinOp::Shr => ">>",
    }
}

fn type_error(op: BinOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::type_error(
        op_name(op),
        "matching numeric operands",
        format!("{} and {}", left.type_name(), right.type_name()),
    )
}

/// Host numeric promotion: two ints stay an int, any float operand
/// promotes the whole operation to float (§3).
pub fn apply_binary(op: BinOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    if op == BinOp::Add {
        if let (Value::Str(a), Value::Str(b)) = (&left, &right) {
            return Ok(Value::str(format!("{a}{b}")));
        }
    }

    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => apply_int(op, *a, *b).ok_or_else(|| type_error(op, &left, &right)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let a = as_f64(&left);
            let b = as_f64(&right);
            apply_float(op, a, b).ok_or_else(|| type_error(op, &left, &right))
        }
        _ => Err(type_error(op, &left, &right)),
    }
}

fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Int(n) => *n as f64,
        Value::Float(n) => *n,
        _ => unreachable!("as_f64 called on non-numeric value"),
    }
}

fn apply_int(op: BinOp, a: i64, b: i64) -> Option<Value> {
    Some(match op {
        BinOp::Add => Value::Int(a.wrapping_add(b)),
        BinOp::Sub => Value::Int(a.wrapping_sub(b)),
        BinOp::Mul => Value::Int(a.wrapping_mul(b)),
        BinOp::Div => {
            if b == 0 {
                return None;
            }
            Value::Int(a.wrapping_div(b))
        }
        BinOp::Mod => {
            if b == 0 {
                return None;
            }
            Value::Int(a.wrapping_rem(b))
        }
        BinOp::Pow => {
            if b >= 0 {
                Value::Int(a.wrapping_pow(b as u32))
            } else {
                Value::Float((a as f64).powf(b as f64))
            }
        }
        BinOp::BitAnd => Value::Int(a & b),
        BinOp::BitOr => Value::Int(a | b),
        BinOp::BitXor => Value::Int(a ^ b),
        BinOp::Shl => Value::Int(a.wrapping_shl(b as u32)),
        BinOp::Shr => Value::Int(a.wrapping_shr(b as u32)),
    })
}

fn apply_float(op: BinOp, a: f64, b: f64) -> Option<Value> {
    Some(match op {
        BinOp::Add => Value::Float(a + b),
        BinOp::Sub => Value::Float(a - b),
        BinOp::Mul => Value::Float(a * b),
        BinOp::Div => Value::Float(a / b),
        BinOp::Mod => Value::Float(a % b),
        BinOp::Pow => Value::Float(a.powf(b)),
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => return None,
    })
}

pub fn apply_compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
    match op {
        CompareOp::Eq => Ok(left.runtime_eq(right)),
        CompareOp::Ne => Ok(!left.runtime_eq(right)),
        _ => {
            let ordering = left.partial_cmp_value(right).ok_or_else(|| {
                RuntimeError::type_error(
                    "comparison",
                    "comparable operands",
                    format!("{} and {}", left.type_name(), right.type_name()),
                )
            })?;
            use std::cmp::Ordering::*;
            Ok(match op {
                CompareOp::Lt => ordering == Less,
                CompareOp::Le => ordering != Greater,
                CompareOp::Gt => ordering == Greater,
                CompareOp::Ge => ordering != Less,
                CompareOp::Eq | CompareOp::Ne => unreachable!(),
            })
        }
    }
}

pub fn apply_unary(op: UnaryOp, operand: Value) -> Result<Value, RuntimeError> {
    match (op, &operand) {
        (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(-n)),
        (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Neg, other) => Err(RuntimeError::type_error("-", "number", other.type_name())),
        (UnaryOp::Not, other) => Ok(Value::Bool(!other.is_truthy())),
        (UnaryOp::BitNot, Value::Int(n)) => Ok(Value::Int(!n)),
        (UnaryOp::BitNot, other) => Err(RuntimeError::type_error("~", "int", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_plus_int_stays_int() {
        let result = apply_binary(BinOp::Add, Value::Int(1), Value::Int(2)).unwrap();
        assert!(matches!(result, Value::Int(3)));
    }

    #[test]
    fn mixed_int_and_float_promotes_to_float() {
        let result = apply_binary(BinOp::Add, Value::Int(1), Value::Float(2.5)).unwrap();
        assert!(matches!(result, Value::Float(n) if n == 3.5));
    }

    #[test]
    fn string_concatenation_via_add() {
        let result = apply_binary(BinOp::Add, Value::str("a"), Value::str("b")).unwrap();
        assert_eq!(result.to_string(), "ab");
    }

    #[test]
    fn division_by_zero_is_a_type_error_for_ints() {
        assert!(apply_binary(BinOp::Div, Value::Int(1), Value::Int(0)).is_err());
    }

    #[test]
    fn compare_eq_crosses_int_and_float() {
        assert!(apply_compare(CompareOp::Eq, &Value::Int(2), &Value::Float(2.0)).unwrap());
    }

    #[test]
    fn compare_lt_numeric() {
        assert!(apply_compare(CompareOp::Lt, &Value::Int(1), &Value::Int(2)).unwrap());
    }

    #[test]
    fn unary_not_on_truthy_value() {
        let result = apply_unary(UnaryOp::Not, Value::Int(0)).unwrap();
        assert!(matches!(result, Value::Bool(true)));
    }
}
