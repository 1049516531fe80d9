//! String builtins: split, join, upper, lower, trim, replace, substring

use crate::error::{RuntimeError, ARITY_ONE, ARITY_THREE, ARITY_TWO};
use crate::value::Value;
use flow_macros::builtin;

fn expect_str<'a>(v: &'a Value, function: &str) -> Result<&'a str, RuntimeError> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(RuntimeError::type_error(function, "string", other.type_name())),
    }
}

#[builtin(name = "split", category = "string")]
pub fn builtin_split(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 2 {
        return Err(RuntimeError::arity("split", ARITY_TWO, args.len()));
    }
    let s = expect_str(&args[0], "split")?;
    let sep = expect_str(&args[1], "split")?;
    let parts = if sep.is_empty() {
        s.chars().map(|c| Value::str(c.to_string())).collect()
    } else {
        s.split(sep).map(Value::str).collect()
    };
    Ok(Value::list(parts))
}

#[builtin(name = "join", category = "string")]
pub fn builtin_join(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 2 {
        return Err(RuntimeError::arity("join", ARITY_TWO, args.len()));
    }
    let sep = expect_str(&args[1], "join")?;
    let items = match &args[0] {
        Value::List(items) => items.borrow().clone(),
        Value::Tuple(items) => items.to_vec(),
        other => return Err(RuntimeError::type_error("join", "list", other.type_name())),
    };
    let joined = items
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(sep);
    Ok(Value::str(joined))
}

#[builtin(name = "upper", category = "string")]
pub fn builtin_upper(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::str(expect_str(&args[0], "upper")?.to_uppercase()))
}

#[builtin(name = "lower", category = "string")]
pub fn builtin_lower(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::str(expect_str(&args[0], "lower")?.to_lowercase()))
}

#[builtin(name = "trim", category = "string")]
pub fn builtin_trim(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::str(expect_str(&args[0], "trim")?.trim().to_string()))
}

#[builtin(name = "replace", category = "string")]
pub fn builtin_replace(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 3 {
        return Err(RuntimeError::arity("replace", ARITY_THREE, args.len()));
    }
    let s = expect_str(&args[0], "replace")?;
    let from = expect_str(&args[1], "replace")?;
    let to = expect_str(&args[2], "replace")?;
    Ok(Value::str(s.replace(from, to)))
}

#[builtin(name = "substring", category = "string")]
pub fn builtin_substring(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 3 {
        return Err(RuntimeError::arity("substring", ARITY_THREE, args.len()));
    }
    let s = expect_str(&args[0], "substring")?;
    let chars: Vec<char> = s.chars().collect();
    let start = match &args[1] {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_error("substring", "int", other.type_name())),
    };
    let end = match &args[2] {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_error("substring", "int", other.type_name())),
    };
    if start < 0 || end < start || end as usize > chars.len() {
        return Err(RuntimeError::index("substring", end, chars.len()));
    }
    Ok(Value::str(
        chars[start as usize..end as usize].iter().collect::<String>(),
    ))
}

#[builtin(name = "ord", category = "string")]
pub fn builtin_ord(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("ord", ARITY_ONE, args.len()));
    }
    let s = expect_str(&args[0], "ord")?;
    let mut chars = s.chars();
    let c = chars
        .next()
        .ok_or_else(|| RuntimeError::value("ord", "expected a single character"))?;
    if chars.next().is_some() {
        return Err(RuntimeError::value("ord", "expected a single character"));
    }
    Ok(Value::Int(c as i64))
}

#[builtin(name = "chr", category = "string")]
pub fn builtin_chr(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("chr", ARITY_ONE, args.len()));
    }
    let n = match &args[0] {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_error("chr", "int", other.type_name())),
    };
    let c = u32::try_from(n)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| RuntimeError::value("chr", format!("{n} is not a valid code point")))?;
    Ok(Value::str(c.to_string()))
}

#[builtin(name = "hex", category = "string")]
pub fn builtin_hex(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("hex", ARITY_ONE, args.len()));
    }
    let n = match &args[0] {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_error("hex", "int", other.type_name())),
    };
    Ok(Value::str(if n < 0 {
        format!("-0x{:x}", -n)
    } else {
        format!("0x{:x}", n)
    }))
}

#[builtin(name = "bin", category = "string")]
pub fn builtin_bin(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("bin", ARITY_ONE, args.len()));
    }
    let n = match &args[0] {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_error("bin", "int", other.type_name())),
    };
    Ok(Value::str(if n < 0 {
        format!("-0b{:b}", -n)
    } else {
        format!("0b{:b}", n)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_separator() {
        let result = builtin_split(&[Value::str("a,b,c"), Value::str(",")]).unwrap();
        assert_eq!(result.to_string(), "[a, b, c]");
    }

    #[test]
    fn join_with_separator() {
        let list = Value::list(vec![Value::str("a"), Value::str("b")]);
        let result = builtin_join(&[list, Value::str("-")]).unwrap();
        assert_eq!(result.to_string(), "a-b");
    }

    #[test]
    fn substring_out_of_bounds_is_index_error() {
        let err =
            builtin_substring(&[Value::str("hi"), Value::Int(0), Value::Int(5)]).unwrap_err();
        assert!(matches!(err, RuntimeError::Index { .. }));
    }

    #[test]
    fn trim_removes_whitespace() {
        assert_eq!(
            builtin_trim(&[Value::str("  hi  ")]).unwrap().to_string(),
            "hi"
        );
    }

    #[test]
    fn ord_and_chr_round_trip() {
        let code = builtin_ord(&[Value::str("a")]).unwrap();
        assert!(matches!(code, Value::Int(97)));
        let back = builtin_chr(&[code]).unwrap();
        assert_eq!(back.to_string(), "a");
    }

    #[test]
    fn hex_and_bin_format_integers() {
        assert_eq!(builtin_hex(&[Value::Int(255)]).unwrap().to_string(), "0xff");
        assert_eq!(builtin_bin(&[Value::Int(5)]).unwrap().to_string(), "0b101");
    }
}
