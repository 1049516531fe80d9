//! Filesystem builtins: read_file, write_file
//!
//! Ported from the original source's `read_file`/`write_file`, which keep a
//! manual file-content cache invalidated on write (`builtins.py`'s
//! `_file_cache` dict) in addition to read caching. Both builtins run
//! through the capability-scoped `Sandbox` (ported from the teacher's
//! `cap-std`-based sandbox) rather than touching the filesystem directly.

use crate::builtins::with_sandbox;
use crate::error::{RuntimeError, ARITY_ONE, ARITY_TWO, ARITY_ZERO_OR_ONE};
use crate::value::Value;
use flow_macros::builtin;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::BufRead;

thread_local! {
    static FILE_CACHE: RefCell<HashMap<String, String>> = RefCell::new(HashMap::new());
}

#[builtin(name = "read_file", category = "filesystem")]
pub fn builtin_read_file(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::arity("read_file", ARITY_ONE, args.len()));
    }
    let path = match &args[0] {
        Value::Str(s) => s.to_string(),
        other => {
            return Err(RuntimeError::type_error(
                "read_file",
                "string",
                other.type_name(),
            ))
        }
    };

    if let Some(cached) = FILE_CACHE.with(|c| c.borrow().get(&path).cloned()) {
        return Ok(Value::str(cached));
    }

    let contents = with_sandbox(|sandbox| sandbox.read_to_string(&path).map_err(Into::into))?;
    FILE_CACHE.with(|c| c.borrow_mut().insert(path, contents.clone()));
    Ok(Value::str(contents))
}

#[builtin(name = "write_file", category = "filesystem")]
pub fn builtin_write_file(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 2 {
        return Err(RuntimeError::arity("write_file", ARITY_TWO, args.len()));
    }
    let path = match &args[0] {
        Value::Str(s) => s.to_string(),
        other => {
            return Err(RuntimeError::type_error(
                "write_file",
                "string",
                other.type_name(),
            ))
        }
    };
    let contents = match &args[1] {
        Value::Str(s) => s.to_string(),
        other => {
            return Err(RuntimeError::type_error(
                "write_file",
                "string",
                other.type_name(),
            ))
        }
    };

    with_sandbox(|sandbox| sandbox.write_string(&path, &contents).map_err(Into::into))?;
    FILE_CACHE.with(|c| {
        c.borrow_mut().remove(&path);
    });
    Ok(Value::Nil)
}

/// Reads one line from stdin, trimming the trailing newline. Outside the
/// sandbox's scope — standard input isn't a filesystem capability.
#[builtin(name = "input", category = "io")]
pub fn builtin_input(args: &[Value]) -> Result<Value, RuntimeError> {
    if !args.is_empty() {
        return Err(RuntimeError::arity("input", "0", args.len()));
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| RuntimeError::io("input", e.to_string()))?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Value::str(line))
}

/// Terminates the process immediately with an optional exit code, matching
/// the original source's `sys.exit`. Never returns.
#[builtin(name = "exit", category = "io")]
pub fn builtin_exit(args: &[Value]) -> Result<Value, RuntimeError> {
    let code = match args.len() {
        0 => 0,
        1 => match &args[0] {
            Value::Int(n) => *n as i32,
            other => return Err(RuntimeError::type_error("exit", "int", other.type_name())),
        },
        n => return Err(RuntimeError::arity("exit", ARITY_ZERO_OR_ONE, n)),
    };
    std::process::exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::set_sandbox_storage;
    use crate::sandbox::Sandbox;
    use serial_test::serial;

    #[test]
    #[serial]
    fn write_then_read_round_trips() {
        let dir = tempdir();
        set_sandbox_storage(Sandbox::new(vec![dir.clone()], 1_000_000).unwrap());
        let path = format!("{}/hello.txt", dir);
        builtin_write_file(&[Value::str(path.clone()), Value::str("hi")]).unwrap();
        let result = builtin_read_file(&[Value::str(path)]).unwrap();
        assert_eq!(result.to_string(), "hi");
    }

    #[test]
    #[serial]
    fn write_invalidates_the_read_cache() {
        let dir = tempdir();
        set_sandbox_storage(Sandbox::new(vec![dir.clone()], 1_000_000).unwrap());
        let path = format!("{}/hello.txt", dir);
        builtin_write_file(&[Value::str(path.clone()), Value::str("first")]).unwrap();
        builtin_read_file(&[Value::str(path.clone())]).unwrap();
        builtin_write_file(&[Value::str(path.clone()), Value::str("second")]).unwrap();
        let result = builtin_read_file(&[Value::str(path)]).unwrap();
        assert_eq!(result.to_string(), "second");
    }

    fn tempdir() -> String {
        let mut dir = std::env::temp_dir();
        dir.push(format!("flow-io-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.to_string_lossy().to_string()
    }
}
