//! # Built-in Functions Module
//!
//! Core built-in functions for Flow, organized into categories. Every
//! builtin is a free function annotated with `#[flow_macros::builtin]`,
//! which registers it into this module's `inventory`-backed table. The VM
//! and the tree-walking interpreter both resolve a builtin purely by name
//! lookup against that table — there is no `match name { "sqrt" => ... }`
//! anywhere in the crate.

use crate::error::RuntimeError;
use crate::sandbox::Sandbox;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::OnceLock;

thread_local! {
    static SANDBOX: RefCell<Option<Sandbox>> = const { RefCell::new(None) };
}

/// Initialize the sandbox used by the filesystem builtins.
pub fn set_sandbox_storage(sandbox: Sandbox) {
    SANDBOX.with(|s| {
        *s.borrow_mut() = Some(sandbox);
    });
}

pub(crate) fn with_sandbox<T>(
    f: impl FnOnce(&mut Sandbox) -> Result<T, RuntimeError>,
) -> Result<T, RuntimeError> {
    SANDBOX.with(|s| {
        let mut guard = s.borrow_mut();
        match guard.as_mut() {
            Some(sandbox) => f(sandbox),
            None => Err(RuntimeError::io(
                "filesystem",
                crate::error::ERR_SANDBOX_NOT_INIT,
            )),
        }
    })
}

/// Capability a builtin needs to call back into a Flow function value.
/// Implemented by both `interpreter::Interpreter` and `vm::Vm` so `map`,
/// `filter`, and `reduce` can invoke a callback through either execution
/// mode without the registry knowing which mode is running.
pub trait Host {
    fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, RuntimeError>;
}

pub type BuiltinFn = fn(&[Value], &mut dyn Host) -> Result<Value, RuntimeError>;

pub struct BuiltinEntry {
    pub name: &'static str,
    pub category: &'static str,
    pub func: BuiltinFn,
}

inventory::collect!(BuiltinEntry);

fn registry() -> &'static HashMap<&'static str, BuiltinFn> {
    static REGISTRY: OnceLock<HashMap<&'static str, BuiltinFn>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        inventory::iter::<BuiltinEntry>()
            .map(|entry| (entry.name, entry.func))
            .collect()
    })
}

pub fn lookup(name: &str) -> Option<BuiltinFn> {
    registry().get(name).copied()
}

pub fn call_builtin(
    name: &str,
    args: &[Value],
    host: &mut dyn Host,
) -> Result<Value, RuntimeError> {
    match lookup(name) {
        Some(f) => f(args, host),
        None => Err(RuntimeError::name(name)),
    }
}

/// Names the parser treats as builtin calls at parse time (§4.2's
/// builtin-call-vs-regular-call dispatch). Kept in sync with the
/// `#[builtin(name = "...")]` attributes below by convention, not by
/// reflection: this is a closed, explicit list.
pub const BUILTIN_NAMES: &[&str] = &[
    "sqrt", "pow", "abs", "floor", "ceil", "round", "log", "sin", "cos", "tan", "min", "max",
    "random", "randint", "shuffle", "append", "pop", "range", "len", "reverse", "sort", "sum",
    "contains", "split", "join", "upper", "lower", "trim", "replace", "substring", "ord", "chr",
    "hex", "bin", "str", "int", "float", "bool", "type", "read_file", "write_file", "time",
    "sleep", "json_parse", "json_stringify", "input", "exit",
];

pub mod convert;
pub mod functional;
pub mod io;
pub mod numeric;
pub mod random;
pub mod sequence;
pub mod serialize;
pub mod strings;
pub mod time_builtins;

#[cfg(test)]
mod tests {
    use super::*;

    struct NoHost;
    impl Host for NoHost {
        fn call_value(&mut self, _callee: &Value, _args: Vec<Value>) -> Result<Value, RuntimeError> {
            Err(RuntimeError::other("call_value", "no host in this test"))
        }
    }

    #[test]
    fn unknown_builtin_is_a_name_error() {
        let mut host = NoHost;
        let err = call_builtin("not_a_builtin", &[], &mut host).unwrap_err();
        assert!(matches!(err, RuntimeError::Name { .. }));
    }

    #[test]
    fn registered_builtins_resolve_by_name() {
        assert!(lookup("sqrt").is_some());
        assert!(lookup("json_parse").is_some());
    }

    #[test]
    fn builtin_names_list_matches_registry() {
        for name in BUILTIN_NAMES {
            assert!(lookup(name).is_some(), "missing registration for {name}");
        }
    }
}
