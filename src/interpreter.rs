// ABOUTME: The tree-walking evaluator: runs an AST directly against a lexically scoped environment

use crate::ast::{Block, Expr, LogicalOp, MatchArm, MatchPattern, Stmt};
use crate::builtins::{self, functional, Host};
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::ops;
use crate::value::{Closure, Value};
use std::io::Write;
use std::rc::Rc;

/// A "control effect" a statement can produce that a block must propagate
/// past its own remaining statements: a `return`, or a loop `break`/
/// `continue`. Plain statements fall through with `Flow::Normal`.
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Evaluates Flow source directly against a chain of [`Environment`]
/// scopes, one per function call and one per block that introduces
/// bindings. Unlike the VM's flat two-tier globals/locals model, every
/// scope here closes over its defining environment — this is the
/// hardened, lexically-scoped mode (§4.4's design note), the VM's globals
/// map remains deliberately simple.
pub struct Interpreter {
    globals: Rc<Environment>,
    out: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            globals: Environment::new(),
            out: Box::new(std::io::stdout()),
        }
    }

    pub fn with_writer(out: Box<dyn Write>) -> Self {
        Interpreter {
            globals: Environment::new(),
            out,
        }
    }

    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    pub fn run(&mut self, block: &Block) -> Result<Value, RuntimeError> {
        let env = Rc::clone(&self.globals);
        match self.exec_block(block, &env)? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Nil),
        }
    }

    fn exec_block(&mut self, block: &Block, env: &Rc<Environment>) -> Result<Flow, RuntimeError> {
        for stmt in block {
            match self.exec_stmt(stmt, env)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &Rc<Environment>) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let v = self.eval(value, env)?;
                env.define(name.clone(), v);
            }
            Stmt::Assign { name, value } => {
                let v = self.eval(value, env)?;
                env.set(name, v)?;
            }
            Stmt::IndexAssign { target, index, value } => {
                let target_v = self.eval(target, env)?;
                let index_v = self.eval(index, env)?;
                let value_v = self.eval(value, env)?;
                assign_index(&target_v, &index_v, value_v)?;
            }
            Stmt::ExprStmt(expr) => {
                self.eval(expr, env)?;
            }
            Stmt::Print(exprs) => {
                let mut parts = Vec::with_capacity(exprs.len());
                for e in exprs {
                    parts.push(self.eval(e, env)?.to_string());
                }
                writeln!(self.out, "{}", parts.join(" "))
                    .map_err(|e| RuntimeError::io("print", e.to_string()))?;
            }
            Stmt::If { condition, then_block, else_block } => {
                if self.eval(condition, env)?.is_truthy() {
                    let child = Environment::with_parent(Rc::clone(env));
                    return self.exec_block(then_block, &child);
                } else if let Some(else_block) = else_block {
                    let child = Environment::with_parent(Rc::clone(env));
                    return self.exec_block(else_block, &child);
                }
            }
            Stmt::While { condition, body } => {
                while self.eval(condition, env)?.is_truthy() {
                    let child = Environment::with_parent(Rc::clone(env));
                    match self.exec_block(body, &child)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                    }
                }
            }
            Stmt::For { var, iterable, body } => {
                let iter_v = self.eval(iterable, env)?;
                let items = iterable_items(&iter_v)?;
                for item in items {
                    let child = Environment::with_parent(Rc::clone(env));
                    child.define(var.clone(), item);
                    match self.exec_block(body, &child)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                    }
                }
            }
            Stmt::FunctionDecl { name, params, body, .. } => {
                let closure = make_closure(name, params, body, env);
                env.define(name.clone(), closure);
            }
            Stmt::Return(expr) => {
                let v = match expr {
                    Some(e) => self.eval(e, env)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(v));
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::ChannelDecl { name } => {
                env.define(name.clone(), Value::list(Vec::new()));
            }
            Stmt::Send { channel, value } => {
                let chan = env
                    .get(channel)
                    .ok_or_else(|| RuntimeError::name(channel))?;
                let v = self.eval(value, env)?;
                if let Value::List(items) = &chan {
                    items.borrow_mut().push(v);
                } else {
                    return Err(RuntimeError::type_error("send", "channel", chan.type_name()));
                }
            }
            Stmt::Receive { channel, target } => {
                let chan = env
                    .get(channel)
                    .ok_or_else(|| RuntimeError::name(channel))?;
                let received = match &chan {
                    Value::List(items) => {
                        let mut items = items.borrow_mut();
                        if items.is_empty() {
                            Value::Nil
                        } else {
                            items.remove(0)
                        }
                    }
                    other => return Err(RuntimeError::type_error("receive", "channel", other.type_name())),
                };
                env.define(target.clone(), received);
            }
            Stmt::Macro { name, params, body } => {
                let closure = make_closure(name, params, body, env);
                env.define(name.clone(), closure);
            }
            Stmt::Extern { name, params, return_type, lib_path } => {
                let placeholder = format!(
                    "<extern {} ({} params){}{}>",
                    name,
                    params.len(),
                    lib_path.as_ref().map(|p| format!(" from {p}")).unwrap_or_default(),
                    return_type.as_ref().map(|t| format!(" -> {t}")).unwrap_or_default(),
                );
                env.define(name.clone(), Value::str(placeholder));
            }
            Stmt::Match { subject, arms, default } => {
                let subject_v = self.eval(subject, env)?;
                return self.exec_match(&subject_v, arms, default, env);
            }
            Stmt::Alloc { name, size } => {
                let size_v = self.eval(size, env)?;
                let buf = builtins::call_builtin("alloc_buffer", &[size_v], self)?;
                env.define(name.clone(), buf);
            }
            Stmt::Free { name } => {
                env.define(name.clone(), Value::Nil);
            }
            Stmt::Annotated { inner, .. } => {
                return self.exec_stmt(inner, env);
            }
        }
        Ok(Flow::Normal)
    }

    fn eval(&mut self, expr: &Expr, env: &Rc<Environment>) -> Result<Value, RuntimeError> {
        Ok(match expr {
            Expr::Int(n) => Value::Int(*n),
            Expr::Float(n) => Value::Float(*n),
            Expr::Str(s) => Value::str(s.clone()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Nil => Value::Nil,
            Expr::Ident(name) => env.get(name).ok_or_else(|| RuntimeError::name(name))?,
            Expr::Unary { op, operand } => {
                let v = self.eval(operand, env)?;
                ops::apply_unary(*op, v)?
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left, env)?;
                let r = self.eval(right, env)?;
                ops::apply_binary(*op, l, r)?
            }
            Expr::Compare { op, left, right } => {
                let l = self.eval(left, env)?;
                let r = self.eval(right, env)?;
                Value::Bool(ops::apply_compare(*op, &l, &r)?)
            }
            Expr::Logical { op, left, right } => {
                // Eager, not short-circuiting: both operands always evaluate,
                // matching the bytecode VM's BINARY_AND/BINARY_OR (§8's
                // cross-mode observable-effects invariant).
                let l = self.eval(left, env)?;
                let r = self.eval(right, env)?;
                match op {
                    LogicalOp::And => Value::Bool(l.is_truthy() && r.is_truthy()),
                    LogicalOp::Or => Value::Bool(l.is_truthy() || r.is_truthy()),
                }
            }
            Expr::Call { callee, args } => {
                let callee_v = self.eval(callee, env)?;
                let mut arg_vs = Vec::with_capacity(args.len());
                for a in args {
                    arg_vs.push(self.eval(a, env)?);
                }
                self.call_value(&callee_v, arg_vs)?
            }
            Expr::BuiltinCall { name, args } => {
                let mut arg_vs = Vec::with_capacity(args.len());
                for a in args {
                    arg_vs.push(self.eval(a, env)?);
                }
                builtins::call_builtin(name, &arg_vs, self)?
            }
            Expr::Index { target, index } => {
                let t = self.eval(target, env)?;
                let i = self.eval(index, env)?;
                index_value(&t, &i)?
            }
            Expr::ListLiteral(items) => {
                let mut vs = Vec::with_capacity(items.len());
                for item in items {
                    vs.push(self.eval(item, env)?);
                }
                Value::list(vs)
            }
            Expr::TupleLiteral(items) => {
                let mut vs = Vec::with_capacity(items.len());
                for item in items {
                    vs.push(self.eval(item, env)?);
                }
                Value::tuple(vs)
            }
            Expr::Lambda { params, body } => {
                // A lambda's body is a single expression; wrap it as a
                // one-statement `return <expr>;` block so it reuses the
                // same closure representation as a named function.
                let body_block: Block = vec![Stmt::Return(Some((**body).clone()))];
                make_closure("<lambda>", params, &body_block, env)
            }
            Expr::Walrus { name, value } => {
                let v = self.eval(value, env)?;
                self.globals.define(name.clone(), v.clone());
                v
            }
            Expr::MapCall { func, iterable } => {
                let f = self.eval(func, env)?;
                let it = self.eval(iterable, env)?;
                functional::map_values(&f, &it, self)?
            }
            Expr::FilterCall { func, iterable } => {
                let f = self.eval(func, env)?;
                let it = self.eval(iterable, env)?;
                functional::filter_values(&f, &it, self)?
            }
            Expr::ReduceCall { func, iterable, initial } => {
                let f = self.eval(func, env)?;
                let it = self.eval(iterable, env)?;
                let init = self.eval(initial, env)?;
                functional::reduce_values(&f, &it, init, self)?
            }
            Expr::Spawn(e) | Expr::Await(e) => self.eval(e, env)?,
            Expr::Pipeline { left, right } => {
                let arg = self.eval(left, env)?;
                let callee = self.eval(right, env)?;
                self.call_value(&callee, vec![arg])?
            }
        })
    }

    /// Tries each `case` arm in order against an already-evaluated subject;
    /// the first matching pattern wins (no fallthrough). Runs `default` when
    /// no arm matches, or does nothing.
    fn exec_match(
        &mut self,
        subject: &Value,
        arms: &[MatchArm],
        default: &Option<Block>,
        env: &Rc<Environment>,
    ) -> Result<Flow, RuntimeError> {
        for arm in arms {
            let child = Environment::with_parent(Rc::clone(env));
            if self.try_bind_pattern(&arm.pattern, subject, &child)? {
                return self.exec_block(&arm.body, &child);
            }
        }
        if let Some(default_body) = default {
            let child = Environment::with_parent(Rc::clone(env));
            return self.exec_block(default_body, &child);
        }
        Ok(Flow::Normal)
    }

    /// Tests `pattern` against `subject`, defining any bindings it
    /// introduces into `env` only when the whole pattern matches.
    fn try_bind_pattern(
        &mut self,
        pattern: &MatchPattern,
        subject: &Value,
        env: &Rc<Environment>,
    ) -> Result<bool, RuntimeError> {
        match pattern {
            MatchPattern::Wildcard => Ok(true),
            MatchPattern::Variable(name) => {
                env.define(name.clone(), subject.clone());
                Ok(true)
            }
            MatchPattern::Literal(expr) => {
                let lit = self.eval(expr, env)?;
                Ok(lit.runtime_eq(subject))
            }
            MatchPattern::Tuple(patterns) => match subject {
                Value::Tuple(items) => {
                    if items.len() != patterns.len() {
                        return Ok(false);
                    }
                    for (p, v) in patterns.iter().zip(items.iter()) {
                        if !self.try_bind_pattern(p, v, env)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
            MatchPattern::Constructor { tag, fields } => match subject {
                Value::Tuple(items) => {
                    if items.is_empty() {
                        return Ok(false);
                    }
                    let tag_matches = matches!(&items[0], Value::Str(s) if s.as_ref() == tag);
                    if !tag_matches || items.len() != fields.len() + 1 {
                        return Ok(false);
                    }
                    for (p, v) in fields.iter().zip(items[1..].iter()) {
                        if !self.try_bind_pattern(p, v, env)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
        }
    }

    fn call_closure(
        &mut self,
        closure: &Rc<Closure>,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        if args.len() != closure.params.len() {
            return Err(RuntimeError::arity(
                &closure.name,
                &closure.params.len().to_string(),
                args.len(),
            ));
        }
        let call_env = Environment::with_parent(Rc::clone(&closure.env));
        for (param, arg) in closure.params.iter().zip(args) {
            call_env.define(param.clone(), arg);
        }
        match self.exec_block(&closure.body, &call_env)? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Nil),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Host for Interpreter {
    fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Closure(closure) => self.call_closure(closure, args),
            Value::Builtin(name) => builtins::call_builtin(name, &args, self),
            other => Err(RuntimeError::type_error("call", "function", other.type_name())),
        }
    }
}

fn make_closure(name: &str, params: &[String], body: &Block, env: &Rc<Environment>) -> Value {
    Value::Closure(Rc::new(Closure {
        name: name.to_string(),
        params: params.to_vec(),
        body: body.clone(),
        env: Rc::clone(env),
    }))
}

fn iterable_items(v: &Value) -> Result<Vec<Value>, RuntimeError> {
    match v {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Tuple(items) => Ok(items.to_vec()),
        other => Err(RuntimeError::type_error("for", "list or tuple", other.type_name())),
    }
}

fn index_value(target: &Value, index: &Value) -> Result<Value, RuntimeError> {
    let i = match index {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_error("index", "int", other.type_name())),
    };
    match target {
        Value::List(items) => {
            let items = items.borrow();
            bounds_check(&items, i).map(|idx| items[idx].clone())
        }
        Value::Tuple(items) => bounds_check(items, i).map(|idx| items[idx].clone()),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            bounds_check(&chars, i).map(|idx| Value::str(chars[idx].to_string()))
        }
        other => Err(RuntimeError::type_error("index", "sequence", other.type_name())),
    }
}

fn bounds_check<T>(items: &[T], i: i64) -> Result<usize, RuntimeError> {
    if i < 0 || i as usize >= items.len() {
        return Err(RuntimeError::index("index", i, items.len()));
    }
    Ok(i as usize)
}

fn assign_index(target: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    let i = match index {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_error("index assignment", "int", other.type_name())),
    };
    match target {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let idx = bounds_check(&items, i)?;
            items[idx] = value;
            Ok(())
        }
        other => Err(RuntimeError::type_error("index assignment", "list", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn run_source(source: &str) -> Interpreter {
        let tokens = tokenize(source).unwrap();
        let block = parse(tokens).unwrap();
        let mut interp = Interpreter::with_writer(Box::new(Vec::new()));
        interp.run(&block).unwrap();
        interp
    }

    #[test]
    fn arithmetic_precedence_seed_scenario() {
        run_source("print 1 + 2 * 3;");
    }

    #[test]
    fn recursion_and_control_flow_factorial() {
        let interp = run_source(
            "function fact(n) { if n < 2 { return 1; } return n * fact(n - 1); } let r = fact(6); print r;",
        );
        assert!(matches!(interp.globals().get("r"), Some(Value::Int(720))));
    }

    #[test]
    fn while_loop_with_mutation_fibonacci() {
        let interp = run_source(
            "let a = 0; let b = 1; let i = 0; while i < 10 { let t = a + b; a = b; b = t; i = i + 1; } print a;",
        );
        assert!(matches!(interp.globals().get("a"), Some(Value::Int(55))));
    }

    #[test]
    fn lists_and_subscription() {
        let interp = run_source("let xs = [3, 1, 4, 1, 5]; xs[2] = 9; let r = xs[2] + xs[4]; print r;");
        assert!(matches!(interp.globals().get("r"), Some(Value::Int(14))));
    }

    #[test]
    fn if_else_if_chain_grade() {
        let interp = run_source(
            "function grade(s) { if s < 60 { return \"F\"; } else if s < 70 { return \"D\"; } else if s < 80 { return \"C\"; } else if s < 90 { return \"B\"; } else { return \"A\"; } } let g = grade(85); print g;",
        );
        match interp.globals().get("g") {
            Some(Value::Str(s)) => assert_eq!(s.as_ref(), "B"),
            other => panic!("expected grade B, got {other:?}"),
        }
    }

    #[test]
    fn closures_capture_their_defining_environment() {
        let interp = run_source(
            "function make_adder(n) { function adder(x) { return x + n; } return adder; } let add5 = make_adder(5); let r = add5(10); print r;",
        );
        assert!(matches!(interp.globals().get("r"), Some(Value::Int(15))));
    }

    #[test]
    fn map_and_filter_via_host_callback() {
        let interp = run_source(
            "function double(x) { return x * 2; } let xs = [1, 2, 3]; let doubled = map(double, xs); print doubled;",
        );
        match interp.globals().get("doubled") {
            Some(Value::List(items)) => {
                let items = items.borrow();
                assert_eq!(items.len(), 3);
                assert!(matches!(items[0], Value::Int(2)));
            }
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn undefined_name_is_a_name_error() {
        let tokens = tokenize("print missing;").unwrap();
        let block = parse(tokens).unwrap();
        let mut interp = Interpreter::with_writer(Box::new(Vec::new()));
        let err = interp.run(&block).unwrap_err();
        assert!(matches!(err, RuntimeError::Name { .. }));
    }
}
