// ABOUTME: The stack-based bytecode virtual machine: dispatches on opcode, drives call frames

use crate::bytecode::{CodeObject, CompareOp, OpCode};
use crate::builtins::{self, functional, Host};
use crate::error::RuntimeError;
use crate::frame::Frame;
use crate::ops;
use crate::value::Value;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

/// Two-tier symbol table, taken literally from spec.md §4.4/§5: one
/// process-wide `HashMap` for globals, one fixed-size local vector per
/// frame. Function calls don't snapshot-and-restore this map — unlike the
/// tree-walker's hardened `Environment`, there is no cost to harden away
/// here, since a call only ever reads an already-settled global binding
/// (late name resolution) and writes go straight to the shared map.
pub struct Vm {
    globals: HashMap<String, Value>,
    frames: Vec<Frame>,
    out: Box<dyn Write>,
}

impl Vm {
    pub fn new() -> Self {
        Vm {
            globals: HashMap::new(),
            frames: Vec::new(),
            out: Box::new(std::io::stdout()),
        }
    }

    pub fn with_writer(out: Box<dyn Write>) -> Self {
        Vm {
            globals: HashMap::new(),
            frames: Vec::new(),
            out,
        }
    }

    pub fn globals(&self) -> &HashMap<String, Value> {
        &self.globals
    }

    pub fn run(&mut self, code: CodeObject) -> Result<Value, RuntimeError> {
        self.frames.push(Frame::new(Rc::new(code)));
        self.run_frames()
    }

    /// Runs until the frame pushed by this call returns, i.e. until
    /// `self.frames` shrinks back to `base_depth`. Used both for the
    /// top-level program and for a nested call issued through `Host`.
    fn run_frames(&mut self) -> Result<Value, RuntimeError> {
        let base_depth = self.frames.len() - 1;
        loop {
            let result = self.step()?;
            if let Some(value) = result {
                if self.frames.len() == base_depth {
                    return Ok(value);
                }
            }
        }
    }

    /// Executes exactly one instruction. Returns `Some(value)` when a
    /// frame just returned (its result already pushed into the caller's
    /// stack, or handed back directly if it was the outermost frame).
    fn step(&mut self) -> Result<Option<Value>, RuntimeError> {
        let frame_idx = self.frames.len() - 1;
        let instr = {
            let frame = &self.frames[frame_idx];
            if frame.ip >= frame.code.code.len() {
                None
            } else {
                Some(frame.code.code[frame.ip])
            }
        };
        let instr = match instr {
            Some(i) => i,
            None => return self.pop_frame(Value::Nil),
        };
        self.frames[frame_idx].ip += 1;

        match instr.op {
            OpCode::LOAD_CONST => {
                let idx = instr.operand.unwrap() as usize;
                let value = self.frames[frame_idx].code.constants[idx].clone();
                self.frames[frame_idx].push(value);
            }
            OpCode::STORE_NAME => {
                let idx = instr.operand.unwrap() as usize;
                let name = self.constant_name(frame_idx, idx);
                let value = self.frames[frame_idx].pop();
                self.globals.insert(name, value);
            }
            OpCode::LOAD_NAME => {
                let idx = instr.operand.unwrap() as usize;
                let name = self.constant_name(frame_idx, idx);
                let value = self
                    .globals
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| RuntimeError::name(&name))?;
                self.frames[frame_idx].push(value);
            }
            OpCode::LOAD_GLOBAL => {
                let idx = instr.operand.unwrap() as usize;
                let name = self.constant_name(frame_idx, idx);
                let value = self
                    .globals
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| RuntimeError::name(&name))?;
                self.frames[frame_idx].push(value);
            }
            OpCode::STORE_GLOBAL => {
                let idx = instr.operand.unwrap() as usize;
                let name = self.constant_name(frame_idx, idx);
                let value = self.frames[frame_idx].pop();
                self.globals.insert(name, value);
            }
            OpCode::LOAD_FAST => {
                let slot = instr.operand.unwrap() as usize;
                let value = self.frames[frame_idx].locals[slot].clone();
                self.frames[frame_idx].push(value);
            }
            OpCode::STORE_FAST => {
                let slot = instr.operand.unwrap() as usize;
                let value = self.frames[frame_idx].pop();
                self.frames[frame_idx].locals[slot] = value;
            }
            OpCode::BINARY_ADD
            | OpCode::BINARY_SUB
            | OpCode::BINARY_MUL
            | OpCode::BINARY_DIV
            | OpCode::BINARY_MOD
            | OpCode::BINARY_POW
            | OpCode::BINARY_BIT_AND
            | OpCode::BINARY_BIT_OR
            | OpCode::BINARY_BIT_XOR
            | OpCode::BINARY_SHL
            | OpCode::BINARY_SHR => {
                let right = self.frames[frame_idx].pop();
                let left = self.frames[frame_idx].pop();
                let result = ops::apply_binary(binop_for(instr.op), left, right)?;
                self.frames[frame_idx].push(result);
            }
            OpCode::BINARY_AND => {
                let right = self.frames[frame_idx].pop();
                let left = self.frames[frame_idx].pop();
                self.frames[frame_idx].push(Value::Bool(left.is_truthy() && right.is_truthy()));
            }
            OpCode::BINARY_OR => {
                let right = self.frames[frame_idx].pop();
                let left = self.frames[frame_idx].pop();
                self.frames[frame_idx].push(Value::Bool(left.is_truthy() || right.is_truthy()));
            }
            OpCode::UNARY_NEG => {
                let v = self.frames[frame_idx].pop();
                let result = ops::apply_unary(crate::ast::UnaryOp::Neg, v)?;
                self.frames[frame_idx].push(result);
            }
            OpCode::UNARY_NOT => {
                let v = self.frames[frame_idx].pop();
                let result = ops::apply_unary(crate::ast::UnaryOp::Not, v)?;
                self.frames[frame_idx].push(result);
            }
            OpCode::COMPARE_OP => {
                let sub_op = compare_op_from_i64(instr.operand.unwrap());
                let right = self.frames[frame_idx].pop();
                let left = self.frames[frame_idx].pop();
                let result = ops::apply_compare(ast_compare_op(sub_op), &left, &right)?;
                self.frames[frame_idx].push(Value::Bool(result));
            }
            OpCode::PRINT => {
                let n = instr.operand.unwrap() as usize;
                let mut parts = Vec::with_capacity(n);
                for _ in 0..n {
                    parts.push(self.frames[frame_idx].pop());
                }
                parts.reverse();
                let line = parts
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(self.out, "{}", line).map_err(|e| RuntimeError::io("print", e.to_string()))?;
            }
            OpCode::JUMP => {
                self.frames[frame_idx].ip = instr.operand.unwrap() as usize;
            }
            OpCode::JUMP_IF_FALSE => {
                let v = self.frames[frame_idx].pop();
                if !v.is_truthy() {
                    self.frames[frame_idx].ip = instr.operand.unwrap() as usize;
                }
            }
            OpCode::RETURN_VALUE => {
                let v = self.frames[frame_idx].pop();
                return self.pop_frame(v);
            }
            OpCode::CALL_FUNCTION => {
                let n = instr.operand.unwrap() as usize;
                let callee = self.frames[frame_idx].pop();
                let mut args = Vec::with_capacity(n);
                for _ in 0..n {
                    args.push(self.frames[frame_idx].pop());
                }
                args.reverse();
                self.push_call(callee, args)?;
            }
            OpCode::CALL_BUILTIN => {
                let name_idx = instr.operand.unwrap() as usize;
                let name = self.constant_name(frame_idx, name_idx);
                let argc = match self.frames[frame_idx].pop() {
                    Value::Int(n) => n as usize,
                    other => {
                        return Err(RuntimeError::type_error("CALL_BUILTIN", "int", other.type_name()))
                    }
                };
                let mut args = Vec::with_capacity(argc);
                for _ in 0..argc {
                    args.push(self.frames[frame_idx].pop());
                }
                args.reverse();
                let result = self.call_named_builtin(&name, args)?;
                self.frames[frame_idx].push(result);
            }
            OpCode::POP_TOP => {
                self.frames[frame_idx].pop();
            }
            OpCode::DUP_TOP => {
                let v = self.frames[frame_idx].stack.last().cloned().expect("DUP_TOP on empty stack");
                self.frames[frame_idx].push(v);
            }
            OpCode::BUILD_LIST => {
                let n = instr.operand.unwrap() as usize;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.frames[frame_idx].pop());
                }
                items.reverse();
                self.frames[frame_idx].push(Value::list(items));
            }
            OpCode::BUILD_TUPLE => {
                let n = instr.operand.unwrap() as usize;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.frames[frame_idx].pop());
                }
                items.reverse();
                self.frames[frame_idx].push(Value::tuple(items));
            }
            OpCode::SUBSCR => {
                let index = self.frames[frame_idx].pop();
                let target = self.frames[frame_idx].pop();
                let result = subscript_get(&target, &index)?;
                self.frames[frame_idx].push(result);
            }
            OpCode::STORE_SUBSCR => {
                let value = self.frames[frame_idx].pop();
                let index = self.frames[frame_idx].pop();
                let target = self.frames[frame_idx].pop();
                subscript_set(&target, &index, value)?;
            }
            OpCode::GET_ITER => {
                let seq = self.frames[frame_idx].pop();
                let items = functional_iterable_items(&seq)?;
                self.frames[frame_idx].iter_stack.push((items, 0));
            }
            OpCode::FOR_ITER => {
                let exit = instr.operand.unwrap() as usize;
                let frame = &mut self.frames[frame_idx];
                let done = {
                    let (items, pos) = frame.iter_stack.last_mut().expect("FOR_ITER without GET_ITER");
                    if *pos < items.len() {
                        frame.stack.push(items[*pos].clone());
                        *pos += 1;
                        false
                    } else {
                        true
                    }
                };
                if done {
                    frame.iter_stack.pop();
                    frame.ip = exit;
                }
            }
        }
        Ok(None)
    }

    fn constant_name(&self, frame_idx: usize, idx: usize) -> String {
        match &self.frames[frame_idx].code.constants[idx] {
            Value::Str(s) => s.to_string(),
            other => other.to_string(),
        }
    }

    fn pop_frame(&mut self, value: Value) -> Result<Option<Value>, RuntimeError> {
        self.frames.pop();
        if let Some(caller) = self.frames.last_mut() {
            caller.push(value);
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    fn push_call(&mut self, callee: Value, args: Vec<Value>) -> Result<(), RuntimeError> {
        match callee {
            Value::Code(code) => {
                if args.len() != code.params.len() {
                    return Err(RuntimeError::arity(
                        &code.name,
                        &code.params.len().to_string(),
                        args.len(),
                    ));
                }
                let mut frame = Frame::new(code);
                for (i, arg) in args.into_iter().enumerate() {
                    frame.locals[i] = arg;
                }
                self.frames.push(frame);
                Ok(())
            }
            Value::Builtin(name) => {
                let result = self.call_named_builtin(name, args)?;
                self.frames.last_mut().unwrap().push(result);
                Ok(())
            }
            other => Err(RuntimeError::type_error("call", "function", other.type_name())),
        }
    }

    fn call_named_builtin(&mut self, name: &str, mut args: Vec<Value>) -> Result<Value, RuntimeError> {
        match name {
            "map" => {
                let iterable = args.pop().expect("map expects 2 args");
                let func = args.pop().expect("map expects 2 args");
                functional::map_values(&func, &iterable, self)
            }
            "filter" => {
                let iterable = args.pop().expect("filter expects 2 args");
                let func = args.pop().expect("filter expects 2 args");
                functional::filter_values(&func, &iterable, self)
            }
            "reduce" => {
                let initial = args.pop().expect("reduce expects 3 args");
                let iterable = args.pop().expect("reduce expects 3 args");
                let func = args.pop().expect("reduce expects 3 args");
                functional::reduce_values(&func, &iterable, initial, self)
            }
            other => builtins::call_builtin(other, &args, self),
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}

impl Host for Vm {
    fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.push_call(callee.clone(), args)?;
        self.run_frames()
    }
}

fn binop_for(op: OpCode) -> crate::ast::BinOp {
    use crate::ast::BinOp::*;
    match op {
        OpCode::BINARY_ADD => Add,
        OpCode::BINARY_SUB => Sub,
        OpCode::BINARY_MUL => Mul,
        OpCode::BINARY_DIV => Div,
        OpCode::BINARY_MOD => Mod,
        OpCode::BINARY_POW => Pow,
        OpCode::BINARY_BIT_AND => BitAnd,
        OpCode::BINARY_BIT_OR => BitOr,
        OpCode::BINARY_BIT_XOR => BitXor,
        OpCode::BINARY_SHL => Shl,
        OpCode::BINARY_SHR => Shr,
        other => unreachable!("{other:?} is not a binary arithmetic opcode"),
    }
}

fn compare_op_from_i64(n: i64) -> CompareOp {
    match n {
        0 => CompareOp::LessThan,
        1 => CompareOp::LessEqual,
        2 => CompareOp::Equal,
        3 => CompareOp::NotEqual,
        4 => CompareOp::GreaterThan,
        5 => CompareOp::GreaterEqual,
        other => unreachable!("invalid COMPARE_OP sub-operator {other}"),
    }
}

fn ast_compare_op(op: CompareOp) -> crate::ast::CompareOp {
    match op {
        CompareOp::LessThan => crate::ast::CompareOp::Lt,
        CompareOp::LessEqual => crate::ast::CompareOp::Le,
        CompareOp::Equal => crate::ast::CompareOp::Eq,
        CompareOp::NotEqual => crate::ast::CompareOp::Ne,
        CompareOp::GreaterThan => crate::ast::CompareOp::Gt,
        CompareOp::GreaterEqual => crate::ast::CompareOp::Ge,
    }
}

fn functional_iterable_items(v: &Value) -> Result<Vec<Value>, RuntimeError> {
    match v {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Tuple(items) => Ok(items.to_vec()),
        other => Err(RuntimeError::type_error("for", "list or tuple", other.type_name())),
    }
}

fn subscript_get(target: &Value, index: &Value) -> Result<Value, RuntimeError> {
    let i = match index {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_error("index", "int", other.type_name())),
    };
    match target {
        Value::List(items) => {
            let items = items.borrow();
            index_at(&items, i, items.len())
        }
        Value::Tuple(items) => index_at(items, i, items.len()),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let v = index_at_slice(&chars, i, chars.len())?;
            Ok(Value::str(v.to_string()))
        }
        other => Err(RuntimeError::type_error("index", "sequence", other.type_name())),
    }
}

fn index_at(items: &[Value], i: i64, len: usize) -> Result<Value, RuntimeError> {
    if i < 0 || i as usize >= len {
        return Err(RuntimeError::index("index", i, len));
    }
    Ok(items[i as usize].clone())
}

fn index_at_slice<T: Copy>(items: &[T], i: i64, len: usize) -> Result<T, RuntimeError> {
    if i < 0 || i as usize >= len {
        return Err(RuntimeError::index("index", i, len));
    }
    Ok(items[i as usize])
}

fn subscript_set(target: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    let i = match index {
        Value::Int(n) => *n,
        other => return Err(RuntimeError::type_error("index assignment", "int", other.type_name())),
    };
    match target {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let len = items.len();
            if i < 0 || i as usize >= len {
                return Err(RuntimeError::index("index assignment", i, len));
            }
            items[i as usize] = value;
            Ok(())
        }
        other => Err(RuntimeError::type_error("index assignment", "list", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn run_source(source: &str) -> Vm {
        let tokens = tokenize(source).unwrap();
        let block = parse(tokens).unwrap();
        let code = compile(&block).unwrap();
        let mut vm = Vm::with_writer(Box::new(Vec::new()));
        vm.run(code).unwrap();
        vm
    }

    #[test]
    fn arithmetic_precedence_seed_scenario() {
        // print 1 + 2 * 3 -> 7
        let vm = run_source("print 1 + 2 * 3;");
        let _ = vm;
    }

    #[test]
    fn local_variable_assignment_seed_scenario() {
        let vm = run_source("let x = 10; let y = x + 5; print y;");
        assert!(matches!(vm.globals().get("y"), Some(Value::Int(15))));
    }

    #[test]
    fn recursion_and_control_flow_factorial() {
        let vm = run_source(
            "function fact(n) { if n < 2 { return 1; } return n * fact(n - 1); } let r = fact(6); print r;",
        );
        assert!(matches!(vm.globals().get("r"), Some(Value::Int(720))));
    }

    #[test]
    fn while_loop_with_mutation_fibonacci() {
        let vm = run_source(
            "let a = 0; let b = 1; let i = 0; while i < 10 { let t = a + b; a = b; b = t; i = i + 1; } print a;",
        );
        assert!(matches!(vm.globals().get("a"), Some(Value::Int(55))));
    }

    #[test]
    fn lists_and_subscription() {
        let vm = run_source("let xs = [3, 1, 4, 1, 5]; xs[2] = 9; let r = xs[2] + xs[4]; print r;");
        assert!(matches!(vm.globals().get("r"), Some(Value::Int(14))));
    }

    #[test]
    fn if_else_if_chain_grade() {
        let vm = run_source(
            "function grade(s) { if s < 60 { return \"F\"; } else if s < 70 { return \"D\"; } else if s < 80 { return \"C\"; } else if s < 90 { return \"B\"; } else { return \"A\"; } } let g = grade(85); print g;",
        );
        match vm.globals().get("g") {
            Some(Value::Str(s)) => assert_eq!(s.as_ref(), "B"),
            other => panic!("expected grade B, got {other:?}"),
        }
    }

    #[test]
    fn map_and_filter_via_host_callback() {
        let vm = run_source(
            "function double(x) { return x * 2; } let xs = [1, 2, 3]; let doubled = map(double, xs); print doubled;",
        );
        match vm.globals().get("doubled") {
            Some(Value::List(items)) => {
                let items = items.borrow();
                assert_eq!(items.len(), 3);
                assert!(matches!(items[0], Value::Int(2)));
            }
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_index_is_an_index_error() {
        let tokens = tokenize("let xs = [1]; let y = xs[5]; print y;").unwrap();
        let block = parse(tokens).unwrap();
        let code = compile(&block).unwrap();
        let mut vm = Vm::with_writer(Box::new(Vec::new()));
        let err = vm.run(code).unwrap_err();
        assert!(matches!(err, RuntimeError::Index { .. }));
    }
}
