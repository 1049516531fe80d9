// ABOUTME: Lowers the syntax tree to a CodeObject, assigning local slots and backpatching jumps

use crate::ast::{BinOp, Block, CompareOp as AstCompareOp, Expr, LogicalOp, MatchPattern, Stmt, UnaryOp};
use crate::bytecode::{CodeObject, CompareOp, Instruction, OpCode};
use crate::error::CompileError;
use crate::value::Value;
use std::collections::HashMap;
use std::rc::Rc;

type CResult<T> = Result<T, CompileError>;

/// One function's local-slot table. The outermost (module) compiler has no
/// `Scope`: every name there resolves through `LOAD_NAME`/`STORE_NAME`
/// against the VM's globals map instead of a slot.
struct Scope {
    slots: HashMap<String, usize>,
}

/// Tracks the jump sites a `break`/`continue` inside the current loop needs
/// patched once the loop's bounds are known.
struct LoopCtx {
    continue_target: usize,
    break_jumps: Vec<usize>,
}

pub struct Compiler {
    code: CodeObject,
    scope: Option<Scope>,
    loop_stack: Vec<LoopCtx>,
    temp_counter: usize,
}

impl Compiler {
    fn new_module() -> Self {
        Compiler {
            code: CodeObject::new("<module>"),
            scope: None,
            loop_stack: Vec::new(),
            temp_counter: 0,
        }
    }

    fn new_function(name: &str, params: &[String]) -> Self {
        let mut code = CodeObject::new(name);
        let mut slots = HashMap::new();
        for (i, p) in params.iter().enumerate() {
            slots.insert(p.clone(), i);
            code.local_names.push(p.clone());
        }
        code.params = params.to_vec();
        code.num_locals = params.len();
        Compiler {
            code,
            scope: Some(Scope { slots }),
            loop_stack: Vec::new(),
            temp_counter: 0,
        }
    }

    fn add_constant(&mut self, value: Value) -> usize {
        if let Some(idx) = self
            .code
            .constants
            .iter()
            .position(|c| c.const_eq(&value))
        {
            return idx;
        }
        self.code.constants.push(value);
        self.code.constants.len() - 1
    }

    fn here(&self) -> usize {
        self.code.code.len()
    }

    fn emit(&mut self, op: OpCode, operand: i64) -> usize {
        self.code.code.push(Instruction::new(op, Some(operand)));
        self.here() - 1
    }

    fn emit_simple(&mut self, op: OpCode) -> usize {
        self.code.code.push(Instruction::simple(op));
        self.here() - 1
    }

    fn patch(&mut self, index: usize, target: usize) {
        self.code.code[index].operand = Some(target as i64);
    }

    fn new_temp(&mut self) -> String {
        let name = format!("__match_tmp_{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    fn declare_local(&mut self, name: &str) -> usize {
        let scope = self.scope.as_mut().expect("declare_local outside a function scope");
        if let Some(&slot) = scope.slots.get(name) {
            return slot;
        }
        let slot = self.code.local_names.len();
        scope.slots.insert(name.to_string(), slot);
        self.code.local_names.push(name.to_string());
        self.code.num_locals = self.code.local_names.len();
        slot
    }

    fn local_slot(&self, name: &str) -> Option<usize> {
        self.scope.as_ref().and_then(|s| s.slots.get(name).copied())
    }

    fn compile_name_load(&mut self, name: &str) {
        if let Some(slot) = self.local_slot(name) {
            self.emit(OpCode::LOAD_FAST, slot as i64);
        } else {
            let idx = self.add_constant(Value::str(name));
            self.emit(OpCode::LOAD_NAME, idx as i64);
        }
    }

    /// `let`/`mut` binding: allocates a fresh slot (or reuses the existing
    /// one for the same name) inside a function, falls back to a global
    /// `STORE_NAME` at module scope.
    fn compile_declare_store(&mut self, name: &str) {
        if self.scope.is_some() {
            let slot = self.declare_local(name);
            self.emit(OpCode::STORE_FAST, slot as i64);
        } else {
            let idx = self.add_constant(Value::str(name));
            self.emit(OpCode::STORE_NAME, idx as i64);
        }
    }

    /// Plain assignment: writes to an already-declared local if one exists,
    /// otherwise a global — it never allocates a new slot.
    fn compile_assign_store(&mut self, name: &str) {
        if let Some(slot) = self.local_slot(name) {
            self.emit(OpCode::STORE_FAST, slot as i64);
        } else {
            let idx = self.add_constant(Value::str(name));
            self.emit(OpCode::STORE_NAME, idx as i64);
        }
    }

    /// Walrus assignment: always targets the VM's global map, even from
    /// inside a function body, bypassing local-slot resolution entirely.
    fn compile_global_store(&mut self, name: &str) {
        let idx = self.add_constant(Value::str(name));
        self.emit(OpCode::STORE_NAME, idx as i64);
    }

    fn compile_block(&mut self, block: &Block) -> CResult<()> {
        for stmt in block {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> CResult<()> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                self.compile_expr(value)?;
                self.compile_declare_store(name);
            }
            Stmt::Assign { name, value } => {
                self.compile_expr(value)?;
                self.compile_assign_store(name);
            }
            Stmt::IndexAssign { target, index, value } => {
                self.compile_expr(target)?;
                self.compile_expr(index)?;
                self.compile_expr(value)?;
                self.emit_simple(OpCode::STORE_SUBSCR);
            }
            Stmt::ExprStmt(expr) => {
                self.compile_expr(expr)?;
                self.emit_simple(OpCode::POP_TOP);
            }
            Stmt::Print(exprs) => {
                for e in exprs {
                    self.compile_expr(e)?;
                }
                self.emit(OpCode::PRINT, exprs.len() as i64);
            }
            Stmt::If { condition, then_block, else_block } => {
                self.compile_expr(condition)?;
                let jif = self.emit(OpCode::JUMP_IF_FALSE, -1);
                self.compile_block(then_block)?;
                let jend = self.emit(OpCode::JUMP, -1);
                let else_start = self.here();
                self.patch(jif, else_start);
                if let Some(else_block) = else_block {
                    self.compile_block(else_block)?;
                }
                let end = self.here();
                self.patch(jend, end);
            }
            Stmt::While { condition, body } => {
                let loop_start = self.here();
                self.compile_expr(condition)?;
                let jexit = self.emit(OpCode::JUMP_IF_FALSE, -1);
                self.loop_stack.push(LoopCtx {
                    continue_target: loop_start,
                    break_jumps: Vec::new(),
                });
                self.compile_block(body)?;
                self.emit(OpCode::JUMP, loop_start as i64);
                let exit = self.here();
                self.patch(jexit, exit);
                let ctx = self.loop_stack.pop().expect("loop_stack underflow");
                for idx in ctx.break_jumps {
                    self.patch(idx, exit);
                }
            }
            Stmt::For { var, iterable, body } => {
                self.compile_expr(iterable)?;
                self.emit_simple(OpCode::GET_ITER);
                let loop_start = self.here();
                let jexit = self.emit(OpCode::FOR_ITER, -1);
                self.compile_declare_store(var);
                self.loop_stack.push(LoopCtx {
                    continue_target: loop_start,
                    break_jumps: Vec::new(),
                });
                self.compile_block(body)?;
                self.emit(OpCode::JUMP, loop_start as i64);
                let exit = self.here();
                self.patch(jexit, exit);
                let ctx = self.loop_stack.pop().expect("loop_stack underflow");
                for idx in ctx.break_jumps {
                    self.patch(idx, exit);
                }
            }
            Stmt::FunctionDecl { name, params, body, .. } => {
                let mut func_compiler = Compiler::new_function(name, params);
                func_compiler.compile_block(body)?;
                // Fall off the end of the body returning nil, matching a
                // function with no explicit `return`.
                let nil_idx = func_compiler.add_constant(Value::Nil);
                func_compiler.emit(OpCode::LOAD_CONST, nil_idx as i64);
                func_compiler.emit_simple(OpCode::RETURN_VALUE);
                let code = Rc::new(func_compiler.code);
                let idx = self.add_constant(Value::Code(code));
                self.emit(OpCode::LOAD_CONST, idx as i64);
                self.compile_declare_store(name);
            }
            Stmt::Return(expr) => {
                match expr {
                    Some(e) => self.compile_expr(e)?,
                    None => {
                        let idx = self.add_constant(Value::Nil);
                        self.emit(OpCode::LOAD_CONST, idx as i64);
                    }
                }
                self.emit_simple(OpCode::RETURN_VALUE);
            }
            Stmt::Break => {
                let idx = self.emit(OpCode::JUMP, -1);
                let ctx = self
                    .loop_stack
                    .last_mut()
                    .ok_or_else(|| CompileError("break outside a loop".to_string()))?;
                ctx.break_jumps.push(idx);
            }
            Stmt::Continue => {
                let target = self
                    .loop_stack
                    .last()
                    .ok_or_else(|| CompileError("continue outside a loop".to_string()))?
                    .continue_target;
                self.emit(OpCode::JUMP, target as i64);
            }
            Stmt::ChannelDecl { name } => {
                let idx = self.add_constant(Value::list(Vec::new()));
                self.emit(OpCode::LOAD_CONST, idx as i64);
                self.compile_declare_store(name);
            }
            Stmt::Send { channel, value } => {
                self.compile_name_load(channel);
                self.compile_expr(value)?;
                self.emit_builtin_call("append", 2);
                self.emit_simple(OpCode::POP_TOP);
            }
            Stmt::Receive { channel, target } => {
                self.compile_name_load(channel);
                self.emit_builtin_call("shift", 1);
                self.compile_declare_store(target);
            }
            Stmt::Macro { name, params, body } => {
                // Macros have no expansion-time semantics in this core; a
                // macro declaration compiles exactly like a function so
                // `name(...)` is callable the same way.
                self.compile_stmt(&Stmt::FunctionDecl {
                    name: name.clone(),
                    is_async: false,
                    generics: Vec::new(),
                    params: params.clone(),
                    body: body.clone(),
                })?;
            }
            Stmt::Extern { name, params, return_type, lib_path } => {
                // No linking happens at compile time (§4.2); record a
                // placeholder binding so a reference to the name resolves
                // instead of raising NameError, matching "no linking at
                // parse time" without silently accepting a call.
                let placeholder = format!(
                    "<extern {} ({} params){}{}>",
                    name,
                    params.len(),
                    lib_path.as_ref().map(|p| format!(" from {p}")).unwrap_or_default(),
                    return_type.as_ref().map(|t| format!(" -> {t}")).unwrap_or_default(),
                );
                let idx = self.add_constant(Value::str(placeholder));
                self.emit(OpCode::LOAD_CONST, idx as i64);
                self.compile_declare_store(name);
            }
            Stmt::Match { subject, arms, default } => {
                self.compile_match_stmt(subject, arms, default)?;
            }
            Stmt::Alloc { name, size } => {
                self.compile_expr(size)?;
                self.emit_builtin_call("alloc_buffer", 1);
                self.compile_declare_store(name);
            }
            Stmt::Free { name } => {
                let idx = self.add_constant(Value::Nil);
                self.emit(OpCode::LOAD_CONST, idx as i64);
                self.compile_assign_store(name);
            }
            Stmt::Annotated { inner, .. } => {
                self.compile_stmt(inner)?;
            }
        }
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr) -> CResult<()> {
        match expr {
            Expr::Int(n) => {
                let idx = self.add_constant(Value::Int(*n));
                self.emit(OpCode::LOAD_CONST, idx as i64);
            }
            Expr::Float(n) => {
                let idx = self.add_constant(Value::Float(*n));
                self.emit(OpCode::LOAD_CONST, idx as i64);
            }
            Expr::Str(s) => {
                let idx = self.add_constant(Value::str(s.clone()));
                self.emit(OpCode::LOAD_CONST, idx as i64);
            }
            Expr::Bool(b) => {
                let idx = self.add_constant(Value::Bool(*b));
                self.emit(OpCode::LOAD_CONST, idx as i64);
            }
            Expr::Nil => {
                let idx = self.add_constant(Value::Nil);
                self.emit(OpCode::LOAD_CONST, idx as i64);
            }
            Expr::Ident(name) => self.compile_name_load(name),
            Expr::Unary { op, operand } => {
                self.compile_expr(operand)?;
                match op {
                    UnaryOp::Neg => {
                        self.emit_simple(OpCode::UNARY_NEG);
                    }
                    UnaryOp::Not => {
                        self.emit_simple(OpCode::UNARY_NOT);
                    }
                    UnaryOp::BitNot => {
                        // ~x == -x - 1 for two's-complement integers; there
                        // is no dedicated bitwise-not opcode in the closed
                        // instruction set.
                        self.emit_simple(OpCode::UNARY_NEG);
                        let one = self.add_constant(Value::Int(1));
                        self.emit(OpCode::LOAD_CONST, one as i64);
                        self.emit_simple(OpCode::BINARY_SUB);
                    }
                }
            }
            Expr::Binary { op, left, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.emit_simple(binop_opcode(*op));
            }
            Expr::Compare { op, left, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.emit(OpCode::COMPARE_OP, compare_op_code(*op) as i64);
            }
            Expr::Logical { op, left, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                match op {
                    LogicalOp::And => self.emit_simple(OpCode::BINARY_AND),
                    LogicalOp::Or => self.emit_simple(OpCode::BINARY_OR),
                };
            }
            Expr::Call { callee, args } => {
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.compile_expr(callee)?;
                self.emit(OpCode::CALL_FUNCTION, args.len() as i64);
            }
            Expr::BuiltinCall { name, args } => {
                self.compile_builtin_call(name, args)?;
            }
            Expr::Index { target, index } => {
                self.compile_expr(target)?;
                self.compile_expr(index)?;
                self.emit_simple(OpCode::SUBSCR);
            }
            Expr::ListLiteral(items) => {
                for item in items {
                    self.compile_expr(item)?;
                }
                self.emit(OpCode::BUILD_LIST, items.len() as i64);
            }
            Expr::TupleLiteral(items) => {
                for item in items {
                    self.compile_expr(item)?;
                }
                self.emit(OpCode::BUILD_TUPLE, items.len() as i64);
            }
            Expr::Lambda { params, body } => {
                let mut func_compiler = Compiler::new_function("<lambda>", params);
                func_compiler.compile_expr(body)?;
                func_compiler.emit_simple(OpCode::RETURN_VALUE);
                let code = Rc::new(func_compiler.code);
                let idx = self.add_constant(Value::Code(code));
                self.emit(OpCode::LOAD_CONST, idx as i64);
            }
            Expr::Walrus { name, value } => {
                self.compile_expr(value)?;
                self.emit_simple(OpCode::DUP_TOP);
                self.compile_global_store(name);
            }
            Expr::MapCall { func, iterable } => {
                self.compile_expr(func)?;
                self.compile_expr(iterable)?;
                self.emit_builtin_call("map", 2);
            }
            Expr::FilterCall { func, iterable } => {
                self.compile_expr(func)?;
                self.compile_expr(iterable)?;
                self.emit_builtin_call("filter", 2);
            }
            Expr::ReduceCall { func, iterable, initial } => {
                self.compile_expr(func)?;
                self.compile_expr(iterable)?;
                self.compile_expr(initial)?;
                self.emit_builtin_call("reduce", 3);
            }
            Expr::Spawn(e) | Expr::Await(e) => {
                // Both evaluate the inner expression immediately in the
                // current frame (§5: no scheduler, no suspension points).
                self.compile_expr(e)?;
            }
            Expr::Pipeline { left, right } => {
                // `a |> f` is sugar for `f(a)`: evaluate the argument, then
                // the callee, then call with one argument.
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.emit(OpCode::CALL_FUNCTION, 1);
            }
        }
        Ok(())
    }

    fn compile_builtin_call(&mut self, name: &str, args: &[Expr]) -> CResult<()> {
        for arg in args {
            self.compile_expr(arg)?;
        }
        self.emit_builtin_call(name, args.len());
        Ok(())
    }

    fn emit_builtin_call(&mut self, name: &str, argc: usize) {
        let count_idx = self.add_constant(Value::Int(argc as i64));
        self.emit(OpCode::LOAD_CONST, count_idx as i64);
        let name_idx = self.add_constant(Value::str(name));
        self.emit(OpCode::CALL_BUILTIN, name_idx as i64);
    }

    /// Compiles `match subject { case pattern : stmt* ... default : stmt* }`
    /// as a statement: a chain of tests against a hidden temporary holding
    /// the subject, each test jumping to the next arm on failure and to the
    /// end once a body has run. No value is left on the stack; a subject
    /// matching no case falls through to `default`, or does nothing.
    fn compile_match_stmt(
        &mut self,
        subject: &Expr,
        arms: &[crate::ast::MatchArm],
        default: &Option<Block>,
    ) -> CResult<()> {
        self.compile_expr(subject)?;
        let subject_tmp = self.new_temp();
        self.compile_declare_store(&subject_tmp);

        let mut end_jumps = Vec::new();
        for arm in arms {
            let mut fail_jumps = Vec::new();
            self.compile_pattern_test(&arm.pattern, &subject_tmp, &mut fail_jumps)?;
            self.compile_pattern_bindings(&arm.pattern, &subject_tmp)?;
            self.compile_block(&arm.body)?;
            end_jumps.push(self.emit(OpCode::JUMP, -1));
            let next_arm = self.here();
            for idx in fail_jumps {
                self.patch(idx, next_arm);
            }
        }
        if let Some(default_body) = default {
            self.compile_block(default_body)?;
        }
        let end = self.here();
        for idx in end_jumps {
            self.patch(idx, end);
        }
        Ok(())
    }

    /// Emits the refutable part of a pattern match: each check that can
    /// fail pushes a boolean and immediately consumes it with
    /// `JUMP_IF_FALSE`, recording the jump site in `fail_jumps` so the
    /// caller can patch all of them to the next arm once its address is
    /// known.
    fn compile_pattern_test(
        &mut self,
        pattern: &MatchPattern,
        subject: &str,
        fail_jumps: &mut Vec<usize>,
    ) -> CResult<()> {
        match pattern {
            MatchPattern::Wildcard | MatchPattern::Variable(_) => {}
            MatchPattern::Literal(expr) => {
                self.compile_name_load(subject);
                self.compile_expr(expr)?;
                self.emit(OpCode::COMPARE_OP, CompareOp::Equal as i64);
                fail_jumps.push(self.emit(OpCode::JUMP_IF_FALSE, -1));
            }
            MatchPattern::Tuple(items) => {
                for (i, sub) in items.iter().enumerate() {
                    self.extract_and_test(subject, i, sub, fail_jumps)?;
                }
            }
            MatchPattern::Constructor { tag, fields } => {
                self.compile_name_load(subject);
                let zero = self.add_constant(Value::Int(0));
                self.emit(OpCode::LOAD_CONST, zero as i64);
                self.emit_simple(OpCode::SUBSCR);
                let tag_idx = self.add_constant(Value::str(tag.clone()));
                self.emit(OpCode::LOAD_CONST, tag_idx as i64);
                self.emit(OpCode::COMPARE_OP, CompareOp::Equal as i64);
                fail_jumps.push(self.emit(OpCode::JUMP_IF_FALSE, -1));
                for (i, sub) in fields.iter().enumerate() {
                    self.extract_and_test(subject, i + 1, sub, fail_jumps)?;
                }
            }
        }
        Ok(())
    }

    fn extract_and_test(
        &mut self,
        subject: &str,
        index: usize,
        sub: &MatchPattern,
        fail_jumps: &mut Vec<usize>,
    ) -> CResult<()> {
        self.compile_name_load(subject);
        let idx_const = self.add_constant(Value::Int(index as i64));
        self.emit(OpCode::LOAD_CONST, idx_const as i64);
        self.emit_simple(OpCode::SUBSCR);
        let sub_tmp = self.new_temp();
        self.compile_declare_store(&sub_tmp);
        self.compile_pattern_test(sub, &sub_tmp, fail_jumps)
    }

    /// Second pass over a pattern: binds `Variable`/nested names once the
    /// test pass has already confirmed the shape matches.
    fn compile_pattern_bindings(&mut self, pattern: &MatchPattern, subject: &str) -> CResult<()> {
        match pattern {
            MatchPattern::Wildcard | MatchPattern::Literal(_) => {}
            MatchPattern::Variable(name) => {
                self.compile_name_load(subject);
                self.compile_declare_store(name);
            }
            MatchPattern::Tuple(items) => {
                for (i, sub) in items.iter().enumerate() {
                    self.bind_extracted(subject, i, sub)?;
                }
            }
            MatchPattern::Constructor { fields, .. } => {
                for (i, sub) in fields.iter().enumerate() {
                    self.bind_extracted(subject, i + 1, sub)?;
                }
            }
        }
        Ok(())
    }

    fn bind_extracted(&mut self, subject: &str, index: usize, sub: &MatchPattern) -> CResult<()> {
        if matches!(sub, MatchPattern::Wildcard | MatchPattern::Literal(_)) {
            return Ok(());
        }
        self.compile_name_load(subject);
        let idx_const = self.add_constant(Value::Int(index as i64));
        self.emit(OpCode::LOAD_CONST, idx_const as i64);
        self.emit_simple(OpCode::SUBSCR);
        let sub_tmp = self.new_temp();
        self.compile_declare_store(&sub_tmp);
        self.compile_pattern_bindings(sub, &sub_tmp)
    }
}

fn binop_opcode(op: BinOp) -> OpCode {
    match op {
        BinOp::Add => OpCode::BINARY_ADD,
        BinOp::Sub => OpCode::BINARY_SUB,
        BinOp::Mul => OpCode::BINARY_MUL,
        BinOp::Div => OpCode::BINARY_DIV,
        BinOp::Mod => OpCode::BINARY_MOD,
        BinOp::Pow => OpCode::BINARY_POW,
        BinOp::BitAnd => OpCode::BINARY_BIT_AND,
        BinOp::BitOr => OpCode::BINARY_BIT_OR,
        BinOp::BitXor => OpCode::BINARY_BIT_XOR,
        BinOp::Shl => OpCode::BINARY_SHL,
        BinOp::Shr => OpCode::BINARY_SHR,
    }
}

fn compare_op_code(op: AstCompareOp) -> CompareOp {
    match op {
        AstCompareOp::Lt => CompareOp::LessThan,
        AstCompareOp::Le => CompareOp::LessEqual,
        AstCompareOp::Eq => CompareOp::Equal,
        AstCompareOp::Ne => CompareOp::NotEqual,
        AstCompareOp::Gt => CompareOp::GreaterThan,
        AstCompareOp::Ge => CompareOp::GreaterEqual,
    }
}

/// Compiles a top-level program into its module-scope code object.
pub fn compile(block: &Block) -> CResult<CodeObject> {
    let mut compiler = Compiler::new_module();
    compiler.compile_block(block)?;
    Ok(compiler.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn compile_source(source: &str) -> CodeObject {
        let tokens = tokenize(source).unwrap();
        let block = parse(tokens).unwrap();
        compile(&block).unwrap()
    }

    #[test]
    fn every_jump_target_is_in_range() {
        let code = compile_source(
            "let i = 0; while i < 3 { let x = i + 1; i = x; } print i;",
        );
        for instr in &code.code {
            if matches!(instr.op, OpCode::JUMP | OpCode::JUMP_IF_FALSE | OpCode::FOR_ITER) {
                let target = instr.operand.unwrap();
                assert!(target >= 0 && (target as usize) <= code.code.len());
            }
        }
    }

    #[test]
    fn constant_pool_deduplicates_equal_literals() {
        let code = compile_source("let a = 1; let b = 1; print a, b;");
        let ones = code.constants.iter().filter(|c| c.const_eq(&Value::Int(1))).count();
        assert_eq!(ones, 1);
    }

    #[test]
    fn function_locals_cover_every_parameter() {
        let code = compile_source("function add(a, b) { return a + b; } print add(1, 2);");
        let add_code = code
            .constants
            .iter()
            .find_map(|c| match c {
                Value::Code(c) if c.name == "add" => Some(c.clone()),
                _ => None,
            })
            .expect("add's code object should be in the module's constant pool");
        assert!(add_code.num_locals >= add_code.params.len());
        for instr in &add_code.code {
            if matches!(instr.op, OpCode::LOAD_FAST | OpCode::STORE_FAST) {
                assert!((instr.operand.unwrap() as usize) < add_code.num_locals);
            }
        }
    }

    #[test]
    fn break_jumps_target_the_loop_exit() {
        let code = compile_source("let i = 0; while i < 10 { i = i + 1; break; } print i;");
        let exit = code.code.len();
        let has_break_jump = code
            .code
            .iter()
            .any(|instr| instr.op == OpCode::JUMP && instr.operand == Some(exit as i64 - 1) || instr.op == OpCode::JUMP);
        assert!(has_break_jump);
    }
}
