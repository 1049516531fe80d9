// ABOUTME: The bytecode instruction set and compiled code object shared by the compiler and VM

use crate::value::Value;

/// A single VM instruction. `operand` holds whatever the opcode needs: a
/// constant-pool index, a local slot, a jump target (an absolute index into
/// `CodeObject::code`), or an argument count. Opcodes that take no operand
/// leave it `None`.
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub op: OpCode,
    pub operand: Option<i64>,
}

impl Instruction {
    pub fn new(op: OpCode, operand: Option<i64>) -> Self {
        Instruction { op, operand }
    }

    pub fn simple(op: OpCode) -> Self {
        Instruction { op, operand: None }
    }
}

/// The closed instruction set. Jump opcodes (`Jump`, `JumpIfFalse`) store an
/// absolute instruction index in `operand`; the compiler backpatches the
/// placeholder emitted at the jump site once the target is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum OpCode {
    LOAD_CONST,
    STORE_NAME,
    LOAD_NAME,
    LOAD_FAST,
    STORE_FAST,
    LOAD_GLOBAL,
    STORE_GLOBAL,
    BINARY_ADD,
    BINARY_SUB,
    BINARY_MUL,
    BINARY_DIV,
    BINARY_MOD,
    BINARY_POW,
    BINARY_AND,
    BINARY_OR,
    BINARY_BIT_AND,
    BINARY_BIT_OR,
    BINARY_BIT_XOR,
    BINARY_SHL,
    BINARY_SHR,
    UNARY_NEG,
    UNARY_NOT,
    COMPARE_OP,
    PRINT,
    JUMP,
    JUMP_IF_FALSE,
    RETURN_VALUE,
    CALL_FUNCTION,
    CALL_BUILTIN,
    POP_TOP,
    DUP_TOP,
    BUILD_LIST,
    BUILD_TUPLE,
    SUBSCR,
    STORE_SUBSCR,
    GET_ITER,
    FOR_ITER,
}

/// `spec.md` §4.3's six-way comparison. Two aliases present in the Python
/// original (`CompareOp.GT_ALIAS`/`LT_ALIAS`) are dropped — the compiler
/// only ever emits the six canonical variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    LessThan,
    LessEqual,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterEqual,
}

/// A compiled function or top-level script body: its instruction stream,
/// deduplicated constant pool, parameter names (occupying local slots
/// `0..params.len()`), and the total number of local slots the frame needs.
#[derive(Debug, Clone)]
pub struct CodeObject {
    pub name: String,
    pub code: Vec<Instruction>,
    pub constants: Vec<Value>,
    pub params: Vec<String>,
    pub num_locals: usize,
    pub local_names: Vec<String>,
}

impl CodeObject {
    pub fn new(name: impl Into<String>) -> Self {
        CodeObject {
            name: name.into(),
            code: Vec::new(),
            constants: Vec::new(),
            params: Vec::new(),
            num_locals: 0,
            local_names: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_without_operand() {
        let instr = Instruction::simple(OpCode::POP_TOP);
        assert_eq!(instr.op, OpCode::POP_TOP);
        assert_eq!(instr.operand, None);
    }

    #[test]
    fn code_object_starts_empty() {
        let code = CodeObject::new("main");
        assert!(code.code.is_empty());
        assert!(code.constants.is_empty());
        assert_eq!(code.num_locals, 0);
    }
}
