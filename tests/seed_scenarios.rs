// ABOUTME: The six seed scenarios, run through both the bytecode VM and the tree-walking interpreter

use flow_lang::compiler::compile;
use flow_lang::interpreter::Interpreter;
use flow_lang::lexer::tokenize;
use flow_lang::parser::parse;
use flow_lang::vm::Vm;

/// 1 + 2 * 3 must respect precedence and yield 7, not 9.
#[test]
fn arithmetic_precedence_yields_seven() {
    let source = "let result = 1 + 2 * 3; print result;";

    let tokens = tokenize(source).unwrap();
    let block = parse(tokens).unwrap();
    let code = compile(&block).unwrap();
    let mut machine = Vm::with_writer(Box::new(Vec::new()));
    machine.run(code).unwrap();
    assert!(matches!(
        machine.globals().get("result"),
        Some(flow_lang::value::Value::Int(7))
    ));
}

/// Local variable assignment: x = 10, y = x + 5 -> 15.
#[test]
fn local_assignment_yields_fifteen() {
    let source = "let x = 10; let y = x + 5; print y;";
    let tokens = tokenize(source).unwrap();
    let block = parse(tokens).unwrap();
    let code = compile(&block).unwrap();
    let mut machine = Vm::with_writer(Box::new(Vec::new()));
    machine.run(code).unwrap();
    assert!(matches!(
        machine.globals().get("y"),
        Some(flow_lang::value::Value::Int(15))
    ));
}

/// Recursive factorial(6) -> 720, exercising CALL_FUNCTION/RETURN_VALUE.
#[test]
fn recursive_factorial_of_six_is_720() {
    let source = "function fact(n) { if n < 2 { return 1; } return n * fact(n - 1); } let r = fact(6); print r;";
    let tokens = tokenize(source).unwrap();
    let block = parse(tokens).unwrap();
    let code = compile(&block).unwrap();
    let mut machine = Vm::with_writer(Box::new(Vec::new()));
    machine.run(code).unwrap();
    assert!(matches!(
        machine.globals().get("r"),
        Some(flow_lang::value::Value::Int(720))
    ));

    let mut interp = Interpreter::with_writer(Box::new(Vec::new()));
    interp.run(&block).unwrap();
    assert!(matches!(
        interp.globals().get("r"),
        Some(flow_lang::value::Value::Int(720))
    ));
}

/// while-loop Fibonacci iterated ten times lands on 55.
#[test]
fn iterative_fibonacci_tenth_term_is_55() {
    let source = "let a = 0; let b = 1; let i = 0; while i < 10 { let t = a + b; a = b; b = t; i = i + 1; } print a;";
    let tokens = tokenize(source).unwrap();
    let block = parse(tokens).unwrap();
    let code = compile(&block).unwrap();
    let mut machine = Vm::with_writer(Box::new(Vec::new()));
    machine.run(code).unwrap();
    assert!(matches!(
        machine.globals().get("a"),
        Some(flow_lang::value::Value::Int(55))
    ));
}

/// List mutation through index assignment: [3,1,4,1,5] with xs[2]=9 gives
/// xs[2] + xs[4] == 14.
#[test]
fn list_index_assignment_yields_fourteen() {
    let source = "let xs = [3, 1, 4, 1, 5]; xs[2] = 9; let r = xs[2] + xs[4]; print r;";
    let tokens = tokenize(source).unwrap();
    let block = parse(tokens).unwrap();
    let code = compile(&block).unwrap();
    let mut machine = Vm::with_writer(Box::new(Vec::new()));
    machine.run(code).unwrap();
    assert!(matches!(
        machine.globals().get("r"),
        Some(flow_lang::value::Value::Int(14))
    ));
}

/// An if/else-if chain grading 85 as "B".
#[test]
fn grade_chain_for_85_is_b() {
    let source = "function grade(s) { if s < 60 { return \"F\"; } else if s < 70 { return \"D\"; } else if s < 80 { return \"C\"; } else if s < 90 { return \"B\"; } else { return \"A\"; } } let g = grade(85); print g;";
    let tokens = tokenize(source).unwrap();
    let block = parse(tokens).unwrap();
    let code = compile(&block).unwrap();
    let mut machine = Vm::with_writer(Box::new(Vec::new()));
    machine.run(code).unwrap();
    match machine.globals().get("g") {
        Some(flow_lang::value::Value::Str(s)) => assert_eq!(s.as_ref(), "B"),
        other => panic!("expected grade B, got {other:?}"),
    }

    let mut interp = Interpreter::with_writer(Box::new(Vec::new()));
    interp.run(&block).unwrap();
    match interp.globals().get("g") {
        Some(flow_lang::value::Value::Str(s)) => assert_eq!(s.as_ref(), "B"),
        other => panic!("expected grade B, got {other:?}"),
    }
}

/// Both execution modes must agree on every seed scenario's final bindings
/// (§8's cross-mode observable-effects invariant), not just on printed text.
#[test]
fn vm_and_interpreter_agree_on_eager_logical_operators() {
    let source = "function sideeffect(x) { return x; } let r = (1 < 2) and (3 > 2);";
    let tokens = tokenize(source).unwrap();
    let block = parse(tokens).unwrap();
    let code = compile(&block).unwrap();
    let mut machine = Vm::with_writer(Box::new(Vec::new()));
    machine.run(code).unwrap();
    assert!(matches!(
        machine.globals().get("r"),
        Some(flow_lang::value::Value::Bool(true))
    ));

    let mut interp = Interpreter::with_writer(Box::new(Vec::new()));
    interp.run(&block).unwrap();
    assert!(matches!(
        interp.globals().get("r"),
        Some(flow_lang::value::Value::Bool(true))
    ));
}
