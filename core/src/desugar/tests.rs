//! Tests for the desugaring passes

use super::*;
use crate::parser::parse_program;
use crate::pipeline::{Pass, PassContext};
use crate::syntax::ast::{Expr, Program, Stmt};
use crate::syntax::print_program;
use crate::syntax::visit::{walk_expr, walk_stmt, Visit};
use crate::types::Options;

// ============================================================================
// Helper Functions
// ============================================================================

fn run_passes(source: &str, passes: &[&dyn Pass]) -> Program {
    let mut program = parse_program(source).expect("Parse should succeed");
    let mut cx = PassContext::new(&program, Options::default());
    for pass in passes {
        program = pass.run(program, &mut cx).expect("Pass should succeed");
    }
    program
}

fn desugar(source: &str, passes: &[&dyn Pass]) -> String {
    print_program(&run_passes(source, passes))
}

/// The printed output must parse again
fn reparses(code: &str) {
    if let Err(e) = parse_program(code) {
        panic!("output does not re-parse: {}\n{}", e, code);
    }
}

#[derive(Default)]
struct Shapes {
    non_while_loops: usize,
    switches: usize,
    logicals: usize,
    continues: usize,
    nested_calls: usize,
}

impl Visit for Shapes {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::For { .. } | Stmt::DoWhile { .. } | Stmt::ForIn { .. } => {
                self.non_while_loops += 1
            }
            Stmt::Switch { .. } => self.switches += 1,
            Stmt::Continue { .. } => self.continues += 1,
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Logical { .. } => self.logicals += 1,
            Expr::Call { args, callee } | Expr::New { args, callee } => {
                if args.iter().any(|a| !a.is_atomic()) || callee.is_call() {
                    self.nested_calls += 1;
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

fn shapes(program: &Program) -> Shapes {
    let mut shapes = Shapes::default();
    for stmt in &program.body {
        shapes.visit_stmt(stmt);
    }
    shapes
}

// ============================================================================
// Arrows
// ============================================================================

#[test]
fn test_arrow_this_is_captured() {
    let code = desugar("function f() { return () => this.x; }", &[&Arrows]);
    assert!(code.contains("var $this = this;"), "{}", code);
    assert!(code.contains("return $this.x;"), "{}", code);
    assert!(!code.contains("=>"), "{}", code);
    reparses(&code);
}

#[test]
fn test_arrow_arguments_are_captured() {
    let code = desugar("function f() { return () => arguments[0]; }", &[&Arrows]);
    assert!(code.contains("var $arguments = arguments;"), "{}", code);
    assert!(code.contains("return $arguments[0];"), "{}", code);
}

#[test]
fn test_plain_function_this_untouched() {
    let code = desugar("var o = { m: function () { return this; } };", &[&Arrows]);
    assert!(!code.contains("$this"), "{}", code);
}

// ============================================================================
// Loops
// ============================================================================

#[test]
fn test_for_becomes_labeled_while() {
    let code = desugar(
        "for (var i = 0; i < 3; i++) { if (i == 1) continue; f(i); }",
        &[&Loops],
    );
    assert!(code.contains("var i = 0;"), "{}", code);
    assert!(code.contains("$loop_break: while (i < 3) {"), "{}", code);
    assert!(code.contains("$loop_continue: {"), "{}", code);
    assert!(code.contains("break $loop_continue;"), "{}", code);
    assert!(code.contains("i++;"), "{}", code);
    reparses(&code);
}

#[test]
fn test_let_for_init_stays_scoped() {
    let program = run_passes("for (let i = 0; i < 3; i++) {}", &[&Loops]);
    assert!(matches!(program.body[0], Stmt::Block { .. }));
}

#[test]
fn test_do_while_runs_once() {
    let code = desugar("do { x++; } while (x < 0);", &[&Loops]);
    assert!(code.contains("let $runOnce = true;"), "{}", code);
    assert!(code.contains("while ($runOnce || x < 0)"), "{}", code);
    assert!(code.contains("$runOnce = false;"), "{}", code);
}

#[test]
fn test_for_in_walks_prototype_chain() {
    let code = desugar("for (var k in o) { f(k); }", &[&Loops]);
    assert!(code.contains("Object.keys($forin_obj)"), "{}", code);
    assert!(code.contains("Object.getPrototypeOf($forin_obj)"), "{}", code);
    assert!(code.contains("var k = $forin_keys[$forin_index];"), "{}", code);
    assert_eq!(shapes(&parse_program(&code).unwrap()).non_while_loops, 0);
}

#[test]
fn test_for_in_break_leaves_both_loops() {
    let code = desugar("for (var k in o) { break; }", &[&Loops]);
    // the outer (prototype) loop is generated first and owns the break
    assert!(code.contains("$loop_break: while ($forin_obj != null)"), "{}", code);
    assert!(code.contains("break $loop_break;"), "{}", code);
}

#[test]
fn test_user_labels_map_to_continue_labels() {
    let code = desugar(
        "outer: while (a) { while (b) { continue outer; } }",
        &[&Loops],
    );
    assert!(code.contains("outer: $loop_break: while (a)"), "{}", code);
    assert!(code.contains("break $loop_continue;"), "{}", code);
    assert_eq!(shapes(&parse_program(&code).unwrap()).continues, 0);
}

#[test]
fn test_loop_desugaring_is_idempotent() {
    let source = r#"
        for (var i = 0; i < 10; i++) { if (i) continue; }
        outer: do { for (var k in o) { break outer; } } while (x);
    "#;
    let once = desugar(source, &[&Loops]);
    let twice = desugar(&once, &[&Loops]);
    assert_eq!(once, twice);
}

#[test]
fn test_break_outside_loop_fails() {
    let program = parse_program("break;").unwrap();
    let mut cx = PassContext::new(&program, Options::default());
    assert!(Loops.run(program, &mut cx).is_err());
}

#[test]
fn test_nested_function_loops_get_own_targets() {
    let code = desugar(
        "while (a) { var f = function () { while (b) { break; } }; }",
        &[&Loops],
    );
    assert!(code.contains("break $loop_break_1;"), "{}", code);
    reparses(&code);
}

// ============================================================================
// Switch
// ============================================================================

#[test]
fn test_switch_becomes_indexed_ifs() {
    let code = desugar(
        "switch (x) { case 1: a(); case 2: b(); break; default: c(); }",
        &[&Switch],
    );
    assert!(code.contains("$switch: {"), "{}", code);
    assert!(code.contains("let $disc = x;"), "{}", code);
    assert!(code.contains("if ($disc === 1) {"), "{}", code);
    assert!(code.contains("$case = 2;"), "{}", code);
    assert!(code.contains("if ($case <= 1) {"), "{}", code);
    assert!(code.contains("break $switch;"), "{}", code);
    assert_eq!(shapes(&parse_program(&code).unwrap()).switches, 0);
}

#[test]
fn test_switch_without_default_falls_off_the_end() {
    let code = desugar("switch (x) { case 'a': f(); }", &[&Switch]);
    assert!(code.contains("$case = 1;"), "{}", code);
}

#[test]
fn test_break_in_loop_inside_switch_stays_with_loop() {
    let program = run_passes(
        "switch (x) { case 1: while (y) { break; } }",
        &[&Switch, &Loops],
    );
    let code = print_program(&program);
    assert!(code.contains("break $loop_break;"), "{}", code);
    assert!(!code.contains("break $switch;"), "{}", code);
}

// ============================================================================
// Logical
// ============================================================================

#[test]
fn test_logical_atomic_left() {
    let code = desugar("x = a && b; y = a || b;", &[&Logical]);
    assert!(code.contains("x = a ? b : a;"), "{}", code);
    assert!(code.contains("y = a ? a : b;"), "{}", code);
}

#[test]
fn test_logical_non_atomic_left_uses_temp() {
    let code = desugar("function f() { return g() || h(); }", &[&Logical]);
    assert!(code.contains("var $lhs;"), "{}", code);
    assert!(code.contains("($lhs = g()) ? $lhs : h()"), "{}", code);
    assert_eq!(shapes(&parse_program(&code).unwrap()).logicals, 0);
}

// ============================================================================
// Hoisting
// ============================================================================

#[test]
fn test_function_declarations_move_to_top() {
    let program = run_passes("f(); if (x) { function f() {} }", &[&HoistFunctions]);
    assert!(matches!(program.body[0], Stmt::Function { .. }));
}

#[test]
fn test_vars_hoisted_to_function_top() {
    let code = desugar(
        "function f(a) { g(); let x = 1, y; if (a) { var z = 2; } }",
        &[&HoistVars::default()],
    );
    assert!(code.contains("var x, y, z;"), "{}", code);
    assert!(code.contains("x = 1;"), "{}", code);
    assert!(code.contains("z = 2;"), "{}", code);
    assert!(!code.contains("let"), "{}", code);
}

#[test]
fn test_jumper_hoist_turns_functions_into_assignments() {
    let code = desugar(
        "function f() { function g() {} try { g(); } catch (e) { log(e); } }",
        &[&HoistVars::jumper()],
    );
    assert!(code.contains("g = function g()"), "{}", code);
    assert!(code.contains("$catch_e = e;"), "{}", code);
    assert!(code.contains("log($catch_e);"), "{}", code);
    assert!(code.contains("var g, $catch_e;"), "{}", code);
}

// ============================================================================
// ANF
// ============================================================================

#[test]
fn test_nested_calls_are_named() {
    let program = run_passes("x = f(g(1)) + h();", &[&Anf]);
    let code = print_program(&program);
    assert!(code.contains("let $t = g(1);"), "{}", code);
    assert!(code.contains("let $t_1 = f($t);"), "{}", code);
    assert!(code.contains("let $t_2 = h();"), "{}", code);
    assert!(code.contains("x = $t_1 + $t_2;"), "{}", code);
    assert_eq!(shapes(&program).nested_calls, 0);
}

#[test]
fn test_earlier_operand_read_before_call() {
    let code = desugar("y = count + inc();", &[&Anf]);
    assert!(code.contains("let $t = count;"), "{}", code);
    assert!(code.contains("let $t_1 = inc();"), "{}", code);
    assert!(code.contains("y = $t + $t_1;"), "{}", code);
}

#[test]
fn test_method_receiver_is_atomic() {
    let code = desugar("a.b.c(1);", &[&Anf]);
    assert!(code.contains("let $t = a.b;"), "{}", code);
    assert!(code.contains("$t.c(1);"), "{}", code);
}

#[test]
fn test_call_initializer_binds_directly() {
    let code = desugar("var r = f(1);", &[&Anf]);
    assert_eq!(code.trim(), "var r = f(1);");
}

#[test]
fn test_conditional_with_calls_becomes_if() {
    let code = desugar("x = c ? f() : 1;", &[&Anf]);
    assert!(code.contains("let $cond;"), "{}", code);
    assert!(code.contains("if (c) {"), "{}", code);
    assert!(code.contains("$cond = $t;"), "{}", code);
    assert!(code.contains("x = $cond;"), "{}", code);
}

#[test]
fn test_compound_assignment_reads_target_first() {
    let code = desugar("x += f();", &[&Anf]);
    assert!(code.contains("let $t = x;"), "{}", code);
    assert!(code.contains("x = $t + $t_1;"), "{}", code);
}

#[test]
fn test_loop_test_with_call_moves_into_body() {
    let code = desugar("while (more()) { step(); }", &[&Loops, &Anf]);
    assert!(code.contains("while (true) {"), "{}", code);
    assert!(code.contains("let $t = more();"), "{}", code);
    assert!(code.contains("if (!$t) {"), "{}", code);
    assert!(code.contains("break $loop_break;"), "{}", code);
    reparses(&code);
}

#[test]
fn test_anf_requires_desugared_loops() {
    let program = parse_program("for (;;) {}").unwrap();
    let mut cx = PassContext::new(&program, Options::default());
    assert!(Anf.run(program, &mut cx).is_err());
}

// ============================================================================
// Cleanup
// ============================================================================

#[test]
fn test_cleanup_flattens_blocks() {
    let code = desugar(";{ a(); { b(); } } { let x = 1; }", &[&Cleanup]);
    assert!(code.starts_with("a();\nb();\n{"), "{}", code);
    assert!(!code.contains(";\n;"), "{}", code);
}

#[test]
fn test_cleanup_keeps_loop_body_blocks() {
    let program = run_passes("while (a) { { f(); } }", &[&Cleanup]);
    match &program.body[0] {
        Stmt::While { body, .. } => assert!(matches!(**body, Stmt::Block { .. })),
        other => panic!("Expected While, got {:?}", other),
    }
}
