//! Tests for the stack-reifying back-end

use crate::parser::parse_program;
use crate::pipeline::{transform, Pipeline};
use crate::types::{Options, Strategy};

// ============================================================================
// Helper Functions
// ============================================================================

fn jumper_with(source: &str, options: Options) -> String {
    let pipeline = Pipeline::for_strategy(Strategy::Jumper, &options);
    let code = transform(source, &pipeline, &options)
        .expect("jumper transform should succeed")
        .code;
    if let Err(e) = parse_program(&code) {
        panic!("output does not re-parse: {}\n{}", e, code);
    }
    code
}

fn jumper(source: &str) -> String {
    jumper_with(source, Options::default())
}

// ============================================================================
// Function Frame Tests
// ============================================================================

#[test]
fn test_program_becomes_program_function() {
    let code = jumper("f(1);");
    assert!(code.starts_with("function $program() {"));
    assert!(code.contains("var $target = null;"));
    assert!(code.contains("const $frame = $__R.stack.pop();"));
    assert!(code.contains("$target = $frame.index;"));
}

#[test]
fn test_function_entry_suspends() {
    let code = jumper("f(1);");
    assert!(code.contains(r#"if ($__R.mode === "normal" || $target === 0) {"#));
    assert!(code.contains("$__R.suspend();"));
}

#[test]
fn test_function_locals_are_restored() {
    let code = jumper("function g(a) { return h(a); }");
    assert!(code.contains("g = function g(a) {"));
    assert!(code.contains("a = $frame.locals[0];"));
    assert!(code.contains("$t = $frame.locals[1];"));
    assert!(code.contains("return $__R.reinvoke(g, this, arguments, new.target);"));
    assert!(code.contains("locals: [a, $t], index: 1 })"));
}

#[test]
fn test_shadowed_function_name_gets_fresh_self_name() {
    let code = jumper("function f(f) { return g(f); }");
    assert!(code.contains("f = function $self_f(f) {"), "{}", code);
    assert!(code.contains("return $__R.reinvoke($self_f, this, arguments, new.target);"));

    let code = jumper("function h(a) { var h = 1; return g(a, h); }");
    assert!(code.contains("h = function $self_h(a) {"), "{}", code);
    assert!(code.contains("return $__R.reinvoke($self_h, this, arguments, new.target);"));
}

#[test]
fn test_unshadowed_function_keeps_its_name() {
    let code = jumper("function k(a) { return g(a); }");
    assert!(!code.contains("$self_"));
}

#[test]
fn test_anonymous_functions_are_named() {
    let code = jumper("var h = function () { return 1; };");
    assert!(code.contains("h = function $fn() {"));
    assert!(code.contains("return $__R.reinvoke($fn, this, arguments, new.target);"));
}

// ============================================================================
// Call Site Tests
// ============================================================================

#[test]
fn test_call_statement_is_instrumented() {
    let code = jumper("f(1);");
    assert!(code.contains(r#"if ($__R.mode === "normal" || $target === 1) {"#));
    assert!(code.contains("f(1);"));
    assert!(code.contains("$__R.resume();"));
    assert!(code.contains("catch ($exn) {"));
    assert!(code.contains("if ($__R.isCapture($exn)) {"));
    assert!(code.contains("return $__R.reinvoke($program, this, arguments, new.target);"));
    assert!(code.contains("locals: [], index: 1 })"));
    assert!(code.contains("throw $exn;"));
}

#[test]
fn test_call_result_drawn_from_frame_when_restoring() {
    let code = jumper("var x = f(1);");
    assert!(code.contains("x = f(1);"));
    assert!(code.contains("x = $__R.resume();"));
    assert!(code.contains("x = $frame.locals[0];"));
    assert!(code.contains("locals: [x], index: 1 })"));
}

#[test]
fn test_plain_statements_only_run_normally() {
    let code = jumper("var x = 1;");
    assert!(code.contains("x = 1;"));
    assert!(!code.contains("$target === 1"));
}

#[test]
fn test_primitive_calls_are_not_call_sites_when_optimizing() {
    let code = jumper_with("var m = Math.max(1, 2);", Options::new().optimize(true));
    assert!(code.contains("m = Math.max(1, 2);"));
    assert!(!code.contains("$target === 1"));
}

#[test]
fn test_call_cc_is_a_call_site() {
    let code = jumper("var v = callCC(k);");
    assert!(code.contains("v = callCC(k);"));
    assert!(code.contains("v = $__R.resume();"));
}

// ============================================================================
// Control Flow Tests
// ============================================================================

#[test]
fn test_while_test_routes_restoring_execution() {
    let code = jumper("while (x) { f(); }");
    assert!(code.contains(
        r#"$__R.mode === "restoring" && ($target === 1 || $target === 2) || $__R.mode === "normal" && x"#
    ));
}

#[test]
fn test_if_routes_to_branch_holding_target() {
    let code = jumper("if (x) { f(); } else { g(); }");
    assert!(code.contains(
        r#"if ($__R.mode === "restoring" && $target === 1 || $__R.mode === "normal" && x) {"#
    ));
    assert!(code.contains(
        r#"else if ($__R.mode === "restoring" && $target === 2 || $__R.mode === "normal") {"#
    ));
}

#[test]
fn test_catch_rethrows_capture_and_reenters() {
    let code = jumper("try { f(); } catch (e) { g(e); }");
    assert!(code.contains("throw $__R.reenter;"));
    assert!(code.contains("if ($__R.isUnwind(e)) {"));
    assert!(code.contains("throw e;"));
    assert!(code.contains("g($catch_e);"));
}

#[test]
fn test_catch_body_call_is_restorable() {
    let code = jumper("try { throw 5; } catch (e) { out.push(g(e)); }");
    // the reenter sentinel reaches the handler, which skips the parameter copy
    assert!(!code.contains("isSignal"));
    assert!(code.contains("throw $__R.reenter;"));
    assert!(code.contains(r#"if ($__R.mode === "normal") {"#));
    assert!(code.contains("$catch_e = e;"));
}

#[test]
fn test_finally_skipped_while_capturing() {
    let code = jumper("try { f(); } finally { g(); }");
    assert!(code.contains("if (!$__R.capturing) {"));
}
