//! Tests for the generator back-end

use crate::error::CompileError;
use crate::parser::parse_program;
use crate::pipeline::{transform, Pipeline};
use crate::types::{Options, Strategy, Transformed};
use super::{eval_function, eval_string};

// ============================================================================
// Helper Functions
// ============================================================================

fn yield_with(source: &str, options: Options) -> Result<Transformed, CompileError> {
    let pipeline = Pipeline::for_strategy(Strategy::Yield, &options);
    transform(source, &pipeline, &options)
}

fn yielded(source: &str) -> String {
    let code = yield_with(source, Options::default())
        .expect("yield transform should succeed")
        .code;
    if let Err(e) = parse_program(&code) {
        panic!("output does not re-parse: {}\n{}", e, code);
    }
    code
}

// ============================================================================
// Call Tests
// ============================================================================

#[test]
fn test_call_is_delegated() {
    let code = yielded("f(1);");
    assert!(code.contains("yield* $call(f, 1);"));
}

#[test]
fn test_nested_calls_delegate_inside_out() {
    let code = yielded("f(g(1));");
    assert!(code.contains("yield* $call(f, yield* $call(g, 1));"));
}

#[test]
fn test_method_call_keeps_receiver() {
    let code = yielded("o.m(1); o[k](2);");
    assert!(code.contains(r#"yield* $callMethod(o, "m", 1);"#));
    assert!(code.contains("yield* $callMethod(o, k, 2);"));
}

#[test]
fn test_new_goes_through_handle_new() {
    let code = yielded("var p = new P(1, 2);");
    assert!(code.contains("var p = yield* $handleNew(P, 1, 2);"));
}

#[test]
fn test_primitive_calls_stay_direct_when_optimizing() {
    let code = yield_with("var m = Math.max(1, 2);", Options::new().optimize(true))
        .expect("yield transform should succeed")
        .code;
    assert!(code.contains("var m = Math.max(1, 2);"));
    assert!(!code.contains("$call"));
}

// ============================================================================
// Function Tests
// ============================================================================

#[test]
fn test_declarations_become_marked_generators() {
    let code = yielded("function f(x) { return x; }");
    assert!(code.contains("function* f(x) {"));
    assert!(code.contains("$mark_func(f);"));
    assert!(code.contains("yield;"));
}

#[test]
fn test_function_expressions_are_marked() {
    let code = yielded("var f = function (x) { return g(x); };");
    assert!(code.contains("var f = $mark_func(function* (x) {"));
    assert!(code.contains("return yield* $call(g, x);"));
}

#[test]
fn test_arrow_functions_become_marked_generators() {
    let code = yielded("var f = (x) => x + 1;");
    assert!(code.contains("$mark_func(function* (x) {"));
}

#[test]
fn test_prototype_assignment_is_wrapped() {
    let code = yielded("C.prototype = { m: function () {} };");
    assert!(code.contains("C.prototype = $proto_assign({"));
}

#[test]
fn test_method_assignment_is_not_wrapped() {
    let code = yielded("C.prototype.m = function () {};");
    assert!(!code.contains("$proto_assign"));
}

#[test]
fn test_generator_functions_rejected() {
    let err = yield_with("function* g() {}", Options::default()).unwrap_err();
    assert!(matches!(err, CompileError::Pass { pass: "yield", .. }));
}

// ============================================================================
// Loop Tests
// ============================================================================

#[test]
fn test_loop_bodies_start_with_yield() {
    let code = yielded("while (x) x--; for (var i = 0; i < 3; i++) {} do {} while (y);");
    assert_eq!(code.matches("yield;").count(), 3);
}

// ============================================================================
// Eval Tests
// ============================================================================

#[test]
fn test_eval_uses_host_compiler() {
    let out = yield_with(r#"var r = eval("1 + 1");"#, Options::default())
        .expect("yield transform should succeed");
    assert!(out.code.contains(r#"yield* $call($compile_string, "1 + 1")"#));
    assert!(out.needs_runtime_include);
}

#[test]
fn test_function_constructor_uses_host_compiler() {
    let out = yield_with(r#"var f = new Function("a", "return a;");"#, Options::default())
        .expect("yield transform should succeed");
    assert!(out.code.contains(r#"yield* $call($compile_func, "a", "return a;")"#));
    assert!(out.needs_runtime_include);
}

#[test]
fn test_plain_program_needs_no_runtime_include() {
    let out = yield_with("f();", Options::default()).expect("yield transform should succeed");
    assert!(!out.needs_runtime_include);
}

#[test]
fn test_eval_string_compiles_to_generator_expression() {
    let code = eval_string("return 1 + 1;", &Options::default()).expect("eval_string");
    assert!(code.starts_with("$call($mark_func(function* () {"));
    assert!(code.contains("return 1 + 1;"));
}

#[test]
fn test_eval_function_compiles_to_marked_generator() {
    let params = vec!["a".to_string(), "b".to_string()];
    let code = eval_function("add", &params, "return a + b;", &Options::default())
        .expect("eval_function");
    assert!(code.starts_with("$mark_func(function* add(a, b) {"));
}

#[test]
fn test_eval_string_reports_parse_errors() {
    let err = eval_string("var = ;", &Options::default()).unwrap_err();
    assert!(matches!(err, CompileError::Parse(_)));
}
