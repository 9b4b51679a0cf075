//! Tests for the structural verifier

use super::*;
use crate::parser::parse_program;
use crate::pipeline::PassContext;
use crate::types::Options;

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse source and verify, returning errors
fn check(source: &str) -> Vec<VerifyError> {
    let program = parse_program(source).expect("Parse should succeed");
    verify(&program)
}

fn has_rule(errors: &[VerifyError], rule_id: &str) -> bool {
    errors.iter().any(|e| e.rule_id == rule_id)
}

fn for_rule<'a>(errors: &'a [VerifyError], rule_id: &str) -> Vec<&'a VerifyError> {
    errors.iter().filter(|e| e.rule_id == rule_id).collect()
}

// ============================================================================
// Loop Tests
// ============================================================================

#[test]
fn test_for_loop_rejected() {
    let errors = check("(function ($k) { for (var i = 0; i < 3; i++) {} });");
    let loops = for_rule(&errors, "only-while-loops");
    assert_eq!(loops.len(), 1);
    assert!(loops[0].message.contains("`for`"));
}

#[test]
fn test_for_in_and_do_while_rejected() {
    let errors = check("(function ($k) { for (var k in o) {} do { x(); } while (y); });");
    assert_eq!(for_rule(&errors, "only-while-loops").len(), 2);
}

#[test]
fn test_loop_in_nested_function_rejected() {
    let errors = check("(function ($k) { var f = function () { for (;;) {} }; });");
    assert!(has_rule(&errors, "only-while-loops"));
}

#[test]
fn test_while_loop_accepted() {
    let errors = check("(function ($k) { while (x) { x = x - 1; } });");
    assert!(!has_rule(&errors, "only-while-loops"));
}

// ============================================================================
// Switch and Logical Tests
// ============================================================================

#[test]
fn test_switch_rejected() {
    let errors = check("(function ($k) { switch (x) { case 1: y(); } });");
    assert_eq!(for_rule(&errors, "no-switch").len(), 1);
}

#[test]
fn test_logical_operators_rejected() {
    let errors = check("(function ($k) { var a = b && c; var d = e || f; });");
    let logical = for_rule(&errors, "no-logical-operators");
    assert_eq!(logical.len(), 2);
    assert!(logical[0].message.contains("&&"));
    assert!(logical[1].message.contains("||"));
}

#[test]
fn test_conditional_accepted() {
    let errors = check("(function ($k) { var a = b ? c : b; });");
    assert!(errors.is_empty());
}

// ============================================================================
// Program Shape Tests
// ============================================================================

#[test]
fn test_single_function_program_accepted() {
    assert!(check("(function ($ret) { return $ret(1); });").is_empty());
}

#[test]
fn test_multiple_statements_rejected() {
    let errors = check("(function () {}); x = 1;");
    let shape = for_rule(&errors, "single-function-program");
    assert_eq!(shape.len(), 1);
    assert!(shape[0].message.contains("found 2"));
}

#[test]
fn test_non_function_statement_rejected() {
    let errors = check("x = 1;");
    assert!(has_rule(&errors, "single-function-program"));
}

#[test]
fn test_empty_program_rejected() {
    let errors = check("");
    assert!(has_rule(&errors, "single-function-program"));
}

// ============================================================================
// Verifier and Pass Tests
// ============================================================================

#[test]
fn test_all_rules_registered() {
    let ids: Vec<_> = Verifier::new().rules().map(|(id, _)| id).collect();
    assert_eq!(
        ids,
        vec![
            "only-while-loops",
            "no-switch",
            "no-logical-operators",
            "single-function-program"
        ]
    );
}

#[test]
fn test_error_display_names_rule() {
    let error = VerifyError::new("no-switch", "`switch` left in the program");
    assert_eq!(error.to_string(), "`switch` left in the program [no-switch]");
}

#[test]
fn test_verify_pass_fails_fast() {
    let program = parse_program("for (;;) {}").expect("Parse should succeed");
    let mut cx = PassContext::new(&program, Options::default());
    let err = VerifyPass.run(program, &mut cx).unwrap_err();
    match err {
        CompileError::Verify(errors) => {
            assert!(has_rule(&errors, "only-while-loops"));
            assert!(has_rule(&errors, "single-function-program"));
        }
        other => panic!("expected a verify error, got {:?}", other),
    }
}

#[test]
fn test_verify_pass_returns_program_unchanged() {
    let program = parse_program("(function ($ret) { $ret(0); });").expect("Parse should succeed");
    let mut cx = PassContext::new(&program, Options::default());
    let out = VerifyPass.run(program.clone(), &mut cx).expect("verify");
    assert_eq!(out, program);
}
