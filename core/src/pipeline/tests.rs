//! Tests for pass ordering, the entry points and their post-conditions

use maplit::hashset;

use super::*;
use crate::parser::parse_program;
use crate::syntax::build;

// ============================================================================
// Helper Passes
// ============================================================================

/// Drops every statement
struct DropAll;

impl Pass for DropAll {
    fn name(&self) -> &'static str {
        "drop-all"
    }

    fn run(&self, mut program: Program, _cx: &mut PassContext) -> Result<Program, CompileError> {
        program.body.clear();
        Ok(program)
    }
}

/// Appends a statement that prints as `if;`
struct Unprintable;

impl Pass for Unprintable {
    fn name(&self) -> &'static str {
        "unprintable"
    }

    fn run(&self, mut program: Program, _cx: &mut PassContext) -> Result<Program, CompileError> {
        program.body.push(build::expr_stmt(build::ident("if")));
        Ok(program)
    }
}

struct Identity;

impl Pass for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn run(&self, program: Program, _cx: &mut PassContext) -> Result<Program, CompileError> {
        Ok(program)
    }
}

// ============================================================================
// Pass Lists
// ============================================================================

#[test]
fn test_cps_pass_order() {
    let names = Pipeline::for_strategy(Strategy::Cps, &Options::default()).pass_names();
    assert_eq!(
        names,
        vec![
            "arrows",
            "switch",
            "loops",
            "logical",
            "functions",
            "hoist",
            "anf",
            "cps",
            "verify"
        ]
    );
}

#[test]
fn test_optimize_adds_cleanup() {
    let options = Options::new().optimize(true);
    for strategy in [Strategy::Cps, Strategy::Yield, Strategy::Jumper] {
        let names = Pipeline::for_strategy(strategy, &options).pass_names();
        assert!(names.contains(&"cleanup"), "{} lacks cleanup", strategy);
    }
    let names = Pipeline::for_strategy(Strategy::Cps, &Options::default()).pass_names();
    assert!(!names.contains(&"cleanup"));
}

#[test]
fn test_yield_and_jumper_pass_order() {
    let names = Pipeline::for_strategy(Strategy::Yield, &Options::default()).pass_names();
    assert_eq!(names, vec!["arrows", "functions", "eval", "yield"]);

    let names = Pipeline::for_strategy(Strategy::Jumper, &Options::default()).pass_names();
    assert_eq!(names.last(), Some(&"jumper"));
    assert!(names.contains(&"hoist-jumper"));
    assert!(names.contains(&"name-functions"));
    assert!(!names.contains(&"verify"));
}

// ============================================================================
// Transform
// ============================================================================

#[test]
fn test_empty_pipeline_prints_input() {
    let options = Options::default();
    let out = transform("f(1);", &Pipeline::new(), &options).unwrap();
    assert_eq!(out.code.trim(), "f(1);");
    assert!(!out.needs_runtime_include);
}

#[test]
fn test_shrinking_output_is_fatal() {
    let options = Options::default();
    let pipeline = Pipeline::new().with(DropAll);
    let err = transform("f(1);", &pipeline, &options).unwrap_err();
    assert!(matches!(err, CompileError::Shrunk { output: 0, .. }));
}

#[test]
fn test_debug_reparses_every_pass() {
    let pipeline = Pipeline::new().with(Identity).with(Unprintable).with(Identity);

    let err = transform("f();", &pipeline, &Options::new().debug(true)).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Intermediate {
            pass: "unprintable",
            ..
        }
    ));

    // without debug the bad tree is printed unchecked
    assert!(transform("f();", &pipeline, &Options::default()).is_ok());
}

#[test]
fn test_parse_error() {
    let err = transform("var = ;", &Pipeline::new(), &Options::default()).unwrap_err();
    assert!(matches!(err, CompileError::Parse(_)));
}

// ============================================================================
// Primitives
// ============================================================================

#[test]
fn test_primitives_only_when_optimizing() {
    let program = parse_program("f();").unwrap();
    let cx = PassContext::new(&program, Options::default());
    assert!(cx.primitives.is_empty());

    let cx = PassContext::new(&program, Options::new().optimize(true));
    assert!(cx.primitives.contains("Math"));
    assert!(cx.primitives.contains("console"));
}

#[test]
fn test_rebound_primitive_is_not_primitive() {
    let program = parse_program("var Math = {}; Math.max(1, 2);").unwrap();
    let cx = PassContext::new(&program, Options::new().optimize(true));
    assert!(!cx.primitives.contains("Math"));
    assert!(cx.primitives.contains("JSON"));
}

#[test]
fn test_callee_root() {
    let callee = build::path("Math", &["max"]);
    assert_eq!(callee_root(&callee), Some("Math"));
    assert_eq!(callee_root(&build::ident("f")), Some("f"));

    let computed = build::call(build::ident("g"), vec![]);
    assert_eq!(callee_root(&build::member(computed, "h")), None);
}

#[test]
fn test_is_primitive_matches_member_chains() {
    let primitives = hashset! {"Math".to_string(), "parseInt".to_string()};
    assert!(is_primitive(&primitives, &build::path("Math", &["max"])));
    assert!(is_primitive(&primitives, &build::ident("parseInt")));
    assert!(!is_primitive(&primitives, &build::path("JSON", &["parse"])));
    assert!(!is_primitive(&primitives, &build::ident("f")));
}

// ============================================================================
// Compile
// ============================================================================

#[test]
fn test_compile_cps_wraps_program() {
    let out = compile("f(1);", Strategy::Cps, &Options::default()).unwrap();
    assert!(out
        .code
        .starts_with("(function ($isStop, $onStop, $onDone, $opts) {"));
    assert!(out.code.contains("$runProg($program);"));
    assert!(out.code.trim_end().ends_with("})"));
}

#[test]
fn test_compile_yield_includes_prelude() {
    let out = compile("f(1);", Strategy::Yield, &Options::default()).unwrap();
    assert!(out
        .code
        .contains("Array.prototype.map = $mark_func(function* (f)"));
    assert!(out.code.contains("$runYield($runProg());"));
    assert!(!out.needs_runtime_include);
}

#[test]
fn test_compile_yield_with_eval_needs_include() {
    let out = compile("eval(\"1 + 1\");", Strategy::Yield, &Options::default()).unwrap();
    assert!(out.needs_runtime_include);
    assert!(out.code.contains("$compile_string"));
    assert!(out.code.contains("function* $compile_string(src)"));
}

#[test]
fn test_compile_instruments_callback_methods_for_every_strategy() {
    let source = "var a = [1, 2, 3].map(function (x) { return x * inc(); });";

    let out = compile(source, Strategy::Cps, &Options::default()).unwrap();
    assert!(out.code.contains("Array.prototype.map = $cps(function"));
    assert!(out.code.contains("Array.prototype.sort = $cps(function"));

    let out = compile(source, Strategy::Jumper, &Options::default()).unwrap();
    assert!(out.code.contains("Array.prototype.map = function $fn"));
    assert!(out.code.contains("Array.prototype.findIndex = function $fn"));
}

#[test]
fn test_compile_jumper_runs_program() {
    let out = compile("var x = f(1);", Strategy::Jumper, &Options::default()).unwrap();
    assert!(out.code.contains("function $program() {"));
    assert!(out.code.contains("$__R.run($program);"));
}
