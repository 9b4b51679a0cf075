//! Runtime preambles
//!
//! The JavaScript each strategy's output runs against, shipped as text. [`wrap`] puts a
//! transformed program inside its preamble, producing the run-time entry point
//!
//! ```text
//! (function ($isStop, $onStop, $onDone, $opts) { ... })
//! ```
//!
//! which the host evaluates and calls. The preambles never evaluate code themselves
//! except through the host's `$opts.compileString`/`$opts.compileFunction`.

use crate::opts::Opts;
use crate::types::Strategy;

/// Slice counter, interval policies and deferral
pub const COMMON: &str = include_str!("js/common.js");
pub const CPS: &str = include_str!("js/cps.js");
pub const YIELD: &str = include_str!("js/yield.js");
pub const JUMPER: &str = include_str!("js/jumper.js");
/// Host-compiler bridge for programs that evaluate code at run time
pub const INCLUDE: &str = include_str!("js/include.js");

/// Array methods written in the source language, compiled in front of every program
/// so callbacks passed to them stay stoppable.
pub const HOF_PRELUDE: &str = include_str!("js/hof.js");

/// Harness that runs an entry point under `$opts.stop` and prints its report
pub const DRIVER: &str = include_str!("js/driver.js");

/// Parameters of the run-time entry point, in order
pub const ENTRY_PARAMS: [&str; 4] = ["$isStop", "$onStop", "$onDone", "$opts"];

/// The strategy's preamble text
pub fn preamble(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Cps => CPS,
        Strategy::Yield => YIELD,
        Strategy::Jumper => JUMPER,
    }
}

/// Wrap transformed `code` into the run-time entry function.
pub fn wrap(strategy: Strategy, code: &str, needs_runtime_include: bool) -> String {
    let mut out = String::with_capacity(code.len() + COMMON.len() + 4096);
    out.push_str("(function (");
    out.push_str(&ENTRY_PARAMS.join(", "));
    out.push_str(") {\n");
    out.push_str(COMMON);
    out.push('\n');
    out.push_str(preamble(strategy));
    out.push('\n');
    if needs_runtime_include {
        out.push_str(INCLUDE);
        out.push('\n');
    }

    match strategy {
        Strategy::Cps => {
            let program = code.trim_end().trim_end_matches(';');
            out.push_str("const $program = ");
            out.push_str(program);
            out.push_str(";\n$runProg($program);\n");
        }
        Strategy::Yield => {
            out.push_str("function* $runProg() {\n");
            out.push_str(code);
            out.push_str("}\n$runYield($runProg());\n");
        }
        Strategy::Jumper => {
            out.push_str(code);
            out.push_str("$__R.run($program);\n");
        }
    }

    out.push_str("})");
    out
}

/// A self-running script: the wrapped program handed to [`DRIVER`] with `opts` as
/// its `$opts` object.
pub fn standalone(compiled: &str, opts: &Opts) -> serde_json::Result<String> {
    let opts = serde_json::to_string(opts)?;
    Ok(format!("{}({}, {});\n", DRIVER.trim_end(), compiled, opts))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    #[test]
    fn test_wrap_exposes_entry_point() {
        let out = wrap(Strategy::Jumper, "function $program() {}\n", false);
        assert!(out.starts_with("(function ($isStop, $onStop, $onDone, $opts) {\n"));
        assert!(out.ends_with("$__R.run($program);\n})"));
    }

    #[test]
    fn test_wrap_cps_binds_program() {
        let out = wrap(Strategy::Cps, "(function ($ret) {\n  return $ret(void 0);\n});\n", false);
        assert!(out.contains("const $program = (function ($ret) {"));
        assert!(out.contains("});\n$runProg($program);"));
    }

    #[test]
    fn test_wrap_yield_runs_generator() {
        let out = wrap(Strategy::Yield, "yield* $call(f);\n", false);
        assert!(out.contains("function* $runProg() {\nyield* $call(f);\n}"));
        assert!(out.contains("$runYield($runProg());"));
        assert!(!out.contains("$compile_string"));
    }

    #[test]
    fn test_runtime_include_only_when_needed() {
        let out = wrap(Strategy::Yield, "", true);
        assert!(out.contains("function* $compile_string(src)"));
    }

    #[test]
    fn test_preambles_define_helpers() {
        assert!(COMMON.contains("function $boundary()"));
        assert!(COMMON.contains("function $defer(resume)"));
        assert!(CPS.contains("function $apply(self, f, k, ...args)"));
        assert!(YIELD.contains("function* $handleNew(C, ...args)"));
        assert!(JUMPER.contains("function callCC(f)"));
    }

    #[test]
    fn test_stop_hands_host_a_resume_function() {
        assert!(COMMON.contains("$onStop(function () {"));
        assert!(COMMON.contains("resume();\n      });"));
    }

    #[test]
    fn test_yield_prototype_assignment_wraps_object() {
        assert!(YIELD.contains("const proto = Object.create(rhs);"));
        assert!(YIELD.contains("Symbol.iterator"));
        assert!(YIELD.contains(r#"Object.defineProperty(f.prototype, "constructor", {"#));
        assert!(YIELD.contains("value: f,"));
    }

    #[test]
    fn test_cps_handler_receives_finalizing_continuation() {
        assert!(CPS.contains("return entry.handler(e, entry.done);"));
        assert!(CPS.contains("$handlers.push({ handler, finalizer, depth, done });"));
    }

    #[test]
    fn test_jumper_catch_accepts_reenter() {
        assert!(JUMPER.contains("isUnwind(e) {"));
        assert!(!JUMPER.contains("e === R.reenter"));
    }

    #[test]
    fn test_standalone_arms_deadline() {
        let opts = Opts::new("prog.js").fixed(10).stop_after(2.0);
        let out = standalone("(function ($isStop, $onStop, $onDone, $opts) {})", &opts).unwrap();
        assert!(out.starts_with("// Standalone harness."));
        assert!(out.contains("$opts.stop * 1000"));
        assert!(out.contains("console.log(Date.now() - startTime + \",\" + yields);"));
        assert!(out.contains(",NA\\n"));
        assert!(out.ends_with(
            r#"})((function ($isStop, $onStop, $onDone, $opts) {}), {"filename":"prog.js","yieldMethod":"fixed","yieldInterval":10,"stop":2.0,"env":"node"});
"#
        ));
    }

    #[test]
    fn test_hof_prelude_parses() {
        let program = parse_program(HOF_PRELUDE).expect("prelude should parse");
        assert_eq!(program.body.len(), 10);
    }

    #[test]
    fn test_hof_prelude_covers_callback_methods() {
        for method in ["map", "filter", "forEach", "reduce", "reduceRight", "some", "every", "find", "findIndex", "sort"] {
            assert!(
                HOF_PRELUDE.contains(&format!("Array.prototype.{} = function", method)),
                "{} missing",
                method
            );
        }
    }
}
