//! Generator back-end
//!
//! Every function becomes a generator registered with `$mark_func`, and every call is
//! delegated through a runtime helper that decides at run time how to invoke the
//! callee:
//!
//! ```text
//! var y = f(x) + o.m(1);
//! // becomes
//! var y = (yield* $call(f, x)) + (yield* $callMethod(o, "m", 1));
//! ```
//!
//! A marked callee is driven through the generator protocol, anything else is called
//! directly. Function entries and loop bodies start with a bare `yield`, so the
//! runtime's step loop regains control at least once per call and per iteration.
//!
//! Constructor calls go through `$handleNew`, which pre-allocates the instance from
//! the prototype and exhausts the constructor's generator before handing it back.
//! Assignments to `F.prototype` go through `$proto_assign` so generator objects created
//! from `F` keep their iterator methods.

use std::collections::HashSet;

use tracing::debug;

use crate::error::CompileError;
use crate::parser::parse_program;
use crate::pipeline::{is_primitive, Pass, PassContext, Pipeline};
use crate::syntax::ast::{Expr, Function, MemberProp, Program, Stmt};
use crate::syntax::build;
use crate::syntax::printer::print_expr;
use crate::syntax::visit::{walk_expr_mut, walk_function_mut, walk_stmt_mut, VisitMut};
use crate::types::{Options, Strategy};

#[cfg(test)]
mod tests;

/* ===================== Eval ===================== */

/// Routes run-time code evaluation through the host's compiler capability.
///
/// `eval(src)` calls `$compile_string(src)` and `Function(...)`/`new Function(...)`
/// call `$compile_func(...)`; both hand the text to the host, which compiles it with
/// the same transform and evaluates the result. The output then needs the
/// compiler-in-runtime preamble.
pub struct Eval;

impl Pass for Eval {
    fn name(&self) -> &'static str {
        "eval"
    }

    fn run(&self, mut program: Program, cx: &mut PassContext) -> Result<Program, CompileError> {
        struct Redirect {
            rewrites: usize,
        }

        impl VisitMut for Redirect {
            fn visit_expr_mut(&mut self, expr: &mut Expr) {
                walk_expr_mut(self, expr);
                let (helper, args) = match expr {
                    Expr::Call { callee, args } if callee.as_ident() == Some("eval") => {
                        ("$compile_string", args)
                    }
                    Expr::Call { callee, args } | Expr::New { callee, args }
                        if callee.as_ident() == Some("Function") =>
                    {
                        ("$compile_func", args)
                    }
                    _ => return,
                };
                let args = std::mem::take(args);
                *expr = build::call(build::ident(helper), args);
                self.rewrites += 1;
            }
        }

        let mut redirect = Redirect { rewrites: 0 };
        for stmt in &mut program.body {
            redirect.visit_stmt_mut(stmt);
        }
        if redirect.rewrites > 0 {
            debug!(rewrites = redirect.rewrites, "program evaluates code at run time");
            cx.needs_runtime_include = true;
        }
        Ok(program)
    }
}

/* ===================== Host Compiler Entry Points ===================== */

fn run_yield(source: &str, options: &Options) -> Result<Program, CompileError> {
    let program = parse_program(source)?;
    let mut cx = PassContext::new(&program, *options);
    Pipeline::for_strategy(Strategy::Yield, options).run(program, &mut cx)
}

/// Compile text handed to `eval` by a running yield program into the source of a
/// generator expression the runtime can delegate to.
pub fn eval_string(source: &str, options: &Options) -> Result<String, CompileError> {
    let wrapped = format!("(function () {{\n{}\n}})();", source);
    let program = run_yield(&wrapped, options)?;
    match program.body.as_slice() {
        [Stmt::Expr {
            expr:
                Expr::Yield {
                    arg: Some(arg),
                    delegate: true,
                },
        }] => Ok(print_expr(arg)),
        _ => Err(CompileError::pass("yield", "evaluated code did not compile to a call")),
    }
}

/// Compile the pieces handed to `Function(...)` into the source of a marked generator
/// function.
pub fn eval_function(
    name: &str,
    params: &[String],
    body: &str,
    options: &Options,
) -> Result<String, CompileError> {
    let wrapped = format!("(function {}({}) {{\n{}\n}});", name, params.join(", "), body);
    let program = run_yield(&wrapped, options)?;
    match program.body.as_slice() {
        [Stmt::Expr { expr }] => Ok(print_expr(expr)),
        _ => Err(CompileError::pass("yield", "function body did not compile to an expression")),
    }
}

/* ===================== Yielding ===================== */

pub struct Yielding;

impl Pass for Yielding {
    fn name(&self) -> &'static str {
        "yield"
    }

    fn run(&self, mut program: Program, cx: &mut PassContext) -> Result<Program, CompileError> {
        let mut marker = Marker {
            primitives: &cx.primitives,
            error: None,
        };
        for stmt in &mut program.body {
            marker.visit_stmt_mut(stmt);
        }
        if let Some(e) = marker.error {
            return Err(e);
        }
        mark_declarations(&mut program.body);
        Ok(program)
    }
}

struct Marker<'a> {
    primitives: &'a HashSet<String>,
    error: Option<CompileError>,
}

impl Marker<'_> {
    /// `yield* helper(...)` for a call or `new`, or `None` when it stays direct
    fn delegate(&self, expr: &mut Expr) -> Option<Expr> {
        let call = match expr {
            Expr::Call { callee, args } => {
                if is_primitive(self.primitives, &**callee) || is_runtime_helper(&**callee) {
                    return None;
                }
                let args = std::mem::take(args);
                match std::mem::replace(&mut **callee, Expr::Null) {
                    Expr::Member { object, prop } => {
                        let key = match prop {
                            MemberProp::Named { name } => build::str_lit(name),
                            MemberProp::Computed { expr } => *expr,
                        };
                        let mut all = vec![*object, key];
                        all.extend(args);
                        build::call(build::ident("$callMethod"), all)
                    }
                    callee => {
                        let mut all = vec![callee];
                        all.extend(args);
                        build::call(build::ident("$call"), all)
                    }
                }
            }
            Expr::New { callee, args } => {
                let mut all = vec![std::mem::replace(&mut **callee, Expr::Null)];
                all.extend(std::mem::take(args));
                build::call(build::ident("$handleNew"), all)
            }
            _ => return None,
        };
        Some(build::yield_star(call))
    }
}

impl VisitMut for Marker<'_> {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
        let body = match stmt {
            Stmt::While { body, .. }
            | Stmt::DoWhile { body, .. }
            | Stmt::For { body, .. }
            | Stmt::ForIn { body, .. } => body,
            _ => return,
        };
        let mut stmts = std::mem::replace(&mut **body, Stmt::Empty).into_block();
        stmts.insert(0, build::expr_stmt(build::yield_bare()));
        **body = build::block(stmts);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
        match expr {
            Expr::Call { .. } | Expr::New { .. } => {
                if let Some(delegated) = self.delegate(expr) {
                    *expr = delegated;
                }
            }
            Expr::Function { .. } => {
                let func = std::mem::replace(expr, Expr::Null);
                *expr = build::call(build::ident("$mark_func"), vec![func]);
            }
            Expr::Assign { op, target, value } if op.is_plain() && is_prototype(target) => {
                let rhs = std::mem::replace(&mut **value, Expr::Null);
                **value = build::call(build::ident("$proto_assign"), vec![rhs]);
            }
            _ => {}
        }
    }

    fn visit_function_mut(&mut self, func: &mut Function) {
        if func.generator && self.error.is_none() {
            self.error = Some(CompileError::pass(
                "yield",
                "generator functions are not supported",
            ));
        }
        walk_function_mut(self, func);
        func.generator = true;
        func.body.insert(0, build::expr_stmt(build::yield_bare()));
        mark_declarations(&mut func.body);
    }
}

/// Insert `$mark_func(f);` after every function declaration in `body`
fn mark_declarations(body: &mut Vec<Stmt>) {
    let mut out = Vec::with_capacity(body.len());
    for stmt in body.drain(..) {
        let mark = match &stmt {
            Stmt::Function { func } => func.name.clone(),
            _ => None,
        };
        out.push(stmt);
        if let Some(name) = mark {
            out.push(build::expr_stmt(build::call(
                build::ident("$mark_func"),
                vec![build::ident(name)],
            )));
        }
    }
    *body = out;
}

/// `F.prototype` as an assignment target
fn is_prototype(target: &Expr) -> bool {
    matches!(
        target,
        Expr::Member {
            prop: MemberProp::Named { name },
            ..
        } if name == "prototype"
    )
}

fn is_runtime_helper(callee: &Expr) -> bool {
    matches!(
        callee.as_ident(),
        Some("$mark_func" | "$proto_assign" | "$call" | "$callMethod" | "$handleNew")
    )
}
