//! Stack-reifying back-end
//!
//! Every function can be suspended at any call site and later re-entered at that same
//! point. Suspension unwinds the native stack with a `$__R.Capture` signal; on the way
//! out each instrumented call site pushes a frame recording how to re-invoke its
//! function, the function's live locals and the call site's label. Resuming replays
//! the frames outermost first with the runtime in `restoring` mode:
//!
//! - each function pops its frame on entry, restores its locals and sets `$target`
//!   to the label it was suspended at;
//! - every statement that is not on the path to `$target` is skipped, and `if`/`while`
//!   tests route execution towards the branch that contains the label;
//! - the call site labeled `$target` takes its result from `$__R.resume()`, which
//!   re-invokes the next frame, or switches back to `normal` mode once the innermost
//!   frame is reached.
//!
//! ```text
//! x = f(a);
//! // becomes
//! if ($__R.mode === "normal" || $target === 3) {
//!   try {
//!     if ($__R.mode === "normal") { x = f(a); } else { x = $__R.resume(); }
//!   } catch ($exn) {
//!     if ($__R.isCapture($exn)) {
//!       $exn.stack.push({ f: () => { ... }, locals: [a, x], index: 3 });
//!     }
//!     throw $exn;
//!   }
//! }
//! ```
//!
//! Input must be desugared and normalized with the jumper variant of variable
//! hoisting (every binding a function-level local) and named functions.

use std::collections::HashSet;

use crate::desugar::for_each_function;
use crate::error::CompileError;
use crate::pipeline::{is_primitive, Pass, PassContext};
use crate::syntax::ast::{Expr, Function, Program, Stmt, VarKind};
use crate::syntax::visit::{walk_expr_mut, VisitMut};
use crate::syntax::{build, NameGen};

#[cfg(test)]
mod tests;

type JumperResult<T> = Result<T, CompileError>;

const PASS: &str = "jumper";
const PROGRAM: &str = "$program";
const TARGET: &str = "$target";
const FRAME: &str = "$frame";

/* ===================== NameFunctions ===================== */

/// Gives every anonymous function expression a fresh name, so a captured frame can
/// refer to the function it re-invokes.
pub struct NameFunctions;

impl Pass for NameFunctions {
    fn name(&self) -> &'static str {
        "name-functions"
    }

    fn run(&self, mut program: Program, cx: &mut PassContext) -> Result<Program, CompileError> {
        struct Namer<'a> {
            names: &'a mut NameGen,
        }

        impl VisitMut for Namer<'_> {
            fn visit_expr_mut(&mut self, expr: &mut Expr) {
                if let Expr::Function { func } = expr {
                    if func.name.is_none() {
                        func.name = Some(self.names.fresh("fn"));
                    }
                }
                walk_expr_mut(self, expr);
            }
        }

        let mut namer = Namer {
            names: &mut cx.names,
        };
        for stmt in &mut program.body {
            namer.visit_stmt_mut(stmt);
        }
        Ok(program)
    }
}

/* ===================== Jumper ===================== */

pub struct Jumper;

impl Pass for Jumper {
    fn name(&self) -> &'static str {
        PASS
    }

    fn run(&self, program: Program, cx: &mut PassContext) -> Result<Program, CompileError> {
        let exn = cx.names.fresh("exn");
        let mut instrument = Instrument {
            primitives: &cx.primitives,
            names: &mut cx.names,
            exn,
            next_label: 0,
        };
        let body = instrument.function_body(PROGRAM, &[], program.body)?;
        Ok(Program {
            body: vec![build::func_decl(PROGRAM, Vec::new(), body)],
        })
    }
}

/// The function whose body is being instrumented
struct Scope<'s> {
    name: &'s str,
    locals: Vec<String>,
}

struct Instrument<'a> {
    primitives: &'a HashSet<String>,
    names: &'a mut NameGen,
    /// Catch parameter of the capture handlers
    exn: String,
    next_label: usize,
}

/// Statements plus the call-site labels they contain
type Labeled<T> = (T, Vec<usize>);

impl Instrument<'_> {
    fn function_body(
        &mut self,
        name: &str,
        params: &[String],
        body: Vec<Stmt>,
    ) -> JumperResult<Vec<Stmt>> {
        let outer = std::mem::replace(&mut self.next_label, 0);

        let split = body
            .iter()
            .position(|s| !is_local_list(s))
            .unwrap_or(body.len());
        let mut rest = body;
        let decls: Vec<Stmt> = rest.drain(..split).collect();

        let scope = Scope {
            name,
            locals: declared_locals(params, &decls),
        };

        let mut out = decls;
        out.push(build::var(TARGET, Some(build::null())));
        out.push(restore_block(&scope.locals));
        let (entry, _) = self.call_site(build::expr_stmt(suspend()), &scope)?;
        out.push(entry);
        let (stmts, _) = self.block(rest, &scope)?;
        out.extend(stmts);

        self.next_label = outer;
        Ok(out)
    }

    fn block(&mut self, stmts: Vec<Stmt>, scope: &Scope) -> JumperResult<Labeled<Vec<Stmt>>> {
        let mut out = Vec::with_capacity(stmts.len());
        let mut labels = Vec::new();
        for stmt in stmts {
            let (s, l) = self.stmt(stmt, scope)?;
            out.extend(s);
            labels.extend(l);
        }
        Ok((out, labels))
    }

    fn single(&mut self, stmt: Stmt, scope: &Scope) -> JumperResult<Labeled<Stmt>> {
        let (stmts, labels) = self.block(stmt.into_block(), scope)?;
        Ok((build::block(stmts), labels))
    }

    fn stmt(&mut self, stmt: Stmt, scope: &Scope) -> JumperResult<Labeled<Vec<Stmt>>> {
        Ok(match stmt {
            Stmt::Empty => (Vec::new(), Vec::new()),
            Stmt::Expr { mut expr } => {
                self.expr(&mut expr)?;
                if self.is_call_site(&expr) {
                    let (s, label) = self.call_site(build::expr_stmt(expr), scope)?;
                    (vec![s], vec![label])
                } else {
                    (vec![when_normal(build::expr_stmt(expr))], Vec::new())
                }
            }
            Stmt::Var { kind, mut decls } => {
                for d in &mut decls {
                    if let Some(init) = &mut d.init {
                        self.expr(init)?;
                    }
                }
                (vec![when_normal(Stmt::Var { kind, decls })], Vec::new())
            }
            Stmt::Return { mut arg } => {
                if let Some(arg) = &mut arg {
                    self.expr(arg)?;
                }
                (vec![when_normal(Stmt::Return { arg })], Vec::new())
            }
            Stmt::Throw { mut arg } => {
                self.expr(&mut arg)?;
                (vec![when_normal(Stmt::Throw { arg })], Vec::new())
            }
            Stmt::Break { .. } => (vec![when_normal(stmt)], Vec::new()),
            Stmt::Block { body } => {
                let (body, labels) = self.block(body, scope)?;
                (vec![build::block(body)], labels)
            }
            Stmt::Labeled { label, body } => {
                let (body, labels) = self.single(*body, scope)?;
                (vec![build::labeled(label, body)], labels)
            }
            Stmt::If {
                mut test,
                cons,
                alt,
            } => {
                self.expr(&mut test)?;
                let (cons, cons_labels) = self.single(*cons, scope)?;
                let mut labels = cons_labels.clone();
                let alt = match alt {
                    Some(alt) => {
                        let (alt, alt_labels) = self.single(*alt, scope)?;
                        let alt_test = route(&alt_labels, None);
                        labels.extend(alt_labels);
                        Some(build::if_stmt(alt_test, alt, None))
                    }
                    None => None,
                };
                let test = route(&cons_labels, Some(test));
                (vec![build::if_stmt(test, cons, alt)], labels)
            }
            Stmt::While { mut test, body } => {
                self.expr(&mut test)?;
                let (entry, entry_label) = self.call_site(build::expr_stmt(suspend()), scope)?;
                let (mut body, mut labels) = self.block(body.into_block(), scope)?;
                body.insert(0, entry);
                labels.insert(0, entry_label);
                let test = route(&labels, Some(test));
                (vec![build::while_(test, body)], labels)
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                let (mut block, mut labels) = self.block(block, scope)?;
                let handler = match handler {
                    Some(h) => {
                        let (mut body, handler_labels) = self.block(h.body, scope)?;
                        body.insert(
                            0,
                            build::if_(
                                build::call(
                                    build::member(runtime(), "isUnwind"),
                                    vec![build::ident(&h.param)],
                                ),
                                vec![build::throw(build::ident(&h.param))],
                                None,
                            ),
                        );
                        if !handler_labels.is_empty() {
                            block.insert(
                                0,
                                build::if_(
                                    build::and(restoring(), targets(&handler_labels)),
                                    vec![build::throw(build::member(runtime(), "reenter"))],
                                    None,
                                ),
                            );
                        }
                        labels.extend(handler_labels);
                        Some((h.param, body))
                    }
                    None => None,
                };
                let finalizer = match finalizer {
                    Some(f) => {
                        let (body, _) = self.block(f, scope)?;
                        Some(vec![build::if_(
                            build::not(build::member(runtime(), "capturing")),
                            body,
                            None,
                        )])
                    }
                    None => None,
                };
                (vec![build::try_(block, handler, finalizer)], labels)
            }
            Stmt::Function { .. } => {
                return Err(CompileError::pass(
                    PASS,
                    "function declarations must be hoisted into assignments first",
                ))
            }
            _ => {
                return Err(CompileError::pass(
                    PASS,
                    "unexpected statement after desugaring",
                ))
            }
        })
    }

    fn is_call_site(&self, expr: &Expr) -> bool {
        let call = match expr {
            Expr::Assign { value, .. } => &**value,
            other => other,
        };
        match call {
            Expr::Call { callee, .. } => !is_primitive(self.primitives, callee),
            Expr::New { .. } => true,
            _ => false,
        }
    }

    /// Instrument a call statement (`f(x);` or `t = f(x);`) with the next label.
    fn call_site(&mut self, stmt: Stmt, scope: &Scope) -> JumperResult<(Stmt, usize)> {
        let Stmt::Expr { expr } = stmt else {
            return Err(CompileError::pass(PASS, "call site must be an expression statement"));
        };
        let label = self.next_label;
        self.next_label += 1;

        let (call, resumed) = match expr {
            Expr::Assign { op, target, value } => (
                build::assign_op(op, (*target).clone(), *value),
                build::assign_op(op, *target, resume()),
            ),
            call => (call, resume()),
        };
        let attempt = build::if_(
            normal(),
            vec![build::expr_stmt(call)],
            Some(vec![build::expr_stmt(resumed)]),
        );

        let exn = build::ident(&self.exn);
        let handler = vec![
            build::if_(
                build::call(build::member(runtime(), "isCapture"), vec![exn.clone()]),
                vec![build::expr_stmt(build::call(
                    build::path(&self.exn, &["stack", "push"]),
                    vec![frame(scope, label)],
                ))],
                None,
            ),
            build::throw(exn),
        ];

        let guarded = build::try_(vec![attempt], Some((self.exn.clone(), handler)), None);
        let stmt = build::if_(build::or(normal(), target_is(label)), vec![guarded], None);
        Ok((stmt, label))
    }

    /// Instrument the bodies of the functions nested in `expr`
    fn expr(&mut self, expr: &mut Expr) -> JumperResult<()> {
        let mut result = Ok(());
        for_each_function(expr, &mut |func: &mut Function| {
            if result.is_err() {
                return;
            }
            let Some(mut name) = func.name.clone() else {
                result = Err(CompileError::pass(PASS, "anonymous function left unnamed"));
                return;
            };
            // a parameter or local named like the function hides it from its frames
            let leading: Vec<Stmt> = func
                .body
                .iter()
                .take_while(|s| is_local_list(s))
                .cloned()
                .collect();
            if declared_locals(&func.params, &leading).contains(&name) {
                name = self.names.fresh(&format!("self_{}", name));
                func.name = Some(name.clone());
            }
            let body = std::mem::take(&mut func.body);
            match self.function_body(&name, &func.params, body) {
                Ok(body) => func.body = body,
                Err(e) => result = Err(e),
            }
        });
        result
    }
}

/* ===================== Fragments ===================== */

fn runtime() -> Expr {
    build::ident("$__R")
}

fn mode_is(mode: &str) -> Expr {
    build::strict_eq(build::member(runtime(), "mode"), build::str_lit(mode))
}

fn normal() -> Expr {
    mode_is("normal")
}

fn restoring() -> Expr {
    mode_is("restoring")
}

fn target_is(label: usize) -> Expr {
    build::strict_eq(build::ident(TARGET), build::num(label as f64))
}

/// `$target === 1 || $target === 4 || ...`
fn targets(labels: &[usize]) -> Expr {
    build::any(labels.iter().map(|&l| target_is(l)).collect())
}

/// Test that enters a construct when restoring towards one of `labels`, or when
/// running normally and `test` holds. `None` stands for an always-true test.
fn route(labels: &[usize], test: Option<Expr>) -> Expr {
    let forward = match test {
        Some(test) => build::and(normal(), test),
        None => normal(),
    };
    if labels.is_empty() {
        forward
    } else {
        build::or(build::and(restoring(), targets(labels)), forward)
    }
}

fn when_normal(stmt: Stmt) -> Stmt {
    build::if_(normal(), vec![stmt], None)
}

fn suspend() -> Expr {
    build::call(build::member(runtime(), "suspend"), Vec::new())
}

fn resume() -> Expr {
    build::call(build::member(runtime(), "resume"), Vec::new())
}

/// `if ($__R.mode === "restoring") { const $frame = $__R.stack.pop(); ... }`
fn restore_block(locals: &[String]) -> Stmt {
    let mut body = vec![build::const_(
        FRAME,
        build::call(build::path("$__R", &["stack", "pop"]), Vec::new()),
    )];
    for (i, local) in locals.iter().enumerate() {
        body.push(build::expr_stmt(build::assign(
            build::ident(local),
            build::index(build::path(FRAME, &["locals"]), build::num(i as f64)),
        )));
    }
    body.push(build::expr_stmt(build::assign(
        build::ident(TARGET),
        build::path(FRAME, &["index"]),
    )));
    build::if_(restoring(), body, None)
}

/// `{ f: () => { return $__R.reinvoke(F, this, arguments, new.target); }, locals, index }`
fn frame(scope: &Scope, label: usize) -> Expr {
    let reinvoke = build::arrow(
        Vec::new(),
        vec![build::ret(build::call(
            build::member(runtime(), "reinvoke"),
            vec![
                build::ident(scope.name),
                Expr::This,
                build::ident("arguments"),
                Expr::NewTarget,
            ],
        ))],
    );
    build::object(vec![
        ("f".to_string(), reinvoke),
        (
            "locals".to_string(),
            build::array(scope.locals.iter().map(build::ident).collect()),
        ),
        ("index".to_string(), build::num(label as f64)),
    ])
}

/// Parameters followed by the names bound by the leading `var` lists
fn declared_locals(params: &[String], decls: &[Stmt]) -> Vec<String> {
    let mut locals = params.to_vec();
    for decl in decls {
        if let Stmt::Var { decls, .. } = decl {
            locals.extend(decls.iter().map(|d| d.name.clone()));
        }
    }
    locals
}

/// `var a, b;` as produced by hoisting: a declaration list without initializers
fn is_local_list(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::Var { kind: VarKind::Var, decls } if decls.iter().all(|d| d.init.is_none())
    )
}
