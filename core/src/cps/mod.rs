//! Continuation-passing back-end
//!
//! Folds each canonical statement list into continuation-accepting code. Every
//! function gains a leading return-continuation parameter, and every call site hands
//! the rest of its statement list to the callee as an arrow function:
//!
//! ```text
//! let $t = f(x); g($t);
//! // becomes
//! return $apply(void 0, f, ($t) => {
//!   return $apply(void 0, g, () => {
//!     return $k(void 0);
//!   }, $t);
//! }, x);
//! ```
//!
//! Calls go through the runtime's `$apply`, the scheduling boundary that also tells
//! transformed callees (registered with `$cps`) from native ones. Loops become
//! recursive arrow functions whose back-edge runs through `$tick`. The whole program
//! folds into a single function expression taking the final continuation.
//!
//! Input must be desugared and in administrative normal form: labeled `while` loops
//! only, hoisted declarations, calls only as statements or `let` initializers.

use std::collections::HashSet;

use crate::error::CompileError;
use crate::pipeline::{is_primitive, Pass, PassContext};
use crate::syntax::ast::{Declarator, Expr, Function, Program, Stmt};
use crate::syntax::visit::{walk_expr_mut, walk_stmt_mut, VisitMut};
use crate::syntax::{build, NameGen};


type CpsResult<T> = Result<T, CompileError>;

const PASS: &str = "cps";

pub struct Cps;

impl Pass for Cps {
    fn name(&self) -> &'static str {
        PASS
    }

    fn run(&self, program: Program, cx: &mut PassContext) -> Result<Program, CompileError> {
        let mut folder = Folder {
            names: &mut cx.names,
            primitives: &cx.primitives,
        };
        let ret = folder.names.fresh("ret");
        let env = Env::new(&ret);
        let body = folder.fold(program.body, &ret, &env)?;
        Ok(Program {
            body: vec![build::expr_stmt(build::func(vec![ret], body))],
        })
    }
}

/// Where control goes on `return` and on `break L`
#[derive(Debug, Clone)]
struct Env {
    ret: String,
    labels: Vec<(String, String)>,
}

impl Env {
    fn new(ret: &str) -> Self {
        Self {
            ret: ret.to_string(),
            labels: Vec::new(),
        }
    }

    fn with_label(&self, label: String, k: &str) -> Self {
        let mut env = self.clone();
        env.labels.push((label, k.to_string()));
        env
    }

    fn label(&self, label: &str) -> Option<&str> {
        self.labels
            .iter()
            .rev()
            .find(|(l, _)| l == label)
            .map(|(_, k)| k.as_str())
    }
}

struct Folder<'a> {
    names: &'a mut NameGen,
    primitives: &'a HashSet<String>,
}

impl Folder<'_> {
    /// Fold `stmts` into statements that run them and finally return `k(void 0)`.
    fn fold(&mut self, stmts: Vec<Stmt>, k: &str, env: &Env) -> CpsResult<Vec<Stmt>> {
        let mut out = Vec::new();
        let mut rest = stmts.into_iter();

        while let Some(stmt) = rest.next() {
            match stmt {
                Stmt::Empty => {}
                Stmt::Block { body } => {
                    let body: Vec<Stmt> = body.into_iter().chain(rest).collect();
                    out.extend(self.fold(body, k, env)?);
                    return Ok(out);
                }
                Stmt::Var { kind, mut decls } => {
                    if let [Declarator {
                        init: Some(init), ..
                    }] = decls.as_slice()
                    {
                        if init.is_call() && !self.is_direct(init) {
                            let Some(Declarator {
                                name,
                                init: Some(init),
                            }) = decls.pop()
                            else {
                                return Err(CompileError::pass(PASS, "malformed declaration"));
                            };
                            let tail = self.fold(rest.collect(), k, env)?;
                            out.push(build::ret(self.apply(init, vec![name], tail)?));
                            return Ok(out);
                        }
                    }
                    for d in &mut decls {
                        if let Some(init) = &mut d.init {
                            self.expr(init)?;
                        }
                    }
                    out.push(Stmt::Var { kind, decls });
                }
                Stmt::Expr { mut expr } => {
                    if expr.is_call() && !self.is_direct(&expr) {
                        let tail = self.fold(rest.collect(), k, env)?;
                        out.push(build::ret(self.apply(expr, Vec::new(), tail)?));
                        return Ok(out);
                    }
                    self.expr(&mut expr)?;
                    out.push(build::expr_stmt(expr));
                }
                Stmt::Function { func } => {
                    let func = self.function(func)?;
                    let name = func.name.clone().unwrap_or_default();
                    out.push(Stmt::Function { func });
                    out.push(build::expr_stmt(build::call(
                        build::ident("$cps"),
                        vec![build::ident(name)],
                    )));
                }
                Stmt::Return { arg } => {
                    let mut arg = arg.unwrap_or_else(build::undefined);
                    self.expr(&mut arg)?;
                    out.push(build::ret(build::call(build::ident(&env.ret), vec![arg])));
                    return Ok(out);
                }
                Stmt::Throw { mut arg } => {
                    self.expr(&mut arg)?;
                    out.push(build::throw(arg));
                    return Ok(out);
                }
                Stmt::Break { label: Some(label) } => {
                    let Some(exit) = env.label(&label) else {
                        return Err(CompileError::pass(
                            PASS,
                            format!("break to unknown label `{}`", label),
                        ));
                    };
                    out.push(build::ret(build::call(build::ident(exit), Vec::new())));
                    return Ok(out);
                }
                Stmt::If {
                    mut test,
                    cons,
                    alt,
                } => {
                    self.expr(&mut test)?;
                    let join = self.join(rest.collect(), k, env, &mut out)?;
                    let cons = self.fold(cons.into_block(), &join, env)?;
                    let alt = match alt {
                        Some(alt) => self.fold(alt.into_block(), &join, env)?,
                        None => vec![self.resume(&join)],
                    };
                    out.push(build::if_(test, cons, Some(alt)));
                    return Ok(out);
                }
                Stmt::Labeled { label, body } => {
                    let join = self.join(rest.collect(), k, env, &mut out)?;
                    let inner = env.with_label(label, &join);
                    out.extend(self.fold(body.into_block(), &join, &inner)?);
                    return Ok(out);
                }
                Stmt::While { mut test, body } => {
                    self.expr(&mut test)?;
                    let join = self.join(rest.collect(), k, env, &mut out)?;
                    let lp = self.names.fresh("loop");
                    let again = self.names.fresh("again");

                    let mut loop_body = vec![build::if_(
                        build::not(test),
                        vec![self.resume(&join)],
                        None,
                    )];
                    loop_body.extend(self.fold(body.into_block(), &again, env)?);

                    out.push(build::const_(&lp, build::arrow(Vec::new(), loop_body)));
                    out.push(build::const_(
                        &again,
                        build::arrow(
                            Vec::new(),
                            vec![build::ret(build::call(
                                build::ident("$tick"),
                                vec![build::ident(&lp)],
                            ))],
                        ),
                    ));
                    out.push(build::ret(build::call(build::ident(lp), Vec::new())));
                    return Ok(out);
                }
                Stmt::Try {
                    block,
                    handler,
                    finalizer,
                } => {
                    let join = self.join(rest.collect(), k, env, &mut out)?;

                    let kb = self.names.fresh("k");
                    let block = build::arrow(vec![kb.clone()], self.fold(block, &kb, env)?);
                    let handler = match handler {
                        Some(h) => {
                            // the runtime hands the handler a continuation that runs the finalizer
                            let kh = self.names.fresh("k");
                            let body = self.fold(h.body, &kh, env)?;
                            build::arrow(vec![h.param, kh], body)
                        }
                        None => build::null(),
                    };
                    let finalizer = match finalizer {
                        Some(f) => {
                            let kf = self.names.fresh("k");
                            build::arrow(vec![kf.clone()], self.fold(f, &kf, env)?)
                        }
                        None => build::null(),
                    };
                    out.push(build::ret(build::call(
                        build::ident("$try"),
                        vec![block, handler, finalizer, build::ident(join)],
                    )));
                    return Ok(out);
                }
                other => {
                    return Err(CompileError::pass(
                        PASS,
                        format!("unexpected statement after desugaring: {}", describe(&other)),
                    ))
                }
            }
        }

        out.push(self.resume(k));
        Ok(out)
    }

    /// `return k(void 0);`
    fn resume(&self, k: &str) -> Stmt {
        build::ret(build::call(build::ident(k), vec![build::undefined()]))
    }

    /// Bind the statements after a branching construct to a continuation so every arm
    /// can end in it. An empty tail reuses `k`.
    fn join(&mut self, rest: Vec<Stmt>, k: &str, env: &Env, out: &mut Vec<Stmt>) -> CpsResult<String> {
        if rest.iter().all(|s| matches!(s, Stmt::Empty)) {
            return Ok(k.to_string());
        }
        let name = self.names.fresh("k");
        let tail = self.fold(rest, k, env)?;
        out.push(build::const_(&name, build::arrow(Vec::new(), tail)));
        Ok(name)
    }

    /// Primitive calls stay direct when optimizing
    fn is_direct(&self, call: &Expr) -> bool {
        match call {
            Expr::Call { callee, .. } => is_primitive(self.primitives, callee),
            _ => false,
        }
    }

    /// `$apply(this, f, (params) => { tail }, ...args)` or `$new(C, k, ...args)`
    fn apply(&mut self, call: Expr, params: Vec<String>, tail: Vec<Stmt>) -> CpsResult<Expr> {
        let k = build::arrow(params, tail);
        match call {
            Expr::Call { callee, mut args } => {
                for a in &mut args {
                    self.expr(a)?;
                }
                let mut callee = *callee;
                self.expr(&mut callee)?;
                let this = match &callee {
                    Expr::Member { object, .. } => (**object).clone(),
                    _ => build::undefined(),
                };
                let mut all = vec![this, callee, k];
                all.extend(args);
                Ok(build::call(build::ident("$apply"), all))
            }
            Expr::New { callee, mut args } => {
                for a in &mut args {
                    self.expr(a)?;
                }
                let mut callee = *callee;
                self.expr(&mut callee)?;
                let mut all = vec![callee, k];
                all.extend(args);
                Ok(build::call(build::ident("$new"), all))
            }
            other => Err(CompileError::pass(
                PASS,
                format!("expected a call, found {:?}", other),
            )),
        }
    }

    /// Transform a function: leading return continuation, folded body.
    fn function(&mut self, func: Function) -> CpsResult<Function> {
        if func.generator {
            return Err(CompileError::pass(PASS, "generator functions are not supported"));
        }
        let ret = self.names.fresh("ret");
        let mut body = func.body;
        shift_arguments(&mut body, self.names);
        let env = Env::new(&ret);
        let body = self.fold(body, &ret, &env)?;

        let mut params = vec![ret];
        params.extend(func.params);
        Ok(Function {
            name: func.name,
            params,
            body,
            generator: false,
            arrow: false,
        })
    }

    /// Transform every function expression in `expr`, registering it with `$cps`.
    fn expr(&mut self, expr: &mut Expr) -> CpsResult<()> {
        struct Lift<'f, 'a> {
            folder: &'f mut Folder<'a>,
            error: Option<CompileError>,
        }

        impl VisitMut for Lift<'_, '_> {
            fn visit_expr_mut(&mut self, expr: &mut Expr) {
                if self.error.is_some() {
                    return;
                }
                if !matches!(expr, Expr::Function { .. }) {
                    walk_expr_mut(self, expr);
                    return;
                }
                if let Expr::Function { func } = std::mem::replace(expr, Expr::Null) {
                    match self.folder.function(*func) {
                        Ok(func) => {
                            *expr = build::call(build::ident("$cps"), vec![build::func_expr(func)])
                        }
                        Err(e) => self.error = Some(e),
                    }
                }
            }
        }

        let mut lift = Lift {
            folder: self,
            error: None,
        };
        lift.visit_expr_mut(expr);
        match lift.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Rebind `arguments` to a copy without the leading continuation
fn shift_arguments(body: &mut Vec<Stmt>, names: &mut NameGen) {
    struct Renamer<'a> {
        to: &'a str,
        found: bool,
    }

    impl VisitMut for Renamer<'_> {
        fn visit_expr_mut(&mut self, expr: &mut Expr) {
            match expr {
                Expr::Ident { name } if name == "arguments" => {
                    *name = self.to.to_string();
                    self.found = true;
                }
                _ => walk_expr_mut(self, expr),
            }
        }

        fn visit_function_mut(&mut self, _func: &mut Function) {}
    }

    let local = names.fresh("args");
    let mut renamer = Renamer {
        to: &local,
        found: false,
    };
    for stmt in body.iter_mut() {
        walk_stmt_mut(&mut renamer, stmt);
    }
    if renamer.found {
        let slice = build::call(
            build::path("Array", &["prototype", "slice", "call"]),
            vec![build::ident("arguments"), build::num(1.0)],
        );
        body.insert(0, build::const_(local, slice));
    }
}

fn describe(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::DoWhile { .. } => "do-while",
        Stmt::For { .. } => "for",
        Stmt::ForIn { .. } => "for-in",
        Stmt::Switch { .. } => "switch",
        Stmt::Continue { .. } => "continue",
        Stmt::Break { .. } => "unlabeled break",
        _ => "statement",
    }
}
