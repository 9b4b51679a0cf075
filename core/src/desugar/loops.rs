//! Loop canonicalization
//!
//! `for`, `do-while` and `for-in` become `while`, and every `while` is wrapped once in
//! a synthetic break label around the loop and a synthetic continue label around its
//! body:
//!
//! ```text
//! for (init; test; update) body
//! // becomes
//! init;
//! $loop_break: while (test) {
//!   $loop_continue: { body }
//!   update;
//! }
//! ```
//!
//! `continue` turns into `break $loop_continue` and unlabeled `break` into
//! `break $loop_break`, so later passes only ever see labeled breaks. Loops that already
//! carry the synthetic labels are recognized and kept as they are, which makes the pass
//! idempotent.

use super::{Rewrite, RewriteResult};
use crate::error::CompileError;
use crate::pipeline::{Pass, PassContext};
use crate::syntax::ast::{
    BinaryOp, Expr, ForInLeft, ForInit, Function, Program, Stmt, UpdateOp, VarKind,
};
use crate::syntax::{build, NameGen};

const BREAK_BASE: &str = "loop_break";
const CONTINUE_BASE: &str = "loop_continue";

/// Is `label` a break label this pass generated?
pub fn is_break_label(label: &str) -> bool {
    label.starts_with("$loop_break")
}

/// Is `label` a continue label this pass generated?
pub fn is_continue_label(label: &str) -> bool {
    label.starts_with("$loop_continue")
}

pub struct Loops;

impl Pass for Loops {
    fn name(&self) -> &'static str {
        "loops"
    }

    fn run(&self, mut program: Program, cx: &mut PassContext) -> Result<Program, CompileError> {
        let mut rewriter = LoopRewriter {
            names: &mut cx.names,
            targets: Vec::new(),
            pending: Vec::new(),
        };
        program.body = rewriter.block(program.body)?;
        Ok(program)
    }
}

/// A loop that `break` and `continue` may refer to
struct Target {
    /// User labels written directly on the loop
    labels: Vec<String>,
    brk: String,
    cont: String,
}

struct LoopRewriter<'a> {
    names: &'a mut NameGen,
    targets: Vec<Target>,
    /// User labels seen on the way down to the next statement
    pending: Vec<String>,
}

impl LoopRewriter<'_> {
    fn fail(message: impl Into<String>) -> CompileError {
        CompileError::pass("loops", message)
    }

    fn continue_target(&self, label: Option<&str>) -> RewriteResult<String> {
        let found = match label {
            None => self.targets.last(),
            Some(l) => self
                .targets
                .iter()
                .rev()
                .find(|t| t.labels.iter().any(|x| x == l)),
        };
        found
            .map(|t| t.cont.clone())
            .ok_or_else(|| match label {
                None => Self::fail("continue outside of a loop"),
                Some(l) => Self::fail(format!("continue to unknown loop label `{}`", l)),
            })
    }

    /// Run `body` with `target` as the innermost loop
    fn within(&mut self, target: Target, body: Vec<Stmt>) -> RewriteResult<Vec<Stmt>> {
        self.targets.push(target);
        let result = self.block(body);
        self.targets.pop();
        result
    }

    /// `$loop_break: while (test) { $loop_continue: { prologue; body } tail }`
    fn while_loop(
        &mut self,
        labels: Vec<String>,
        mut test: Expr,
        body: Stmt,
        prologue: Vec<Stmt>,
        tail: Option<Expr>,
    ) -> RewriteResult<Stmt> {
        let brk = self.names.fresh(BREAK_BASE);
        let cont = self.names.fresh(CONTINUE_BASE);
        self.expr(&mut test)?;

        let mut inner = prologue;
        inner.extend(self.within(
            Target {
                labels,
                brk: brk.clone(),
                cont: cont.clone(),
            },
            body.into_block(),
        )?);

        let mut loop_body = vec![build::labeled(cont, build::block(inner))];
        if let Some(mut tail) = tail {
            self.expr(&mut tail)?;
            loop_body.push(build::expr_stmt(tail));
        }
        Ok(build::labeled(brk, build::while_(test, loop_body)))
    }

    /// A loop already in canonical shape: keep its labels, rewrite inside
    fn canonical(&mut self, labels: Vec<String>, brk: String, stmt: Stmt) -> RewriteResult<Stmt> {
        let Stmt::While { mut test, body } = stmt else {
            return Err(Self::fail("synthetic break label on a non-loop"));
        };
        let mut parts = body.into_block();
        let has_continue =
            matches!(parts.first(), Some(Stmt::Labeled { label, .. }) if is_continue_label(label));
        if !has_continue {
            return Err(Self::fail("synthetic loop without a continue label"));
        }
        let Stmt::Labeled { label: cont, body } = parts.remove(0) else {
            return Err(Self::fail("synthetic loop without a continue label"));
        };
        let inner = body.into_block();

        self.expr(&mut test)?;
        let inner = self.within(
            Target {
                labels,
                brk: brk.clone(),
                cont: cont.clone(),
            },
            inner,
        )?;
        let rest = self.block(parts)?;

        let mut loop_body = vec![build::labeled(cont, build::block(inner))];
        loop_body.extend(rest);
        Ok(build::labeled(brk, build::while_(test, loop_body)))
    }

    fn for_loop(&mut self, labels: Vec<String>, stmt: Stmt) -> RewriteResult<Vec<Stmt>> {
        let Stmt::For {
            init,
            test,
            update,
            body,
        } = stmt
        else {
            return Err(Self::fail("expected a for loop"));
        };

        let mut out = Vec::new();
        let mut scoped = false;
        match init {
            Some(ForInit::Decl { kind, mut decls }) => {
                for d in &mut decls {
                    if let Some(e) = &mut d.init {
                        self.expr(e)?;
                    }
                }
                scoped = kind != VarKind::Var;
                out.push(Stmt::Var { kind, decls });
            }
            Some(ForInit::Expr { mut expr }) => {
                self.expr(&mut expr)?;
                out.push(build::expr_stmt(expr));
            }
            None => {}
        }

        let test = test.unwrap_or_else(|| build::bool_lit(true));
        out.push(self.while_loop(labels, test, *body, Vec::new(), update)?);

        // keep `let i` from leaking into the enclosing scope
        if scoped {
            Ok(vec![build::block(out)])
        } else {
            Ok(out)
        }
    }

    fn do_while(&mut self, labels: Vec<String>, body: Stmt, test: Expr) -> RewriteResult<Vec<Stmt>> {
        let ran = self.names.fresh("runOnce");
        let test = build::or(build::ident(&ran), test);
        let prologue = vec![build::expr_stmt(build::assign(
            build::ident(&ran),
            build::bool_lit(false),
        ))];
        Ok(vec![
            build::let_(&ran, build::bool_lit(true)),
            self.while_loop(labels, test, body, prologue, None)?,
        ])
    }

    /// Enumerate `Object.keys` of every level of the prototype chain. `break` leaves
    /// both loops; `continue` moves to the next key.
    fn for_in(
        &mut self,
        labels: Vec<String>,
        left: ForInLeft,
        mut right: Expr,
        body: Stmt,
    ) -> RewriteResult<Vec<Stmt>> {
        let obj = self.names.fresh("forin_obj");
        let keys = self.names.fresh("forin_keys");
        let idx = self.names.fresh("forin_index");
        let outer_brk = self.names.fresh(BREAK_BASE);
        let outer_cont = self.names.fresh(CONTINUE_BASE);
        let inner_brk = self.names.fresh(BREAK_BASE);
        let inner_cont = self.names.fresh(CONTINUE_BASE);

        self.expr(&mut right)?;
        let key = build::index(build::ident(&keys), build::ident(&idx));
        let bind = match left {
            ForInLeft::Decl { kind, name } => build::decl(kind, name, Some(key)),
            ForInLeft::Target { mut expr } => {
                self.expr(&mut expr)?;
                build::expr_stmt(build::assign(expr, key))
            }
        };

        let mut inner = vec![bind];
        inner.extend(self.within(
            Target {
                labels,
                brk: outer_brk.clone(),
                cont: inner_cont.clone(),
            },
            body.into_block(),
        )?);

        let key_loop = build::labeled(
            inner_brk,
            build::while_(
                build::binary(
                    BinaryOp::Lt,
                    build::ident(&idx),
                    build::member(build::ident(&keys), "length"),
                ),
                vec![
                    build::labeled(inner_cont, build::block(inner)),
                    build::expr_stmt(build::update(UpdateOp::Incr, false, build::ident(&idx))),
                ],
            ),
        );

        let level = vec![
            build::let_(
                &keys,
                build::call(build::path("Object", &["keys"]), vec![build::ident(&obj)]),
            ),
            build::let_(&idx, build::num(0.0)),
            key_loop,
        ];
        let chain_loop = build::labeled(
            outer_brk,
            build::while_(
                build::binary(BinaryOp::Ne, build::ident(&obj), build::null()),
                vec![
                    build::labeled(outer_cont, build::block(level)),
                    build::expr_stmt(build::assign(
                        build::ident(&obj),
                        build::call(
                            build::path("Object", &["getPrototypeOf"]),
                            vec![build::ident(&obj)],
                        ),
                    )),
                ],
            ),
        );

        Ok(vec![build::let_(&obj, right), chain_loop])
    }
}

impl Rewrite for LoopRewriter<'_> {
    fn function(&mut self, func: &mut Function) -> RewriteResult<()> {
        let targets = std::mem::take(&mut self.targets);
        let pending = std::mem::take(&mut self.pending);
        let body = std::mem::take(&mut func.body);
        let result = self.block(body);
        self.targets = targets;
        self.pending = pending;
        func.body = result?;
        Ok(())
    }

    fn stmt(&mut self, stmt: Stmt) -> RewriteResult<Vec<Stmt>> {
        let mut labels = std::mem::take(&mut self.pending);
        match stmt {
            Stmt::Labeled { label, body } if is_break_label(&label) => {
                Ok(vec![self.canonical(labels, label, *body)?])
            }
            Stmt::Labeled { label, body } => {
                labels.push(label.clone());
                self.pending = labels;
                let mut inner = self.stmt(*body)?;
                self.pending.clear();
                let body = if inner.len() == 1 {
                    inner.remove(0)
                } else {
                    build::block(inner)
                };
                Ok(vec![build::labeled(label, body)])
            }
            Stmt::While { test, body } => {
                Ok(vec![self.while_loop(labels, test, *body, Vec::new(), None)?])
            }
            stmt @ Stmt::For { .. } => self.for_loop(labels, stmt),
            Stmt::DoWhile { body, test } => self.do_while(labels, *body, test),
            Stmt::ForIn { left, right, body } => self.for_in(labels, left, right, *body),
            Stmt::Continue { label } => {
                let cont = self.continue_target(label.as_deref())?;
                Ok(vec![build::break_(cont)])
            }
            Stmt::Break { label: None } => match self.targets.last() {
                Some(t) => Ok(vec![build::break_(t.brk.clone())]),
                None => Err(Self::fail("break outside of a loop or switch")),
            },
            other => Ok(vec![self.descend(other)?]),
        }
    }
}
