//! Desugaring front-end
//!
//! Passes that normalize arbitrary programs into the canonical subset the back-ends
//! expect: only labeled `while` loops, no `switch`, no short-circuit operators, hoisted
//! declarations and call sites in administrative normal form.
//!
//! Most passes are written against [`Rewrite`], which supplies the recursion through
//! every statement list and nested function so a pass only overrides the cases it
//! changes.

pub mod anf;
pub mod arrows;
pub mod cleanup;
pub mod functions;
pub mod hoist;
pub mod logical;
pub mod loops;
pub mod switch;

#[cfg(test)]
mod tests;

pub use anf::Anf;
pub use arrows::Arrows;
pub use cleanup::Cleanup;
pub use functions::HoistFunctions;
pub use hoist::HoistVars;
pub use logical::Logical;
pub use loops::Loops;
pub use switch::Switch;

use crate::error::CompileError;
use crate::syntax::ast::{Expr, Function, Stmt, SwitchCase};
use crate::syntax::visit::{walk_expr_mut, VisitMut};

pub(crate) type RewriteResult<T> = Result<T, CompileError>;

/* ===================== Rewrite Framework ===================== */

/// Statement-list rewriting with default structural recursion.
pub(crate) trait Rewrite {
    /// Rewrite one statement into zero or more statements
    fn stmt(&mut self, stmt: Stmt) -> RewriteResult<Vec<Stmt>> {
        Ok(vec![self.descend(stmt)?])
    }

    /// Rewrite a function nested anywhere in the tree
    fn function(&mut self, func: &mut Function) -> RewriteResult<()> {
        let body = std::mem::take(&mut func.body);
        func.body = self.block(body)?;
        Ok(())
    }

    /// Rewrite an expression in place; by default only nested functions change
    fn expr(&mut self, expr: &mut Expr) -> RewriteResult<()> {
        let mut result = Ok(());
        for_each_function(expr, &mut |func| {
            if result.is_ok() {
                result = self.function(func);
            }
        });
        result
    }

    fn block(&mut self, stmts: Vec<Stmt>) -> RewriteResult<Vec<Stmt>> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            out.extend(self.stmt(stmt)?);
        }
        Ok(out)
    }

    /// Rewrite a statement in a position that holds exactly one
    fn single(&mut self, stmt: Stmt) -> RewriteResult<Stmt> {
        let mut out = self.stmt(stmt)?;
        if out.len() == 1 {
            Ok(out.remove(0))
        } else {
            Ok(Stmt::Block { body: out })
        }
    }

    /// Rebuild `stmt` with every child rewritten
    fn descend(&mut self, stmt: Stmt) -> RewriteResult<Stmt> {
        Ok(match stmt {
            Stmt::Empty | Stmt::Break { .. } | Stmt::Continue { .. } => stmt,
            Stmt::Expr { mut expr } => {
                self.expr(&mut expr)?;
                Stmt::Expr { expr }
            }
            Stmt::Throw { mut arg } => {
                self.expr(&mut arg)?;
                Stmt::Throw { arg }
            }
            Stmt::Var { kind, mut decls } => {
                for d in &mut decls {
                    if let Some(init) = &mut d.init {
                        self.expr(init)?;
                    }
                }
                Stmt::Var { kind, decls }
            }
            Stmt::Function { mut func } => {
                self.function(&mut func)?;
                Stmt::Function { func }
            }
            Stmt::Return { mut arg } => {
                if let Some(arg) = &mut arg {
                    self.expr(arg)?;
                }
                Stmt::Return { arg }
            }
            Stmt::If {
                mut test,
                cons,
                alt,
            } => {
                self.expr(&mut test)?;
                let cons = Box::new(self.single(*cons)?);
                let alt = match alt {
                    Some(alt) => Some(Box::new(self.single(*alt)?)),
                    None => None,
                };
                Stmt::If { test, cons, alt }
            }
            Stmt::Block { body } => Stmt::Block {
                body: self.block(body)?,
            },
            Stmt::While { mut test, body } => {
                self.expr(&mut test)?;
                Stmt::While {
                    test,
                    body: Box::new(self.single(*body)?),
                }
            }
            Stmt::DoWhile { body, mut test } => {
                let body = Box::new(self.single(*body)?);
                self.expr(&mut test)?;
                Stmt::DoWhile { body, test }
            }
            Stmt::For {
                mut init,
                mut test,
                mut update,
                body,
            } => {
                match &mut init {
                    Some(crate::syntax::ast::ForInit::Decl { decls, .. }) => {
                        for d in decls {
                            if let Some(e) = &mut d.init {
                                self.expr(e)?;
                            }
                        }
                    }
                    Some(crate::syntax::ast::ForInit::Expr { expr }) => self.expr(expr)?,
                    None => {}
                }
                if let Some(test) = &mut test {
                    self.expr(test)?;
                }
                if let Some(update) = &mut update {
                    self.expr(update)?;
                }
                Stmt::For {
                    init,
                    test,
                    update,
                    body: Box::new(self.single(*body)?),
                }
            }
            Stmt::ForIn {
                mut left,
                mut right,
                body,
            } => {
                if let crate::syntax::ast::ForInLeft::Target { expr } = &mut left {
                    self.expr(expr)?;
                }
                self.expr(&mut right)?;
                Stmt::ForIn {
                    left,
                    right,
                    body: Box::new(self.single(*body)?),
                }
            }
            Stmt::Labeled { label, body } => Stmt::Labeled {
                label,
                body: Box::new(self.single(*body)?),
            },
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                let block = self.block(block)?;
                let handler = match handler {
                    Some(mut h) => {
                        h.body = self.block(std::mem::take(&mut h.body))?;
                        Some(h)
                    }
                    None => None,
                };
                let finalizer = match finalizer {
                    Some(f) => Some(self.block(f)?),
                    None => None,
                };
                Stmt::Try {
                    block,
                    handler,
                    finalizer,
                }
            }
            Stmt::Switch { mut disc, cases } => {
                self.expr(&mut disc)?;
                let mut out = Vec::with_capacity(cases.len());
                for case in cases {
                    let mut test = case.test;
                    if let Some(t) = &mut test {
                        self.expr(t)?;
                    }
                    out.push(SwitchCase {
                        test,
                        body: self.block(case.body)?,
                    });
                }
                Stmt::Switch { disc, cases: out }
            }
        })
    }
}

/// Call `f` on every function directly nested in `expr` (not on functions nested
/// inside those).
pub(crate) fn for_each_function(expr: &mut Expr, f: &mut dyn FnMut(&mut Function)) {
    struct Visitor<'a> {
        f: &'a mut dyn FnMut(&mut Function),
    }

    impl VisitMut for Visitor<'_> {
        fn visit_expr_mut(&mut self, expr: &mut Expr) {
            walk_expr_mut(self, expr);
        }

        fn visit_function_mut(&mut self, func: &mut Function) {
            (self.f)(func);
        }
    }

    Visitor { f }.visit_expr_mut(expr);
}
