//! Variable hoisting
//!
//! All `var`, `let` and `const` declarations of a function become one `var` list at
//! the top of that function and their initializers become assignments in place:
//!
//! ```text
//! function f() { g(); let x = 1, y; }
//! // becomes
//! function f() { var x, y; g(); x = 1; }
//! ```
//!
//! The jumper variant makes every binding of a function a plain local it can save and
//! restore: function declarations turn into assignments of function expressions, and
//! catch parameters are copied into fresh function-level locals.

use std::collections::HashSet;

use super::{Rewrite, RewriteResult};
use crate::error::CompileError;
use crate::pipeline::{Pass, PassContext};
use crate::syntax::ast::{
    CatchClause, Declarator, Expr, ForInLeft, ForInit, Function, Program, Stmt,
};
use crate::syntax::visit::{walk_expr_mut, walk_stmt_mut, VisitMut};
use crate::syntax::{build, NameGen};

#[derive(Debug, Default, Clone, Copy)]
pub struct HoistVars {
    jumper: bool,
}

impl HoistVars {
    pub fn jumper() -> Self {
        Self { jumper: true }
    }
}

impl Pass for HoistVars {
    fn name(&self) -> &'static str {
        if self.jumper {
            "hoist-jumper"
        } else {
            "hoist"
        }
    }

    fn run(&self, mut program: Program, cx: &mut PassContext) -> Result<Program, CompileError> {
        let mut hoister = Hoister {
            names: &mut cx.names,
            jumper: self.jumper,
            declared: Declared::default(),
        };
        let body = hoister.block(program.body)?;
        program.body = hoister.declared.prepend(body);
        Ok(program)
    }
}

/// Names declared in one function, in first-seen order
#[derive(Default)]
struct Declared {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl Declared {
    fn add(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.order.push(name.to_string());
        }
    }

    fn prepend(self, body: Vec<Stmt>) -> Vec<Stmt> {
        if self.order.is_empty() {
            return body;
        }
        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(build::var_list(self.order));
        out.extend(body);
        out
    }
}

struct Hoister<'a> {
    names: &'a mut NameGen,
    jumper: bool,
    declared: Declared,
}

impl Hoister<'_> {
    fn initializers(&mut self, decls: Vec<Declarator>) -> RewriteResult<Vec<Expr>> {
        let mut assigns = Vec::new();
        for d in decls {
            self.declared.add(&d.name);
            if let Some(mut init) = d.init {
                self.expr(&mut init)?;
                assigns.push(build::assign(build::ident(d.name), init));
            }
        }
        Ok(assigns)
    }

    fn catch_clause(&mut self, handler: CatchClause) -> RewriteResult<CatchClause> {
        if !self.jumper {
            return Ok(CatchClause {
                param: handler.param,
                body: self.block(handler.body)?,
            });
        }
        let local = self.names.fresh(&format!("catch_{}", handler.param));
        self.declared.add(&local);

        let mut body = handler.body;
        rename_free(&mut body, &handler.param, &local);
        body.insert(
            0,
            build::expr_stmt(build::assign(build::ident(&local), build::ident(&handler.param))),
        );
        Ok(CatchClause {
            param: handler.param,
            body: self.block(body)?,
        })
    }
}

impl Rewrite for Hoister<'_> {
    fn function(&mut self, func: &mut Function) -> RewriteResult<()> {
        let outer = std::mem::take(&mut self.declared);
        for p in &func.params {
            self.declared.seen.insert(p.clone());
        }
        let body = std::mem::take(&mut func.body);
        let result = self.block(body);
        let declared = std::mem::replace(&mut self.declared, outer);
        func.body = declared.prepend(result?);
        Ok(())
    }

    fn stmt(&mut self, stmt: Stmt) -> RewriteResult<Vec<Stmt>> {
        match stmt {
            Stmt::Var { decls, .. } => Ok(self
                .initializers(decls)?
                .into_iter()
                .map(build::expr_stmt)
                .collect()),
            Stmt::Function { mut func } if self.jumper => {
                self.function(&mut func)?;
                let name = func.name.clone().unwrap_or_default();
                self.declared.add(&name);
                Ok(vec![build::expr_stmt(build::assign(
                    build::ident(name),
                    build::func_expr(func),
                ))])
            }
            Stmt::For {
                init: Some(ForInit::Decl { decls, .. }),
                test,
                update,
                body,
            } => {
                let mut assigns = self.initializers(decls)?;
                let init = match assigns.len() {
                    0 => None,
                    1 => assigns.pop().map(|expr| ForInit::Expr { expr }),
                    _ => Some(ForInit::Expr {
                        expr: build::seq(assigns),
                    }),
                };
                Ok(vec![self.descend(Stmt::For {
                    init,
                    test,
                    update,
                    body,
                })?])
            }
            Stmt::ForIn {
                left: ForInLeft::Decl { name, .. },
                right,
                body,
            } => {
                self.declared.add(&name);
                Ok(vec![self.descend(Stmt::ForIn {
                    left: ForInLeft::Target {
                        expr: build::ident(name),
                    },
                    right,
                    body,
                })?])
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                let block = self.block(block)?;
                let handler = match handler {
                    Some(h) => Some(self.catch_clause(h)?),
                    None => None,
                };
                let finalizer = match finalizer {
                    Some(f) => Some(self.block(f)?),
                    None => None,
                };
                Ok(vec![Stmt::Try {
                    block,
                    handler,
                    finalizer,
                }])
            }
            other => Ok(vec![self.descend(other)?]),
        }
    }
}

/// Replace free occurrences of `from` with `to`, leaving functions that rebind `from`
/// untouched.
fn rename_free(stmts: &mut [Stmt], from: &str, to: &str) {
    struct Renamer<'a> {
        from: &'a str,
        to: &'a str,
    }

    impl VisitMut for Renamer<'_> {
        fn visit_expr_mut(&mut self, expr: &mut Expr) {
            match expr {
                Expr::Ident { name } if name == self.from => *name = self.to.to_string(),
                _ => walk_expr_mut(self, expr),
            }
        }

        fn visit_function_mut(&mut self, func: &mut Function) {
            if func.params.iter().any(|p| p == self.from) || declares(&func.body, self.from) {
                return;
            }
            for stmt in &mut func.body {
                self.visit_stmt_mut(stmt);
            }
        }
    }

    let mut renamer = Renamer { from, to };
    for stmt in stmts {
        walk_stmt_mut(&mut renamer, stmt);
    }
}

/// Does `body` declare `name` itself (not in nested functions)?
fn declares(body: &[Stmt], name: &str) -> bool {
    body.iter().any(|stmt| match stmt {
        Stmt::Var { decls, .. } => decls.iter().any(|d| d.name == name),
        Stmt::Function { func } => func.name.as_deref() == Some(name),
        Stmt::Block { body } => declares(body, name),
        Stmt::If { cons, alt, .. } => {
            declares(std::slice::from_ref(cons.as_ref()), name)
                || alt
                    .as_ref()
                    .map_or(false, |a| declares(std::slice::from_ref(a.as_ref()), name))
        }
        Stmt::While { body, .. } | Stmt::Labeled { body, .. } => {
            declares(std::slice::from_ref(body.as_ref()), name)
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            declares(block, name)
                || handler.as_ref().map_or(false, |h| declares(&h.body, name))
                || finalizer.as_ref().map_or(false, |f| declares(f, name))
        }
        _ => false,
    })
}
