//! Tree tidying, run only when optimizing
//!
//! Drops empty statements and splices nested blocks into their enclosing statement
//! list when the block declares nothing block-scoped.

use super::{Rewrite, RewriteResult};
use crate::error::CompileError;
use crate::pipeline::{Pass, PassContext};
use crate::syntax::ast::{Program, Stmt, VarKind};

pub struct Cleanup;

impl Pass for Cleanup {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    fn run(&self, mut program: Program, _cx: &mut PassContext) -> Result<Program, CompileError> {
        program.body = Tidy.block(program.body)?;
        Ok(program)
    }
}

struct Tidy;

fn declares_block_scoped(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|s| match s {
        Stmt::Var { kind, .. } => *kind != VarKind::Var,
        Stmt::Function { .. } => true,
        _ => false,
    })
}

impl Rewrite for Tidy {
    // a block in a single-statement position (loop body, branch, label) stays a block
    fn single(&mut self, stmt: Stmt) -> RewriteResult<Stmt> {
        match stmt {
            Stmt::Block { body } => Ok(Stmt::Block {
                body: self.block(body)?,
            }),
            other => {
                let mut out = self.stmt(other)?;
                if out.len() == 1 {
                    Ok(out.remove(0))
                } else {
                    Ok(Stmt::Block { body: out })
                }
            }
        }
    }

    fn stmt(&mut self, stmt: Stmt) -> RewriteResult<Vec<Stmt>> {
        match stmt {
            Stmt::Empty => Ok(Vec::new()),
            Stmt::Block { body } => {
                let body = self.block(body)?;
                if declares_block_scoped(&body) {
                    Ok(vec![Stmt::Block { body }])
                } else {
                    Ok(body)
                }
            }
            other => Ok(vec![self.descend(other)?]),
        }
    }
}
