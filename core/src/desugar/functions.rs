//! Function declaration hoisting
//!
//! Every function declaration moves to the top of its enclosing function body (or the
//! program), in source order. Declarations nested in blocks, branches and loop bodies
//! are lifted too, so the back-ends only ever find declarations in a leading run.

use super::{Rewrite, RewriteResult};
use crate::error::CompileError;
use crate::pipeline::{Pass, PassContext};
use crate::syntax::ast::{Function, Program, Stmt};

pub struct HoistFunctions;

impl Pass for HoistFunctions {
    fn name(&self) -> &'static str {
        "functions"
    }

    fn run(&self, mut program: Program, _cx: &mut PassContext) -> Result<Program, CompileError> {
        let mut hoister = Hoister::default();
        let body = hoister.block(program.body)?;
        program.body = hoister.hoisted;
        program.body.extend(body);
        Ok(program)
    }
}

#[derive(Default)]
struct Hoister {
    hoisted: Vec<Stmt>,
}

impl Rewrite for Hoister {
    fn function(&mut self, func: &mut Function) -> RewriteResult<()> {
        let outer = std::mem::take(&mut self.hoisted);
        let body = std::mem::take(&mut func.body);
        let result = self.block(body);
        let mut hoisted = std::mem::replace(&mut self.hoisted, outer);

        hoisted.extend(result?);
        func.body = hoisted;
        Ok(())
    }

    fn stmt(&mut self, stmt: Stmt) -> RewriteResult<Vec<Stmt>> {
        match stmt {
            Stmt::Function { mut func } => {
                self.function(&mut func)?;
                self.hoisted.push(Stmt::Function { func });
                Ok(Vec::new())
            }
            other => Ok(vec![self.descend(other)?]),
        }
    }
}
