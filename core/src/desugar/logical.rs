//! Short-circuit operators to conditionals
//!
//! `a && b` becomes `a ? b : a` and `a || b` becomes `a ? a : b`. A left operand that
//! is not atomic is evaluated once into a temporary declared at the top of the
//! enclosing function: `f() || g()` becomes `($lhs = f()) ? $lhs : g()`.

use super::{for_each_function, Rewrite, RewriteResult};
use crate::error::CompileError;
use crate::pipeline::{Pass, PassContext};
use crate::syntax::ast::{Expr, Function, LogicalOp, Program};
use crate::syntax::visit::{walk_expr_mut, VisitMut};
use crate::syntax::{build, NameGen};

pub struct Logical;

impl Pass for Logical {
    fn name(&self) -> &'static str {
        "logical"
    }

    fn run(&self, mut program: Program, cx: &mut PassContext) -> Result<Program, CompileError> {
        let mut rewriter = LogicalRewriter {
            names: &mut cx.names,
            temps: Vec::new(),
        };
        let mut body = rewriter.block(program.body)?;
        if !rewriter.temps.is_empty() {
            body.insert(0, build::var_list(std::mem::take(&mut rewriter.temps)));
        }
        program.body = body;
        Ok(program)
    }
}

struct LogicalRewriter<'a> {
    names: &'a mut NameGen,
    /// Temporaries of the function being rewritten
    temps: Vec<String>,
}

impl Rewrite for LogicalRewriter<'_> {
    fn function(&mut self, func: &mut Function) -> RewriteResult<()> {
        let outer = std::mem::take(&mut self.temps);
        let body = std::mem::take(&mut func.body);
        let result = self.block(body);
        let temps = std::mem::replace(&mut self.temps, outer);

        let mut body = result?;
        if !temps.is_empty() {
            body.insert(0, build::var_list(temps));
        }
        func.body = body;
        Ok(())
    }

    fn expr(&mut self, expr: &mut Expr) -> RewriteResult<()> {
        Lowerer {
            names: &mut *self.names,
            temps: &mut self.temps,
        }
        .visit_expr_mut(expr);

        let mut result = Ok(());
        for_each_function(expr, &mut |func| {
            if result.is_ok() {
                result = self.function(func);
            }
        });
        result
    }
}

struct Lowerer<'a> {
    names: &'a mut NameGen,
    temps: &'a mut Vec<String>,
}

impl VisitMut for Lowerer<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);

        if !matches!(expr, Expr::Logical { .. }) {
            return;
        }
        let Expr::Logical { op, left, right } = std::mem::replace(expr, Expr::Null) else {
            return;
        };

        let (test, value) = if left.is_atomic() {
            ((*left).clone(), *left)
        } else {
            let temp = self.names.fresh("lhs");
            self.temps.push(temp.clone());
            (build::assign(build::ident(&temp), *left), build::ident(temp))
        };

        *expr = match op {
            LogicalOp::And => build::cond(test, *right, value),
            LogicalOp::Or => build::cond(test, value, *right),
        };
    }

    // nested functions are rewritten with their own temporaries
    fn visit_function_mut(&mut self, _func: &mut Function) {}
}
