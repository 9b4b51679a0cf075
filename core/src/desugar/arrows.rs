//! Arrow function lowering
//!
//! Arrows become ordinary function expressions. Their lexical `this` and `arguments`
//! are captured once at the top of the nearest enclosing non-arrow function:
//!
//! ```text
//! function f() { return () => this.x; }
//! // becomes
//! function f() { var $this = this; return function () { return $this.x; }; }
//! ```

use crate::error::CompileError;
use crate::pipeline::{Pass, PassContext};
use crate::syntax::ast::{Expr, Function, Program, Stmt};
use crate::syntax::build;
use crate::syntax::visit::{walk_expr_mut, walk_function_mut, walk_stmt_mut, VisitMut};
use crate::syntax::NameGen;

pub struct Arrows;

impl Pass for Arrows {
    fn name(&self) -> &'static str {
        "arrows"
    }

    fn run(&self, mut program: Program, cx: &mut PassContext) -> Result<Program, CompileError> {
        lower_body(&mut program.body, &mut cx.names);
        Ok(program)
    }
}

struct Lowerer<'a> {
    names: &'a mut NameGen,
    arrow_depth: usize,
    this_name: Option<String>,
    arguments_name: Option<String>,
}

impl VisitMut for Lowerer<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if self.arrow_depth > 0 {
            match expr {
                Expr::This => {
                    let name = self
                        .this_name
                        .get_or_insert_with(|| self.names.fresh("this"))
                        .clone();
                    *expr = build::ident(name);
                    return;
                }
                Expr::Ident { name } if name == "arguments" => {
                    let name = self
                        .arguments_name
                        .get_or_insert_with(|| self.names.fresh("arguments"))
                        .clone();
                    *expr = build::ident(name);
                    return;
                }
                _ => {}
            }
        }
        walk_expr_mut(self, expr);
    }

    fn visit_function_mut(&mut self, func: &mut Function) {
        if func.arrow {
            func.arrow = false;
            self.arrow_depth += 1;
            walk_function_mut(self, func);
            self.arrow_depth -= 1;
        } else {
            lower_body(&mut func.body, self.names);
        }
    }
}

/// Lower the arrows of one non-arrow function body (or the program)
fn lower_body(body: &mut Vec<Stmt>, names: &mut NameGen) {
    let mut lowerer = Lowerer {
        names,
        arrow_depth: 0,
        this_name: None,
        arguments_name: None,
    };
    for stmt in body.iter_mut() {
        walk_stmt_mut(&mut lowerer, stmt);
    }

    let mut captures = Vec::new();
    if let Some(name) = lowerer.this_name {
        captures.push(build::var(name, Some(Expr::This)));
    }
    if let Some(name) = lowerer.arguments_name {
        captures.push(build::var(name, Some(build::ident("arguments"))));
    }
    body.splice(0..0, captures);
}
