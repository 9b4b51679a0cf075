//! `switch` elimination
//!
//! A switch becomes a labeled block that first computes the index of the matching
//! case, then runs every case body at or after that index. Fall-through falls out of
//! the `<=` tests and `break` leaves the block:
//!
//! ```text
//! switch (x) { case 1: a(); case 2: b(); break; default: c(); }
//! // becomes
//! $switch: {
//!   let $disc = x;
//!   let $case;
//!   if ($disc === 1) { $case = 0; } else if ($disc === 2) { $case = 1; } else { $case = 2; }
//!   if ($case <= 0) { a(); }
//!   if ($case <= 1) { b(); break $switch; }
//!   if ($case <= 2) { c(); }
//! }
//! ```

use super::{Rewrite, RewriteResult};
use crate::error::CompileError;
use crate::pipeline::{Pass, PassContext};
use crate::syntax::ast::{BinaryOp, Program, Stmt, VarKind};
use crate::syntax::{build, NameGen};

pub struct Switch;

impl Pass for Switch {
    fn name(&self) -> &'static str {
        "switch"
    }

    fn run(&self, mut program: Program, cx: &mut PassContext) -> Result<Program, CompileError> {
        let mut rewriter = SwitchRewriter {
            names: &mut cx.names,
        };
        program.body = rewriter.block(program.body)?;
        Ok(program)
    }
}

struct SwitchRewriter<'a> {
    names: &'a mut NameGen,
}

impl Rewrite for SwitchRewriter<'_> {
    fn stmt(&mut self, stmt: Stmt) -> RewriteResult<Vec<Stmt>> {
        let stmt = self.descend(stmt)?;
        let Stmt::Switch { disc, cases } = stmt else {
            return Ok(vec![stmt]);
        };

        let label = self.names.fresh("switch");
        let disc_name = self.names.fresh("disc");
        let case_name = self.names.fresh("case");

        let default_index = cases.iter().position(|c| c.test.is_none());
        let fallback = build::num(default_index.unwrap_or(cases.len()) as f64);

        // if ($disc === t0) { $case = 0; } else if ... else { $case = fallback; }
        let mut selector = build::expr_stmt(build::assign(build::ident(&case_name), fallback));
        for (index, case) in cases.iter().enumerate().rev() {
            if let Some(test) = &case.test {
                let set = build::expr_stmt(build::assign(
                    build::ident(&case_name),
                    build::num(index as f64),
                ));
                selector = build::if_stmt(
                    build::strict_eq(build::ident(&disc_name), test.clone()),
                    build::block(vec![set]),
                    Some(match selector {
                        s @ Stmt::If { .. } => s,
                        s => build::block(vec![s]),
                    }),
                );
            }
        }

        let mut body = vec![
            build::let_(&disc_name, disc),
            build::decl(VarKind::Let, &case_name, None),
            selector,
        ];
        for (index, case) in cases.into_iter().enumerate() {
            if case.body.is_empty() {
                continue;
            }
            let mut case_body = case.body;
            retarget_breaks(&mut case_body, &label);
            body.push(build::if_(
                build::binary(
                    BinaryOp::Le,
                    build::ident(&case_name),
                    build::num(index as f64),
                ),
                case_body,
                None,
            ));
        }

        Ok(vec![build::labeled(label, build::block(body))])
    }
}

/// Point every unlabeled `break` that would leave the switch at `label`
fn retarget_breaks(stmts: &mut [Stmt], label: &str) {
    for stmt in stmts {
        retarget_stmt(stmt, label);
    }
}

fn retarget_stmt(stmt: &mut Stmt, label: &str) {
    match stmt {
        Stmt::Break { label: target } if target.is_none() => *target = Some(label.to_string()),
        Stmt::If { cons, alt, .. } => {
            retarget_stmt(cons, label);
            if let Some(alt) = alt {
                retarget_stmt(alt, label);
            }
        }
        Stmt::Block { body } => retarget_breaks(body, label),
        Stmt::Labeled { body, .. } => retarget_stmt(body, label),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            retarget_breaks(block, label);
            if let Some(h) = handler {
                retarget_breaks(&mut h.body, label);
            }
            if let Some(f) = finalizer {
                retarget_breaks(f, label);
            }
        }
        // loops own their unlabeled breaks; functions cannot break out
        _ => {}
    }
}
