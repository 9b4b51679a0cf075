//! Rule: Single Function Program
//!
//! The continuation-passing output is one expression statement holding one function
//! expression; the runtime applies it to the final continuation.
//!
//! # Valid
//!
//! ```js
//! (function ($ret) { ... });
//! ```

use crate::syntax::ast::{Expr, Program, Stmt};

use super::super::{VerifyError, VerifyRule};

pub struct SingleFunctionProgramRule;

impl VerifyRule for SingleFunctionProgramRule {
    fn id(&self) -> &'static str {
        "single-function-program"
    }

    fn description(&self) -> &'static str {
        "the program must be a single function expression statement"
    }

    fn check(&self, program: &Program) -> Vec<VerifyError> {
        match program.body.as_slice() {
            [Stmt::Expr {
                expr: Expr::Function { .. },
            }] => Vec::new(),
            [_] => vec![VerifyError::new(
                self.id(),
                "top-level statement is not a function expression",
            )],
            body => vec![VerifyError::new(
                self.id(),
                format!("expected one top-level statement, found {}", body.len()),
            )],
        }
    }
}
