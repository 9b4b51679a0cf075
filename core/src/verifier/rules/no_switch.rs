//! Rule: No Switch
//!
//! Reports every `switch` statement.

use crate::syntax::ast::{Program, Stmt};
use crate::syntax::visit::{walk_program, walk_stmt, Visit};

use super::super::{VerifyError, VerifyRule};

pub struct NoSwitchRule;

impl VerifyRule for NoSwitchRule {
    fn id(&self) -> &'static str {
        "no-switch"
    }

    fn description(&self) -> &'static str {
        "switch statements must have been rewritten"
    }

    fn check(&self, program: &Program) -> Vec<VerifyError> {
        struct Counter(usize);

        impl Visit for Counter {
            fn visit_stmt(&mut self, stmt: &Stmt) {
                if matches!(stmt, Stmt::Switch { .. }) {
                    self.0 += 1;
                }
                walk_stmt(self, stmt);
            }
        }

        let mut counter = Counter(0);
        walk_program(&mut counter, program);
        (0..counter.0)
            .map(|_| VerifyError::new(self.id(), "`switch` left in the program"))
            .collect()
    }
}
