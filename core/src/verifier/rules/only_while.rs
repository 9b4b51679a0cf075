//! Rule: Only While Loops
//!
//! Reports every loop that is not a `while`, anywhere in the program including nested
//! functions.
//!
//! # Valid
//!
//! ```js
//! $loop_break: while (i < n) { $loop_continue: { f(i); } i++; }
//! ```
//!
//! # Invalid
//!
//! ```js
//! for (var i = 0; i < n; i++) {}
//! for (var k in o) {}
//! do {} while (x);
//! ```

use crate::syntax::ast::{Program, Stmt};
use crate::syntax::visit::{walk_program, walk_stmt, Visit};

use super::super::{VerifyError, VerifyRule};

pub struct OnlyWhileLoopsRule;

impl VerifyRule for OnlyWhileLoopsRule {
    fn id(&self) -> &'static str {
        "only-while-loops"
    }

    fn description(&self) -> &'static str {
        "loops must have been rewritten to while"
    }

    fn check(&self, program: &Program) -> Vec<VerifyError> {
        let mut finder = LoopFinder {
            errors: Vec::new(),
            rule_id: self.id(),
        };
        walk_program(&mut finder, program);
        finder.errors
    }
}

struct LoopFinder {
    errors: Vec<VerifyError>,
    rule_id: &'static str,
}

impl Visit for LoopFinder {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        let kind = match stmt {
            Stmt::For { .. } => Some("for"),
            Stmt::ForIn { .. } => Some("for-in"),
            Stmt::DoWhile { .. } => Some("do-while"),
            _ => None,
        };
        if let Some(kind) = kind {
            self.errors.push(VerifyError::new(
                self.rule_id,
                format!("`{}` loop left in the program", kind),
            ));
        }
        walk_stmt(self, stmt);
    }
}
