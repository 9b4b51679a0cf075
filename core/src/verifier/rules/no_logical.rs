//! Rule: No Logical Operators
//!
//! Reports every `&&` and `||` expression. Both short-circuit, so a call on their
//! right side would be a suspension point the transform cannot see.
//!
//! # Invalid
//!
//! ```js
//! var ok = ready && check();
//! ```

use crate::syntax::ast::{Expr, Program};
use crate::syntax::visit::{walk_expr, walk_program, Visit};

use super::super::{VerifyError, VerifyRule};

pub struct NoLogicalOperatorsRule;

impl VerifyRule for NoLogicalOperatorsRule {
    fn id(&self) -> &'static str {
        "no-logical-operators"
    }

    fn description(&self) -> &'static str {
        "short-circuit operators must have been rewritten to conditionals"
    }

    fn check(&self, program: &Program) -> Vec<VerifyError> {
        struct Finder {
            errors: Vec<VerifyError>,
            rule_id: &'static str,
        }

        impl Visit for Finder {
            fn visit_expr(&mut self, expr: &Expr) {
                if let Expr::Logical { op, .. } = expr {
                    self.errors.push(VerifyError::new(
                        self.rule_id,
                        format!("`{}` left in the program", op.as_str()),
                    ));
                }
                walk_expr(self, expr);
            }
        }

        let mut finder = Finder {
            errors: Vec::new(),
            rule_id: self.id(),
        };
        walk_program(&mut finder, program);
        finder.errors
    }
}
