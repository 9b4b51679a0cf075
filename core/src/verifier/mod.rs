//! Structural verifier for continuation-passing output
//!
//! A rule-based check, run as the last pass of the CPS pipeline, that the tree only
//! uses the canonical subset the transform relies on. It guards against regressions in
//! earlier passes; it is not a type checker.
//!
//! # Architecture
//!
//! 1. **VerifyRule trait** - Each rule implements this trait
//! 2. **Verifier** - Collects and runs all rules
//! 3. **VerifyError** - One violation, tagged with the rule that found it
//!
//! # Adding a New Rule
//!
//! 1. Create a new file in `verifier/rules/`
//! 2. Implement `VerifyRule` for your struct
//! 3. Add it to the `Verifier::new()` constructor

pub mod rules;

use crate::error::CompileError;
use crate::pipeline::{Pass, PassContext};
use crate::syntax::Program;

// ============================================================================
// Verify Error Type
// ============================================================================

/// A structural violation found in a transformed tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyError {
    /// Which rule produced this error
    pub rule_id: &'static str,
    /// Human-readable message
    pub message: String,
}

impl VerifyError {
    pub fn new(rule_id: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.message, self.rule_id)
    }
}

impl std::error::Error for VerifyError {}

// ============================================================================
// VerifyRule Trait
// ============================================================================

/// Trait that all verifier rules implement.
///
/// Each rule checks one structural property and reports every place it is broken.
pub trait VerifyRule: Send + Sync {
    /// Unique identifier for this rule (e.g., "no-switch")
    fn id(&self) -> &'static str;

    /// Human-readable description of what this rule checks
    fn description(&self) -> &'static str;

    /// Return every violation in `program`; empty means the rule holds
    fn check(&self, program: &Program) -> Vec<VerifyError>;
}

// ============================================================================
// Verifier - Runs All Rules
// ============================================================================

pub struct Verifier {
    rules: Vec<Box<dyn VerifyRule>>,
}

impl Verifier {
    /// A verifier with every built-in rule
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(rules::OnlyWhileLoopsRule),
                Box::new(rules::NoSwitchRule),
                Box::new(rules::NoLogicalOperatorsRule),
                Box::new(rules::SingleFunctionProgramRule),
            ],
        }
    }

    pub fn check(&self, program: &Program) -> Vec<VerifyError> {
        self.rules
            .iter()
            .flat_map(|rule| rule.check(program))
            .collect()
    }

    /// Registered rules as `(id, description)` pairs
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Check `program` against every rule and return all violations found.
pub fn verify(program: &Program) -> Vec<VerifyError> {
    Verifier::new().check(program)
}

/// The verifier as the final pass of a pipeline; any violation aborts compilation.
pub struct VerifyPass;

impl Pass for VerifyPass {
    fn name(&self) -> &'static str {
        "verify"
    }

    fn run(&self, program: Program, _cx: &mut PassContext) -> Result<Program, CompileError> {
        let errors = verify(&program);
        if errors.is_empty() {
            Ok(program)
        } else {
            Err(CompileError::Verify(errors))
        }
    }
}

#[cfg(test)]
mod tests;
