use thiserror::Error;

use crate::parser::ParseError;
use crate::verifier::VerifyError;

/// Everything that can abort a compilation
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A pass met input it cannot handle
    #[error("{pass}: {message}")]
    Pass {
        pass: &'static str,
        message: String,
    },

    #[error("structural check failed: {}", join_violations(.0))]
    Verify(Vec<VerifyError>),

    #[error("transformed code is shorter than the input ({output} < {input} bytes)")]
    Shrunk { input: usize, output: usize },

    #[error("tree after `{pass}` does not re-parse: {source}")]
    Intermediate {
        pass: &'static str,
        source: ParseError,
    },
}

impl CompileError {
    pub fn pass(pass: &'static str, message: impl Into<String>) -> Self {
        CompileError::Pass {
            pass,
            message: message.into(),
        }
    }
}

fn join_violations(errors: &[VerifyError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
