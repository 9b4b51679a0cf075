//! Stopify: compiles JavaScript into programs that can be paused, resumed and stopped
//! by a host, plus the Rust-side pieces that drive and configure them.

pub mod cli;
pub mod config;
pub mod cps;
pub mod desugar;
pub mod error;
pub mod jumper;
pub mod opts;
pub mod parser;
pub mod pipeline;
pub mod runtime;
pub mod scheduler;
pub mod syntax;
pub mod types;
pub mod verifier;
pub mod yielding;

// Re-export main types
pub use types::*;

// Re-export the compile entry points for convenience
pub use error::CompileError;
pub use pipeline::{compile, transform, Pipeline};
