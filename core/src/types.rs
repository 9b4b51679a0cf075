use serde::{Deserialize, Serialize};

/// Back-end strategy encoding the suspension points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Continuation-passing
    #[default]
    Cps,
    /// Generator-driven stepping
    Yield,
    /// Stack reification through capture exceptions
    Jumper,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Cps => "cps",
            Strategy::Yield => "yield",
            Strategy::Jumper => "jumper",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compile-time options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Options {
    /// Re-parse and log every intermediate tree
    #[serde(default)]
    pub debug: bool,
    /// Run the optional cleanup pass and leave known primitive calls uninstrumented
    #[serde(default)]
    pub optimize: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }
}

/// Result of a compile-time transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformed {
    pub code: String,
    /// The program evaluates source text at run time and needs the compiler preamble
    pub needs_runtime_include: bool,
}
