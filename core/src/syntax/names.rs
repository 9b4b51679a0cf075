//! Fresh-name supply
//!
//! Generated bindings and labels all come from one `NameGen` per compilation, which
//! knows every name already present in the program plus the names the runtime
//! preambles define.

use std::collections::{HashMap, HashSet};

use super::ast::Program;
use super::visit;

/// Names defined by the runtime preambles; generated code must never shadow them.
pub const RUNTIME_NAMES: &[&str] = &[
    "$isStop",
    "$onStop",
    "$onDone",
    "$opts",
    "$counter",
    "$interval",
    "$flexible",
    "$minInterval",
    "$maxInterval",
    "$maxGrowth",
    "$estimate",
    "$sliceStart",
    "$transformed",
    "$handlers",
    "$invoke",
    "$raise",
    "$resumeWith",
    "$isMarked",
    "$generatorPrototype",
    "$defer",
    "$boundary",
    "$cps",
    "$apply",
    "$tick",
    "$try",
    "$new",
    "$mark_func",
    "$call",
    "$callMethod",
    "$handleNew",
    "$proto_assign",
    "$runYield",
    "$runProg",
    "$compile_string",
    "$compile_func",
    "$__R",
    "$program",
    "$target",
    "$frame",
    "callCC",
];

/// Host primitives whose calls never need instrumentation when the program leaves
/// them alone.
pub const KNOWN_PRIMITIVES: &[&str] = &[
    "Math",
    "JSON",
    "console",
    "Object",
    "Number",
    "String",
    "parseInt",
    "parseFloat",
    "isNaN",
];

#[derive(Debug, Clone, Default)]
pub struct NameGen {
    used: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl NameGen {
    /// A generator that avoids every name in `program` and the runtime's names
    pub fn for_program(program: &Program) -> Self {
        let mut used = visit::all_names(program);
        used.extend(RUNTIME_NAMES.iter().map(|s| s.to_string()));
        Self {
            used,
            counters: HashMap::new(),
        }
    }

    /// Returns `$base` the first time, then `$base_1`, `$base_2`, ... skipping taken names.
    pub fn fresh(&mut self, base: &str) -> String {
        loop {
            let counter = self.counters.entry(base.to_string()).or_insert(0);
            let candidate = if *counter == 0 {
                format!("${}", base)
            } else {
                format!("${}_{}", base, counter)
            };
            *counter += 1;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Record an externally chosen name so later `fresh` calls avoid it
    pub fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    #[test]
    fn test_fresh_names_skip_existing() {
        let program = parse_program("var $t = 1; var $t_1 = 2;").expect("parse");
        let mut names = NameGen::for_program(&program);
        assert_eq!(names.fresh("t"), "$t_2");
        assert_eq!(names.fresh("t"), "$t_3");
        assert_eq!(names.fresh("k"), "$k");
    }

    #[test]
    fn test_runtime_names_are_reserved() {
        let mut names = NameGen::for_program(&Program::default());
        assert_eq!(names.fresh("apply"), "$apply_1");
    }
}
