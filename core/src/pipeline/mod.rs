//! Compilation pipeline
//!
//! A strategy is an ordered list of [`Pass`]es over one program tree. `transform`
//! parses, runs the passes and prints; `compile` additionally wraps the output in the
//! strategy's runtime preamble.
//!
//! In debug mode the tree is printed and re-parsed after every pass so a pass that
//! produces unprintable output is caught where it happens.

use std::collections::HashSet;
use std::time::Instant;

use tracing::{debug, info, trace};

use crate::cps::Cps;
use crate::desugar::{Anf, Arrows, Cleanup, HoistFunctions, HoistVars, Logical, Loops, Switch};
use crate::error::CompileError;
use crate::jumper::{Jumper, NameFunctions};
use crate::parser::parse_program;
use crate::runtime;
use crate::syntax::names::KNOWN_PRIMITIVES;
use crate::syntax::visit::bound_names;
use crate::syntax::{print_program, Expr, NameGen, Program};
use crate::types::{Options, Strategy, Transformed};
use crate::verifier::VerifyPass;
use crate::yielding::{Eval, Yielding};

#[cfg(test)]
mod tests;

/* ===================== Pass Interface ===================== */

/// State shared by the passes of one compilation
#[derive(Debug)]
pub struct PassContext {
    pub names: NameGen,
    pub options: Options,
    /// Set when the output must ship with the compiler-in-runtime helpers
    pub needs_runtime_include: bool,
    /// Known primitives the program never rebinds; empty unless optimizing
    pub primitives: HashSet<String>,
}

impl PassContext {
    pub fn new(program: &Program, options: Options) -> Self {
        let primitives = if options.optimize {
            let bound = bound_names(program);
            KNOWN_PRIMITIVES
                .iter()
                .filter(|name| !bound.contains(**name))
                .map(|name| name.to_string())
                .collect()
        } else {
            HashSet::new()
        };
        Self {
            names: NameGen::for_program(program),
            options,
            needs_runtime_include: false,
            primitives,
        }
    }

    /// Is `callee` a call on an untouched host primitive (`Math.max`, `parseInt`, ...)?
    pub fn is_primitive_call(&self, callee: &Expr) -> bool {
        is_primitive(&self.primitives, callee)
    }
}

/// The identifier a member chain such as `Math.max` or `a.b[c]` hangs off
pub fn callee_root(callee: &Expr) -> Option<&str> {
    let mut root = callee;
    while let Expr::Member { object, .. } = root {
        root = object;
    }
    root.as_ident()
}

/// `is_primitive_call` for passes that hold the primitive set apart from the context
pub fn is_primitive(primitives: &HashSet<String>, callee: &Expr) -> bool {
    callee_root(callee).map_or(false, |root| primitives.contains(root))
}

/// One tree-to-tree transformation
pub trait Pass {
    fn name(&self) -> &'static str;

    fn run(&self, program: Program, cx: &mut PassContext) -> Result<Program, CompileError>;
}

/* ===================== Pipeline ===================== */

#[derive(Default)]
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, pass: impl Pass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    fn with_if(self, enabled: bool, pass: impl Pass + 'static) -> Self {
        if enabled {
            self.with(pass)
        } else {
            self
        }
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// The pass list of a strategy
    pub fn for_strategy(strategy: Strategy, options: &Options) -> Self {
        match strategy {
            Strategy::Cps => Self::new()
                .with(Arrows)
                .with(Switch)
                .with(Loops)
                .with(Logical)
                .with(HoistFunctions)
                .with(HoistVars::default())
                .with_if(options.optimize, Cleanup)
                .with(Anf)
                .with(Cps)
                .with(VerifyPass),
            Strategy::Yield => Self::new()
                .with(Arrows)
                .with(HoistFunctions)
                .with(Eval)
                .with_if(options.optimize, Cleanup)
                .with(Yielding),
            Strategy::Jumper => Self::new()
                .with(Arrows)
                .with(Switch)
                .with(Loops)
                .with(Logical)
                .with(HoistFunctions)
                .with_if(options.optimize, Cleanup)
                .with(Anf)
                .with(HoistVars::jumper())
                .with(NameFunctions)
                .with(Jumper),
        }
    }

    /// Run every pass in order
    pub fn run(&self, mut program: Program, cx: &mut PassContext) -> Result<Program, CompileError> {
        for pass in &self.passes {
            let started = Instant::now();
            program = pass.run(program, cx)?;
            debug!(
                pass = pass.name(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "pass finished"
            );

            if cx.options.debug {
                let printed = print_program(&program);
                debug!(pass = pass.name(), "intermediate program:\n{}", printed);
                if let Ok(tree) = serde_json::to_string(&program) {
                    trace!(pass = pass.name(), tree = %tree, "intermediate tree");
                }
                parse_program(&printed).map_err(|source| CompileError::Intermediate {
                    pass: pass.name(),
                    source,
                })?;
            }
        }
        Ok(program)
    }
}

/* ===================== Entry Points ===================== */

/// Parse `source`, run `pipeline` over it and print the result.
///
/// Fails when parsing or a pass fails, or when the transformed program prints shorter
/// than the input does, which only happens when a pass dropped code. Both sides are
/// compared in printed form so comments and layout in the source do not count.
pub fn transform(
    source: &str,
    pipeline: &Pipeline,
    options: &Options,
) -> Result<Transformed, CompileError> {
    let program = parse_program(source)?;
    let input_len = print_program(&program).len();
    let mut cx = PassContext::new(&program, *options);
    let program = pipeline.run(program, &mut cx)?;
    let code = print_program(&program);

    if code.len() < input_len {
        return Err(CompileError::Shrunk {
            input: input_len,
            output: code.len(),
        });
    }

    Ok(Transformed {
        code,
        needs_runtime_include: cx.needs_runtime_include,
    })
}

/// Compile `source` with `strategy` into a complete program: the transformed code
/// inside the strategy's runtime preamble.
pub fn compile(
    source: &str,
    strategy: Strategy,
    options: &Options,
) -> Result<Transformed, CompileError> {
    let started = Instant::now();
    let pipeline = Pipeline::for_strategy(strategy, options);

    // native higher-order methods cannot call back into transformed functions
    let input = format!("{}\n{}", runtime::HOF_PRELUDE, source);
    let transformed = transform(&input, &pipeline, options)?;
    let code = runtime::wrap(strategy, &transformed.code, transformed.needs_runtime_include);

    info!(
        strategy = %strategy,
        input_bytes = source.len(),
        output_bytes = code.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "compiled program"
    );

    Ok(Transformed {
        code,
        needs_runtime_include: transformed.needs_runtime_include,
    })
}
