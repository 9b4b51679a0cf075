use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::error::CompileError;
use crate::opts::{parse_runtime_opts, parse_runtime_opts_for};
use crate::pipeline::{self, Pipeline};
use crate::runtime;
use crate::types::{Options, Strategy};

#[derive(Parser)]
#[command(name = "stopify")]
#[command(about = "Stopify - compile JavaScript into programs that can be paused, resumed and stopped", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides stopify.toml in the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a program into its stoppable form
    Compile {
        /// Strategy (defaults to compiler.strategy from the configuration)
        #[arg(short = 't', long = "transform", value_enum)]
        transform: Option<Strategy>,

        /// Re-parse the tree after every pass
        #[arg(long)]
        debug: bool,

        /// Leave known primitive calls uninstrumented
        #[arg(long)]
        optimize: bool,

        /// Source file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// Emit a script that runs itself and reports `<ms>,<stop checks>`
        #[arg(long)]
        standalone: bool,

        /// Run flags for a standalone script, after `--` (e.g. `-- -y 100 --stop 5`)
        #[arg(last = true, requires = "standalone")]
        run_args: Vec<String>,
    },

    /// Run the continuation-passing pipeline and report structural violations
    Verify {
        /// Source file
        input: PathBuf,
    },

    /// Resolve run flags and print the options object a compiled program receives
    Opts {
        /// Run flags, e.g. `-y 100 --stop 5 prog.js`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load and validate configuration before any command runs
    let config = Config::builder()
        .config_path(cli.config.clone())
        .build()
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Compile {
            transform,
            debug,
            optimize,
            input,
            output,
            standalone,
            run_args,
        } => {
            let strategy = transform.unwrap_or(config.compiler.strategy);
            let options = Options::new()
                .debug(debug || config.compiler.debug)
                .optimize(optimize || config.compiler.optimize);
            let source = read_source(&input).await?;

            let mut compiled = pipeline::compile(&source, strategy, &options)
                .with_context(|| format!("Failed to compile {}", input.display()))?;
            if standalone {
                let filename = input.to_string_lossy();
                let opts = parse_runtime_opts_for(&run_args, Some(filename.as_ref()))?;
                compiled.code = runtime::standalone(&compiled.code, &opts)?;
            }

            match output {
                Some(path) => {
                    tokio::fs::write(&path, &compiled.code)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(
                        strategy = %strategy,
                        output = %path.display(),
                        runtime_include = compiled.needs_runtime_include,
                        "wrote compiled program"
                    );
                }
                None => print!("{}", compiled.code),
            }
        }

        Commands::Verify { input } => {
            let source = read_source(&input).await?;
            let pipeline = Pipeline::for_strategy(Strategy::Cps, &config.compiler.options());

            match pipeline::transform(&source, &pipeline, &config.compiler.options()) {
                Ok(_) => println!("✓ {} passes structural verification", input.display()),
                Err(CompileError::Verify(errors)) => {
                    eprintln!("{} violation(s) in {}:", errors.len(), input.display());
                    for error in &errors {
                        eprintln!("  {}", error);
                    }
                    std::process::exit(1);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to compile {}", input.display()))
                }
            }
        }

        Commands::Opts { args } => {
            let opts = parse_runtime_opts(args)?;
            println!("{}", serde_json::to_string_pretty(&opts)?);
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

async fn read_source(path: &PathBuf) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
