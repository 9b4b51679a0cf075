//! Run options
//!
//! Parses the flags a host passes when it runs a compiled program:
//!
//! ```text
//! [-y|--yield <n>] [-l|--latency <ms>] [--stop <seconds>] [--env node|browser] <filename>
//! ```
//!
//! The resulting [`Opts`] serializes to the `$opts` object the run-time entry point
//! receives.

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum OptsError {
    #[error("missing filename")]
    MissingFilename,

    #[error("cannot specify both --yield and --latency")]
    Conflict,

    #[error("{flag} must be a number (or omitted), got `{value}`")]
    Malformed { flag: &'static str, value: String },

    #[error("{flag} must be a whole number, got `{value}`")]
    NotWhole { flag: &'static str, value: String },

    #[error("{0}")]
    Usage(String),
}

/// How the slice size between stop checks is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum YieldMethod {
    /// A fixed number of boundaries per slice
    #[default]
    Fixed,
    /// Slices sized to hit a target latency
    Flexible,
}

/// Host environment the program runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    #[default]
    Node,
    Browser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opts {
    pub filename: String,
    pub yield_method: YieldMethod,
    /// Boundaries per slice (fixed) or target milliseconds per slice (flexible);
    /// `None` leaves the choice to the runtime default
    pub yield_interval: Option<u64>,
    /// Deadline in seconds after which the program is asked to stop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<f64>,
    pub env: Env,
}

impl Opts {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            yield_method: YieldMethod::Fixed,
            yield_interval: None,
            stop: None,
            env: Env::Node,
        }
    }

    pub fn fixed(mut self, interval: u64) -> Self {
        self.yield_method = YieldMethod::Fixed;
        self.yield_interval = Some(interval);
        self
    }

    pub fn flexible(mut self, latency_ms: u64) -> Self {
        self.yield_method = YieldMethod::Flexible;
        self.yield_interval = Some(latency_ms);
        self
    }

    pub fn stop_after(mut self, seconds: f64) -> Self {
        self.stop = Some(seconds);
        self
    }

    pub fn env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }
}

/// Raw flags; numbers are kept as text so malformed values get our own error.
#[derive(Parser, Debug)]
#[command(name = "stopify-run", no_binary_name = true)]
pub struct RuntimeArgs {
    /// Stop checks every <n> boundaries
    #[arg(short = 'y', long = "yield", allow_hyphen_values = true)]
    pub yield_interval: Option<String>,

    /// Aim for slices of <ms> milliseconds
    #[arg(short = 'l', long = "latency", allow_hyphen_values = true)]
    pub latency: Option<String>,

    /// Ask the program to stop after <seconds>
    #[arg(long, allow_hyphen_values = true)]
    pub stop: Option<String>,

    #[arg(long, value_enum, default_value_t = Env::Node)]
    pub env: Env,

    pub positional: Vec<String>,
}

fn number(flag: &'static str, value: &str) -> Result<f64, OptsError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| OptsError::Malformed {
            flag,
            value: value.to_string(),
        })
}

impl RuntimeArgs {
    /// Validate the flags. `filename` is used when the host already knows the program
    /// file, in which case no positional argument is required.
    pub fn resolve(self, filename: Option<&str>) -> Result<Opts, OptsError> {
        let filename = match (filename, self.positional.as_slice()) {
            (Some(name), _) => name.to_string(),
            (None, [only]) => only.clone(),
            (None, _) => return Err(OptsError::MissingFilename),
        };

        let yield_interval = self
            .yield_interval
            .as_deref()
            .map(|v| number("--yield", v))
            .transpose()?;
        let latency = self
            .latency
            .as_deref()
            .map(|v| number("--latency", v))
            .transpose()?;
        if yield_interval.is_some() && latency.is_some() {
            return Err(OptsError::Conflict);
        }
        let stop = self.stop.as_deref().map(|v| number("--stop", v)).transpose()?;

        let (yield_method, yield_interval) = match (latency, yield_interval) {
            (Some(ms), _) => (YieldMethod::Flexible, Some(ms.max(0.0).round() as u64)),
            (None, Some(n)) if n > 0.0 => {
                // boundaries are counted, a fractional count has no meaning
                if n.fract() != 0.0 {
                    return Err(OptsError::NotWhole {
                        flag: "--yield",
                        value: self.yield_interval.unwrap_or_default(),
                    });
                }
                (YieldMethod::Fixed, Some(n as u64))
            }
            _ => (YieldMethod::Fixed, None),
        };

        Ok(Opts {
            filename,
            yield_method,
            yield_interval,
            stop,
            env: self.env,
        })
    }
}

/// Parse run flags (without the binary name).
pub fn parse_runtime_opts<I, T>(args: I) -> Result<Opts, OptsError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    parse_runtime_opts_for(args, None)
}

/// [`parse_runtime_opts`] for a host that supplies the filename itself.
pub fn parse_runtime_opts_for<I, T>(args: I, filename: Option<&str>) -> Result<Opts, OptsError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let raw = RuntimeArgs::try_parse_from(args).map_err(|e| OptsError::Usage(e.to_string()))?;
    raw.resolve(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Opts, OptsError> {
        parse_runtime_opts(args.iter().copied())
    }

    #[test]
    fn test_filename_only() {
        let opts = parse(&["prog.js"]).unwrap();
        assert_eq!(opts, Opts::new("prog.js"));
    }

    #[test]
    fn test_fixed_yield() {
        let opts = parse(&["-y", "250", "prog.js"]).unwrap();
        assert_eq!(opts.yield_method, YieldMethod::Fixed);
        assert_eq!(opts.yield_interval, Some(250));

        let opts = parse(&["--yield", "10", "prog.js"]).unwrap();
        assert_eq!(opts.yield_interval, Some(10));
    }

    #[test]
    fn test_non_positive_yield_uses_default() {
        let opts = parse(&["-y", "0", "prog.js"]).unwrap();
        assert_eq!(opts.yield_method, YieldMethod::Fixed);
        assert_eq!(opts.yield_interval, None);
    }

    #[test]
    fn test_fractional_yield_is_rejected() {
        let err = parse(&["-y", "0.5", "prog.js"]).unwrap_err();
        assert_eq!(
            err,
            OptsError::NotWhole {
                flag: "--yield",
                value: "0.5".to_string()
            }
        );
        assert!(parse(&["-y", "2.5", "prog.js"]).is_err());
        assert_eq!(parse(&["-y", "3.0", "prog.js"]).unwrap().yield_interval, Some(3));
    }

    #[test]
    fn test_fractional_latency_rounds() {
        let opts = parse(&["-l", "2.6", "prog.js"]).unwrap();
        assert_eq!(opts.yield_interval, Some(3));
        let opts = parse(&["-l", "-4", "prog.js"]).unwrap();
        assert_eq!(opts.yield_interval, Some(0));
    }

    #[test]
    fn test_latency_is_flexible() {
        let opts = parse(&["--latency", "50", "prog.js"]).unwrap();
        assert_eq!(opts.yield_method, YieldMethod::Flexible);
        assert_eq!(opts.yield_interval, Some(50));
    }

    #[test]
    fn test_stop_and_env() {
        let opts = parse(&["--stop", "1.5", "--env", "browser", "prog.js"]).unwrap();
        assert_eq!(opts.stop, Some(1.5));
        assert_eq!(opts.env, Env::Browser);
    }

    #[test]
    fn test_conflict() {
        let err = parse(&["-y", "10", "-l", "10", "prog.js"]).unwrap_err();
        assert_eq!(err, OptsError::Conflict);
    }

    #[test]
    fn test_malformed_numbers() {
        let err = parse(&["-y", "often", "prog.js"]).unwrap_err();
        assert!(matches!(err, OptsError::Malformed { flag: "--yield", .. }));

        let err = parse(&["-l", "fast", "prog.js"]).unwrap_err();
        assert!(matches!(err, OptsError::Malformed { flag: "--latency", .. }));

        let err = parse(&["--stop", "soon", "prog.js"]).unwrap_err();
        assert!(matches!(err, OptsError::Malformed { flag: "--stop", .. }));
    }

    #[test]
    fn test_missing_filename() {
        assert_eq!(parse(&["-y", "10"]).unwrap_err(), OptsError::MissingFilename);
        assert_eq!(
            parse(&["a.js", "b.js"]).unwrap_err(),
            OptsError::MissingFilename
        );
    }

    #[test]
    fn test_host_supplied_filename() {
        let opts = parse_runtime_opts_for(["-y", "5"], Some("host.js")).unwrap();
        assert_eq!(opts.filename, "host.js");
        assert_eq!(opts.yield_interval, Some(5));
    }

    #[test]
    fn test_unknown_flag() {
        let err = parse(&["--fast", "prog.js"]).unwrap_err();
        assert!(matches!(err, OptsError::Usage(_)));
    }

    #[test]
    fn test_serializes_camel_case() {
        let opts = Opts::new("prog.js").flexible(20);
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "filename": "prog.js",
                "yieldMethod": "flexible",
                "yieldInterval": 20,
                "env": "node"
            })
        );
    }
}
