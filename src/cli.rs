//! Command-line surface
//!
//! Options shared by the `irvana` and `irvana-embedded` binaries, plus the
//! merge of those options over `irvana.toml`.
//!
//! `--load=<lib>` may also appear among the trailing arguments. Those
//! tokens are pulled out before the rest is forwarded to the entry point.
//! Every other trailing token, option-like or not, belongs to the entry
//! point.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{ArgAction, Args, Parser};
use thiserror::Error;

use crate::config::{ConfigResult, IrvanaConfig};
use crate::engine::{OptLevel, SymbolPrecedence};
use crate::pipeline::RunRequest;
use crate::source::SourceDescriptor;

const LOAD_PREFIX: &str = "--load=";

/// Usage errors clap cannot express.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Missing IR path (or --remoteload <host> <path>)")]
    MissingSource,

    #[error("--load requires a library path")]
    MissingLibrary,
}

/// Options common to every runner binary.
#[derive(Debug, Clone, Default, Args)]
pub struct RunOptions {
    /// Config file (default: irvana.toml in this or a parent directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Entry point symbol (default: main)
    #[arg(long, value_name = "SYMBOL")]
    pub entry: Option<String>,

    /// Code generation optimization level
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub opt_level: Option<OptLevel>,

    /// Do not resolve externals against this process
    #[arg(long)]
    pub no_host_symbols: bool,

    /// Prefer host symbols over loaded libraries
    #[arg(long)]
    pub host_first: bool,

    /// Pass NAME as argv[0]
    #[arg(long, value_name = "NAME")]
    pub argv0: Option<String>,

    /// Exit with the entry point's return value
    #[arg(long)]
    pub exit_with_result: bool,

    /// Shared library to load before compilation (repeatable)
    #[arg(long = "load", value_name = "LIB")]
    pub load: Vec<PathBuf>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl RunOptions {
    /// Load the explicit config file, or search for one.
    pub fn load_config(&self) -> ConfigResult<IrvanaConfig> {
        IrvanaConfig::resolve(self.config.as_deref())
    }

    /// Build a run from `config` and these options. `extra_libraries` and
    /// `args` come from [`split_load_flags`] over the trailing tokens.
    pub fn request(
        &self,
        config: &IrvanaConfig,
        source: SourceDescriptor,
        extra_libraries: Vec<PathBuf>,
        args: Vec<String>,
    ) -> RunRequest {
        let mut engine = config.engine_options();
        engine.libraries.extend(self.load.iter().cloned());
        engine.libraries.extend(extra_libraries);
        if self.no_host_symbols {
            engine.host_symbols = false;
        }
        if self.host_first {
            engine.precedence = SymbolPrecedence::HostFirst;
        }
        if let Some(level) = self.opt_level {
            engine.opt_level = level;
        }

        RunRequest {
            source,
            engine,
            entry: self
                .entry
                .clone()
                .unwrap_or_else(|| config.engine.entry.clone()),
            args,
            program_name: self
                .argv0
                .clone()
                .or_else(|| config.arguments.program_name.clone()),
        }
    }
}

/// Separate `--load=<lib>` tokens from entry point arguments, keeping both
/// in order. A bare `--load` is an ordinary argument here.
pub fn split_load_flags(tokens: Vec<String>) -> Result<(Vec<PathBuf>, Vec<String>), UsageError> {
    let mut libraries = Vec::new();
    let mut args = Vec::new();

    for token in tokens {
        if let Some(path) = token.strip_prefix(LOAD_PREFIX) {
            if path.is_empty() {
                return Err(UsageError::MissingLibrary);
            }
            libraries.push(PathBuf::from(path));
        } else {
            args.push(token);
        }
    }

    Ok((libraries, args))
}

/// Exit status for a clap parse failure of `kind`: 0 for help and version
/// output, 1 for everything else.
pub fn parse_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => 1,
    }
}

/// Parse the process arguments into `P`, printing clap's message and
/// exiting with [`parse_exit_code`] on failure.
pub fn parse_args<P: Parser>() -> P {
    match P::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(parse_exit_code(e.kind()))
        }
    }
}

/// `irvana`: run IR from a local file or an HTTP server.
#[derive(Debug, Parser)]
#[command(name = "irvana")]
#[command(version)]
#[command(about = "JIT-compile and run an LLVM IR module", long_about = None)]
pub struct RunnerCli {
    #[command(flatten)]
    pub options: RunOptions,

    /// Fetch the IR from http://HOST/PATH: the first two ARGS are HOST and PATH
    #[arg(long)]
    pub remoteload: bool,

    /// IR path (or HOST PATH) followed by arguments for the entry point
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub rest: Vec<String>,
}

impl RunnerCli {
    /// Resolve the source and merge options over `config`.
    pub fn request(&self, config: &IrvanaConfig) -> Result<RunRequest, UsageError> {
        let (libraries, mut args) = split_load_flags(self.rest.clone())?;
        let source = if self.remoteload {
            if args.len() < 2 {
                return Err(UsageError::MissingSource);
            }
            let tail = args.split_off(2);
            let source = SourceDescriptor::remote(args[0].as_str(), args[1].as_str());
            args = tail;
            source
        } else {
            if args.is_empty() {
                return Err(UsageError::MissingSource);
            }
            SourceDescriptor::local(args.remove(0))
        };
        Ok(self.options.request(config, source, libraries, args))
    }
}

/// `irvana-embedded`: run the IR sealed into this binary.
#[derive(Debug, Parser)]
#[command(name = "irvana-embedded")]
#[command(version)]
#[command(about = "Run the LLVM IR module embedded in this binary", long_about = None)]
pub struct EmbeddedCli {
    #[command(flatten)]
    pub options: RunOptions,

    /// Arguments for the entry point
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub rest: Vec<String>,
}

impl EmbeddedCli {
    pub fn request(&self, config: &IrvanaConfig) -> Result<RunRequest, UsageError> {
        let (libraries, args) = split_load_flags(self.rest.clone())?;
        Ok(self
            .options
            .request(config, SourceDescriptor::embedded(), libraries, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_load_flags() {
        let (libs, args) =
            split_load_flags(strings(&["a", "--load=/l/one.so", "b", "--load=two.so", "c"]))
                .unwrap();
        assert_eq!(libs, vec![PathBuf::from("/l/one.so"), PathBuf::from("two.so")]);
        assert_eq!(args, strings(&["a", "b", "c"]));
    }

    #[test]
    fn test_bare_load_is_forwarded() {
        let (libs, args) = split_load_flags(strings(&["--load", "value", "x"])).unwrap();
        assert!(libs.is_empty());
        assert_eq!(args, strings(&["--load", "value", "x"]));
    }

    #[test]
    fn test_split_load_flag_without_value() {
        assert_eq!(
            split_load_flags(strings(&["--load="])),
            Err(UsageError::MissingLibrary)
        );
    }

    #[test]
    fn test_local_file_with_trailing_load() {
        let cli = RunnerCli::try_parse_from([
            "irvana",
            "prog.ll",
            "one",
            "--load=libx.so",
            "--two",
        ])
        .unwrap();
        let request = cli.request(&IrvanaConfig::default()).unwrap();
        assert_eq!(request.source, SourceDescriptor::local("prog.ll"));
        assert_eq!(request.args, strings(&["one", "--two"]));
        assert_eq!(request.engine.libraries, vec![PathBuf::from("libx.so")]);
        assert_eq!(request.entry, "main");
        assert!(request.program_name.is_none());
    }

    #[test]
    fn test_load_before_ir_path() {
        let cli = RunnerCli::try_parse_from(["irvana", "--load=first.so", "prog.ll", "--load=second.so"])
            .unwrap();
        let request = cli.request(&IrvanaConfig::default()).unwrap();
        assert_eq!(request.source, SourceDescriptor::local("prog.ll"));
        assert_eq!(
            request.engine.libraries,
            vec![PathBuf::from("first.so"), PathBuf::from("second.so")]
        );
        assert!(request.args.is_empty());
    }

    #[test]
    fn test_remoteload() {
        let cli = RunnerCli::try_parse_from([
            "irvana",
            "--remoteload",
            "10.0.0.5:8080",
            "/payload.ll",
            "x",
            "--load=lib.so",
        ])
        .unwrap();
        let request = cli.request(&IrvanaConfig::default()).unwrap();
        assert_eq!(request.source, SourceDescriptor::remote("10.0.0.5:8080", "/payload.ll"));
        assert_eq!(request.args, strings(&["x"]));
        assert_eq!(request.engine.libraries, vec![PathBuf::from("lib.so")]);
    }

    #[test]
    fn test_remoteload_forwards_option_like_arguments() {
        let cli = RunnerCli::try_parse_from([
            "irvana",
            "--remoteload",
            "h",
            "/p",
            "-v",
            "--entry",
            "x",
        ])
        .unwrap();
        assert_eq!(cli.options.verbose, 0);
        assert!(cli.options.entry.is_none());

        let request = cli.request(&IrvanaConfig::default()).unwrap();
        assert_eq!(request.source, SourceDescriptor::remote("h", "/p"));
        assert_eq!(request.args, strings(&["-v", "--entry", "x"]));
        assert_eq!(request.entry, "main");
    }

    #[test]
    fn test_local_forwards_option_like_arguments() {
        let cli = RunnerCli::try_parse_from(["irvana", "p.ll", "-v", "--entry", "x"]).unwrap();
        let request = cli.request(&IrvanaConfig::default()).unwrap();
        assert_eq!(request.args, strings(&["-v", "--entry", "x"]));
        assert_eq!(cli.options.verbose, 0);
    }

    #[test]
    fn test_missing_source() {
        let cli = RunnerCli::try_parse_from(["irvana"]).unwrap();
        assert_eq!(
            cli.request(&IrvanaConfig::default()).unwrap_err(),
            UsageError::MissingSource
        );

        let cli = RunnerCli::try_parse_from(["irvana", "--remoteload", "h"]).unwrap();
        assert_eq!(
            cli.request(&IrvanaConfig::default()).unwrap_err(),
            UsageError::MissingSource
        );
    }

    #[test]
    fn test_cli_overrides_config() {
        let config: IrvanaConfig = toml::from_str(
            "[engine]\nentry = \"start\"\nlibraries = [\"cfg.so\"]\nopt_level = \"less\"\n\
             [arguments]\nprogram_name = \"cfgname\"\n",
        )
        .unwrap();

        let cli = RunnerCli::try_parse_from(["irvana", "p.ll"]).unwrap();
        let request = cli.request(&config).unwrap();
        assert_eq!(request.entry, "start");
        assert_eq!(request.program_name.as_deref(), Some("cfgname"));
        assert_eq!(request.engine.opt_level, OptLevel::Less);

        let cli = RunnerCli::try_parse_from([
            "irvana",
            "--entry",
            "other",
            "--argv0",
            "cli",
            "--opt-level",
            "aggressive",
            "--no-host-symbols",
            "--host-first",
            "p.ll",
            "--load=cli.so",
        ])
        .unwrap();
        let request = cli.request(&config).unwrap();
        assert_eq!(request.entry, "other");
        assert_eq!(request.program_name.as_deref(), Some("cli"));
        assert_eq!(request.engine.opt_level, OptLevel::Aggressive);
        assert!(!request.engine.host_symbols);
        assert_eq!(request.engine.precedence, SymbolPrecedence::HostFirst);
        assert_eq!(
            request.engine.libraries,
            vec![PathBuf::from("cfg.so"), PathBuf::from("cli.so")]
        );
    }

    #[test]
    fn test_parse_failures_exit_one() {
        let err = RunnerCli::try_parse_from(["irvana", "--opt-level", "bogus", "p.ll"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(parse_exit_code(err.kind()), 1);

        let err = RunnerCli::try_parse_from(["irvana", "--no-such-flag"]).unwrap_err();
        assert_eq!(parse_exit_code(err.kind()), 1);

        let err = RunnerCli::try_parse_from(["irvana", "--help"]).unwrap_err();
        assert_eq!(parse_exit_code(err.kind()), 0);
        let err = EmbeddedCli::try_parse_from(["irvana-embedded", "--version"]).unwrap_err();
        assert_eq!(parse_exit_code(err.kind()), 0);
    }

    #[test]
    fn test_embedded_cli() {
        let cli = EmbeddedCli::try_parse_from(["irvana-embedded", "-vv", "a", "--load=l.so", "b"])
            .unwrap();
        assert_eq!(cli.options.verbose, 2);
        let request = cli.request(&IrvanaConfig::default()).unwrap();
        assert_eq!(request.args, strings(&["a", "b"]));
        assert_eq!(request.source.strategy(), "encrypted-blob");
    }
}
