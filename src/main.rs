//! Irvana - LLVM IR Loader and JIT Runner
//!
//! Runs `main` from a local IR file or one fetched with `--remoteload`.

use anyhow::{Context, Result};
use irvana::cli::{parse_args, RunnerCli};
use irvana::{logging, pipeline};
use std::io::{self, Write};

fn main() -> Result<()> {
    let cli: RunnerCli = parse_args();
    let config = cli
        .options
        .load_config()
        .context("Failed to load configuration")?;
    logging::init(cli.options.verbose, config.logging.level.as_deref());

    let request = cli.request(&config)?;
    let result = pipeline::run(&request)?;

    let mut stdout = io::stdout().lock();
    result.report(&mut stdout)?;
    stdout.flush()?;

    if cli.options.exit_with_result {
        std::process::exit(result.exit_code());
    }
    Ok(())
}
