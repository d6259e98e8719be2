//! Runner for the IR module sealed into this binary at build time.
//!
//! Build with `IRVANA_EMBED_BLOB` pointing at an `irvana-seal` output and
//! `IRVANA_EMBED_KEY` (or `IRVANA_EMBED_KEY_FILE`) holding its key.

use anyhow::{bail, Context, Result};
use irvana::cli::{parse_args, EmbeddedCli};
use irvana::source::embedded;
use irvana::{logging, pipeline};
use std::io::{self, Write};

fn main() -> Result<()> {
    let cli: EmbeddedCli = parse_args();
    let config = cli
        .options
        .load_config()
        .context("Failed to load configuration")?;
    logging::init(cli.options.verbose, config.logging.level.as_deref());

    if !embedded::is_present() {
        tracing::warn!("no IR blob was embedded at build time (set IRVANA_EMBED_BLOB)");
    }
    if embedded::KEY.is_empty() && embedded::is_present() {
        bail!("IR blob is embedded without a key (set IRVANA_EMBED_KEY)");
    }

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
