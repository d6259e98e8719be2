//! Seal an IR file for the embedded runner.
//!
//! Output layout is `ciphertext || tag`; the nonce is derived from the key,
//! so nothing else travels with the blob.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use irvana::cli::parse_args;
use irvana::crypto;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "irvana-seal")]
#[command(version)]
#[command(about = "Encrypt an LLVM IR file for irvana-embedded", long_about = None)]
#[command(group(ArgGroup::new("key_source").required(true).args(["key", "key_file", "key_hex"])))]
struct Cli {
    /// IR file to seal (.ll or .bc)
    input: PathBuf,

    /// Output blob path
    #[arg(short, long)]
    output: PathBuf,

    /// Key material as text
    #[arg(long)]
    key: Option<String>,

    /// Read key material from a file
    #[arg(long, value_name = "PATH")]
    key_file: Option<PathBuf>,

    /// Key material as hex
    #[arg(long, value_name = "HEX")]
    key_hex: Option<String>,
}

impl Cli {
    fn key_material(&self) -> Result<Vec<u8>> {
        if let Some(text) = &self.key {
            return Ok(text.as_bytes().to_vec());
        }
        if let Some(path) = &self.key_file {
            return fs::read(path)
                .with_context(|| format!("Failed to read key file {}", path.display()));
        }
        let hex_text = self.key_hex.as_deref().unwrap_or_default();
        hex::decode(hex_text.trim()).context("Invalid hex key")
    }
}

fn main() -> Result<()> {
    let cli: Cli = parse_args();

    let plaintext = fs::read(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let key = cli.key_material()?;
    let blob = crypto::seal(&plaintext, &key)?;

    fs::write(&cli.output, &blob)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    println!(
        "Sealed {} bytes -> {} ({} bytes)",
        plaintext.len(),
        cli.output.display(),
        blob.len()
    );
    Ok(())
}
