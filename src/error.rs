//! Run errors
//!
//! One variant per pipeline stage. The stage name leads the message so a
//! failure always says where it happened.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::crypto::DecryptionError;
use crate::engine::EngineError;
use crate::fetch::FetchError;
use crate::invoke::InvokeError;
use crate::loader::ParseError;
use crate::marshal::MarshalError;
use crate::source::AcquisitionError;

/// Pipeline stage a run failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Acquisition,
    Fetch,
    Decryption,
    Parse,
    Engine,
    EntryPoint,
    Arguments,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Acquisition => "acquisition",
            Stage::Fetch => "fetch",
            Stage::Decryption => "decryption",
            Stage::Parse => "parse",
            Stage::Engine => "engine",
            Stage::EntryPoint => "entry-point",
            Stage::Arguments => "arguments",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("acquisition: {0}")]
    Acquisition(AcquisitionError),

    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),

    #[error("decryption: {0}")]
    Decryption(#[from] DecryptionError),

    #[error("parse: {0}")]
    Parse(#[from] ParseError),

    #[error("engine: {0}")]
    Engine(#[from] EngineError),

    #[error("entry-point: {0}")]
    EntryPoint(#[from] InvokeError),

    #[error("arguments: {0}")]
    Arguments(#[from] MarshalError),
}

impl RunError {
    pub fn stage(&self) -> Stage {
        match self {
            RunError::Config(_) => Stage::Config,
            RunError::Acquisition(_) => Stage::Acquisition,
            RunError::Fetch(_) => Stage::Fetch,
            RunError::Decryption(_) => Stage::Decryption,
            RunError::Parse(_) => Stage::Parse,
            RunError::Engine(_) => Stage::Engine,
            RunError::EntryPoint(_) => Stage::EntryPoint,
            RunError::Arguments(_) => Stage::Arguments,
        }
    }
}

impl From<AcquisitionError> for RunError {
    fn from(err: AcquisitionError) -> Self {
        match err {
            AcquisitionError::Fetch(fetch) => RunError::Fetch(fetch),
            other => RunError::Acquisition(other),
        }
    }
}
