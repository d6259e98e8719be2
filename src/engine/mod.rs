//! Execution Engine
//!
//! Turns a parsed module into resident native code:
//!
//! 1. initialize the native backend (once per process)
//! 2. load requested shared libraries with process-wide visibility
//! 3. open the host process as a symbol source, if enabled
//! 4. hand the module to a fresh MCJIT session
//! 5. bind every external declaration through the [`SymbolResolver`]
//!
//! Each step short-circuits the rest. MCJIT compiles lazily: the whole
//! module is generated on the first address lookup, which
//! [`Session::entry_point`] performs.

pub mod backend;
mod session;
pub mod symbols;

use std::path::PathBuf;

use clap::ValueEnum;
use inkwell::OptimizationLevel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loader::IrModule;

pub use session::{EntrySignature, EntryReturn, ResolvedEntryPoint, Session};
pub use symbols::{
    HostProcess, Resolution, SharedLibrary, SymbolPrecedence, SymbolResolver, SymbolSource,
};

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Native backend initialization failed: {0}")]
    BackendInit(String),

    #[error("Failed to load shared library {}: {reason}", path.display())]
    LibraryLoadFailed { path: PathBuf, reason: String },

    #[error("Failed to create JIT session: {0}")]
    SessionCreation(String),

    #[error("Unresolved external symbol '{name}' (searched: {searched})")]
    UnresolvedSymbol { name: String, searched: String },
}

/// Code generation optimization level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OptLevel {
    None,
    Less,
    #[default]
    Default,
    Aggressive,
}

impl From<OptLevel> for OptimizationLevel {
    fn from(level: OptLevel) -> Self {
        match level {
            OptLevel::None => OptimizationLevel::None,
            OptLevel::Less => OptimizationLevel::Less,
            OptLevel::Default => OptimizationLevel::Default,
            OptLevel::Aggressive => OptimizationLevel::Aggressive,
        }
    }
}

/// Session creation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Shared libraries to load, in order
    pub libraries: Vec<PathBuf>,
    /// Resolve externals against the host process
    pub host_symbols: bool,
    pub precedence: SymbolPrecedence,
    pub opt_level: OptLevel,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            libraries: Vec::new(),
            host_symbols: true,
            precedence: SymbolPrecedence::default(),
            opt_level: OptLevel::default(),
        }
    }
}

/// Create the execution session that owns `module` from here on.
pub fn create_session<'ctx>(
    module: IrModule<'ctx>,
    options: &EngineOptions,
) -> Result<Session<'ctx>, EngineError> {
    backend::initialize()?;

    let libraries = options
        .libraries
        .iter()
        .map(SharedLibrary::load)
        .collect::<Result<Vec<_>, _>>()?;

    let host = if options.host_symbols {
        Some(Box::new(HostProcess::open()?) as Box<dyn SymbolSource>)
    } else {
        None
    };

    Session::new(module, libraries, host, options)
}
