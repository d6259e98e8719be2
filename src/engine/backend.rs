//! Native code-generation backend setup.
//!
//! Process-wide and performed at most once. The first outcome is cached, so
//! later callers observe the same success or failure without re-running it.

use inkwell::targets::{InitializationConfig, Target};
use once_cell::sync::OnceCell;

use super::EngineError;

static NATIVE_TARGET: OnceCell<Result<(), String>> = OnceCell::new();

/// Initialize the host target, asm printer and asm parser.
pub fn initialize() -> Result<(), EngineError> {
    NATIVE_TARGET
        .get_or_init(|| {
            let result = Target::initialize_native(&InitializationConfig::default());
            match &result {
                Ok(()) => tracing::debug!("native target initialized"),
                Err(e) => tracing::error!(error = %e, "native target initialization failed"),
            }
            result
        })
        .clone()
        .map_err(EngineError::BackendInit)
}

/// Whether [`initialize`] has already run in this process.
pub fn is_initialized() -> bool {
    matches!(NATIVE_TARGET.get(), Some(Ok(())))
}
