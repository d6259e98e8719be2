//! IR Loader
//!
//! Parses textual (`.ll`) or bitcode (`.bc`) LLVM IR into a fresh
//! [`CompilationContext`] and verifies the result. A module is returned
//! whole or not at all.

use std::fmt;

use inkwell::context::Context;
use inkwell::memory_buffer::MemoryBuffer;
use inkwell::module::Module;
use thiserror::Error;

use crate::source::RawIrBytes;

/// Owns every type and constant derived from one module.
///
/// Created per run and never shared, so unrelated loads cannot collide.
pub struct CompilationContext {
    context: Context,
}

impl CompilationContext {
    pub fn new() -> Self {
        Self {
            context: Context::create(),
        }
    }

    pub(crate) fn llvm(&self) -> &Context {
        &self.context
    }
}

impl Default for CompilationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Position of a diagnostic inside the parsed buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// A message from the IR parser or verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Buffer the message refers to (file path, URL, or `<embedded>`)
    pub buffer: String,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    /// Split an LLVM diagnostic of the form
    /// `<buffer>:<line>:<col>: error: <message>` into its parts. Anything
    /// else is kept verbatim without a location.
    pub fn from_llvm(buffer: &str, raw: &str) -> Self {
        let first = raw.lines().next().unwrap_or("").trim();
        let parsed = first
            .strip_prefix(buffer)
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|rest| {
                let mut parts = rest.splitn(3, ':');
                let line = parts.next()?.trim().parse().ok()?;
                let column = parts.next()?.trim().parse().ok()?;
                let message = parts.next()?.trim();
                let message = message.strip_prefix("error:").unwrap_or(message).trim();
                Some((SourceLocation { line, column }, message.to_string()))
            });

        match parsed {
            Some((location, message)) => Self {
                buffer: buffer.to_string(),
                message,
                location: Some(location),
            },
            None => Self {
                buffer: buffer.to_string(),
                message: raw.trim().to_string(),
                location: None,
            },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}:{}:{}: {}", self.buffer, loc.line, loc.column, self.message),
            None => write!(f, "{}: {}", self.buffer, self.message),
        }
    }
}

/// IR parse errors.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}: IR buffer is empty")]
    Empty(String),

    #[error("Malformed IR: {0}")]
    Syntax(Diagnostic),

    #[error("IR failed verification: {0}")]
    Verify(Diagnostic),
}

impl ParseError {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ParseError::Empty(_) => None,
            ParseError::Syntax(d) | ParseError::Verify(d) => Some(d),
        }
    }
}

/// A parsed and verified module, bound to its context.
pub struct IrModule<'ctx> {
    pub(crate) module: Module<'ctx>,
    pub(crate) name: String,
}

impl<'ctx> IrModule<'ctx> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the module defines (not just declares) `symbol` as a function.
    pub fn defines_function(&self, symbol: &str) -> bool {
        self.module
            .get_function(symbol)
            .map(|f| f.count_basic_blocks() > 0)
            .unwrap_or(false)
    }

    /// Serialize to bitcode.
    pub fn to_bitcode(&self) -> Vec<u8> {
        self.module.write_bitcode_to_memory().as_slice().to_vec()
    }
}

impl fmt::Debug for IrModule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IrModule").field("name", &self.name).finish()
    }
}

/// Parse `bytes` into `context`.
pub fn parse(bytes: RawIrBytes, context: &CompilationContext) -> Result<IrModule<'_>, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::Empty(bytes.name().to_string()));
    }

    let buffer = MemoryBuffer::create_from_memory_range_copy(bytes.as_slice(), bytes.name());
    let module = context
        .llvm()
        .create_module_from_ir(buffer)
        .map_err(|e| ParseError::Syntax(Diagnostic::from_llvm(bytes.name(), &e.to_string())))?;

    module
        .verify()
        .map_err(|e| ParseError::Verify(Diagnostic::from_llvm(bytes.name(), &e.to_string())))?;

    let name = module.get_name().to_string_lossy().into_owned();
    tracing::info!(
        module = %name,
        bytes = bytes.len(),
        functions = module.get_functions().count(),
        "parsed IR module"
    );
    Ok(IrModule { module, name })
}
