//! Irvana - LLVM IR Loader and JIT Runner
//!
//! Takes an LLVM IR module from one of three places, compiles it in process
//! with LLVM's MCJIT, and calls its `main` with the caller's arguments.
//!
//! # Features
//!
//! - **Three acquisition strategies**: local file, AES-256-GCM blob sealed
//!   into the binary at build time, or a single plain HTTP GET
//! - **All-or-nothing parsing**: textual or bitcode IR, verified before use
//! - **Explicit symbol binding**: every external declaration is bound to a
//!   loaded library or the host process before code generation
//! - **Native calling convention**: `main()`, `main(argc, argv)` and
//!   `main(argc, argv, envp)`, returning `i32` or `void`
//!
//! # Pipeline
//!
//! ```text
//! SourceDescriptor ──acquire──> Payload ──decrypt──> RawIrBytes
//!                                                        │
//!                                                     parse
//!                                                        ▼
//! ExecutionResult <──invoke── ResolvedEntryPoint <── Session <── IrModule
//! ```
//!
//! # Example
//!
//! ```no_run
//! use irvana::pipeline::{run, RunRequest};
//! use irvana::source::SourceDescriptor;
//!
//! let request = RunRequest::new(SourceDescriptor::local("prog.ll")).with_args(["a", "b"]);
//! let result = run(&request).unwrap();
//! println!("{}", result);
//! ```

pub mod cli;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod invoke;
pub mod loader;
pub mod logging;
pub mod marshal;
pub mod pipeline;
pub mod source;

pub use config::{ConfigError, IrvanaConfig};
pub use engine::{EngineError, EngineOptions, OptLevel, Session, SymbolPrecedence};
pub use error::{RunError, Stage};
pub use invoke::{ExecutionResult, InvokeError};
pub use loader::{CompilationContext, IrModule, ParseError};
pub use marshal::{ArgumentVector, MarshalError};
pub use pipeline::{run, RunRequest};
pub use source::{AcquisitionError, RawIrBytes, SourceDescriptor};
