//! Invoker & Result Reporter
//!
//! Calls a resolved entry point with a marshaled argument vector and
//! reports its return value. The call runs on the current thread with the
//! full privileges of the process; it returns when the callee returns.

use std::ffi::{c_char, c_int};
use std::fmt;
use std::io::{self, Write};

use thiserror::Error;

use crate::engine::{EntryReturn, EntrySignature, ResolvedEntryPoint};
use crate::marshal::{environment_block, ArgumentVector};

/// Entry point lookup errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvokeError {
    #[error("Entry point '{0}' is not defined in the module")]
    SymbolNotFound(String),

    #[error("Entry point '{name}' has an unsupported signature: {detail}")]
    UnsupportedSignature { name: String, detail: String },
}

/// Value returned by the entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub value: i32,
}

impl ExecutionResult {
    /// Write the `Result: <n>` line.
    pub fn report(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", self)
    }

    /// Value as a process exit status.
    pub fn exit_code(&self) -> i32 {
        self.value & 0xff
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Result: {}", self.value)
    }
}

type NoArgsI32 = unsafe extern "C" fn() -> c_int;
type NoArgsVoid = unsafe extern "C" fn();
type ArgvI32 = unsafe extern "C" fn(c_int, *const *const c_char) -> c_int;
type ArgvVoid = unsafe extern "C" fn(c_int, *const *const c_char);
type ArgvEnvpI32 =
    unsafe extern "C" fn(c_int, *const *const c_char, *const *const c_char) -> c_int;
type ArgvEnvpVoid = unsafe extern "C" fn(c_int, *const *const c_char, *const *const c_char);

/// Call `entry` with `args`. A `void` entry point reports `0`.
pub fn invoke(entry: &ResolvedEntryPoint<'_>, args: &ArgumentVector) -> ExecutionResult {
    let address = entry.address;
    tracing::info!(
        entry = entry.name(),
        argc = args.argc(),
        signature = ?entry.signature(),
        "invoking entry point"
    );

    // Safety: `address` was produced by the engine for a function whose IR
    // signature `classify` matched against these exact shapes, and the
    // session that owns the code outlives `entry`.
    let value = unsafe {
        match (entry.signature(), entry.returns()) {
            (EntrySignature::NoArgs, EntryReturn::Int32) => {
                let f: NoArgsI32 = std::mem::transmute(address);
                f()
            }
            (EntrySignature::NoArgs, EntryReturn::Void) => {
                let f: NoArgsVoid = std::mem::transmute(address);
                f();
                0
            }
            (EntrySignature::Argv, EntryReturn::Int32) => {
                let f: ArgvI32 = std::mem::transmute(address);
                args.with_raw(|argc, argv| f(argc, argv))
            }
            (EntrySignature::Argv, EntryReturn::Void) => {
                let f: ArgvVoid = std::mem::transmute(address);
                args.with_raw(|argc, argv| f(argc, argv));
                0
            }
            (EntrySignature::ArgvEnvp, returns) => {
                let env = environment_block();
                env.with_ptrs(|envp| {
                    args.with_raw(|argc, argv| match returns {
                        EntryReturn::Int32 => {
                            let f: ArgvEnvpI32 = std::mem::transmute(address);
                            f(argc, argv, envp)
                        }
                        EntryReturn::Void => {
                            let f: ArgvEnvpVoid = std::mem::transmute(address);
                            f(argc, argv, envp);
                            0
                        }
                    })
                })
            }
        }
    };

    tracing::info!(entry = entry.name(), value, "entry point returned");
    ExecutionResult { value }
}
