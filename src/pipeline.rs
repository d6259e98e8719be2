//! Run driver
//!
//! ```text
//! acquire ─> decrypt ─> parse ─> create session ─> entry point ─> marshal ─> invoke
//! ```
//!
//! Stages run strictly in order on the calling thread and the first failure
//! ends the run. Nothing is invoked unless a full module was compiled.

use crate::engine::{self, EngineOptions};
use crate::error::RunError;
use crate::invoke::{self, ExecutionResult};
use crate::loader::{self, CompilationContext};
use crate::marshal::ArgumentVector;
use crate::source::SourceDescriptor;

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub source: SourceDescriptor,
    pub engine: EngineOptions,
    /// Entry point symbol
    pub entry: String,
    /// Extra arguments forwarded as argv
    pub args: Vec<String>,
    /// Optional argv[0]
    pub program_name: Option<String>,
}

impl RunRequest {
    /// Run `main` from `source` with default engine options and no arguments.
    pub fn new(source: SourceDescriptor) -> Self {
        Self {
            source,
            engine: EngineOptions::default(),
            entry: "main".to_string(),
            args: Vec::new(),
            program_name: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_engine(mut self, engine: EngineOptions) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    fn marshal_args(&self) -> Result<ArgumentVector, RunError> {
        let args = match &self.program_name {
            Some(name) => ArgumentVector::with_program_name(name, self.args.iter().cloned())?,
            None => ArgumentVector::marshal(self.args.iter().cloned())?,
        };
        Ok(args)
    }
}

/// Execute one run end to end.
pub fn run(request: &RunRequest) -> Result<ExecutionResult, RunError> {
    let payload = request.source.acquire()?;
    tracing::info!(
        strategy = request.source.strategy(),
        sealed = payload.is_sealed(),
        "IR acquired"
    );

    let bytes = payload.into_ir_bytes()?;
    tracing::info!(buffer = bytes.name(), bytes = bytes.len(), "IR bytes ready");

    let context = CompilationContext::new();
    let module = loader::parse(bytes, &context)?;

    let session = engine::create_session(module, &request.engine)?;
    let entry = session.entry_point(&request.entry)?;
    let args = request.marshal_args()?;
    tracing::info!(
        module = session.module_name(),
        entry = entry.name(),
        args = args.len(),
        externals = session.resolved_symbols().len(),
        "ready to invoke"
    );

    session.run_static_constructors();
    let result = invoke::invoke(&entry, &args);
    session.run_static_destructors();

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::invoke::InvokeError;

    fn write_ir(name: &str, text: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("irvana_pipeline_{}_{}", std::process::id(), name));
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_local_file_run() {
        let path = write_ir("ret42.ll", "define i32 @main() {\n  ret i32 42\n}\n");
        let result = run(&RunRequest::new(SourceDescriptor::local(&path))).unwrap();
        assert_eq!(result.value, 42);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file_stops_at_acquisition() {
        let err = run(&RunRequest::new(SourceDescriptor::local("/nonexistent/irvana.ll"))).unwrap_err();
        assert_eq!(err.stage(), Stage::Acquisition);
    }

    #[test]
    fn test_program_name_counts_in_argc() {
        let path = write_ir(
            "argc.ll",
            "define i32 @main(i32 %argc, ptr %argv) {\n  ret i32 %argc\n}\n",
        );
        let mut request = RunRequest::new(SourceDescriptor::local(&path)).with_args(["a", "b"]);
        assert_eq!(run(&request).unwrap().value, 2);
        request.program_name = Some("prog".into());
        assert_eq!(run(&request).unwrap().value, 3);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_alternate_entry() {
        let path = write_ir("start.ll", "define i32 @start() {\n  ret i32 9\n}\n");
        let request = RunRequest::new(SourceDescriptor::local(&path));
        match run(&request) {
            Err(RunError::EntryPoint(InvokeError::SymbolNotFound(name))) => assert_eq!(name, "main"),
            other => panic!("Expected SymbolNotFound, got {:?}", other),
        }
        assert_eq!(run(&request.with_entry("start")).unwrap().value, 9);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_interior_nul_argument() {
        let path = write_ir("nul.ll", "define i32 @main(i32 %c, ptr %v) {\n  ret i32 0\n}\n");
        let request = RunRequest::new(SourceDescriptor::local(&path)).with_args(["bad\0"]);
        assert_eq!(run(&request).unwrap_err().stage(), Stage::Arguments);
        std::fs::remove_file(path).unwrap();
    }
}
