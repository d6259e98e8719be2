//! JIT Session
//!
//! One MCJIT engine owning one module, plus the symbol sources its external
//! declarations were bound against. Libraries stay loaded for as long as
//! the session lives.

use std::marker::PhantomData;

use inkwell::execution_engine::ExecutionEngine;
use inkwell::module::Module;
use inkwell::types::{AnyType, BasicTypeEnum};
use inkwell::values::FunctionValue;

use crate::invoke::InvokeError;
use crate::loader::IrModule;

use super::symbols::{Resolution, SharedLibrary, SymbolResolver, SymbolSource};
use super::{EngineError, EngineOptions};

/// Parameter shape of an entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySignature {
    /// `main()`
    NoArgs,
    /// `main(int argc, char **argv)`
    Argv,
    /// `main(int argc, char **argv, char **envp)`
    ArgvEnvp,
}

/// Return shape of an entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryReturn {
    Int32,
    Void,
}

/// Native address of the entry point, valid while the session is alive.
#[derive(Debug)]
pub struct ResolvedEntryPoint<'s> {
    pub(crate) name: String,
    pub(crate) address: usize,
    pub(crate) signature: EntrySignature,
    pub(crate) returns: EntryReturn,
    _session: PhantomData<&'s ()>,
}

impl ResolvedEntryPoint<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> EntrySignature {
        self.signature
    }

    pub fn returns(&self) -> EntryReturn {
        self.returns
    }
}

pub struct Session<'ctx> {
    engine: ExecutionEngine<'ctx>,
    module: Module<'ctx>,
    name: String,
    resolutions: Vec<Resolution>,
    // Dropped after the engine and module above.
    resolver: SymbolResolver,
}

impl<'ctx> Session<'ctx> {
    pub(super) fn new(
        module: IrModule<'ctx>,
        libraries: Vec<SharedLibrary>,
        host: Option<Box<dyn SymbolSource>>,
        options: &EngineOptions,
    ) -> Result<Self, EngineError> {
        let IrModule { module, name } = module;

        let libraries = libraries
            .into_iter()
            .map(|lib| Box::new(lib) as Box<dyn SymbolSource>)
            .collect();
        let resolver = SymbolResolver::new(libraries, host, options.precedence);

        let engine = module
            .create_jit_execution_engine(options.opt_level.into())
            .map_err(|e| EngineError::SessionCreation(e.to_string()))?;

        let resolutions = bind_externals(&engine, &module, &resolver)?;

        tracing::info!(
            module = %name,
            externals = resolutions.len(),
            precedence = options.precedence.as_str(),
            sources = ?resolver.source_labels(),
            "JIT session created"
        );

        Ok(Self {
            engine,
            module,
            name,
            resolutions,
            resolver,
        })
    }

    pub fn module_name(&self) -> &str {
        &self.name
    }

    /// Every external declaration and the source that satisfied it.
    pub fn resolved_symbols(&self) -> &[Resolution] {
        &self.resolutions
    }

    /// Labels of the symbol sources, in lookup order.
    pub fn symbol_sources(&self) -> Vec<String> {
        self.resolver.source_labels()
    }

    /// Look up the entry point `name`. Triggers code generation.
    pub fn entry_point(&self, name: &str) -> Result<ResolvedEntryPoint<'_>, InvokeError> {
        let function = self
            .module
            .get_function(name)
            .filter(|f| f.count_basic_blocks() > 0)
            .ok_or_else(|| InvokeError::SymbolNotFound(name.to_string()))?;

        let (signature, returns) = classify(function).map_err(|detail| {
            InvokeError::UnsupportedSignature {
                name: name.to_string(),
                detail,
            }
        })?;

        let address = self
            .engine
            .get_function_address(name)
            .map_err(|_| InvokeError::SymbolNotFound(name.to_string()))?;

        tracing::debug!(
            entry = name,
            address = %format!("{:#x}", address),
            ?signature,
            "entry point resolved"
        );
        Ok(ResolvedEntryPoint {
            name: name.to_string(),
            address,
            signature,
            returns,
            _session: PhantomData,
        })
    }

    /// Run `llvm.global_ctors`.
    pub fn run_static_constructors(&self) {
        self.engine.run_static_constructors();
    }

    /// Run `llvm.global_dtors`.
    pub fn run_static_destructors(&self) {
        self.engine.run_static_destructors();
    }
}

fn is_intrinsic(name: &str) -> bool {
    name.starts_with("llvm.")
}

fn bind_externals<'ctx>(
    engine: &ExecutionEngine<'ctx>,
    module: &Module<'ctx>,
    resolver: &SymbolResolver,
) -> Result<Vec<Resolution>, EngineError> {
    let mut resolutions = Vec::new();
    let searched = || resolver.source_labels().join(", ");

    for function in module.get_functions() {
        if function.count_basic_blocks() > 0 {
            continue;
        }
        let name = function.get_name().to_string_lossy().into_owned();
        if is_intrinsic(&name) {
            continue;
        }
        let hit = resolver
            .resolve(&name)
            .ok_or_else(|| EngineError::UnresolvedSymbol {
                name: name.clone(),
                searched: searched(),
            })?;
        engine.add_global_mapping(&function, hit.address);
        tracing::debug!(symbol = %name, source = %hit.source, "bound external function");
        resolutions.push(hit);
    }

    for global in module.get_globals() {
        if !global.is_declaration() {
            continue;
        }
        let name = global.get_name().to_string_lossy().into_owned();
        if is_intrinsic(&name) {
            continue;
        }
        let hit = resolver
            .resolve(&name)
            .ok_or_else(|| EngineError::UnresolvedSymbol {
                name: name.clone(),
                searched: searched(),
            })?;
        engine.add_global_mapping(&global.as_pointer_value(), hit.address);
        tracing::debug!(symbol = %name, source = %hit.source, "bound external global");
        resolutions.push(hit);
    }

    Ok(resolutions)
}

fn classify(function: FunctionValue<'_>) -> Result<(EntrySignature, EntryReturn), String> {
    let fn_type = function.get_type();
    if fn_type.is_var_arg() {
        return Err("variadic entry points are not supported".into());
    }

    let returns = match fn_type.get_return_type() {
        None => EntryReturn::Void,
        Some(t) if t.is_int_type() && t.into_int_type().get_bit_width() == 32 => EntryReturn::Int32,
        Some(t) => {
            return Err(format!(
                "return type must be i32 or void, found {}",
                t.print_to_string()
            ))
        }
    };

    let params: Vec<_> = function.get_param_iter().map(|p| p.get_type()).collect();
    // argc is passed as a C `int`.
    let is_c_int = |t: &BasicTypeEnum<'_>| t.is_int_type() && t.into_int_type().get_bit_width() == 32;
    let signature = match params.as_slice() {
        [] => EntrySignature::NoArgs,
        [argc, argv] if is_c_int(argc) && argv.is_pointer_type() => EntrySignature::Argv,
        [argc, argv, envp] if is_c_int(argc) && argv.is_pointer_type() && envp.is_pointer_type() => {
            EntrySignature::ArgvEnvp
        }
        _ => {
            return Err(format!(
                "expected (), (i32, ptr) or (i32, ptr, ptr) parameters, found {} parameter(s)",
                params.len()
            ))
        }
    };

    Ok((signature, returns))
}
