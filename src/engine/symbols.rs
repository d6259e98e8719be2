//! External Symbol Resolution
//!
//! Binds every name a module declares but does not define to an address.
//!
//! ```text
//! declare i64 @strlen(ptr)
//!       │
//!       ▼
//! SymbolResolver ──> [SharedLibrary..., HostProcess]   (library-first)
//!                ──> [HostProcess, SharedLibrary...]   (host-first)
//!       │
//!       ▼
//! first source defining the name wins
//! ```

use std::ffi::CString;
use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use serde::{Deserialize, Serialize};

use super::EngineError;

/// Order in which sources are consulted when a name is defined in more
/// than one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolPrecedence {
    /// Loaded libraries (in load order), then the host process
    #[default]
    LibraryFirst,
    /// The host process, then loaded libraries
    HostFirst,
}

impl SymbolPrecedence {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolPrecedence::LibraryFirst => "library-first",
            SymbolPrecedence::HostFirst => "host-first",
        }
    }
}

/// Something that can map a symbol name to an address.
pub trait SymbolSource {
    /// Human-readable origin used in logs and resolution records
    fn label(&self) -> String;

    /// Address of `name`, or `None` when this source does not export it
    fn address_of(&self, name: &str) -> Option<usize>;
}

fn lookup(library: &Library, name: &str) -> Option<usize> {
    let c_name = CString::new(name).ok()?;
    // Safety: the symbol is only read as an address; its type is checked
    // by the IR that declared it.
    let symbol = unsafe { library.get::<*const ()>(c_name.as_bytes_with_nul()).ok()? };
    let addr = *symbol as usize;
    (addr != 0).then_some(addr)
}

/// A shared library loaded with process-wide symbol visibility.
pub struct SharedLibrary {
    path: PathBuf,
    library: Library,
}

impl SharedLibrary {
    /// Load the library at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();
        let library = open_global(&path).map_err(|e| EngineError::LibraryLoadFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), "loaded shared library");
        Ok(Self { path, library })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn open_global(path: &Path) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};
    // Safety: loading runs the library's initializers; the caller chose it.
    unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL).map(Library::from) }
}

#[cfg(windows)]
fn open_global(path: &Path) -> Result<Library, libloading::Error> {
    // Safety: loading runs the library's initializers; the caller chose it.
    unsafe { Library::new(path) }
}

impl SymbolSource for SharedLibrary {
    fn label(&self) -> String {
        self.path().display().to_string()
    }

    fn address_of(&self, name: &str) -> Option<usize> {
        lookup(&self.library, name)
    }
}

impl fmt::Debug for SharedLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLibrary").field("path", &self.path).finish()
    }
}

/// The running executable and everything already in its global scope.
pub struct HostProcess {
    library: Library,
}

impl HostProcess {
    #[cfg(unix)]
    pub fn open() -> Result<Self, EngineError> {
        Ok(Self {
            library: libloading::os::unix::Library::this().into(),
        })
    }

    #[cfg(windows)]
    pub fn open() -> Result<Self, EngineError> {
        let library = libloading::os::windows::Library::this()
            .map_err(|e| EngineError::SessionCreation(format!("host symbols unavailable: {}", e)))?;
        Ok(Self {
            library: library.into(),
        })
    }
}

impl SymbolSource for HostProcess {
    fn label(&self) -> String {
        "<host>".to_string()
    }

    fn address_of(&self, name: &str) -> Option<usize> {
        lookup(&self.library, name)
    }
}

/// Where one external name was bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub name: String,
    pub address: usize,
    pub source: String,
}

/// Ordered list of symbol sources.
pub struct SymbolResolver {
    sources: Vec<Box<dyn SymbolSource>>,
}

impl SymbolResolver {
    /// Order `libraries` and `host` according to `precedence`.
    pub fn new(
        libraries: Vec<Box<dyn SymbolSource>>,
        host: Option<Box<dyn SymbolSource>>,
        precedence: SymbolPrecedence,
    ) -> Self {
        let mut sources = Vec::with_capacity(libraries.len() + 1);
        match precedence {
            SymbolPrecedence::LibraryFirst => {
                sources.extend(libraries);
                sources.extend(host);
            }
            SymbolPrecedence::HostFirst => {
                sources.extend(host);
                sources.extend(libraries);
            }
        }
        Self { sources }
    }

    pub fn resolve(&self, name: &str) -> Option<Resolution> {
        self.sources.iter().find_map(|source| {
            source.address_of(name).map(|address| Resolution {
                name: name.to_string(),
                address,
                source: source.label(),
            })
        })
    }

    pub fn source_labels(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.label()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeSource {
        label: &'static str,
        symbols: HashMap<&'static str, usize>,
    }

    impl FakeSource {
        fn boxed(label: &'static str, symbols: &[(&'static str, usize)]) -> Box<dyn SymbolSource> {
            Box::new(Self {
                label,
                symbols: symbols.iter().copied().collect(),
            })
        }
    }

    impl SymbolSource for FakeSource {
        fn label(&self) -> String {
            self.label.to_string()
        }

        fn address_of(&self, name: &str) -> Option<usize> {
            self.symbols.get(name).copied()
        }
    }

    fn resolver(precedence: SymbolPrecedence) -> SymbolResolver {
        SymbolResolver::new(
            vec![
                FakeSource::boxed("liba", &[("shared", 0x1000), ("only_a", 0x1100)]),
                FakeSource::boxed("libb", &[("shared", 0x2000), ("only_b", 0x2200)]),
            ],
            Some(FakeSource::boxed("<host>", &[("shared", 0x3000), ("only_host", 0x3300)])),
            precedence,
        )
    }

    #[test]
    fn test_library_first_order() {
        let r = resolver(SymbolPrecedence::LibraryFirst);
        assert_eq!(r.source_labels(), vec!["liba", "libb", "<host>"]);
        let hit = r.resolve("shared").unwrap();
        assert_eq!((hit.address, hit.source.as_str()), (0x1000, "liba"));
    }

    #[test]
    fn test_host_first_order() {
        let r = resolver(SymbolPrecedence::HostFirst);
        assert_eq!(r.source_labels(), vec!["<host>", "liba", "libb"]);
        let hit = r.resolve("shared").unwrap();
        assert_eq!((hit.address, hit.source.as_str()), (0x3000, "<host>"));
    }

    #[test]
    fn test_unique_names_resolve_anywhere() {
        for precedence in [SymbolPrecedence::LibraryFirst, SymbolPrecedence::HostFirst] {
            let r = resolver(precedence);
            assert_eq!(r.resolve("only_b").unwrap().source, "libb");
            assert_eq!(r.resolve("only_host").unwrap().source, "<host>");
            assert!(r.resolve("absent").is_none());
        }
    }

    #[test]
    fn test_without_host() {
        let r = SymbolResolver::new(Vec::new(), None, SymbolPrecedence::LibraryFirst);
        assert!(r.is_empty());
        assert!(r.resolve("strlen").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_host_process_exports_libc() {
        let host = HostProcess::open().unwrap();
        assert!(host.address_of("strlen").is_some());
        assert!(host.address_of("irvana_no_such_symbol_xyz").is_none());
    }

    #[test]
    fn test_missing_library_fails() {
        match SharedLibrary::load("/nonexistent/libirvana_missing.so") {
            Err(EngineError::LibraryLoadFailed { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/libirvana_missing.so"))
            }
            other => panic!("Expected LibraryLoadFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_names() {
        assert_eq!(SymbolPrecedence::default(), SymbolPrecedence::LibraryFirst);
        assert_eq!(SymbolPrecedence::HostFirst.as_str(), "host-first");
    }
}
