//! Argument Marshaling
//!
//! Builds the `(argc, argv)` pair a native `main` expects. The owned
//! strings live in [`ArgumentVector`]; the `char *` array only exists for
//! the duration of [`ArgumentVector::with_raw`], so it cannot outlive the
//! call it is built for.
//!
//! argv holds the extra arguments only. A program-name slot is added when
//! one is configured. `argv[argc]` is always NULL.

use std::ffi::{c_char, c_int, CString};

use thiserror::Error;

/// Marshaling errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarshalError {
    #[error("Argument {index} contains an interior NUL byte")]
    InteriorNul { index: usize },

    #[error("Too many arguments: {0}")]
    TooMany(usize),
}

/// NUL-terminated strings plus a NULL-terminated pointer table over them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CStringArray {
    strings: Vec<CString>,
}

impl CStringArray {
    pub fn from_strings<I, S>(items: I) -> Result<Self, MarshalError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        let strings = items
            .into_iter()
            .enumerate()
            .map(|(index, s)| CString::new(s).map_err(|_| MarshalError::InteriorNul { index }))
            .collect::<Result<Vec<_>, _>>()?;
        if c_int::try_from(strings.len()).is_err() {
            return Err(MarshalError::TooMany(strings.len()));
        }
        Ok(Self { strings })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CString> {
        self.strings.iter()
    }

    /// Call `f` with a NULL-terminated pointer table over the strings.
    pub fn with_ptrs<R>(&self, f: impl FnOnce(*const *const c_char) -> R) -> R {
        let ptrs: Vec<*const c_char> = self
            .strings
            .iter()
            .map(|s| s.as_ptr())
            .chain(std::iter::once(std::ptr::null()))
            .collect();
        f(ptrs.as_ptr())
    }
}

/// Arguments for one entry-point call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgumentVector {
    args: CStringArray,
}

impl ArgumentVector {
    /// Marshal `tokens` as argv without a program-name slot.
    pub fn marshal<I, S>(tokens: I) -> Result<Self, MarshalError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        Ok(Self {
            args: CStringArray::from_strings(tokens)?,
        })
    }

    /// Marshal `tokens` with `program_name` as argv[0].
    pub fn with_program_name<I, S>(program_name: &str, tokens: I) -> Result<Self, MarshalError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        let all = std::iter::once(program_name.as_bytes().to_vec())
            .chain(tokens.into_iter().map(Into::into));
        Self::marshal(all)
    }

    pub fn argc(&self) -> c_int {
        // Bounded by `CStringArray::from_strings`.
        self.args.len() as c_int
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Call `f` with `argc` and a pointer to `argv`. The pointers are valid
    /// only inside `f`.
    pub fn with_raw<R>(&self, f: impl FnOnce(c_int, *const *const c_char) -> R) -> R {
        let argc = self.argc();
        self.args.with_ptrs(|argv| f(argc, argv))
    }
}

/// `KEY=VALUE` strings for an `envp` table, taken from this process.
pub fn environment_block() -> CStringArray {
    #[cfg(unix)]
    let entries = {
        use std::os::unix::ffi::OsStrExt;
        std::env::vars_os()
            .map(|(k, v)| {
                let mut entry = k.as_bytes().to_vec();
                entry.push(b'=');
                entry.extend_from_slice(v.as_bytes());
                entry
            })
            .collect::<Vec<_>>()
    };
    #[cfg(not(unix))]
    let entries = std::env::vars_os()
        .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()).into_bytes())
        .collect::<Vec<_>>();

    // The OS never hands out NUL bytes inside variables.
    let entries = entries.into_iter().filter(|e| !e.contains(&0));
    CStringArray::from_strings(entries).unwrap_or_default()
}
