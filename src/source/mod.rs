//! Source Providers
//!
//! Produces the IR bytes for one run from exactly one acquisition strategy:
//!
//! ```text
//! SourceDescriptor
//!       │
//!       ├── LocalFile        ──> read the file
//!       ├── EncryptedBlob    ──> ciphertext + key (decrypted afterwards)
//!       └── RemoteResource   ──> HTTP GET host/path
//!       │
//!       ▼
//!   Payload ──into_ir_bytes()──> RawIrBytes
//! ```

pub mod embedded;
mod file;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::crypto::{self, DecryptionError};
use crate::fetch::{self, FetchError};

/// Acquisition errors.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("IR file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read IR file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Embedded IR blob is empty")]
    EmptyBlob,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Where the IR for one run comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// IR file on the local filesystem
    LocalFile { path: PathBuf },
    /// Ciphertext and key material compiled into the binary
    EncryptedBlob { ciphertext: Vec<u8>, key: Vec<u8> },
    /// IR served over plain HTTP
    RemoteResource { host: String, path: String },
}

impl SourceDescriptor {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        SourceDescriptor::LocalFile { path: path.into() }
    }

    pub fn remote(host: impl Into<String>, path: impl Into<String>) -> Self {
        SourceDescriptor::RemoteResource {
            host: host.into(),
            path: path.into(),
        }
    }

    pub fn encrypted(ciphertext: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> Self {
        SourceDescriptor::EncryptedBlob {
            ciphertext: ciphertext.into(),
            key: key.into(),
        }
    }

    /// The blob baked in by the build script.
    pub fn embedded() -> Self {
        Self::encrypted(embedded::CIPHERTEXT, embedded::KEY)
    }

    /// Short strategy name for logs.
    pub fn strategy(&self) -> &'static str {
        match self {
            SourceDescriptor::LocalFile { .. } => "local-file",
            SourceDescriptor::EncryptedBlob { .. } => "encrypted-blob",
            SourceDescriptor::RemoteResource { .. } => "remote",
        }
    }

    /// Run the acquisition path for this descriptor.
    pub fn acquire(&self) -> Result<Payload, AcquisitionError> {
        match self {
            SourceDescriptor::LocalFile { path } => {
                let bytes = file::read_ir_file(path)?;
                Ok(Payload::Plain(RawIrBytes::new(
                    bytes,
                    path.display().to_string(),
                )))
            }
            SourceDescriptor::EncryptedBlob { ciphertext, key } => {
                if ciphertext.is_empty() {
                    return Err(AcquisitionError::EmptyBlob);
                }
                Ok(Payload::Sealed {
                    ciphertext: ciphertext.clone(),
                    key: key.clone(),
                })
            }
            SourceDescriptor::RemoteResource { host, path } => {
                let bytes = fetch::fetch(host, path)?;
                Ok(Payload::Plain(RawIrBytes::new(
                    bytes,
                    fetch::request_url(host, path),
                )))
            }
        }
    }
}

// Key material stays out of logs and panics.
impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::LocalFile { path } => {
                f.debug_struct("LocalFile").field("path", path).finish()
            }
            SourceDescriptor::EncryptedBlob { ciphertext, key } => f
                .debug_struct("EncryptedBlob")
                .field("ciphertext_len", &ciphertext.len())
                .field("key_len", &key.len())
                .finish(),
            SourceDescriptor::RemoteResource { host, path } => f
                .debug_struct("RemoteResource")
                .field("host", host)
                .field("path", path)
                .finish(),
        }
    }
}

/// What a provider hands back before decryption.
pub enum Payload {
    Plain(RawIrBytes),
    Sealed { ciphertext: Vec<u8>, key: Vec<u8> },
}

impl Payload {
    /// Decrypt if needed and yield the IR bytes.
    pub fn into_ir_bytes(self) -> Result<RawIrBytes, DecryptionError> {
        match self {
            Payload::Plain(bytes) => Ok(bytes),
            Payload::Sealed { ciphertext, key } => {
                let plaintext = crypto::decrypt(&ciphertext, &key)?;
                Ok(RawIrBytes::new(plaintext, "<embedded>"))
            }
        }
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self, Payload::Sealed { .. })
    }
}

/// Owned IR bytes plus the buffer name used in diagnostics.
///
/// Consumed by value by [`crate::loader::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIrBytes {
    bytes: Vec<u8>,
    name: String,
}

impl RawIrBytes {
    pub fn new(bytes: Vec<u8>, name: impl Into<String>) -> Self {
        Self {
            bytes,
            name: name.into(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
