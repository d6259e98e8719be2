//! Local file acquisition.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::AcquisitionError;

pub(super) fn read_ir_file(path: &Path) -> Result<Vec<u8>, AcquisitionError> {
    match fs::read(path) {
        Ok(bytes) => {
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "read IR file");
            Ok(bytes)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(AcquisitionError::NotFound(path.to_path_buf()))
        }
        Err(source) => Err(AcquisitionError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
