//! Build-time embedded blob.
//!
//! `build.rs` writes `CIPHERTEXT` and `KEY` from `IRVANA_EMBED_BLOB` and
//! `IRVANA_EMBED_KEY` / `IRVANA_EMBED_KEY_FILE`. Both are empty when the
//! variables are unset.

include!(concat!(env!("OUT_DIR"), "/embedded_blob.rs"));

/// True when the build baked a blob into this binary.
pub fn is_present() -> bool {
    !CIPHERTEXT.is_empty()
}
