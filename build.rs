//! Build script for the embedded-blob variant
//!
//! Writes `$OUT_DIR/embedded_blob.rs`, which `src/source/embedded.rs` includes.
//! The blob is produced beforehand with `irvana-seal`:
//!
//! ```text
//! irvana-seal final.ll -o final.blob --key "s3cret"
//! IRVANA_EMBED_BLOB=final.blob IRVANA_EMBED_KEY="s3cret" cargo build --release
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=IRVANA_EMBED_BLOB");
    println!("cargo:rerun-if-env-changed=IRVANA_EMBED_KEY");
    println!("cargo:rerun-if-env-changed=IRVANA_EMBED_KEY_FILE");

    let ciphertext = match env::var_os("IRVANA_EMBED_BLOB") {
        Some(path) => {
            let path = absolute(Path::new(&path));
            println!("cargo:rerun-if-changed={}", path.display());
            format!("include_bytes!({:?})", path.display().to_string())
        }
        None => "&[]".to_string(),
    };

    let key = if let Some(path) = env::var_os("IRVANA_EMBED_KEY_FILE") {
        let path = absolute(Path::new(&path));
        println!("cargo:rerun-if-changed={}", path.display());
        format!("include_bytes!({:?})", path.display().to_string())
    } else if let Ok(text) = env::var("IRVANA_EMBED_KEY") {
        format!("&{:?}", text.into_bytes())
    } else {
        "&[]".to_string()
    };

    let generated = format!(
        "// @generated by build.rs\n\
         /// Sealed IR blob (ciphertext followed by the GCM tag).\n\
         pub const CIPHERTEXT: &[u8] = {};\n\
         /// Key material the blob was sealed with.\n\
         pub const KEY: &[u8] = {};\n",
        ciphertext, key
    );

    fs::write(out_dir.join("embedded_blob.rs"), generated)
        .expect("Failed to write embedded_blob.rs");
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|e| {
        panic!("Embedded blob input {} is unreadable: {}", path.display(), e)
    })
}
