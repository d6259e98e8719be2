//! Blob Cipher
//!
//! Seals and opens the IR blob carried by the embedded variant.
//! Uses ring: SHA-256 for key derivation, AES-256-GCM for the cipher.
//!
//! # Layout
//!
//! ```text
//! key   = SHA-256(material)
//! nonce = SHA-256("irvana.blob.nonce" || material)[..12]
//! blob  = AES-256-GCM(key, nonce, plaintext) || tag(16)
//! ```
//!
//! Only the key material is needed to open a blob; no IV travels with it.
//! A wrong key or a single flipped bit fails authentication.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::digest;
use thiserror::Error;

/// GCM tag length appended to every blob.
pub const TAG_LEN: usize = 16;

const NONCE_LABEL: &[u8] = b"irvana.blob.nonce";
const BLOB_AAD: &[u8] = b"irvana-blob-v1";

/// Decryption errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("Key material is empty")]
    EmptyKey,

    #[error("Ciphertext is empty")]
    EmptyCiphertext,

    #[error("Ciphertext is {0} bytes, shorter than the 16-byte tag")]
    Truncated(usize),

    #[error("Key rejected by the cipher")]
    KeyRejected,

    #[error("Authentication failed: wrong key or tampered ciphertext")]
    Rejected,

    #[error("Decryption produced no plaintext")]
    EmptyPlaintext,
}

/// Sealing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SealError {
    #[error("Key material is empty")]
    EmptyKey,

    #[error("Nothing to seal: plaintext is empty")]
    EmptyPlaintext,

    #[error("Encryption failed")]
    Failed,
}

/// AES key and nonce derived from one piece of key material.
struct BlobKey {
    key: LessSafeKey,
    nonce: [u8; NONCE_LEN],
}

impl BlobKey {
    /// Returns `None` when ring rejects the derived key.
    fn derive(material: &[u8]) -> Option<Self> {
        let key_bytes = digest::digest(&digest::SHA256, material);
        let unbound = UnboundKey::new(&AES_256_GCM, key_bytes.as_ref()).ok()?;

        let mut ctx = digest::Context::new(&digest::SHA256);
        ctx.update(NONCE_LABEL);
        ctx.update(material);
        let nonce_digest = ctx.finish();
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&nonce_digest.as_ref()[..NONCE_LEN]);

        Some(Self {
            key: LessSafeKey::new(unbound),
            nonce,
        })
    }

    fn nonce(&self) -> Nonce {
        Nonce::assume_unique_for_key(self.nonce)
    }
}

/// Open a sealed blob.
///
/// Never returns partial or unauthenticated plaintext.
pub fn decrypt(ciphertext: &[u8], material: &[u8]) -> Result<Vec<u8>, DecryptionError> {
    if material.is_empty() {
        return Err(DecryptionError::EmptyKey);
    }
    if ciphertext.is_empty() {
        return Err(DecryptionError::EmptyCiphertext);
    }
    if ciphertext.len() < TAG_LEN {
        return Err(DecryptionError::Truncated(ciphertext.len()));
    }

    let key = BlobKey::derive(material).ok_or(DecryptionError::KeyRejected)?;
    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .key
        .open_in_place(key.nonce(), Aad::from(BLOB_AAD), &mut in_out)
        .map_err(|_| DecryptionError::Rejected)?;

    if plaintext.is_empty() {
        return Err(DecryptionError::EmptyPlaintext);
    }
    let len = plaintext.len();
    in_out.truncate(len);

    tracing::debug!(ciphertext = ciphertext.len(), plaintext = len, "blob decrypted");
    Ok(in_out)
}

/// Seal plaintext IR so [`decrypt`] can open it with the same material.
pub fn seal(plaintext: &[u8], material: &[u8]) -> Result<Vec<u8>, SealError> {
    if material.is_empty() {
        return Err(SealError::EmptyKey);
    }
    if plaintext.is_empty() {
        return Err(SealError::EmptyPlaintext);
    }

    let key = BlobKey::derive(material).ok_or(SealError::Failed)?;
    let mut in_out = plaintext.to_vec();
    key.key
        .seal_in_place_append_tag(key.nonce(), Aad::from(BLOB_AAD), &mut in_out)
        .map_err(|_| SealError::Failed)?;
    Ok(in_out)
}
