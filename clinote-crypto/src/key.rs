//! Raw key buffers.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Unwrapped key bytes on their way into a [`CryptoProvider`](crate::CryptoProvider).
///
/// The buffer is wiped when dropped. It is not `Clone`, so the only copy of
/// the material is the one handed to `import_key`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RawKeyBytes {
    bytes: Vec<u8>,
}

impl RawKeyBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Borrows the raw material. Only provider implementations should call this.
    pub fn expose_secret(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for RawKeyBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl std::fmt::Debug for RawKeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawKeyBytes([REDACTED; {}])", self.bytes.len())
    }
}
