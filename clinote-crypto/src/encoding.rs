//! Base64 helpers.
//!
//! Binary payload fields travel as standard base64. Key-management services
//! answer in base64url, usually without padding, so their output goes
//! through [`canonicalize_base64url`] before decoding.

use crate::error::{CryptoError, CryptoResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use zeroize::Zeroize;

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(encoded: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::Encoding(format!("invalid base64: {e}")))
}

/// Rewrites a base64url string into padded standard base64.
///
/// `-` becomes `+`, `_` becomes `/`, and `=` padding is restored to a
/// multiple of four. Input that is already standard base64 passes through.
pub fn canonicalize_base64url(encoded: &str) -> String {
    let mut out: String = encoded
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    match out.len() % 4 {
        2 => out.push_str("=="),
        3 => out.push('='),
        // 0 needs nothing; 1 is unrecoverable and left for the decoder to reject
        _ => {}
    }
    out
}

/// Decodes base64url (padded or not) or standard base64.
///
/// The canonicalized copy of the input is wiped before returning, so this
/// is safe to use on encoded key material.
pub fn decode_base64url_lenient(encoded: &str) -> CryptoResult<Vec<u8>> {
    let mut canonical = canonicalize_base64url(encoded);
    let decoded = decode_base64(&canonical);
    canonical.zeroize();
    decoded
}
