//! Child process output decoding.
//!
//! The agent prints UTF-8, but conda and Python on Chinese Windows consoles
//! write GBK. Output is tried as UTF-8 first and decoded as GBK otherwise.

use encoding_rs::GBK;
use tracing::trace;

/// Decodes child output as UTF-8, falling back to GBK, and trims it.
///
/// Bytes that are valid in neither encoding become `U+FFFD`.
#[must_use]
pub fn decode_output(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.trim().to_string();
    }

    let (text, had_errors) = GBK.decode_without_bom_handling(bytes);
    if had_errors {
        trace!(len = bytes.len(), "Output is neither UTF-8 nor GBK");
    }
    text.trim().to_string()
}
