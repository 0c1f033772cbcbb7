//! Best-effort base64 encoding.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::bytes::RawValue;

/// Encodes bytes as standard, padded base64 text (as ASCII bytes).
///
/// # Example
///
/// ```
/// use apifuzzer_util::b64encode;
///
/// assert_eq!(b64encode(b"hello world"), b"aGVsbG8gd29ybGQ=".to_vec());
/// ```
pub fn b64encode(data: &[u8]) -> Vec<u8> {
    STANDARD.encode(data).into_bytes()
}

/// Base64 encodes binary data, passing anything else through unchanged.
///
/// Callers always get a value back: `Binary` payloads come back encoded,
/// every other variant is returned as given.
///
/// # Example
///
/// ```
/// use apifuzzer_util::{try_b64encode, RawValue};
///
/// assert_eq!(try_b64encode(RawValue::Binary(b"foo".to_vec())), RawValue::Binary(b"Zm9v".to_vec()));
/// assert_eq!(try_b64encode(RawValue::Null), RawValue::Null);
/// ```
pub fn try_b64encode(data: RawValue) -> RawValue {
    match data {
        RawValue::Binary(bytes) => RawValue::Binary(b64encode(&bytes)),
        other => {
            tracing::debug!("base64 skipped for non-binary value");
            other
        }
    }
}
