//! apifuzzer-util - helper functions for the API fuzzer
//!
//! Value-to-bytes encoding for fuzz payloads, best-effort base64, JSON payload
//! coercion and lookup, secure random integers and logger setup.
//!
//! # Example
//!
//! ```
//! use apifuzzer_util::{get_item, json_data, transform_data_to_bytes, FuzzValue};
//! use serde_json::json;
//!
//! let doc = json_data(r#"{"info": {"title": "pets"}}"#).unwrap();
//! assert_eq!(*get_item(&doc, &["info", "title"]), json!("pets"));
//!
//! let payload = transform_data_to_bytes(&FuzzValue::Float(2.5)).unwrap();
//! assert_eq!(payload, vec![0, 0]);
//! ```

pub mod b64;
pub mod bytes;
pub mod error;
pub mod json;
pub mod logging;
pub mod random;
pub mod strings;

// Re-exports for convenience
pub use b64::{b64encode, try_b64encode};
pub use bytes::{transform_data_to_bytes, Bits, EncodeOptions, FuzzValue, RawValue, Utf16Order, ValueEncoder};
pub use error::{EncodingUnsupported, NotJsonContainer, UtilError};
pub use json::{get_item, json_data, pretty_print, JsonCoercer, JsonInput, Printable, DEFAULT_PRINT_LIMIT};
pub use logging::{component_span, init, subscriber, FuzzerFormatter, LogLevel, LoggerConfig};
pub use random::{checked_randint, secure_randint};
pub use strings::container_name_to_param;
