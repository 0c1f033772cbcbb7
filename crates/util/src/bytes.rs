//! Conversion of fuzz values into raw request bytes.
//!
//! Each [`FuzzValue`] variant has its own byte semantics. They differ on
//! purpose and must not be unified:
//!
//! - a float is a *length*: `3.7` becomes three zero bytes;
//! - text is UTF-16, two bytes per code unit;
//! - a bit sequence is packed MSB-first and zero padded;
//! - anything else goes through [`RawValue`]'s generic conversion, which is
//!   the only branch that can fail.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::Span;

use crate::error::EncodingUnsupported;
use crate::logging::component_span;

/// A typed value handed to the byte encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum FuzzValue {
    Float(f64),
    Text(String),
    Bits(Bits),
    Generic(RawValue),
}

impl From<f64> for FuzzValue {
    fn from(value: f64) -> Self {
        FuzzValue::Float(value)
    }
}

impl From<&str> for FuzzValue {
    fn from(value: &str) -> Self {
        FuzzValue::Text(value.to_string())
    }
}

impl From<String> for FuzzValue {
    fn from(value: String) -> Self {
        FuzzValue::Text(value)
    }
}

impl From<Bits> for FuzzValue {
    fn from(value: Bits) -> Self {
        FuzzValue::Bits(value)
    }
}

impl From<RawValue> for FuzzValue {
    fn from(value: RawValue) -> Self {
        FuzzValue::Generic(value)
    }
}

impl From<Vec<u8>> for FuzzValue {
    fn from(value: Vec<u8>) -> Self {
        FuzzValue::Generic(RawValue::Binary(value))
    }
}

/// An ordered sequence of bits that is not necessarily byte aligned.
///
/// Bits are stored MSB-first: bit 0 is the highest bit of the first byte.
/// Unused trailing bits of the last byte are always zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bits {
    bytes: Vec<u8>,
    len: usize,
}

impl Bits {
    pub fn new() -> Self {
        Self::default()
    }

    /// All bits of `bytes`, in order.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            len: bytes.len() * 8,
        }
    }

    pub fn push(&mut self, bit: bool) {
        let offset = self.len % 8;
        if offset == 0 {
            self.bytes.push(0);
        }
        if bit {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 0x80 >> offset;
            }
        }
        self.len += 1;
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        Some(self.bytes[index / 8] & (0x80 >> (index % 8)) != 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Packs the bits into bytes, zero padding the final byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

impl FromIterator<bool> for Bits {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut bits = Bits::new();
        for bit in iter {
            bits.push(bit);
        }
        bits
    }
}

/// A loosely typed value that may or may not have a byte representation.
///
/// Mirrors the JSON data model plus raw binary. Converting `Binary` into a
/// [`Value`] yields an array of numbers, so `Value -> RawValue -> Value` does
/// not round-trip the binary/array distinction.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<RawValue>),
    Object(BTreeMap<String, RawValue>),
    Binary(Vec<u8>),
}

impl RawValue {
    fn kind(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Bool(_) => "bool",
            RawValue::Number(_) => "number",
            RawValue::String(_) => "string",
            RawValue::Array(_) => "array",
            RawValue::Object(_) => "object",
            RawValue::Binary(_) => "binary",
        }
    }
}

impl From<&Value> for RawValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(*b),
            Value::Number(n) => RawValue::Number(n.clone()),
            Value::String(s) => RawValue::String(s.clone()),
            Value::Array(arr) => RawValue::Array(arr.iter().map(RawValue::from).collect()),
            Value::Object(obj) => RawValue::Object(
                obj.iter()
                    .map(|(key, val)| (key.clone(), RawValue::from(val)))
                    .collect(),
            ),
        }
    }
}

impl From<RawValue> for Value {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Null => Value::Null,
            RawValue::Bool(b) => Value::Bool(b),
            RawValue::Number(n) => Value::Number(n),
            RawValue::String(s) => Value::String(s),
            RawValue::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            RawValue::Object(obj) => {
                let mut map = Map::new();
                for (key, val) in obj {
                    map.insert(key, Value::from(val));
                }
                Value::Object(map)
            }
            RawValue::Binary(bytes) => {
                Value::Array(bytes.into_iter().map(|b| Value::Number(b.into())).collect())
            }
        }
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(bytes: Vec<u8>) -> Self {
        RawValue::Binary(bytes)
    }
}

impl From<&[u8]> for RawValue {
    fn from(bytes: &[u8]) -> Self {
        RawValue::Binary(bytes.to_vec())
    }
}

/// Byte order of encoded UTF-16 code units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Utf16Order {
    #[default]
    Little,
    Big,
}

/// Options for [`ValueEncoder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Byte order for text. Default is little-endian.
    pub utf16_order: Utf16Order,
    /// Prepend a byte-order mark to encoded text. Default is `false`.
    pub utf16_bom: bool,
    /// Largest zero-byte run a float may request. Default is no limit.
    pub max_float_len: Option<usize>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            utf16_order: Utf16Order::Little,
            utf16_bom: false,
            max_float_len: None,
        }
    }
}

/// Converts a [`FuzzValue`] to bytes with default [`EncodeOptions`].
///
/// # Errors
///
/// Returns [`EncodingUnsupported`] for a float that is negative or not
/// finite, and for a generic value with no byte conversion.
///
/// # Examples
///
/// ```
/// use apifuzzer_util::{transform_data_to_bytes, FuzzValue};
///
/// assert_eq!(transform_data_to_bytes(&FuzzValue::Float(3.7)).unwrap(), vec![0, 0, 0]);
/// assert_eq!(transform_data_to_bytes(&"hi".into()).unwrap(), vec![b'h', 0, b'i', 0]);
/// ```
pub fn transform_data_to_bytes(value: &FuzzValue) -> Result<Vec<u8>, EncodingUnsupported> {
    encode_value(&EncodeOptions::default(), value)
}

/// Byte encoder carrying its options and logging span.
#[derive(Debug, Clone)]
pub struct ValueEncoder {
    options: EncodeOptions,
    span: Span,
}

impl Default for ValueEncoder {
    fn default() -> Self {
        Self::new(EncodeOptions::default())
    }
}

impl ValueEncoder {
    pub fn new(options: EncodeOptions) -> Self {
        Self::with_span(options, component_span("ValueEncoder"))
    }

    pub fn with_span(options: EncodeOptions, span: Span) -> Self {
        Self { options, span }
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    pub fn encode(&self, value: &FuzzValue) -> Result<Vec<u8>, EncodingUnsupported> {
        let _entered = self.span.enter();
        let result = encode_value(&self.options, value);
        if let Err(err) = &result {
            tracing::debug!(kind = err.kind, "value has no byte representation: {}", err.reason);
        }
        result
    }
}

fn encode_value(options: &EncodeOptions, value: &FuzzValue) -> Result<Vec<u8>, EncodingUnsupported> {
    match value {
        FuzzValue::Float(f) => encode_float(*f, options.max_float_len),
        FuzzValue::Text(s) => Ok(encode_utf16(s, options)),
        FuzzValue::Bits(bits) => Ok(bits.to_bytes()),
        FuzzValue::Generic(raw) => encode_generic(raw),
    }
}

fn encode_float(f: f64, max_len: Option<usize>) -> Result<Vec<u8>, EncodingUnsupported> {
    if !f.is_finite() {
        return Err(EncodingUnsupported::new("float", format!("{f} is not finite")));
    }
    let count = f.trunc();
    if count < 0.0 {
        return Err(EncodingUnsupported::new("float", format!("negative count {count}")));
    }
    if count > isize::MAX as f64 {
        return Err(EncodingUnsupported::new("float", format!("count {count} is not addressable")));
    }
    if let Some(max_len) = max_len {
        if count > max_len as f64 {
            return Err(EncodingUnsupported::new(
                "float",
                format!("count {count} exceeds limit {max_len}"),
            ));
        }
    }
    Ok(vec![0u8; count as usize])
}

fn encode_utf16(s: &str, options: &EncodeOptions) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2 + 2);
    let unit_bytes = |unit: u16| match options.utf16_order {
        Utf16Order::Little => unit.to_le_bytes(),
        Utf16Order::Big => unit.to_be_bytes(),
    };
    if options.utf16_bom {
        out.extend_from_slice(&unit_bytes(0xFEFF));
    }
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit_bytes(unit));
    }
    out
}

fn encode_generic(raw: &RawValue) -> Result<Vec<u8>, EncodingUnsupported> {
    match raw {
        RawValue::Binary(bytes) => Ok(bytes.clone()),
        RawValue::Number(n) => {
            let magnitude = if let Some(u) = n.as_u64() {
                u
            } else if let Some(i) = n.as_i64() {
                i.unsigned_abs()
            } else {
                return Err(EncodingUnsupported::new("number", format!("{n} is not an integer")));
            };
            Ok(magnitude_bytes(magnitude))
        }
        RawValue::Array(items) => items
            .iter()
            .map(|item| match item {
                RawValue::Number(n) => n
                    .as_u64()
                    .and_then(|u| u8::try_from(u).ok())
                    .ok_or_else(|| {
                        EncodingUnsupported::new("array", format!("element {n} is not in range(0, 256)"))
                    }),
                other => Err(EncodingUnsupported::new(
                    "array",
                    format!("element of type {} is not an integer", other.kind()),
                )),
            })
            .collect(),
        other => Err(EncodingUnsupported::new(
            other.kind(),
            "no byte representation",
        )),
    }
}

/// Minimal big-endian bytes of `n`; zero has no significant bytes.
fn magnitude_bytes(n: u64) -> Vec<u8> {
    let bytes = n.to_be_bytes();
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}
