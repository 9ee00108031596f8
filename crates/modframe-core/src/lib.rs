//! Modframe core library for configurable binary-frame decoding.
//!
//! This crate implements the decoding engine used by the CLI: a declarative
//! field specification is validated once into an immutable [`FrameLayout`],
//! and [`decode`] turns raw Modbus-style response frames into typed, named
//! field values plus diagnostic tags. Decoding is byte-oriented and
//! side-effect free; all I/O is isolated in the CLI crate. Byte-access
//! conventions are captured in a reader so the frame walk stays minimal.
//!
//! Invariants:
//! - A layout is validated at construction and never mutated afterwards, so
//!   concurrent decodes may share it without synchronization.
//! - A decode either yields the full field mapping or an error; partial
//!   results are never emitted.
//! - Decoding is idempotent: identical layout and bytes yield identical
//!   output or the identical error.
//!
//! Version française (résumé):
//! Cette crate fournit le cœur de décodage : une configuration déclarative
//! est validée en un [`FrameLayout`] immuable, puis [`decode`] extrait les
//! champs typés et les étiquettes de diagnostic d'une trame binaire. Les E/S
//! restent dans la CLI; le décodage est pur, total ou en échec, jamais
//! partiel.
//!
//! # Examples
//! ```
//! use modframe_core::{FrameLayout, decode};
//!
//! let layout = FrameLayout::from_json(
//!     r#"{
//!         "fields": [
//!             { "name": "temp", "address": 0, "raw_type": "uint16", "scale": 0.1 }
//!         ]
//!     }"#,
//! )?;
//!
//! // device 0x01, function 0x03, length 0x0002, data 0x00C8, Modbus CRC16.
//! let frame = [0x01, 0x03, 0x00, 0x02, 0x00, 0xC8, 0x9C, 0xE5];
//! let decoded = decode(&layout, &frame)?;
//! assert_eq!(decoded.tags.device_address, 1);
//! assert_eq!(decoded.tags.payload_length, 2);
//! assert!(decoded.tags.checksum_passed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

mod checksum;
mod decode;
mod layout;
mod transform;

pub use checksum::ChecksumAlgorithm;
pub use decode::{DecodeError, decode};
pub use layout::{
    ChecksumSpec, ConfigError, Endianness, FieldSpec, FrameLayout, LayoutConfig, LengthField,
    RawType,
};
pub use transform::{EvalError, Evaluate, ExprParseError, ExprProgram, Transform};

/// A decoded output value.
///
/// Raw integer fields are widened to 64-bit floats before any transform, so
/// the common case is [`Value::Float`]. The other variants exist for
/// expression evaluators that remap a raw numeric value to another type.
///
/// # Examples
/// ```
/// use modframe_core::Value;
///
/// let v = Value::Float(20.0);
/// assert_eq!(serde_json::to_string(&v)?, "20.0");
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean remap result.
    Bool(bool),
    /// Integer remap result.
    Int(i64),
    /// Numeric value (the default for all raw types).
    Float(f64),
    /// Textual remap result.
    Text(String),
}

/// A field value together with its optional unit label.
///
/// # Examples
/// ```
/// use modframe_core::{DecodedValue, Value};
///
/// let v = DecodedValue {
///     value: Value::Float(20.0),
///     unit: Some("degC".to_string()),
/// };
/// assert_eq!(v.unit.as_deref(), Some("degC"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedValue {
    /// The decoded (possibly transformed) value.
    pub value: Value,
    /// Unit label taken verbatim from the field spec, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Diagnostic tags attached to every successful decode.
///
/// # Examples
/// ```
/// use modframe_core::FrameTags;
///
/// let tags = FrameTags {
///     device_address: 1,
///     function_code: 3,
///     payload_length: 2,
///     checksum_passed: true,
/// };
/// assert_eq!(tags.function_code, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTags {
    /// First frame byte, read verbatim.
    pub device_address: u8,
    /// Second frame byte, read verbatim.
    pub function_code: u8,
    /// Value of the length field; informational, never bounds extraction.
    pub payload_length: u64,
    /// Whether checksum verification passed (true when disabled).
    pub checksum_passed: bool,
}

/// The result of decoding one frame: named field values plus tags.
///
/// Field names map to values in deterministic (sorted) order. Constructed
/// fresh per input frame.
///
/// # Examples
/// ```
/// use modframe_core::{DecodedFrame, FrameTags};
///
/// let decoded = DecodedFrame {
///     fields: Default::default(),
///     tags: FrameTags {
///         device_address: 1,
///         function_code: 3,
///         payload_length: 0,
///         checksum_passed: true,
///     },
/// };
/// assert!(decoded.fields.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedFrame {
    /// Field name to decoded value, in deterministic order.
    pub fields: BTreeMap<String, DecodedValue>,
    /// Diagnostic tags for the caller to attach as message metadata.
    pub tags: FrameTags,
}
