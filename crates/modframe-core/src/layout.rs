//! Frame layout model: raw configuration in, validated schema out.
//!
//! The raw [`LayoutConfig`] mirrors the JSON configuration surface with
//! documented defaults. [`FrameLayout::build`] validates it once at startup
//! into the immutable schema the decoder walks; configuration mistakes fail
//! fast here and never per-message.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::checksum::ChecksumAlgorithm;
use crate::transform::{ExprParseError, ExprProgram, Transform};

/// Construction-time configuration error. Fatal to starting a processor.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bytes_per_unit must be at least 1")]
    InvalidBytesPerUnit,
    #[error("unsupported length field width {width}: expected 1, 2, 4 or 8")]
    UnsupportedLengthWidth { width: usize },
    #[error("unknown checksum algorithm `{name}`")]
    UnknownAlgorithm { name: String },
    #[error("layout defines no fields")]
    NoFields,
    #[error("field #{index}: missing required key `{key}`")]
    MissingFieldKey { index: usize, key: &'static str },
    #[error("field `{name}`: duplicate name")]
    DuplicateField { name: String },
    #[error("field `{name}`: unknown raw type `{raw_type}`")]
    UnknownRawType { name: String, raw_type: String },
    #[error("field `{name}`: invalid expression: {source}")]
    InvalidExpression {
        name: String,
        source: ExprParseError,
    },
}

/// Byte order of a multi-byte read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    fn from_big(big_endian: bool) -> Endianness {
        if big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}

/// Raw numeric encoding of a field before any transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl RawType {
    /// Encoded width in bytes.
    pub fn width(&self) -> usize {
        match self {
            RawType::Int8 | RawType::UInt8 => 1,
            RawType::Int16 | RawType::UInt16 => 2,
            RawType::Int32 | RawType::UInt32 | RawType::Float32 => 4,
            RawType::Int64 | RawType::UInt64 | RawType::Float64 => 8,
        }
    }
}

impl FromStr for RawType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int8" => Ok(RawType::Int8),
            "uint8" => Ok(RawType::UInt8),
            "int16" => Ok(RawType::Int16),
            "uint16" => Ok(RawType::UInt16),
            "int32" => Ok(RawType::Int32),
            "uint32" => Ok(RawType::UInt32),
            "int64" => Ok(RawType::Int64),
            "uint64" => Ok(RawType::UInt64),
            "float32" => Ok(RawType::Float32),
            "float64" => Ok(RawType::Float64),
            _ => Err(()),
        }
    }
}

/// Raw JSON configuration for a whole layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    /// Scale factor converting a field address into a byte offset.
    #[serde(default = "default_bytes_per_unit")]
    pub bytes_per_unit: usize,
    /// Where and how the payload length is encoded.
    #[serde(default)]
    pub length_field: LengthFieldConfig,
    /// Trailing checksum digest description.
    #[serde(default)]
    pub checksum: ChecksumConfig,
    /// Ordered field specifications.
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

fn default_bytes_per_unit() -> usize {
    2
}

/// Raw configuration of the length field.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LengthFieldConfig {
    #[serde(default = "default_length_offset")]
    pub byte_offset: usize,
    #[serde(default = "default_length_width")]
    pub width: usize,
    #[serde(default = "default_true")]
    pub big_endian: bool,
}

impl Default for LengthFieldConfig {
    fn default() -> Self {
        LengthFieldConfig {
            byte_offset: default_length_offset(),
            width: default_length_width(),
            big_endian: true,
        }
    }
}

fn default_length_offset() -> usize {
    2
}

fn default_length_width() -> usize {
    2
}

fn default_true() -> bool {
    true
}

/// Raw configuration of the trailing checksum.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChecksumConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_true")]
    pub big_endian: bool,
}

impl Default for ChecksumConfig {
    fn default() -> Self {
        ChecksumConfig {
            enabled: true,
            algorithm: default_algorithm(),
            big_endian: true,
        }
    }
}

fn default_algorithm() -> String {
    "crc16_modbus".to_string()
}

/// Raw configuration of one field.
///
/// `name`, `address` and `raw_type` are required; their absence is reported
/// by [`FrameLayout::build`] rather than at deserialization so the error
/// names the offending field index.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<usize>,
    #[serde(default)]
    pub raw_type: Option<String>,
    #[serde(default = "default_true")]
    pub big_endian: bool,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub expression: Option<String>,
}

/// Validated length-field descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthField {
    pub byte_offset: usize,
    pub width: usize,
    pub endianness: Endianness,
}

/// Validated checksum descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumSpec {
    pub enabled: bool,
    pub algorithm: ChecksumAlgorithm,
    pub endianness: Endianness,
}

/// Validated specification of one field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Output key; unique within the layout.
    pub name: String,
    /// Logical unit index, converted to bytes via `bytes_per_unit`.
    pub address: usize,
    pub raw_type: RawType,
    pub endianness: Endianness,
    /// Unit label copied into the decoded value.
    pub unit: Option<String>,
    pub transform: Transform,
}

/// The validated, immutable frame schema.
///
/// Built once per processor instance; the decoder only ever borrows it, so
/// concurrent decodes across threads need no synchronization.
///
/// # Examples
/// ```
/// use modframe_core::FrameLayout;
///
/// let layout = FrameLayout::from_json(
///     r#"{ "fields": [ { "name": "flow", "address": 1, "raw_type": "int32" } ] }"#,
/// )?;
/// assert_eq!(layout.bytes_per_unit(), 2);
/// assert_eq!(layout.fields().len(), 1);
/// # Ok::<(), modframe_core::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FrameLayout {
    bytes_per_unit: usize,
    length_field: LengthField,
    checksum: ChecksumSpec,
    fields: Vec<FieldSpec>,
    warnings: Vec<String>,
}

impl FrameLayout {
    /// Parse and validate a layout from its JSON configuration text.
    pub fn from_json(text: &str) -> Result<FrameLayout, ConfigError> {
        let config: LayoutConfig = serde_json::from_str(text)?;
        FrameLayout::build(config)
    }

    /// Validate a raw configuration into an immutable layout.
    pub fn build(config: LayoutConfig) -> Result<FrameLayout, ConfigError> {
        if config.bytes_per_unit == 0 {
            return Err(ConfigError::InvalidBytesPerUnit);
        }
        if !matches!(config.length_field.width, 1 | 2 | 4 | 8) {
            return Err(ConfigError::UnsupportedLengthWidth {
                width: config.length_field.width,
            });
        }
        let algorithm = ChecksumAlgorithm::from_str(&config.checksum.algorithm)
            .map_err(|err| ConfigError::UnknownAlgorithm { name: err.0 })?;
        if config.fields.is_empty() {
            return Err(ConfigError::NoFields);
        }

        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(config.fields.len());
        for (index, field) in config.fields.into_iter().enumerate() {
            let name = field
                .name
                .filter(|name| !name.is_empty())
                .ok_or(ConfigError::MissingFieldKey { index, key: "name" })?;
            let address = field.address.ok_or(ConfigError::MissingFieldKey {
                index,
                key: "address",
            })?;
            let raw_type_name = field.raw_type.ok_or(ConfigError::MissingFieldKey {
                index,
                key: "raw_type",
            })?;
            let raw_type =
                RawType::from_str(&raw_type_name).map_err(|_| ConfigError::UnknownRawType {
                    name: name.clone(),
                    raw_type: raw_type_name,
                })?;
            if !seen.insert(name.clone()) {
                return Err(ConfigError::DuplicateField { name });
            }

            let transform = match (&field.expression, field.scale) {
                (Some(expression), scale) => {
                    if scale.is_some() {
                        warnings.push(format!(
                            "field `{name}`: both scale and expression set; expression wins"
                        ));
                    }
                    let program = ExprProgram::compile(expression).map_err(|source| {
                        ConfigError::InvalidExpression {
                            name: name.clone(),
                            source,
                        }
                    })?;
                    Transform::Expr(Arc::new(program))
                }
                (None, Some(scale)) => Transform::Scale(scale),
                (None, None) => Transform::Identity,
            };

            fields.push(FieldSpec {
                name,
                address,
                raw_type,
                endianness: Endianness::from_big(field.big_endian),
                unit: field.unit,
                transform,
            });
        }

        Ok(FrameLayout {
            bytes_per_unit: config.bytes_per_unit,
            length_field: LengthField {
                byte_offset: config.length_field.byte_offset,
                width: config.length_field.width,
                endianness: Endianness::from_big(config.length_field.big_endian),
            },
            checksum: ChecksumSpec {
                enabled: config.checksum.enabled,
                algorithm,
                endianness: Endianness::from_big(config.checksum.big_endian),
            },
            fields,
            warnings,
        })
    }

    /// Scale factor converting field addresses into byte offsets.
    pub fn bytes_per_unit(&self) -> usize {
        self.bytes_per_unit
    }

    /// The length-field descriptor.
    pub fn length_field(&self) -> &LengthField {
        &self.length_field
    }

    /// The checksum descriptor.
    pub fn checksum(&self) -> &ChecksumSpec {
        &self.checksum
    }

    /// Field specifications in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Non-fatal configuration warnings collected during construction.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json(fields: &str) -> String {
        format!(r#"{{ "fields": [ {fields} ] }}"#)
    }

    #[test]
    fn defaults_applied() {
        let layout = FrameLayout::from_json(&minimal_json(
            r#"{ "name": "temp", "address": 0, "raw_type": "uint16" }"#,
        ))
        .expect("layout");

        assert_eq!(layout.bytes_per_unit(), 2);
        assert_eq!(layout.length_field().byte_offset, 2);
        assert_eq!(layout.length_field().width, 2);
        assert_eq!(layout.length_field().endianness, Endianness::Big);
        assert!(layout.checksum().enabled);
        assert_eq!(layout.checksum().algorithm, ChecksumAlgorithm::Crc16Modbus);
        assert_eq!(layout.checksum().endianness, Endianness::Big);

        let field = &layout.fields()[0];
        assert_eq!(field.endianness, Endianness::Big);
        assert!(field.unit.is_none());
        assert!(matches!(field.transform, Transform::Identity));
        assert!(layout.warnings().is_empty());
    }

    #[test]
    fn empty_field_list_rejected() {
        let err = FrameLayout::from_json(r#"{ "fields": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::NoFields));
        let err = FrameLayout::from_json("{}").unwrap_err();
        assert!(matches!(err, ConfigError::NoFields));
    }

    #[test]
    fn missing_field_keys_rejected() {
        let err =
            FrameLayout::from_json(&minimal_json(r#"{ "address": 0, "raw_type": "uint16" }"#))
                .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingFieldKey { index: 0, key: "name" }
        ));

        let err = FrameLayout::from_json(&minimal_json(r#"{ "name": "a", "raw_type": "uint16" }"#))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingFieldKey { key: "address", .. }
        ));

        let err = FrameLayout::from_json(&minimal_json(r#"{ "name": "a", "address": 0 }"#))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingFieldKey { key: "raw_type", .. }
        ));
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = FrameLayout::from_json(&minimal_json(
            r#"{ "name": "a", "address": 0, "raw_type": "uint16" },
               { "name": "a", "address": 1, "raw_type": "uint16" }"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateField { name } if name == "a"));
    }

    #[test]
    fn unknown_raw_type_rejected() {
        let err = FrameLayout::from_json(&minimal_json(
            r#"{ "name": "a", "address": 0, "raw_type": "uint24" }"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRawType { .. }));
    }

    #[test]
    fn raw_type_names_are_case_insensitive() {
        let layout = FrameLayout::from_json(&minimal_json(
            r#"{ "name": "a", "address": 0, "raw_type": "Float32" }"#,
        ))
        .expect("layout");
        assert_eq!(layout.fields()[0].raw_type, RawType::Float32);
    }

    #[test]
    fn unsupported_length_width_rejected() {
        let err = FrameLayout::from_json(
            r#"{
                "length_field": { "width": 3 },
                "fields": [ { "name": "a", "address": 0, "raw_type": "uint16" } ]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnsupportedLengthWidth { width: 3 }
        ));
    }

    #[test]
    fn unknown_algorithm_rejected() {
        let err = FrameLayout::from_json(
            r#"{
                "checksum": { "algorithm": "crc13" },
                "fields": [ { "name": "a", "address": 0, "raw_type": "uint16" } ]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAlgorithm { name } if name == "crc13"));
    }

    #[test]
    fn zero_bytes_per_unit_rejected() {
        let err = FrameLayout::from_json(
            r#"{
                "bytes_per_unit": 0,
                "fields": [ { "name": "a", "address": 0, "raw_type": "uint16" } ]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBytesPerUnit));
    }

    #[test]
    fn invalid_expression_rejected() {
        let err = FrameLayout::from_json(&minimal_json(
            r#"{ "name": "a", "address": 0, "raw_type": "uint16", "expression": "value +" }"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExpression { .. }));
    }

    #[test]
    fn expression_wins_over_scale_with_warning() {
        let layout = FrameLayout::from_json(&minimal_json(
            r#"{ "name": "a", "address": 0, "raw_type": "uint16",
                 "scale": 0.5, "expression": "value * 2" }"#,
        ))
        .expect("layout");
        assert!(matches!(layout.fields()[0].transform, Transform::Expr(_)));
        assert_eq!(layout.warnings().len(), 1);
        assert!(layout.warnings()[0].contains("expression wins"));
    }

    #[test]
    fn unknown_config_keys_rejected() {
        let err = FrameLayout::from_json(
            r#"{
                "bytes_per_address": 2,
                "fields": [ { "name": "a", "address": 0, "raw_type": "uint16" } ]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
