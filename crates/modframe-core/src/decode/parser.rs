use std::collections::BTreeMap;

use super::error::DecodeError;
use super::reader::FrameReader;
use crate::layout::{Endianness, FieldSpec, FrameLayout, RawType};
use crate::{DecodedFrame, DecodedValue, FrameTags};

/// Decode one raw frame against a validated layout.
///
/// Verification and extraction happen in a fixed order: checksum, device
/// address and function code, payload length, then each field at its
/// absolute offset. The payload length is recorded as a tag only; fields are
/// addressed absolutely and never bounded by it.
pub fn decode(layout: &FrameLayout, frame: &[u8]) -> Result<DecodedFrame, DecodeError> {
    let reader = FrameReader::new(frame);

    let checksum = layout.checksum();
    if checksum.enabled {
        verify_checksum(&reader, checksum.algorithm, checksum.endianness)?;
    }

    let device_address = reader.read_u8(0)?;
    let function_code = reader.read_u8(1)?;

    let length_field = layout.length_field();
    if !matches!(length_field.width, 1 | 2 | 4 | 8) {
        // Construction already rejects this; kept as a per-message guard.
        return Err(DecodeError::UnsupportedLengthWidth {
            width: length_field.width,
        });
    }
    let payload_length = reader.read_uint(
        length_field.byte_offset,
        length_field.width,
        length_field.endianness,
    )?;

    let base_offset = length_field.byte_offset + length_field.width;

    let mut fields = BTreeMap::new();
    for spec in layout.fields() {
        let byte_offset = base_offset
            .saturating_add(spec.address.saturating_mul(layout.bytes_per_unit()));
        let raw = read_raw(&reader, byte_offset, spec)?;
        let value = spec
            .transform
            .apply(raw)
            .map_err(|source| DecodeError::FieldDecode {
                field: spec.name.clone(),
                source,
            })?;
        fields.insert(
            spec.name.clone(),
            DecodedValue {
                value,
                unit: spec.unit.clone(),
            },
        );
    }

    Ok(DecodedFrame {
        fields,
        tags: FrameTags {
            device_address,
            function_code,
            payload_length,
            checksum_passed: true,
        },
    })
}

fn verify_checksum(
    reader: &FrameReader<'_>,
    algorithm: crate::ChecksumAlgorithm,
    endianness: Endianness,
) -> Result<(), DecodeError> {
    let width = algorithm.digest_width();
    let payload_len = reader
        .len()
        .checked_sub(width)
        .ok_or(DecodeError::TooShort {
            needed: width,
            actual: reader.len(),
        })?;
    let payload = reader.read_slice(0..payload_len)?;
    let computed = algorithm.compute(payload);
    let received = reader.read_uint(payload_len, width, endianness)?;
    if computed != received {
        return Err(DecodeError::ChecksumMismatch { computed, received });
    }
    Ok(())
}

/// Extract a field's raw bytes and widen them to an `f64` intermediate.
/// Integer types go through the unsigned bit pattern read by the reader;
/// floats reinterpret the same bits directly.
fn read_raw(
    reader: &FrameReader<'_>,
    byte_offset: usize,
    spec: &FieldSpec,
) -> Result<f64, DecodeError> {
    let bits = reader.read_uint(byte_offset, spec.raw_type.width(), spec.endianness)?;
    let value = match spec.raw_type {
        RawType::UInt8 | RawType::UInt16 | RawType::UInt32 | RawType::UInt64 => bits as f64,
        RawType::Int8 => bits as u8 as i8 as f64,
        RawType::Int16 => bits as u16 as i16 as f64,
        RawType::Int32 => bits as u32 as i32 as f64,
        RawType::Int64 => bits as i64 as f64,
        RawType::Float32 => f64::from(f32::from_bits(bits as u32)),
        RawType::Float64 => f64::from_bits(bits),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::decode;
    use crate::layout::FrameLayout;
    use crate::{ChecksumAlgorithm, DecodeError, Value};

    fn with_modbus_crc(payload: &[u8]) -> Vec<u8> {
        let digest = ChecksumAlgorithm::Crc16Modbus.compute(payload) as u16;
        let mut frame = payload.to_vec();
        frame.extend_from_slice(&digest.to_be_bytes());
        frame
    }

    fn layout(json: &str) -> FrameLayout {
        FrameLayout::from_json(json).expect("layout")
    }

    #[test]
    fn reference_frame_decodes() {
        let layout = layout(
            r#"{
                "bytes_per_unit": 2,
                "length_field": { "byte_offset": 2, "width": 2, "big_endian": true },
                "checksum": { "enabled": true, "algorithm": "crc16_modbus", "big_endian": true },
                "fields": [
                    { "name": "temp", "address": 0, "raw_type": "uint16",
                      "big_endian": true, "scale": 0.1 }
                ]
            }"#,
        );
        let frame = with_modbus_crc(&[0x01, 0x03, 0x00, 0x02, 0x00, 0xC8]);

        let decoded = decode(&layout, &frame).expect("decode");
        assert_eq!(decoded.fields["temp"].value, Value::Float(20.0));
        assert_eq!(decoded.tags.device_address, 1);
        assert_eq!(decoded.tags.function_code, 3);
        assert_eq!(decoded.tags.payload_length, 2);
        assert!(decoded.tags.checksum_passed);
    }

    #[test]
    fn corrupted_byte_fails_checksum() {
        let layout = layout(
            r#"{ "fields": [ { "name": "temp", "address": 0, "raw_type": "uint16" } ] }"#,
        );
        let mut frame = with_modbus_crc(&[0x01, 0x03, 0x00, 0x02, 0x00, 0xC8]);
        frame[4] ^= 0x01;

        let err = decode(&layout, &frame).unwrap_err();
        assert!(matches!(err, DecodeError::ChecksumMismatch { .. }));
    }

    #[test]
    fn signed_and_float_raw_types() {
        let layout = layout(
            r#"{
                "checksum": { "enabled": false },
                "fields": [
                    { "name": "neg", "address": 0, "raw_type": "int16" },
                    { "name": "ratio", "address": 1, "raw_type": "float32" }
                ]
            }"#,
        );
        // Header + length, then -2 as i16 and 1.5f32 at unit addresses 0 and 1.
        let mut frame = vec![0x01, 0x03, 0x00, 0x06];
        frame.extend_from_slice(&(-2i16).to_be_bytes());
        frame.extend_from_slice(&1.5f32.to_be_bytes());

        let decoded = decode(&layout, &frame).expect("decode");
        assert_eq!(decoded.fields["neg"].value, Value::Float(-2.0));
        assert_eq!(decoded.fields["ratio"].value, Value::Float(1.5));
    }

    #[test]
    fn little_endian_field() {
        let layout = layout(
            r#"{
                "checksum": { "enabled": false },
                "fields": [
                    { "name": "le", "address": 0, "raw_type": "uint16", "big_endian": false }
                ]
            }"#,
        );
        let frame = [0x01, 0x03, 0x00, 0x02, 0x01, 0x02];

        let decoded = decode(&layout, &frame).expect("decode");
        assert_eq!(decoded.fields["le"].value, Value::Float(513.0));
    }

    #[test]
    fn field_slice_out_of_bounds() {
        let layout = layout(
            r#"{
                "checksum": { "enabled": false },
                "fields": [ { "name": "far", "address": 10, "raw_type": "uint16" } ]
            }"#,
        );
        let frame = [0x01, 0x03, 0x00, 0x02, 0x00, 0xC8];

        let err = decode(&layout, &frame).unwrap_err();
        assert!(matches!(err, DecodeError::TooShort { .. }));
    }

    #[test]
    fn frame_shorter_than_digest() {
        let layout = layout(
            r#"{ "fields": [ { "name": "a", "address": 0, "raw_type": "uint8" } ] }"#,
        );
        let err = decode(&layout, &[0x01]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TooShort {
                needed: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn expression_failure_names_field() {
        let layout = layout(
            r#"{
                "checksum": { "enabled": false },
                "fields": [
                    { "name": "bad", "address": 0, "raw_type": "uint16",
                      "expression": "1 / value" }
                ]
            }"#,
        );
        // Raw value zero makes the expression divide by zero.
        let frame = [0x01, 0x03, 0x00, 0x02, 0x00, 0x00];

        let err = decode(&layout, &frame).unwrap_err();
        assert!(matches!(err, DecodeError::FieldDecode { field, .. } if field == "bad"));
    }

    #[test]
    fn payload_length_is_informational_only() {
        // The length field claims zero bytes of data; fields are still read
        // at their absolute offsets.
        let layout = layout(
            r#"{
                "checksum": { "enabled": false },
                "fields": [ { "name": "v", "address": 0, "raw_type": "uint16" } ]
            }"#,
        );
        let frame = [0x01, 0x03, 0x00, 0x00, 0x01, 0x02];

        let decoded = decode(&layout, &frame).expect("decode");
        assert_eq!(decoded.tags.payload_length, 0);
        assert_eq!(decoded.fields["v"].value, Value::Float(258.0));
    }
}
