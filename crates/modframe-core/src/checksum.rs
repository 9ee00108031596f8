//! Checksum algorithms for frame integrity verification.
//!
//! Each supported algorithm maps to a reference parameter set from the `crc`
//! catalog; the digest is an unsigned integer of at most 64 bits whose byte
//! width determines how many trailing frame bytes hold it. Dispatch is a
//! single match on the closed enum, resolved once at layout construction.

use std::fmt;
use std::str::FromStr;

use crc::{
    CRC_16_IBM_3740, CRC_16_IBM_SDLC, CRC_16_MODBUS, CRC_16_XMODEM, CRC_32_ISCSI, CRC_32_ISO_HDLC,
    CRC_64_ECMA_182, CRC_64_XZ, Crc,
};

/// Supported checksum algorithms (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    /// CRC-16/MODBUS: poly 0x8005 reflected, init 0xFFFF, no final XOR.
    Crc16Modbus,
    /// CRC-16/XMODEM: poly 0x1021, init 0.
    Crc16Xmodem,
    /// CRC-16/CCITT (X.25 / IBM-SDLC parameters).
    Crc16Ccitt,
    /// CRC-16/CCITT-FALSE (IBM-3740 parameters).
    Crc16CcittFalse,
    /// CRC-32 (ISO-HDLC, the zip/ethernet polynomial).
    Crc32,
    /// CRC-32C (iSCSI, Castagnoli polynomial).
    Crc32C,
    /// CRC-64/ECMA-182.
    Crc64,
    /// CRC-64/XZ.
    Crc64Xz,
}

impl ChecksumAlgorithm {
    /// All supported algorithms, in documentation order.
    pub const ALL: [ChecksumAlgorithm; 8] = [
        ChecksumAlgorithm::Crc16Modbus,
        ChecksumAlgorithm::Crc16Xmodem,
        ChecksumAlgorithm::Crc16Ccitt,
        ChecksumAlgorithm::Crc16CcittFalse,
        ChecksumAlgorithm::Crc32,
        ChecksumAlgorithm::Crc32C,
        ChecksumAlgorithm::Crc64,
        ChecksumAlgorithm::Crc64Xz,
    ];

    /// Width of the trailing digest in bytes.
    pub fn digest_width(&self) -> usize {
        match self {
            ChecksumAlgorithm::Crc16Modbus
            | ChecksumAlgorithm::Crc16Xmodem
            | ChecksumAlgorithm::Crc16Ccitt
            | ChecksumAlgorithm::Crc16CcittFalse => 2,
            ChecksumAlgorithm::Crc32 | ChecksumAlgorithm::Crc32C => 4,
            ChecksumAlgorithm::Crc64 | ChecksumAlgorithm::Crc64Xz => 8,
        }
    }

    /// Compute the digest over `data`. Pure and stateless.
    pub fn compute(&self, data: &[u8]) -> u64 {
        match self {
            ChecksumAlgorithm::Crc16Modbus => {
                u64::from(Crc::<u16>::new(&CRC_16_MODBUS).checksum(data))
            }
            ChecksumAlgorithm::Crc16Xmodem => {
                u64::from(Crc::<u16>::new(&CRC_16_XMODEM).checksum(data))
            }
            ChecksumAlgorithm::Crc16Ccitt => {
                u64::from(Crc::<u16>::new(&CRC_16_IBM_SDLC).checksum(data))
            }
            ChecksumAlgorithm::Crc16CcittFalse => {
                u64::from(Crc::<u16>::new(&CRC_16_IBM_3740).checksum(data))
            }
            ChecksumAlgorithm::Crc32 => u64::from(Crc::<u32>::new(&CRC_32_ISO_HDLC).checksum(data)),
            ChecksumAlgorithm::Crc32C => u64::from(Crc::<u32>::new(&CRC_32_ISCSI).checksum(data)),
            ChecksumAlgorithm::Crc64 => Crc::<u64>::new(&CRC_64_ECMA_182).checksum(data),
            ChecksumAlgorithm::Crc64Xz => Crc::<u64>::new(&CRC_64_XZ).checksum(data),
        }
    }

    /// Canonical configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Crc16Modbus => "crc16_modbus",
            ChecksumAlgorithm::Crc16Xmodem => "crc16_xmodem",
            ChecksumAlgorithm::Crc16Ccitt => "crc16_ccitt",
            ChecksumAlgorithm::Crc16CcittFalse => "crc16_ccitt_false",
            ChecksumAlgorithm::Crc32 => "crc32",
            ChecksumAlgorithm::Crc32C => "crc32c",
            ChecksumAlgorithm::Crc64 => "crc64",
            ChecksumAlgorithm::Crc64Xz => "crc64_xz",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when an algorithm name is outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlgorithm(pub String);

impl FromStr for ChecksumAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ChecksumAlgorithm::ALL
            .iter()
            .copied()
            .find(|algo| algo.name() == normalized)
            .ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::ChecksumAlgorithm;

    const CHECK_INPUT: &[u8] = b"123456789";

    #[test]
    fn reference_check_values() {
        // Standard check values for each parameter set.
        assert_eq!(ChecksumAlgorithm::Crc16Modbus.compute(CHECK_INPUT), 0x4B37);
        assert_eq!(ChecksumAlgorithm::Crc16Xmodem.compute(CHECK_INPUT), 0x31C3);
        assert_eq!(ChecksumAlgorithm::Crc16Ccitt.compute(CHECK_INPUT), 0x906E);
        assert_eq!(
            ChecksumAlgorithm::Crc16CcittFalse.compute(CHECK_INPUT),
            0x29B1
        );
        assert_eq!(ChecksumAlgorithm::Crc32.compute(CHECK_INPUT), 0xCBF4_3926);
        assert_eq!(ChecksumAlgorithm::Crc32C.compute(CHECK_INPUT), 0xE306_9283);
        assert_eq!(
            ChecksumAlgorithm::Crc64.compute(CHECK_INPUT),
            0x6C40_DF5F_0B49_7347
        );
        assert_eq!(
            ChecksumAlgorithm::Crc64Xz.compute(CHECK_INPUT),
            0x995D_C9BB_DF19_39FA
        );
    }

    #[test]
    fn modbus_matches_reference_frame() {
        let frame = [0x01, 0x03, 0x00, 0x02, 0x00, 0xC8];
        assert_eq!(ChecksumAlgorithm::Crc16Modbus.compute(&frame), 0x9CE5);
    }

    #[test]
    fn digest_widths() {
        for algo in ChecksumAlgorithm::ALL {
            let width = algo.digest_width();
            assert!(matches!(width, 2 | 4 | 8), "{algo}: width {width}");
        }
        assert_eq!(ChecksumAlgorithm::Crc16Modbus.digest_width(), 2);
        assert_eq!(ChecksumAlgorithm::Crc32.digest_width(), 4);
        assert_eq!(ChecksumAlgorithm::Crc64Xz.digest_width(), 8);
    }

    #[test]
    fn parse_round_trip() {
        for algo in ChecksumAlgorithm::ALL {
            let parsed: ChecksumAlgorithm = algo.name().parse().expect("parse canonical name");
            assert_eq!(parsed, algo);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        let parsed: ChecksumAlgorithm = "CRC16_Modbus".parse().expect("parse mixed case");
        assert_eq!(parsed, ChecksumAlgorithm::Crc16Modbus);
    }

    #[test]
    fn parse_unknown_name() {
        let err = "crc15".parse::<ChecksumAlgorithm>().unwrap_err();
        assert_eq!(err.0, "crc15");
    }
}
