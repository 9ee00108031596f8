use super::error::DecodeError;
use crate::layout::Endianness;

pub(crate) struct FrameReader<'a> {
    frame: &'a [u8],
}

impl<'a> FrameReader<'a> {
    pub fn new(frame: &'a [u8]) -> Self {
        Self { frame }
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn require_len(&self, needed: usize) -> Result<(), DecodeError> {
        if self.frame.len() < needed {
            return Err(DecodeError::TooShort {
                needed,
                actual: self.frame.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, DecodeError> {
        self.frame
            .get(offset)
            .copied()
            .ok_or(DecodeError::TooShort {
                needed: offset + 1,
                actual: self.frame.len(),
            })
    }

    pub fn read_slice(&self, range: std::ops::Range<usize>) -> Result<&'a [u8], DecodeError> {
        self.frame
            .get(range.clone())
            .ok_or(DecodeError::TooShort {
                needed: range.end,
                actual: self.frame.len(),
            })
    }

    /// Read `width` bytes at `offset` as an unsigned integer, honoring the
    /// byte order. Width may be 1..=8; callers restrict it further.
    pub fn read_uint(
        &self,
        offset: usize,
        width: usize,
        endianness: Endianness,
    ) -> Result<u64, DecodeError> {
        let end = offset.saturating_add(width);
        let bytes = self.read_slice(offset..end)?;
        let value = match endianness {
            Endianness::Big => bytes
                .iter()
                .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte)),
            Endianness::Little => bytes
                .iter()
                .rev()
                .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte)),
        };
        Ok(value)
    }
}
