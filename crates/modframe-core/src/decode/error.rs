use thiserror::Error;

use crate::transform::EvalError;

/// Per-message decoding error. Recoverable at the pipeline level; the frame
/// is dropped or rerouted by the caller, never partially decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("checksum mismatch: computed {computed:#x}, frame carries {received:#x}")]
    ChecksumMismatch { computed: u64, received: u64 },
    #[error("unsupported length field width {width}: expected 1, 2, 4 or 8")]
    UnsupportedLengthWidth { width: usize },
    #[error("field `{field}` failed to decode: {source}")]
    FieldDecode { field: String, source: EvalError },
}
