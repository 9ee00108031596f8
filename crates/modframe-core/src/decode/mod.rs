//! Frame decoding.
//!
//! The module follows a layered structure:
//! - `reader`: bounds-checked byte access and endianness conventions
//! - `parser`: the frame walk (checksum, tags, length, fields)
//! - `error`: explicit, per-message errors
//!
//! Decoding is pure and contains no I/O; a decode either yields the full
//! field mapping or fails with the first error encountered.

mod error;
mod parser;
mod reader;

pub use error::DecodeError;
pub use parser::decode;
