//! DICOM encoding and decoding primitives.
//!
//! This crate reads and writes the smallest units of a DICOM data set
//! in the Explicit VR Little Endian transfer syntax:
//! element tags, element headers
//! (value representation and value length,
//! the length field being 2 or 4 bytes wide depending on the VR),
//! and the headers of sequence items and delimiters.
//!
//! All APIs are based on synchronous I/O.

pub mod decode;
pub mod encode;

pub use decode::{Decode, ExplicitVRLittleEndianDecoder};
pub use encode::{Encode, ExplicitVRLittleEndianEncoder};
