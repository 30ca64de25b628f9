//! This module contains the DICOM data element header encoding logic.

use dcmtree_core::header::{DataElementHeader, Length};
use dcmtree_core::{Tag, VR};
use snafu::{Backtrace, Snafu};
use std::io::{self, Write};

pub mod explicit_le;

pub use self::explicit_le::ExplicitVRLittleEndianEncoder;

/// Module-level error type:
/// for errors which may occur while encoding DICOM data.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Failed to write tag: {}", source))]
    WriteTag {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write element header: {}", source))]
    WriteHeader {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write item header: {}", source))]
    WriteItemHeader {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write item delimiter: {}", source))]
    WriteItemDelimiter {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write sequence delimiter: {}", source))]
    WriteSequenceDelimiter {
        backtrace: Backtrace,
        source: io::Error,
    },
    /// The invalid value representation has no wire form
    #[snafu(display("Cannot encode element {} with an invalid value representation", tag))]
    InvalidVr { tag: Tag, backtrace: Backtrace },
    /// The length does not fit in the 2-byte length field of the VR
    #[snafu(display("Length {} of element {} does not fit in a {} header", len, tag, vr))]
    LengthOverflow {
        tag: Tag,
        vr: VR,
        len: Length,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Type trait for encoding DICOM data element headers.
pub trait Encode {
    /// Encode a data element tag.
    fn encode_tag<W>(&self, to: W, tag: Tag) -> Result<()>
    where
        W: Write;

    /// Encode a full data element header,
    /// returning the number of bytes written (8 or 12).
    fn encode_element_header<W>(&self, to: W, de: DataElementHeader) -> Result<usize>
    where
        W: Write;

    /// Encode the header of a sequence item with the given length.
    fn encode_item_header<W>(&self, to: W, len: u32) -> Result<()>
    where
        W: Write;

    /// Encode an item delimiter.
    fn encode_item_delimiter<W>(&self, to: W) -> Result<()>
    where
        W: Write;

    /// Encode a sequence delimiter.
    fn encode_sequence_delimiter<W>(&self, to: W) -> Result<()>
    where
        W: Write;
}

/// The number of bytes taken by the header of an element with the given VR,
/// tag included.
pub fn header_len(vr: VR) -> u64 {
    if vr.has_reserved_bytes() {
        12
    } else {
        8
    }
}

/// The number of bytes taken by an item header or delimiter.
pub const ITEM_HEADER_LEN: u64 = 8;
