//! This module contains the DICOM data element header decoding logic.

use dcmtree_core::header::{DataElementHeader, Length};
use dcmtree_core::{Tag, VR};
use snafu::{Backtrace, Snafu};
use std::io::{self, Read};

pub mod explicit_le;

pub use self::explicit_le::ExplicitVRLittleEndianDecoder;

/// Module-level error type:
/// for errors which may occur while decoding DICOM data.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Failed to read the header's tag field: {}", source))]
    ReadTag {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the header's value representation: {}", source))]
    ReadVr {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the header's reserved bytes: {}", source))]
    ReadReserved {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the header's element length field: {}", source))]
    ReadLength {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the item header: {}", source))]
    ReadItemHeader {
        backtrace: Backtrace,
        source: io::Error,
    },
    /// The two bytes in place of the value representation
    /// are not a known code
    #[snafu(display("Malformed header: unknown value representation {:02X?}", code))]
    UnknownVr { code: [u8; 2], backtrace: Backtrace },
}

impl Error {
    /// Whether the error was caused by the data source
    /// ending in the middle of a header.
    pub fn is_unexpected_eof(&self) -> bool {
        match self {
            Error::ReadTag { source, .. }
            | Error::ReadVr { source, .. }
            | Error::ReadReserved { source, .. }
            | Error::ReadLength { source, .. }
            | Error::ReadItemHeader { source, .. } => {
                source.kind() == io::ErrorKind::UnexpectedEof
            }
            Error::UnknownVr { .. } => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Type trait for reading and decoding DICOM data element headers.
///
/// All methods leave the source right after the bytes they consumed,
/// so that the caller can read or skip the element's value.
pub trait Decode {
    /// Fetch and decode a data element tag.
    /// Fails if the source ends before the 4 bytes of the tag.
    fn decode_tag<S>(&self, source: &mut S) -> Result<Tag>
    where
        S: ?Sized + Read;

    /// Fetch and decode a data element tag,
    /// or return `None` if the source has no more bytes.
    /// A source ending in the middle of the tag is an error.
    fn try_decode_tag<S>(&self, source: &mut S) -> Result<Option<Tag>>
    where
        S: ?Sized + Read;

    /// Decode the value representation and value length
    /// which follow an element tag.
    ///
    /// Returns the VR, the length
    /// and the exact number of bytes read from the source.
    fn decode_vr_length<S>(&self, source: &mut S) -> Result<(VR, Length, usize)>
    where
        S: ?Sized + Read;

    /// Fetch and decode the next data element header from the given source.
    ///
    /// Returns the header and the exact number of bytes read from the source.
    fn decode_header<S>(&self, source: &mut S) -> Result<(DataElementHeader, usize)>
    where
        S: ?Sized + Read,
    {
        let tag = self.decode_tag(source)?;
        let (vr, len, bytes_read) = self.decode_vr_length(source)?;
        Ok((DataElementHeader::new(tag, vr, len), 4 + bytes_read))
    }

    /// Fetch and decode an item or delimiter header:
    /// a tag followed by a 4-byte length, without value representation.
    ///
    /// The tag is returned as is,
    /// so that callers can decide what to do with anything
    /// other than an item or delimiter.
    fn decode_item_header<S>(&self, source: &mut S) -> Result<(Tag, Length)>
    where
        S: ?Sized + Read;
}
