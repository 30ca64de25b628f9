//! Probing of the DICOM file envelope:
//! the magic code after the preamble
//! and the transfer syntax declared in the file meta group.
//!
//! Probes never fail.
//! They report what they found as a `bool` or a [`TransferSyntax`],
//! so that callers can decide what to do with files
//! which are not DICOM or not in a supported encoding.
use dcmtree_core::uid::trim_uid;
use dcmtree_core::{Tag, TransferSyntax, VR};
use dcmtree_encoding::decode::{Decode, ExplicitVRLittleEndianDecoder};
use std::io::{Read, Seek, SeekFrom};

/// The magic code which follows the preamble of a DICOM file.
pub const DICM_MAGIC_CODE: [u8; 4] = [b'D', b'I', b'C', b'M'];

/// The length of the preamble of a DICOM file, in bytes.
pub const PREAMBLE_LEN: u64 = 128;

/// Check whether the source holds the `DICM` magic code
/// right after a 128-byte preamble.
///
/// On success the source is left right after the magic code.
/// Otherwise, the source is moved back to where it was.
pub fn verify_magic<S>(source: &mut S) -> bool
where
    S: Read + Seek,
{
    let start = match source.stream_position() {
        Ok(pos) => pos,
        Err(_) => return false,
    };
    let mut buf = [0u8; 4];
    let found = source.seek(SeekFrom::Start(PREAMBLE_LEN)).is_ok()
        && source.read_exact(&mut buf).is_ok()
        && buf == DICM_MAGIC_CODE;
    if !found {
        tracing::debug!("No DICOM magic code found");
        if let Err(e) = source.seek(SeekFrom::Start(start)) {
            tracing::warn!("Could not restore source position: {}", e);
        }
    }
    found
}

/// Look for the Transfer Syntax UID element (0002,0010)
/// from the current position onwards,
/// without building an element tree.
///
/// Yields [`TransferSyntax::Unknown`] if the UID is not in the table,
/// and [`TransferSyntax::Invalid`] if the element could not be found:
/// the source ended, a header was malformed,
/// a sequence or an undefined length came first,
/// or the element is not a UI.
///
/// The source position is always restored.
pub fn read_transfer_syntax<S>(source: &mut S) -> TransferSyntax
where
    S: Read + Seek,
{
    let start = match source.stream_position() {
        Ok(pos) => pos,
        Err(_) => return TransferSyntax::Invalid,
    };
    let ts = scan_transfer_syntax(source);
    if let Err(e) = source.seek(SeekFrom::Start(start)) {
        tracing::warn!("Could not restore source position: {}", e);
    }
    ts
}

fn scan_transfer_syntax<S>(source: &mut S) -> TransferSyntax
where
    S: Read + Seek,
{
    let decoder = ExplicitVRLittleEndianDecoder;
    loop {
        let header = match decoder.decode_header(source) {
            Ok((header, _)) => header,
            Err(e) => {
                tracing::debug!("Transfer syntax not found: {}", e);
                return TransferSyntax::Invalid;
            }
        };
        let len = match header.len.get() {
            Some(len) if !header.is_sequence() => len,
            _ => return TransferSyntax::Invalid,
        };

        if header.tag == Tag::TRANSFER_SYNTAX {
            if header.vr != VR::UI {
                return TransferSyntax::Invalid;
            }
            let mut buf = Vec::new();
            match source.by_ref().take(u64::from(len)).read_to_end(&mut buf) {
                Ok(n) if n as u64 == u64::from(len) => {}
                _ => return TransferSyntax::Invalid,
            }
            let uid = String::from_utf8_lossy(&buf);
            return TransferSyntax::from_uid(trim_uid(&uid));
        }

        if source.seek(SeekFrom::Current(i64::from(len))).is_err() {
            return TransferSyntax::Invalid;
        }
    }
}
