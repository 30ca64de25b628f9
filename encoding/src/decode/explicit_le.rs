//! Explicit VR Little Endian syntax transfer implementation

use crate::decode::{
    Decode, ReadItemHeaderSnafu, ReadLengthSnafu, ReadReservedSnafu, ReadTagSnafu, ReadVrSnafu,
    Result, UnknownVrSnafu,
};
use byteordered::byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use dcmtree_core::header::Length;
use dcmtree_core::{Tag, VR};
use snafu::{OptionExt, ResultExt};
use std::io::{self, ErrorKind, Read};

/// A data element decoder for the Explicit VR Little Endian transfer syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitVRLittleEndianDecoder;

impl Decode for ExplicitVRLittleEndianDecoder {
    fn decode_tag<S>(&self, source: &mut S) -> Result<Tag>
    where
        S: ?Sized + Read,
    {
        let mut buf = [0u8; 4];
        source.read_exact(&mut buf).context(ReadTagSnafu)?;
        Ok(Tag(
            LittleEndian::read_u16(&buf[0..2]),
            LittleEndian::read_u16(&buf[2..4]),
        ))
    }

    fn try_decode_tag<S>(&self, source: &mut S) -> Result<Option<Tag>>
    where
        S: ?Sized + Read,
    {
        let mut buf = [0u8; 4];
        let mut filled = 0;
        while filled < buf.len() {
            match source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e).context(ReadTagSnafu),
            }
        }
        match filled {
            0 => Ok(None),
            4 => Ok(Some(Tag(
                LittleEndian::read_u16(&buf[0..2]),
                LittleEndian::read_u16(&buf[2..4]),
            ))),
            _ => Err(io::Error::from(ErrorKind::UnexpectedEof)).context(ReadTagSnafu),
        }
    }

    fn decode_vr_length<S>(&self, source: &mut S) -> Result<(VR, Length, usize)>
    where
        S: ?Sized + Read,
    {
        let mut code = [0u8; 2];
        source.read_exact(&mut code).context(ReadVrSnafu)?;
        let vr = VR::from_binary(code).context(UnknownVrSnafu { code })?;

        // PS3.5 7.1.2: the 16 bits following the VR of OB, OD, OF, OL, OV,
        // OW, SQ, SV, UC, UN, UR, UT and UV are reserved,
        // and the value length field is a 32-bit unsigned integer.
        // For all other VRs it is a 16-bit unsigned integer.
        if vr.has_reserved_bytes() {
            let mut reserved = [0u8; 2];
            source
                .read_exact(&mut reserved)
                .context(ReadReservedSnafu)?;
            let len = source
                .read_u32::<LittleEndian>()
                .context(ReadLengthSnafu)?;
            Ok((vr, Length(len), 8))
        } else {
            let len = source
                .read_u16::<LittleEndian>()
                .context(ReadLengthSnafu)?;
            Ok((vr, Length(u32::from(len)), 4))
        }
    }

    fn decode_item_header<S>(&self, source: &mut S) -> Result<(Tag, Length)>
    where
        S: ?Sized + Read,
    {
        let mut buf = [0u8; 8];
        source.read_exact(&mut buf).context(ReadItemHeaderSnafu)?;
        let group = LittleEndian::read_u16(&buf[0..2]);
        let element = LittleEndian::read_u16(&buf[2..4]);
        let len = LittleEndian::read_u32(&buf[4..8]);
        Ok((Tag(group, element), Length(len)))
    }
}

#[cfg(test)]
mod tests {
    use super::ExplicitVRLittleEndianDecoder;
    use crate::decode::{Decode, Error};
    use dcmtree_core::header::{Length, ALL_VRS};
    use dcmtree_core::{Tag, VR};
    use std::io::{Cursor, Seek, SeekFrom};

    // manually crafting some DICOM data elements
    //  Tag: (0002,0002) Media Storage SOP Class UID
    //  VR: UI
    //  Length: 26
    //  Value: "1.2.840.10008.5.1.4.1.1.1\0"
    // --
    //  Tag: (0002,0010) Transfer Syntax UID
    //  VR: UI
    //  Length: 20
    //  Value: "1.2.840.10008.1.2.1\0" == ExplicitVRLittleEndian
    // --
    #[rustfmt::skip]
    const RAW: &[u8; 62] = &[
        0x02, 0x00, 0x02, 0x00, 0x55, 0x49, 0x1a, 0x00, 0x31, 0x2e, 0x32, 0x2e, 0x38, 0x34, 0x30, 0x2e,
        0x31, 0x30, 0x30, 0x30, 0x38, 0x2e, 0x35, 0x2e, 0x31, 0x2e, 0x34, 0x2e, 0x31, 0x2e, 0x31, 0x2e,
        0x31, 0x00,
        0x02, 0x00, 0x10, 0x00, 0x55, 0x49, 0x14, 0x00, 0x31, 0x2e, 0x32, 0x2e, 0x38, 0x34, 0x30, 0x2e,
        0x31, 0x30, 0x30, 0x30, 0x38, 0x2e, 0x31, 0x2e, 0x32, 0x2e, 0x31, 0x00,
    ];

    #[test]
    fn decode_data_elements() {
        let dec = ExplicitVRLittleEndianDecoder;
        let mut cursor = Cursor::new(&RAW[..]);
        {
            // read first element
            let (elem, bytes_read) = dec
                .decode_header(&mut cursor)
                .expect("should find an element");
            assert_eq!(elem.tag, Tag(2, 2));
            assert_eq!(elem.vr, VR::UI);
            assert_eq!(elem.len, Length(26));
            assert_eq!(bytes_read, 8);
            // read only half of the value data
            let mut buffer = [0u8; 13];
            std::io::Read::read_exact(&mut cursor, &mut buffer).unwrap();
            assert_eq!(&buffer, b"1.2.840.10008");
        }
        // cursor should now be @ #21 (there is no automatic skipping)
        assert_eq!(cursor.stream_position().unwrap(), 21);
        // cursor should now be @ #34 after skipping
        assert_eq!(cursor.seek(SeekFrom::Current(13)).unwrap(), 34);
        {
            let (elem, _bytes_read) = dec
                .decode_header(&mut cursor)
                .expect("should find an element");
            assert_eq!(elem.tag, Tag::TRANSFER_SYNTAX);
            assert_eq!(elem.vr, VR::UI);
            assert_eq!(elem.len, Length(20));
            let mut buffer = [0u8; 20];
            std::io::Read::read_exact(&mut cursor, &mut buffer).unwrap();
            assert_eq!(&buffer, b"1.2.840.10008.1.2.1\0");
        }
        // clean end of input
        assert!(dec.try_decode_tag(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn header_width_depends_on_vr() {
        let dec = ExplicitVRLittleEndianDecoder;
        for vr in ALL_VRS {
            let mut raw = Vec::new();
            raw.extend_from_slice(vr.name().as_bytes());
            // reserved bytes and a 32-bit length, or a 16-bit length
            let zeros = if vr.has_reserved_bytes() { 6 } else { 2 };
            raw.extend(std::iter::repeat(0x00).take(zeros));
            // anything read past the header would show up in the length
            raw.extend_from_slice(&[0xAA; 4]);
            let mut cursor = Cursor::new(&raw[..]);
            let (got_vr, len, bytes_read) = dec.decode_vr_length(&mut cursor).unwrap();
            assert_eq!(got_vr, vr);
            assert_eq!(len, Length(0));
            let expected = if vr.has_reserved_bytes() { 8 } else { 4 };
            assert_eq!(bytes_read, expected, "header width of {}", vr);
            assert_eq!(cursor.position(), expected as u64);
        }
    }

    #[test]
    fn unknown_vr_is_malformed() {
        let dec = ExplicitVRLittleEndianDecoder;
        #[rustfmt::skip]
        let raw: &[u8] = &[
            0x10, 0x00, 0x10, 0x00, // (0010,0010)
            b'Z', b'Z', 0x02, 0x00, // "ZZ", len 2
            b'A', b'B',
        ];
        let err = dec.decode_header(&mut Cursor::new(raw)).unwrap_err();
        assert!(matches!(err, Error::UnknownVr { code: [b'Z', b'Z'], .. }));
        assert!(!err.is_unexpected_eof());
    }

    #[test]
    fn partial_tag_is_an_error() {
        let dec = ExplicitVRLittleEndianDecoder;
        let mut cursor = Cursor::new(&[0x08, 0x00, 0x16][..]);
        let err = dec.try_decode_tag(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::ReadTag { .. }));
        assert!(err.is_unexpected_eof());
    }

    #[test]
    fn decode_items() {
        let dec = ExplicitVRLittleEndianDecoder;
        #[rustfmt::skip]
        let raw: &[u8] = &[
            0xFE, 0xFF, 0x00, 0xE0, 0x0A, 0x00, 0x00, 0x00, // item, len 10
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00, // item delimiter
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00, // sequence delimiter
            0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF,       // truncated item
        ];
        let mut cursor = Cursor::new(raw);
        assert_eq!(
            dec.decode_item_header(&mut cursor).unwrap(),
            (Tag::ITEM, Length(10))
        );
        assert_eq!(
            dec.decode_item_header(&mut cursor).unwrap(),
            (Tag::ITEM_DELIMITER, Length(0))
        );
        assert_eq!(
            dec.decode_item_header(&mut cursor).unwrap(),
            (Tag::SEQUENCE_DELIMITER, Length(0))
        );
        let err = dec.decode_item_header(&mut cursor).unwrap_err();
        assert!(err.is_unexpected_eof());
    }
}
