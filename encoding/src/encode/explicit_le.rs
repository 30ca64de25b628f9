//! Explicit VR Little Endian syntax transfer implementation.

use crate::encode::{
    Encode, InvalidVrSnafu, LengthOverflowSnafu, Result, WriteHeaderSnafu,
    WriteItemDelimiterSnafu, WriteItemHeaderSnafu, WriteSequenceDelimiterSnafu, WriteTagSnafu,
};
use byteordered::byteorder::{ByteOrder, LittleEndian};
use dcmtree_core::header::DataElementHeader;
use dcmtree_core::Tag;
use snafu::{ensure, OptionExt, ResultExt};
use std::io::Write;

/// A concrete encoder for the transfer syntax ExplicitVRLittleEndian
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitVRLittleEndianEncoder;

fn item_header(tag: Tag, len: u32) -> [u8; 8] {
    let mut buf = [0u8; 8];
    LittleEndian::write_u16(&mut buf[0..], tag.group());
    LittleEndian::write_u16(&mut buf[2..], tag.element());
    LittleEndian::write_u32(&mut buf[4..], len);
    buf
}

impl Encode for ExplicitVRLittleEndianEncoder {
    fn encode_tag<W>(&self, mut to: W, tag: Tag) -> Result<()>
    where
        W: Write,
    {
        let mut buf = [0u8; 4];
        LittleEndian::write_u16(&mut buf[..], tag.group());
        LittleEndian::write_u16(&mut buf[2..], tag.element());
        to.write_all(&buf).context(WriteTagSnafu)
    }

    fn encode_element_header<W>(&self, mut to: W, de: DataElementHeader) -> Result<usize>
    where
        W: Write,
    {
        let vr_bytes = de.vr.to_bytes().context(InvalidVrSnafu { tag: de.tag })?;
        if de.vr.has_reserved_bytes() {
            let mut buf = [0u8; 12];
            LittleEndian::write_u16(&mut buf[0..], de.tag.group());
            LittleEndian::write_u16(&mut buf[2..], de.tag.element());
            buf[4] = vr_bytes[0];
            buf[5] = vr_bytes[1];
            // buf[6..8] is kept zero'd
            LittleEndian::write_u32(&mut buf[8..], de.len.0);
            to.write_all(&buf).context(WriteHeaderSnafu)?;
            Ok(12)
        } else {
            ensure!(
                de.len.0 <= u32::from(u16::MAX),
                LengthOverflowSnafu {
                    tag: de.tag,
                    vr: de.vr,
                    len: de.len,
                }
            );
            let mut buf = [0u8; 8];
            LittleEndian::write_u16(&mut buf[0..], de.tag.group());
            LittleEndian::write_u16(&mut buf[2..], de.tag.element());
            buf[4] = vr_bytes[0];
            buf[5] = vr_bytes[1];
            LittleEndian::write_u16(&mut buf[6..], de.len.0 as u16);
            to.write_all(&buf).context(WriteHeaderSnafu)?;
            Ok(8)
        }
    }

    fn encode_item_header<W>(&self, mut to: W, len: u32) -> Result<()>
    where
        W: Write,
    {
        to.write_all(&item_header(Tag::ITEM, len))
            .context(WriteItemHeaderSnafu)
    }

    fn encode_item_delimiter<W>(&self, mut to: W) -> Result<()>
    where
        W: Write,
    {
        to.write_all(&item_header(Tag::ITEM_DELIMITER, 0))
            .context(WriteItemDelimiterSnafu)
    }

    fn encode_sequence_delimiter<W>(&self, mut to: W) -> Result<()>
    where
        W: Write,
    {
        to.write_all(&item_header(Tag::SEQUENCE_DELIMITER, 0))
            .context(WriteSequenceDelimiterSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::ExplicitVRLittleEndianEncoder;
    use crate::decode::{Decode, ExplicitVRLittleEndianDecoder};
    use crate::encode::{header_len, Encode, Error};
    use dcmtree_core::header::{DataElementHeader, Length, ALL_VRS};
    use dcmtree_core::{Tag, VR};
    use std::io::Cursor;

    #[test]
    fn encode_data_elements() {
        let enc = ExplicitVRLittleEndianEncoder;
        let mut buf = Vec::new();

        // (0002,0002) Media Storage SOP Class UID, UI, len 26
        let de = DataElementHeader::new(Tag(0x0002, 0x0002), VR::UI, Length(26));
        assert_eq!(enc.encode_element_header(&mut buf, de).unwrap(), 8);
        // (7FE0,0010) Pixel Data, OB, len 4
        let de = DataElementHeader::new(Tag::PIXEL_DATA, VR::OB, Length(4));
        assert_eq!(enc.encode_element_header(&mut buf, de).unwrap(), 12);

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x02, 0x00, 0x02, 0x00, b'U', b'I', 0x1A, 0x00,
            0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn encode_items_and_delimiters() {
        let enc = ExplicitVRLittleEndianEncoder;
        let mut buf = Vec::new();
        enc.encode_item_header(&mut buf, 16).unwrap();
        enc.encode_item_delimiter(&mut buf).unwrap();
        enc.encode_sequence_delimiter(&mut buf).unwrap();

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0xFE, 0xFF, 0x00, 0xE0, 0x10, 0x00, 0x00, 0x00,
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn headers_decode_back() {
        let enc = ExplicitVRLittleEndianEncoder;
        let dec = ExplicitVRLittleEndianDecoder;
        for vr in ALL_VRS {
            let de = DataElementHeader::new(Tag(0x0009, 0x1001), vr, Length(6));
            let mut buf = Vec::new();
            let written = enc.encode_element_header(&mut buf, de).unwrap();
            assert_eq!(written as u64, header_len(vr));
            let (decoded, read) = dec.decode_header(&mut Cursor::new(&buf)).unwrap();
            assert_eq!(decoded, de);
            assert_eq!(read, written);
        }
    }

    #[test]
    fn reject_unencodable_headers() {
        let enc = ExplicitVRLittleEndianEncoder;
        let de = DataElementHeader::new(Tag(0x0010, 0x0010), VR::Invalid, Length(2));
        assert!(matches!(
            enc.encode_element_header(Vec::new(), de),
            Err(Error::InvalidVr { .. })
        ));
        let de = DataElementHeader::new(Tag(0x0010, 0x0010), VR::PN, Length(0x1_0000));
        assert!(matches!(
            enc.encode_element_header(Vec::new(), de),
            Err(Error::LengthOverflow { .. })
        ));
    }
}
