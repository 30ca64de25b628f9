//! This module contains the basic types required for interpreting
//! DICOM data element headers:
//! the attribute tag, the value length, the value representation
//! and the registry of their wire encoding rules.

use snafu::{Backtrace, Snafu};
use std::fmt;
use std::str::{from_utf8, FromStr};

/// Error type for issues constructing a sequence item header.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum SequenceItemHeaderError {
    /// Unexpected header tag.
    /// Only Item (0xFFFE, 0xE000),
    /// Item Delimiter (0xFFFE, 0xE00D),
    /// or Sequence Delimiter (0xFFFE, 0xE0DD)
    /// are admitted.
    #[snafu(display("Unexpected tag {}", tag))]
    UnexpectedTag { tag: Tag, backtrace: Backtrace },
    /// Unexpected delimiter value length.
    /// Must be zero for item and sequence delimiters.
    #[snafu(display("Unexpected delimiter length {}", len))]
    UnexpectedDelimiterLength { len: Length, backtrace: Backtrace },
}

/// Idiomatic alias for a tag's group number.
pub type GroupNumber = u16;
/// Idiomatic alias for a tag's element number.
pub type ElementNumber = u16;

/// The data type for DICOM data element tags.
///
/// Both `(u16, u16)` and `[u16; 2]` can be converted to this type.
///
/// ```
/// # use dcmtree_core::Tag;
/// let tag = Tag::from((0x0010, 0x0010));
/// assert_eq!(tag.to_string(), "(0010,0010)");
/// ```
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy)]
pub struct Tag(pub GroupNumber, pub ElementNumber);

impl Tag {
    /// Item (FFFE,E000)
    pub const ITEM: Tag = Tag(0xFFFE, 0xE000);
    /// Item Delimitation Item (FFFE,E00D)
    pub const ITEM_DELIMITER: Tag = Tag(0xFFFE, 0xE00D);
    /// Sequence Delimitation Item (FFFE,E0DD)
    pub const SEQUENCE_DELIMITER: Tag = Tag(0xFFFE, 0xE0DD);
    /// Transfer Syntax UID (0002,0010)
    pub const TRANSFER_SYNTAX: Tag = Tag(0x0002, 0x0010);
    /// Media Storage SOP Class UID (0002,0002)
    pub const MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag(0x0002, 0x0002);
    /// SOP Class UID (0008,0016)
    pub const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);
    /// Pixel Data (7FE0,0010)
    pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

    /// Getter for the tag's group value.
    #[inline]
    pub fn group(self) -> GroupNumber {
        self.0
    }

    /// Getter for the tag's element value.
    #[inline]
    pub fn element(self) -> ElementNumber {
        self.1
    }

    /// Check whether this tag belongs to the pixel data family:
    /// group 0x7FE0 with a non-zero element number, or group 0x7FE1.
    #[inline]
    pub fn is_pixel_data(self) -> bool {
        (self.0 == 0x7FE0 && self.1 > 0) || self.0 == 0x7FE1
    }

    /// Check whether this is one of the item or delimitation tags
    /// of group 0xFFFE.
    #[inline]
    pub fn is_item_or_delimiter(self) -> bool {
        self == Tag::ITEM || self == Tag::ITEM_DELIMITER || self == Tag::SEQUENCE_DELIMITER
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tag({:#06X?}, {:#06X?})", self.0, self.1)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

impl PartialEq<(u16, u16)> for Tag {
    fn eq(&self, other: &(u16, u16)) -> bool {
        self.0 == other.0 && self.1 == other.1
    }
}

impl From<(u16, u16)> for Tag {
    #[inline]
    fn from(value: (u16, u16)) -> Tag {
        Tag(value.0, value.1)
    }
}

impl From<[u16; 2]> for Tag {
    #[inline]
    fn from(value: [u16; 2]) -> Tag {
        Tag(value[0], value[1])
    }
}

/// Parse a tag from text in the form `GGGG,EEEE`,
/// optionally surrounded by parentheses.
impl FromStr for Tag {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(s);
        let (group, element) = s.split_once(',').ok_or("missing tag separator")?;
        let group = u16::from_str_radix(group.trim(), 16).map_err(|_| "invalid group number")?;
        let element =
            u16::from_str_radix(element.trim(), 16).map_err(|_| "invalid element number")?;
        Ok(Tag(group, element))
    }
}

const UNDEFINED_LEN: u32 = 0xFFFF_FFFF;

/// A type for representing data set content length, in bytes.
/// An internal value of `0xFFFF_FFFF` represents an undefined
/// (unspecified) length, which has to be determined
/// by traversing the content up to its delimiter.
///
/// Unlike lengths in the wire protocol,
/// two undefined lengths compare as equal here,
/// so that trees holding streamed sequences can be compared.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Length(pub u32);

impl Length {
    /// A length that is undefined.
    pub const UNDEFINED: Self = Length(UNDEFINED_LEN);

    /// Create a new length value with the given number of bytes.
    ///
    /// # Panic
    ///
    /// This function will panic if `len` represents an undefined length.
    #[inline]
    pub fn defined(len: u32) -> Self {
        assert_ne!(len, UNDEFINED_LEN);
        Length(len)
    }

    /// Check whether this length is undefined (unknown).
    #[inline]
    pub fn is_undefined(self) -> bool {
        self.0 == UNDEFINED_LEN
    }

    /// Check whether this length is well defined (not undefined).
    #[inline]
    pub fn is_defined(self) -> bool {
        !self.is_undefined()
    }

    /// Fetch the concrete length value, if available.
    /// Returns `None` if it represents an undefined length.
    #[inline]
    pub fn get(self) -> Option<u32> {
        match self.0 {
            UNDEFINED_LEN => None,
            v => Some(v),
        }
    }
}

impl From<u32> for Length {
    #[inline]
    fn from(o: u32) -> Self {
        Length(o)
    }
}

impl fmt::Debug for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            UNDEFINED_LEN => f.write_str("Length(Undefined)"),
            l => f.debug_tuple("Length").field(&l).finish(),
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            UNDEFINED_LEN => f.write_str("U/L"),
            l => write!(f, "{}", &l),
        }
    }
}

/// An enum type for a DICOM value representation.
///
/// Codes which are not recognized map to [`VR::Invalid`].
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
pub enum VR {
    /// Application Entity
    AE,
    /// Age String
    AS,
    /// Attribute Tag
    AT,
    /// Code String
    CS,
    /// Date
    DA,
    /// Decimal String
    DS,
    /// Date Time
    DT,
    /// Floating Point Single
    FL,
    /// Floating Point Double
    FD,
    /// Integer String
    IS,
    /// Long String
    LO,
    /// Long Text
    LT,
    /// Other Byte
    OB,
    /// Other Double
    OD,
    /// Other Float
    OF,
    /// Other Long
    OL,
    /// Other Very Long
    OV,
    /// Other Word
    OW,
    /// Person Name
    PN,
    /// Short String
    SH,
    /// Signed Long
    SL,
    /// Sequence of Items
    SQ,
    /// Signed Short
    SS,
    /// Short Text
    ST,
    /// Signed Very Long
    SV,
    /// Time
    TM,
    /// Unlimited Characters
    UC,
    /// Unique Identifier (UID)
    UI,
    /// Unsigned Long
    UL,
    /// Unknown
    UN,
    /// Universal Resource Identifier or Universal Resource Locator (URI/URL)
    UR,
    /// Unsigned Short
    US,
    /// Unlimited Text
    UT,
    /// Unsigned Very Long
    UV,
    /// Not a known value representation
    Invalid,
}

/// All valid value representations, in registry order.
pub const ALL_VRS: [VR; 34] = {
    use VR::*;
    [
        AE, AS, AT, CS, DA, DS, DT, FL, FD, IS, LO, LT, OB, OD, OF, OL, OV, OW, PN, SH, SL, SQ,
        SS, ST, SV, TM, UC, UI, UL, UN, UR, US, UT, UV,
    ]
};

impl VR {
    /// Look up a value representation by its 2-character code.
    /// Unknown codes yield [`VR::Invalid`].
    pub fn lookup(code: &str) -> VR {
        VR::from_str(code).unwrap_or(VR::Invalid)
    }

    /// Obtain the value representation corresponding to the given two bytes.
    /// Each byte should represent an alphabetic character in upper case.
    /// Returns `None` for unknown codes.
    pub fn from_binary(chars: [u8; 2]) -> Option<Self> {
        from_utf8(chars.as_ref())
            .ok()
            .and_then(|s| VR::from_str(s).ok())
    }

    /// Retrieve a string representation of this VR.
    pub fn to_string(self) -> &'static str {
        use VR::*;
        match self {
            AE => "AE",
            AS => "AS",
            AT => "AT",
            CS => "CS",
            DA => "DA",
            DS => "DS",
            DT => "DT",
            FL => "FL",
            FD => "FD",
            IS => "IS",
            LO => "LO",
            LT => "LT",
            OB => "OB",
            OD => "OD",
            OF => "OF",
            OL => "OL",
            OV => "OV",
            OW => "OW",
            PN => "PN",
            SH => "SH",
            SL => "SL",
            SQ => "SQ",
            SS => "SS",
            ST => "ST",
            SV => "SV",
            TM => "TM",
            UC => "UC",
            UI => "UI",
            UL => "UL",
            UN => "UN",
            UR => "UR",
            US => "US",
            UT => "UT",
            UV => "UV",
            Invalid => "INVALID",
        }
    }

    /// Alias of [`VR::to_string`], named after the registry operation.
    #[inline]
    pub fn name(self) -> &'static str {
        self.to_string()
    }

    /// Retrieve a copy of this VR's byte representation.
    /// The function returns two alphabetic characters in upper case,
    /// or `None` for [`VR::Invalid`].
    pub fn to_bytes(self) -> Option<[u8; 2]> {
        if self == VR::Invalid {
            return None;
        }
        let bytes = self.to_string().as_bytes();
        Some([bytes[0], bytes[1]])
    }

    /// Whether the explicit VR header reserves two extra bytes,
    /// which selects a 4-byte length field instead of a 2-byte one.
    pub fn has_reserved_bytes(self) -> bool {
        use VR::*;
        matches!(self, OB | OD | OF | OL | OV | OW | SQ | SV | UC | UN | UR | UT | UV)
    }

    /// Whether the binary value is made of multi-byte numbers,
    /// and so depends on the byte order of the transfer syntax.
    pub fn is_endian_sensitive(self) -> bool {
        use VR::*;
        matches!(
            self,
            FL | FD | OD | OF | OL | OV | OW | SL | SS | SV | UL | US | UV
        )
    }

    /// The value length assumed when the declared length is undefined,
    /// which is also the maximum length of the value for most textual VRs.
    /// Zero means that no default exists,
    /// and an undefined length is an error for this VR.
    pub fn default_length(self) -> usize {
        use VR::*;
        match self {
            AE => 16,
            AS => 4,
            AT => 4,
            CS => 16,
            DA => 8,
            DS => 16,
            DT => 26,
            FL => 4,
            FD => 8,
            IS => 12,
            LO => 64,
            LT => 10240,
            PN => 64,
            SH => 16,
            SL => 4,
            SS => 2,
            ST => 1024,
            TM => 14,
            UI => 64,
            UL => 4,
            UR => 64,
            US => 2,
            OB | OD | OF | OL | OV | OW | SQ | SV | UC | UN | UT | UV | Invalid => 0,
        }
    }

    /// A short human readable description of the VR.
    pub fn description(self) -> &'static str {
        use VR::*;
        match self {
            AE => "application entity",
            AS => "age string",
            AT => "attribute tag",
            CS => "code string",
            DA => "date",
            DS => "decimal string",
            DT => "date and time",
            FL => "floating point single precision",
            FD => "floating point double precision",
            IS => "integer string",
            LO => "long string",
            LT => "long text",
            OB => "other byte (8-bit) stream",
            OD => "other double (64-bit) stream",
            OF => "other float (32-bit) stream",
            OL => "other long (32-bit) stream",
            OV => "other very long (64-bit) stream",
            OW => "other word (16-bit) stream",
            PN => "person name",
            SH => "short string",
            SL => "signed long (32-bit integer)",
            SQ => "sequence of items",
            SS => "signed short (16-bit integer)",
            ST => "short text",
            SV => "signed very long (64-bit integer)",
            TM => "time",
            UC => "unlimited characters",
            UI => "unique identifier",
            UL => "unsigned long (32-bit integer)",
            UN => "unknown",
            UR => "URI or URL",
            US => "unsigned short (16-bit integer)",
            UT => "unlimited text",
            UV => "unsigned very long (64-bit integer)",
            Invalid => "invalid value representation",
        }
    }

    /// Whether values of this VR are character strings.
    pub fn is_textual(self) -> bool {
        use VR::*;
        matches!(
            self,
            AE | AS | CS | DA | DS | DT | IS | LO | LT | PN | SH | ST | TM | UC | UI | UR | UT
        )
    }

    /// The byte used to pad values of this VR to an even length.
    pub fn padding(self) -> u8 {
        if self.is_textual() && self != VR::UI {
            b' '
        } else {
            0
        }
    }
}

/// Obtain the value representation corresponding to the given string.
/// The string should hold exactly two UTF-8 encoded alphabetic characters
/// in upper case, otherwise no match is made.
impl FromStr for VR {
    type Err = &'static str;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        ALL_VRS
            .iter()
            .copied()
            .find(|vr| vr.to_string() == string)
            .ok_or("no such value representation")
    }
}

impl fmt::Display for VR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(VR::to_string(*self))
    }
}

/// The header of a data element: tag, value representation and length.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct DataElementHeader {
    /// DICOM tag
    pub tag: Tag,
    /// Value Representation
    pub vr: VR,
    /// Element length
    pub len: Length,
}

impl DataElementHeader {
    /// Create a new data element header with the given properties.
    #[inline]
    pub fn new<T: Into<Tag>>(tag: T, vr: VR, len: Length) -> DataElementHeader {
        DataElementHeader {
            tag: tag.into(),
            vr,
            len,
        }
    }

    /// Check whether the header introduces a sequence.
    #[inline]
    pub fn is_sequence(&self) -> bool {
        self.vr == VR::SQ
    }
}

/// Data type for describing a sequence item data element.
/// If the element represents an item, it will also contain
/// the specified length.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SequenceItemHeader {
    /// The cursor contains an item.
    Item {
        /// the length of the item in bytes (can be undefined)
        len: Length,
    },
    /// The cursor read an item delimiter.
    ItemDelimiter,
    /// The cursor read a sequence delimiter.
    SequenceDelimiter,
}

impl SequenceItemHeader {
    /// Create a sequence item header using the element's raw properties.
    /// An error is raised if the tag is not an item or delimiter tag,
    /// or if a delimiter carries a non-zero length.
    pub fn new<T: Into<Tag>>(
        tag: T,
        len: Length,
    ) -> Result<SequenceItemHeader, SequenceItemHeaderError> {
        match tag.into() {
            Tag::ITEM => Ok(SequenceItemHeader::Item { len }),
            Tag::ITEM_DELIMITER | Tag::SEQUENCE_DELIMITER if len != Length(0) => {
                UnexpectedDelimiterLengthSnafu { len }.fail()
            }
            Tag::ITEM_DELIMITER => Ok(SequenceItemHeader::ItemDelimiter),
            Tag::SEQUENCE_DELIMITER => Ok(SequenceItemHeader::SequenceDelimiter),
            tag => UnexpectedTagSnafu { tag }.fail(),
        }
    }

    /// The tag which encodes this header.
    pub fn tag(&self) -> Tag {
        match self {
            SequenceItemHeader::Item { .. } => Tag::ITEM,
            SequenceItemHeader::ItemDelimiter => Tag::ITEM_DELIMITER,
            SequenceItemHeader::SequenceDelimiter => Tag::SEQUENCE_DELIMITER,
        }
    }

    /// The length recorded in this header.
    pub fn length(&self) -> Length {
        match self {
            SequenceItemHeader::Item { len } => *len,
            _ => Length(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_from_u16_pair() {
        let t = Tag::from((0x0010u16, 0x0020u16));
        assert_eq!(0x0010u16, t.group());
        assert_eq!(0x0020u16, t.element());
        assert_eq!(t, (0x0010, 0x0020));
    }

    #[test]
    fn tag_display_and_parse() {
        let t = Tag(0x7FE0, 0x0010);
        assert_eq!(t.to_string(), "(7FE0,0010)");
        assert_eq!(format!("{:?}", t), "Tag(0x7FE0, 0x0010)");
        assert_eq!("7fe0,0010".parse::<Tag>(), Ok(t));
        assert_eq!("(7FE0,0010)".parse::<Tag>(), Ok(t));
        assert!("7FE00010".parse::<Tag>().is_err());
        assert!("XXXX,0010".parse::<Tag>().is_err());
    }

    #[test]
    fn pixel_data_family() {
        assert!(Tag(0x7FE0, 0x0010).is_pixel_data());
        assert!(Tag(0x7FE0, 0x0008).is_pixel_data());
        assert!(Tag(0x7FE1, 0x0000).is_pixel_data());
        assert!(!Tag(0x7FE0, 0x0000).is_pixel_data());
        assert!(!Tag(0x0010, 0x0010).is_pixel_data());
    }

    #[test]
    fn length_sentinel() {
        assert!(Length::UNDEFINED.is_undefined());
        assert_eq!(Length::UNDEFINED.get(), None);
        assert_eq!(Length(8).get(), Some(8));
        assert_eq!(Length::UNDEFINED, Length::UNDEFINED);
        assert_eq!(Length::UNDEFINED.to_string(), "U/L");
        assert_eq!(Length(28).to_string(), "28");
    }

    #[test]
    fn vr_lookup() {
        assert_eq!(VR::lookup("PN"), VR::PN);
        assert_eq!(VR::lookup("SQ"), VR::SQ);
        assert_eq!(VR::lookup("XX"), VR::Invalid);
        assert_eq!(VR::lookup("pn"), VR::Invalid);
        assert_eq!(VR::from_binary(*b"UI"), Some(VR::UI));
        assert_eq!(VR::from_binary([0x00, 0x01]), None);
        assert_eq!(VR::Invalid.to_bytes(), None);
        assert_eq!(VR::OB.to_bytes(), Some(*b"OB"));
        for vr in ALL_VRS {
            assert_eq!(VR::lookup(vr.name()), vr);
        }
    }

    #[test]
    fn vr_registry_properties() {
        assert!(VR::SQ.has_reserved_bytes());
        assert!(VR::UR.has_reserved_bytes());
        assert!(!VR::UI.has_reserved_bytes());
        assert!(!VR::Invalid.has_reserved_bytes());

        assert!(VR::US.is_endian_sensitive());
        assert!(!VR::OB.is_endian_sensitive());

        assert_eq!(VR::LT.default_length(), 10240);
        assert_eq!(VR::UI.default_length(), 64);
        assert_eq!(VR::OB.default_length(), 0);
        assert_eq!(VR::Invalid.default_length(), 0);

        assert_eq!(VR::PN.description(), "person name");
        assert_eq!(VR::Invalid.name(), "INVALID");
    }

    #[test]
    fn padding_bytes() {
        assert_eq!(VR::UI.padding(), 0);
        assert_eq!(VR::PN.padding(), b' ');
        assert_eq!(VR::OB.padding(), 0);
    }

    #[test]
    fn sequence_item_headers() {
        assert_eq!(
            SequenceItemHeader::new(Tag::ITEM, Length(12)).unwrap(),
            SequenceItemHeader::Item { len: Length(12) }
        );
        assert_eq!(
            SequenceItemHeader::new(Tag::SEQUENCE_DELIMITER, Length(0)).unwrap(),
            SequenceItemHeader::SequenceDelimiter
        );
        assert!(matches!(
            SequenceItemHeader::new(Tag::ITEM_DELIMITER, Length(4)),
            Err(SequenceItemHeaderError::UnexpectedDelimiterLength { .. })
        ));
        assert!(matches!(
            SequenceItemHeader::new(Tag::SEQUENCE_DELIMITER, Length(4)),
            Err(SequenceItemHeaderError::UnexpectedDelimiterLength { len: Length(4), .. })
        ));
        assert!(matches!(
            SequenceItemHeader::new(Tag(0x0010, 0x0010), Length(0)),
            Err(SequenceItemHeaderError::UnexpectedTag { .. })
        ));
    }
}
