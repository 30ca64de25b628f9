//! UID declarations and the tables of known transfer syntaxes
//! and storage SOP classes.

/// Transfer Syntax: Implicit VR Little Endian
pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
/// Transfer Syntax: Explicit VR Little Endian
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
/// Transfer Syntax: Explicit VR Big Endian (Retired)
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";

/// Trim the padding which may follow a UID value on the wire.
pub fn trim_uid(uid: &str) -> &str {
    uid.trim_end_matches(|c: char| c == '\0' || c == ' ')
}

/// A transfer syntax, as identified by the Transfer Syntax UID
/// of a file's meta group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TransferSyntax {
    /// The UID is not in the table
    Unknown,
    /// Implicit VR Little Endian
    ImplicitVrLittleEndian,
    /// Explicit VR Little Endian
    ExplicitVrLittleEndian,
    /// Explicit VR Big Endian
    ExplicitVrBigEndian,
    /// JPEG Baseline (Process 1)
    JpegBaseline8,
    /// JPEG Extended (Process 2 & 4)
    JpegExtended12,
    /// JPEG Lossless, Non-Hierarchical (Process 14)
    JpegLossless,
    /// JPEG-LS Lossless
    JpegLsLossless,
    /// JPEG-LS Lossy (Near-Lossless)
    JpegLsLossy,
    /// JPEG 2000 Image Compression (Lossless Only)
    Jpeg2000Lossless,
    /// JPEG 2000 Image Compression
    Jpeg2000,
    /// JPEG 2000 Part 2 Multi-component Image Compression (Lossless Only)
    Jpeg2000MultiLossless,
    /// JPEG 2000 Part 2 Multi-component Image Compression
    Jpeg2000Multi,
    /// MPEG2 Main Profile / Main Level
    Mpeg2,
    /// MPEG-4 AVC/H.264 High Profile / Level 4.1
    Mpeg4,
    /// MPEG-4 AVC/H.264 BD-compatible High Profile / Level 4.1
    Mpeg4Bd,
    /// RLE Lossless
    RleLossless,
    /// RFC 2557 MIME encapsulation
    Rfc2557,
    /// XML Encoding
    Xml,
    /// No usable transfer syntax UID was found
    Invalid,
}

const TRANSFER_SYNTAXES: [(TransferSyntax, &str, &str); 18] = {
    use TransferSyntax::*;
    [
        (ImplicitVrLittleEndian, IMPLICIT_VR_LITTLE_ENDIAN, "implicit VR little endian"),
        (ExplicitVrLittleEndian, EXPLICIT_VR_LITTLE_ENDIAN, "explicit VR little endian"),
        (ExplicitVrBigEndian, EXPLICIT_VR_BIG_ENDIAN, "explicit VR big endian"),
        (JpegBaseline8, "1.2.840.10008.1.2.4.50", "lossy JPEG 8-bit compression"),
        (JpegExtended12, "1.2.840.10008.1.2.4.51", "lossy JPEG 12-bit compression"),
        (JpegLossless, "1.2.840.10008.1.2.4.70", "lossless JPEG"),
        (JpegLsLossless, "1.2.840.10008.1.2.4.80", "lossless JPEG-LS"),
        (JpegLsLossy, "1.2.840.10008.1.2.4.81", "lossy JPEG-LS"),
        (Jpeg2000Lossless, "1.2.840.10008.1.2.4.90", "lossless JPEG 2000"),
        (Jpeg2000, "1.2.840.10008.1.2.4.91", "JPEG 2000"),
        (Jpeg2000MultiLossless, "1.2.840.10008.1.2.4.92", "lossless multicomponent JPEG 2000"),
        (Jpeg2000Multi, "1.2.840.10008.1.2.4.93", "multicomponent JPEG 2000"),
        (Mpeg2, "1.2.840.10008.1.2.4.100", "MPEG-2"),
        (Mpeg4, "1.2.840.10008.1.2.4.102", "MPEG-4"),
        (Mpeg4Bd, "1.2.840.10008.1.2.4.103", "MPEG-4 BD-compatible"),
        (RleLossless, "1.2.840.10008.1.2.5", "lossless RLE"),
        (Rfc2557, "1.2.840.10008.1.2.6.1", "RFC 2557"),
        (Xml, "1.2.840.10008.1.2.6.2", "XML encoding"),
    ]
};

impl TransferSyntax {
    /// Identify a transfer syntax by its UID.
    /// Trailing padding is ignored;
    /// UIDs which are not in the table yield [`TransferSyntax::Unknown`].
    pub fn from_uid(uid: &str) -> TransferSyntax {
        let uid = trim_uid(uid);
        TRANSFER_SYNTAXES
            .iter()
            .find(|(_, u, _)| *u == uid)
            .map(|(ts, _, _)| *ts)
            .unwrap_or(TransferSyntax::Unknown)
    }

    /// The UID of this transfer syntax,
    /// or `None` for [`Unknown`](TransferSyntax::Unknown)
    /// and [`Invalid`](TransferSyntax::Invalid).
    pub fn uid(self) -> Option<&'static str> {
        TRANSFER_SYNTAXES
            .iter()
            .find(|(ts, _, _)| *ts == self)
            .map(|(_, uid, _)| *uid)
    }

    /// A short human readable description.
    pub fn description(self) -> &'static str {
        match self {
            TransferSyntax::Unknown => "unknown transfer syntax",
            TransferSyntax::Invalid => "invalid transfer syntax",
            ts => TRANSFER_SYNTAXES
                .iter()
                .find(|(t, _, _)| *t == ts)
                .map(|(_, _, descr)| *descr)
                .unwrap_or("unknown transfer syntax"),
        }
    }

    /// Whether data sets in this transfer syntax can be read and written
    /// by this library.
    #[inline]
    pub fn is_supported(self) -> bool {
        self == TransferSyntax::ExplicitVrLittleEndian
    }
}

impl std::fmt::Display for TransferSyntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.uid() {
            Some(uid) => write!(f, "{} ({})", self.description(), uid),
            None => f.write_str(self.description()),
        }
    }
}

/// A storage SOP class known to this library.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SopClass {
    /// SOP class UID
    pub uid: &'static str,
    /// SOP class name
    pub name: &'static str,
}

/// The table of storage SOP classes recognized by [`sop_class`].
pub const SOP_CLASSES: &[SopClass] = &[
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.1", name: "Computed Radiography Image Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.12.1", name: "X-Ray Angiographic Image Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.128", name: "PET Image Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.128.1", name: "Legacy Converted Enhanced PET Image Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.130", name: "Enhanced PET Image Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.2", name: "CT Image Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.20", name: "Nuclear Medicine Image Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.30", name: "Parametric Map Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.3.1", name: "Ultrasound Multiframe Image Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.4", name: "MR Image Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.4.1", name: "Enhanced MR Image Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.4.2", name: "MR Spectroscopy Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.6.1", name: "Ultrasound Image Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.66", name: "Raw Data Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.66.1", name: "Spatial Registration Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.66.2", name: "Spatial Fiducials Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.66.3", name: "Deformable Spatial Registration Storage" },
    SopClass { uid: "1.2.840.10008.5.1.4.1.1.66.4", name: "Segmentation Storage" },
];

/// Look up a storage SOP class by UID, ignoring trailing padding.
pub fn sop_class(uid: &str) -> Option<&'static SopClass> {
    let uid = trim_uid(uid);
    SOP_CLASSES.iter().find(|sop| sop.uid == uid)
}

/// The name of the storage SOP class with the given UID.
pub fn sop_class_name(uid: &str) -> Option<&'static str> {
    sop_class(uid).map(|sop| sop.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_transfer_syntaxes() {
        assert_eq!(
            TransferSyntax::from_uid("1.2.840.10008.1.2.1\0"),
            TransferSyntax::ExplicitVrLittleEndian
        );
        assert_eq!(
            TransferSyntax::from_uid("1.2.840.10008.1.2"),
            TransferSyntax::ImplicitVrLittleEndian
        );
        assert_eq!(
            TransferSyntax::from_uid("1.2.840.10008.1.2.4.100"),
            TransferSyntax::Mpeg2
        );
        assert_eq!(TransferSyntax::from_uid("1.2.3.4"), TransferSyntax::Unknown);
        assert_eq!(TransferSyntax::from_uid(""), TransferSyntax::Unknown);
    }

    #[test]
    fn transfer_syntax_properties() {
        let ts = TransferSyntax::ExplicitVrLittleEndian;
        assert!(ts.is_supported());
        assert_eq!(ts.uid(), Some("1.2.840.10008.1.2.1"));
        assert_eq!(ts.description(), "explicit VR little endian");
        assert!(!TransferSyntax::ExplicitVrBigEndian.is_supported());
        assert_eq!(TransferSyntax::Invalid.uid(), None);
        assert_eq!(TransferSyntax::Unknown.description(), "unknown transfer syntax");
    }

    #[test]
    fn identify_sop_classes() {
        assert_eq!(
            sop_class_name("1.2.840.10008.5.1.4.1.1.128\0"),
            Some("PET Image Storage")
        );
        assert_eq!(
            sop_class_name("1.2.840.10008.5.1.4.1.1.128.1"),
            Some("Legacy Converted Enhanced PET Image Storage")
        );
        assert_eq!(sop_class_name("1.2.840.10008.5.1.4.1.1.4 "), Some("MR Image Storage"));
        assert_eq!(sop_class_name("1.2.3"), None);
    }
}
