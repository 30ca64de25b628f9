//! This crate contains a high-level abstraction for reading and writing
//! DICOM files as element trees.
//!
//! Loading a DICOM file can be done with ease via the function [`open_file`].
//! For additional file reading options, use [`OpenFileOptions`].
//! The resulting [`FileDicomObject`] dereferences to its [`ElementTree`],
//! which can be searched and traversed.
//!
//! # Examples
//!
//! Read an object and fetch some attributes:
//!
//! ```no_run
//! use dcmtree_object::{open_file, Tag};
//! # fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! let obj = open_file("0001.dcm")?;
//!
//! if let Some(name) = obj.find_tag(Tag(0x0010, 0x0010)) {
//!     println!("Patient name: {}", name.to_string_lossy());
//! }
//! let rows = obj.find_tag(Tag(0x0028, 0x0010)).map(|e| e.to_int()).transpose()?;
//! # Ok(())
//! # }
//! ```
//!
//! Pixel data values can be left out
//! by using [`OpenFileOptions`]:
//!
//! ```no_run
//! use dcmtree_object::OpenFileOptions;
//!
//! let obj = OpenFileOptions::new()
//!     .header_only(true)
//!     .open_file("0002.dcm")?;
//! # Result::<(), dcmtree_object::ReadError>::Ok(())
//! ```
//!
//! Objects can be built from scratch and written to a new file:
//!
//! ```no_run
//! use dcmtree_object::{FileDicomObject, Tag, VR};
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut obj = FileDicomObject::new_empty();
//! obj.append_element(None, Tag(0x0010, 0x0010), VR::PN, "Doe^John")?;
//! obj.write_to_file("0001_new.dcm")?;
//! # Ok(())
//! # }
//! ```
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]

pub mod file;
pub mod meta;

pub use crate::file::{from_reader, open_file, OpenFileOptions};
pub use dcmtree_core::uid::sop_class_name;
pub use dcmtree_core::{ElementRef, ElementTree, NodeId, Tag, TransferSyntax, VR};
pub use dcmtree_parser::{DataSetWriterOptions, DEFAULT_MAX_DEPTH};

use dcmtree_core::uid::{trim_uid, EXPLICIT_VR_LITTLE_ENDIAN};
use dcmtree_parser::{write_dataset, ReadError as ParseError, WriteError as PrintError};
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::meta::DICM_MAGIC_CODE;

/// An error which may occur when loading a DICOM object
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ReadError {
    #[snafu(display("Could not open file '{}'", filename.display()))]
    OpenFile {
        filename: std::path::PathBuf,
        backtrace: Backtrace,
        source: std::io::Error,
    },
    /// The source has no `DICM` magic code after the preamble
    #[snafu(display("Not a DICOM file"))]
    NotDicom { backtrace: Backtrace },
    #[snafu(display("Unsupported transfer syntax: {}", ts))]
    UnsupportedTransferSyntax {
        ts: TransferSyntax,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not parse data set"))]
    ParseDataSet {
        #[snafu(backtrace)]
        source: ParseError,
    },
}

/// An error which may occur when writing a DICOM object
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum WriteError {
    #[snafu(display("Could not write to file '{}'", filename.display()))]
    WriteFile {
        filename: std::path::PathBuf,
        backtrace: Backtrace,
        source: std::io::Error,
    },
    #[snafu(display("Could not write object preamble"))]
    WritePreamble {
        backtrace: Backtrace,
        source: std::io::Error,
    },
    #[snafu(display("Could not write magic code"))]
    WriteMagicCode {
        backtrace: Backtrace,
        source: std::io::Error,
    },
    #[snafu(display("Could not flush written data"))]
    Flush {
        backtrace: Backtrace,
        source: std::io::Error,
    },
    /// There are no elements to write
    #[snafu(display("Cannot write an empty data set"))]
    EmptyDataSet { backtrace: Backtrace },
    #[snafu(display("Unsupported transfer syntax: {}", ts))]
    WriteUnsupportedTransferSyntax {
        ts: TransferSyntax,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not print data set"))]
    PrintDataSet {
        #[snafu(backtrace)]
        source: PrintError,
    },
}

/// A DICOM file held in memory:
/// the file meta group and the main data set,
/// as a single element tree.
///
/// The transfer syntax is the one declared
/// by the Transfer Syntax UID element (0002,0010) of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDicomObject {
    tree: ElementTree,
}

impl FileDicomObject {
    /// Create a new object holding only a Transfer Syntax UID element
    /// for Explicit VR Little Endian.
    pub fn new_empty() -> Self {
        let mut tree = ElementTree::new();
        if let Err(e) =
            tree.append_element(None, Tag::TRANSFER_SYNTAX, VR::UI, EXPLICIT_VR_LITTLE_ENDIAN)
        {
            // a top-level UI element is always accepted
            tracing::error!("Could not create transfer syntax element: {}", e);
        }
        FileDicomObject { tree }
    }

    /// Wrap an existing element tree.
    pub fn from_tree(tree: ElementTree) -> Self {
        FileDicomObject { tree }
    }

    /// Retrieve the element tree.
    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    /// Retrieve the element tree for modification.
    pub fn tree_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }

    /// Take the element tree out of the object.
    pub fn into_tree(self) -> ElementTree {
        self.tree
    }

    /// The transfer syntax declared in the tree,
    /// or [`TransferSyntax::Invalid`] if the tree declares none.
    pub fn transfer_syntax(&self) -> TransferSyntax {
        match self.tree.find_tag(Tag::TRANSFER_SYNTAX) {
            Some(e) if e.vr() == VR::UI => match e.value() {
                Some(v) => TransferSyntax::from_uid(trim_uid(&String::from_utf8_lossy(v))),
                None => TransferSyntax::Invalid,
            },
            _ => TransferSyntax::Invalid,
        }
    }

    /// The UID of the SOP class of the object,
    /// from the Media Storage SOP Class UID of the meta group,
    /// or else from the SOP Class UID of the data set.
    pub fn sop_class_uid(&self) -> Option<String> {
        [Tag::MEDIA_STORAGE_SOP_CLASS_UID, Tag::SOP_CLASS_UID]
            .into_iter()
            .filter_map(|tag| self.tree.find_tag(tag))
            .find_map(|e| e.value().map(|v| trim_uid(&String::from_utf8_lossy(v)).to_string()))
    }

    /// The name of the SOP class of the object, if it is a known one.
    pub fn sop_class_name(&self) -> Option<&'static str> {
        self.sop_class_uid().and_then(|uid| sop_class_name(&uid))
    }

    /// Write the object into a new file at the given path,
    /// with a zeroed preamble.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteError> {
        let path = path.as_ref();
        self.check_writable()?;
        let file = File::create(path).context(WriteFileSnafu { filename: path })?;
        let mut to = BufWriter::new(file);

        // write preamble
        to.write_all(&[0_u8; 128][..])
            .context(WriteFileSnafu { filename: path })?;

        // write magic sequence
        to.write_all(&DICM_MAGIC_CODE)
            .context(WriteFileSnafu { filename: path })?;

        write_dataset(&mut to, &self.tree, DataSetWriterOptions::default())
            .context(PrintDataSetSnafu)?;
        to.flush().context(WriteFileSnafu { filename: path })?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }

    /// Write the entire object as a DICOM file
    /// into the given writer.
    pub fn write_all<W: Write>(&self, to: W) -> Result<(), WriteError> {
        self.write_with_options(to, DataSetWriterOptions::default())
    }

    /// Write the entire object as a DICOM file
    /// into the given writer, with the given data set writing options.
    pub fn write_with_options<W: Write>(
        &self,
        to: W,
        options: DataSetWriterOptions,
    ) -> Result<(), WriteError> {
        self.check_writable()?;
        let mut to = BufWriter::new(to);

        // write preamble
        to.write_all(&[0_u8; 128][..]).context(WritePreambleSnafu)?;

        // write magic sequence
        to.write_all(&DICM_MAGIC_CODE)
            .context(WriteMagicCodeSnafu)?;

        write_dataset(&mut to, &self.tree, options).context(PrintDataSetSnafu)?;
        to.flush().context(FlushSnafu)?;
        Ok(())
    }

    fn check_writable(&self) -> Result<(), WriteError> {
        ensure!(!self.tree.is_empty(), EmptyDataSetSnafu);
        let ts = self.transfer_syntax();
        ensure!(ts.is_supported(), WriteUnsupportedTransferSyntaxSnafu { ts });
        Ok(())
    }
}

impl Default for FileDicomObject {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl Deref for FileDicomObject {
    type Target = ElementTree;

    fn deref(&self) -> &ElementTree {
        &self.tree
    }
}

impl DerefMut for FileDicomObject {
    fn deref_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::{FileDicomObject, WriteError};
    use crate::from_reader;
    use dcmtree_core::{ElementTree, Tag, TransferSyntax, VR};
    use std::io::Cursor;

    #[test]
    fn new_object_declares_explicit_vr_little_endian() {
        let obj = FileDicomObject::new_empty();
        assert_eq!(obj.transfer_syntax(), TransferSyntax::ExplicitVrLittleEndian);
        assert_eq!(obj.len(), 1);
        // the UID is padded to an even length
        let ts = obj.find_tag(Tag::TRANSFER_SYNTAX).unwrap();
        assert_eq!(ts.length().0, 20);
    }

    #[test]
    fn write_and_read_back() {
        let mut obj = FileDicomObject::new_empty();
        obj.append_element(None, Tag::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.4")
            .unwrap();
        obj.append_element(None, Tag(0x0010, 0x0010), VR::PN, "Doe^John")
            .unwrap();
        assert_eq!(obj.sop_class_name(), Some("MR Image Storage"));

        let mut out = Vec::new();
        obj.write_all(&mut out).unwrap();
        assert_eq!(&out[128..132], b"DICM");
        assert!(out[..128].iter().all(|b| *b == 0));

        let read = from_reader(Cursor::new(out)).unwrap();
        assert_eq!(read, obj);
        assert_eq!(
            read.find_tag(Tag(0x0010, 0x0010)).unwrap().to_string_lossy(),
            "Doe^John"
        );
    }

    #[test]
    fn writing_guards() {
        let obj = FileDicomObject::from_tree(ElementTree::new());
        let err = obj.write_all(Vec::new()).unwrap_err();
        assert!(matches!(err, WriteError::EmptyDataSet { .. }), "got {:?}", err);

        let mut tree = ElementTree::new();
        tree.append_element(None, Tag::TRANSFER_SYNTAX, VR::UI, "1.2.840.10008.1.2")
            .unwrap();
        let obj = FileDicomObject::from_tree(tree);
        assert_eq!(obj.transfer_syntax(), TransferSyntax::ImplicitVrLittleEndian);
        let err = obj.write_all(Vec::new()).unwrap_err();
        assert!(
            matches!(err, WriteError::WriteUnsupportedTransferSyntax { .. }),
            "got {:?}",
            err
        );
    }
}
