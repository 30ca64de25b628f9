use dcmtree_parser::{read_dataset, DataSetReaderOptions};
use snafu::{ensure, ResultExt};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::meta::{read_transfer_syntax, verify_magic};
use crate::{
    FileDicomObject, NotDicomSnafu, OpenFileSnafu, ParseDataSetSnafu, ReadError,
    UnsupportedTransferSyntaxSnafu,
};

/// Create a DICOM object by reading from a byte source.
///
/// The source must start with the 128-byte preamble,
/// followed by the magic code and the file meta group.
pub fn from_reader<R>(from: R) -> Result<FileDicomObject, ReadError>
where
    R: Read + Seek,
{
    OpenFileOptions::new().from_reader(from)
}

/// Create a DICOM object by reading from a file.
///
/// This function assumes the standard file encoding structure: 128-byte
/// preamble, magic code, file meta group, and the rest of the data set.
pub fn open_file<P>(path: P) -> Result<FileDicomObject, ReadError>
where
    P: AsRef<Path>,
{
    OpenFileOptions::new().open_file(path)
}

/// A builder type for opening a DICOM file with additional options.
///
/// # Example
///
/// ```no_run
/// # use dcmtree_object::OpenFileOptions;
/// let file = OpenFileOptions::new()
///     .header_only(true)
///     .open_file("path/to/file.dcm")?;
/// # Result::<(), Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Default, Clone)]
#[non_exhaustive]
pub struct OpenFileOptions {
    reader: DataSetReaderOptions,
}

impl OpenFileOptions {
    pub fn new() -> Self {
        OpenFileOptions::default()
    }

    /// Set whether to skip the values of pixel data elements.
    ///
    /// Their headers are still kept in the tree,
    /// with the length declared in the file.
    pub fn header_only(mut self, header_only: bool) -> Self {
        self.reader = self.reader.header_only(header_only);
        self
    }

    /// Set the maximum number of nested sequence levels.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.reader = self.reader.max_depth(max_depth);
        self
    }

    /// Open the file at the given path.
    pub fn open_file<P>(self, path: P) -> Result<FileDicomObject, ReadError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path).context(OpenFileSnafu { filename: path })?;
        tracing::debug!("Opening {}", path.display());
        self.from_reader(BufReader::new(file))
    }

    /// Obtain a DICOM object by reading from a byte source
    /// which starts with the 128-byte preamble.
    pub fn from_reader<R>(self, mut from: R) -> Result<FileDicomObject, ReadError>
    where
        R: Read + Seek,
    {
        ensure!(verify_magic(&mut from), NotDicomSnafu);
        let ts = read_transfer_syntax(&mut from);
        ensure!(ts.is_supported(), UnsupportedTransferSyntaxSnafu { ts });

        let tree = read_dataset(from, self.reader).context(ParseDataSetSnafu)?;
        Ok(FileDicomObject::from_tree(tree))
    }
}

#[cfg(test)]
mod tests {
    use super::OpenFileOptions;
    use crate::ReadError;
    use dcmtree_core::TransferSyntax;
    use std::io::Cursor;

    fn file_with(body: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; 128];
        data.extend_from_slice(b"DICM");
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn reject_non_dicom_data() {
        let data = vec![0u8; 200];
        let err = OpenFileOptions::new()
            .from_reader(Cursor::new(data))
            .unwrap_err();
        assert!(matches!(err, ReadError::NotDicom { .. }), "got {:?}", err);
    }

    #[test]
    fn reject_other_transfer_syntaxes() {
        #[rustfmt::skip]
        let data = file_with(&[
            // (0002,0010) Transfer Syntax UID: Implicit VR Little Endian
            0x02, 0x00, 0x10, 0x00, b'U', b'I', 0x12, 0x00,
            b'1', b'.', b'2', b'.', b'8', b'4', b'0', b'.', b'1', b'0', b'0', b'0', b'8', b'.',
            b'1', b'.', b'2', 0x00,
        ]);
        let err = OpenFileOptions::new()
            .from_reader(Cursor::new(data))
            .unwrap_err();
        assert!(
            matches!(
                err,
                ReadError::UnsupportedTransferSyntax {
                    ts: TransferSyntax::ImplicitVrLittleEndian,
                    ..
                }
            ),
            "got {:?}",
            err
        );

        // no transfer syntax element at all
        let data = file_with(&[0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x02, 0x00, b'M', b'R']);
        let err = OpenFileOptions::new()
            .from_reader(Cursor::new(data))
            .unwrap_err();
        assert!(
            matches!(
                err,
                ReadError::UnsupportedTransferSyntax {
                    ts: TransferSyntax::Invalid,
                    ..
                }
            ),
            "got {:?}",
            err
        );
    }
}
