//! This module contains the data set writer,
//! which serializes an element tree
//! in the Explicit VR Little Endian transfer syntax.
//!
//! Sequences are always written with undefined length
//! and closed with a sequence delimiter.
//! Items are written with their exact encoded length,
//! computed beforehand from their contents.
use super::DEFAULT_MAX_DEPTH;
use dcmtree_core::header::{DataElementHeader, Length};
use dcmtree_core::tree::{ElementRef, ElementTree};
use dcmtree_core::Tag;
use dcmtree_encoding::encode::{
    header_len, Encode, Error as EncodeError, ExplicitVRLittleEndianEncoder, ITEM_HEADER_LEN,
};
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use std::io::{self, Write};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not write header of element {}", tag))]
    WriteHeader {
        tag: Tag,
        #[snafu(backtrace)]
        source: EncodeError,
    },
    #[snafu(display("Could not write value of element {}", tag))]
    WriteValue {
        tag: Tag,
        backtrace: Backtrace,
        source: io::Error,
    },
    /// The element declares a value length but holds no value
    #[snafu(display("Element {} has length {} but no value", tag, len))]
    MissingValue {
        tag: Tag,
        len: Length,
        backtrace: Backtrace,
    },
    /// Sequences are nested deeper than the writer accepts
    #[snafu(display(
        "Sequence {} is nested deeper than {} levels",
        tag,
        max_depth
    ))]
    UnsupportedNesting {
        tag: Tag,
        max_depth: usize,
        backtrace: Backtrace,
    },
    /// The encoded item does not fit in a 32-bit length
    #[snafu(display("Item of sequence {} is too long ({} bytes)", tag, len))]
    ItemTooLong {
        tag: Tag,
        len: u64,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The set of options for the data set writer.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct DataSetWriterOptions {
    /// the maximum number of nested sequence levels
    pub max_depth: usize,
}

impl Default for DataSetWriterOptions {
    fn default() -> Self {
        DataSetWriterOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DataSetWriterOptions {
    /// Create the default set of options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the maximum number of nested sequence levels.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// A device for writing an element tree as an encoded data set.
#[derive(Debug)]
pub struct DataSetWriter<W> {
    to: W,
    encoder: ExplicitVRLittleEndianEncoder,
    options: DataSetWriterOptions,
}

/// Write the whole tree to the given destination.
pub fn write_dataset<W>(to: W, tree: &ElementTree, options: DataSetWriterOptions) -> Result<()>
where
    W: Write,
{
    DataSetWriter::new(to, options).write_tree(tree)
}

/// The number of bytes the element takes once written,
/// header, padding, items and delimiters included.
pub fn encoded_len(element: ElementRef<'_>) -> u64 {
    if element.is_item() {
        return ITEM_HEADER_LEN + item_content_len(element);
    }
    if !element.is_sequence() {
        return header_len(element.vr()) + padded_len(element.value().unwrap_or(&[]));
    }
    if element.children().next().is_none() {
        // header with zero length, then the sequence delimiter
        header_len(element.vr()) + ITEM_HEADER_LEN
    } else {
        // header, items, item delimiter and sequence delimiter
        let items: u64 = element.children().map(encoded_len).sum();
        header_len(element.vr()) + items + 2 * ITEM_HEADER_LEN
    }
}

/// The number of bytes taken by the elements of an item.
fn item_content_len(item: ElementRef<'_>) -> u64 {
    item.children().map(encoded_len).sum()
}

fn padded_len(value: &[u8]) -> u64 {
    let len = value.len() as u64;
    len + (len & 1)
}

impl<W> DataSetWriter<W>
where
    W: Write,
{
    pub fn new(to: W, options: DataSetWriterOptions) -> Self {
        DataSetWriter {
            to,
            encoder: ExplicitVRLittleEndianEncoder,
            options,
        }
    }

    /// Retrieve the inner destination.
    pub fn into_inner(self) -> W {
        self.to
    }

    /// Write every top-level element of the tree, in order.
    pub fn write_tree(&mut self, tree: &ElementTree) -> Result<()> {
        for element in tree.roots() {
            self.write_element(element, 0)?;
        }
        Ok(())
    }

    /// Write an element which is enclosed by `depth` sequences.
    fn write_element(&mut self, element: ElementRef<'_>, depth: usize) -> Result<()> {
        if element.is_sequence() {
            self.write_sequence(element, depth)
        } else {
            self.write_leaf(element)
        }
    }

    fn write_leaf(&mut self, element: ElementRef<'_>) -> Result<()> {
        let tag = element.tag();
        let vr = element.vr();
        let value = match element.value() {
            Some(value) => value,
            None => {
                ensure!(
                    element.length() == Length(0),
                    MissingValueSnafu {
                        tag,
                        len: element.length()
                    }
                );
                &[]
            }
        };
        let len = padded_len(value);
        let header = DataElementHeader::new(tag, vr, Length(len as u32));
        self.encoder
            .encode_element_header(&mut self.to, header)
            .context(WriteHeaderSnafu { tag })?;
        self.to.write_all(value).context(WriteValueSnafu { tag })?;
        if value.len() % 2 == 1 {
            self.to
                .write_all(&[vr.padding()])
                .context(WriteValueSnafu { tag })?;
        }
        Ok(())
    }

    fn write_sequence(&mut self, seq: ElementRef<'_>, depth: usize) -> Result<()> {
        let tag = seq.tag();
        ensure!(
            depth < self.options.max_depth,
            UnsupportedNestingSnafu {
                tag,
                max_depth: self.options.max_depth
            }
        );

        if seq.children().next().is_none() {
            let header = DataElementHeader::new(tag, seq.vr(), Length(0));
            self.encoder
                .encode_element_header(&mut self.to, header)
                .context(WriteHeaderSnafu { tag })?;
            return self
                .encoder
                .encode_sequence_delimiter(&mut self.to)
                .context(WriteHeaderSnafu { tag });
        }

        let header = DataElementHeader::new(tag, seq.vr(), Length::UNDEFINED);
        self.encoder
            .encode_element_header(&mut self.to, header)
            .context(WriteHeaderSnafu { tag })?;

        for item in seq.children() {
            let len = item_content_len(item);
            // the all-ones length is reserved for undefined lengths
            ensure!(len < u64::from(u32::MAX), ItemTooLongSnafu { tag, len });
            self.encoder
                .encode_item_header(&mut self.to, len as u32)
                .context(WriteHeaderSnafu { tag: Tag::ITEM })?;
            for child in item.children() {
                self.write_element(child, depth + 1)?;
            }
        }

        self.encoder
            .encode_item_delimiter(&mut self.to)
            .context(WriteHeaderSnafu {
                tag: Tag::ITEM_DELIMITER,
            })?;
        self.encoder
            .encode_sequence_delimiter(&mut self.to)
            .context(WriteHeaderSnafu {
                tag: Tag::SEQUENCE_DELIMITER,
            })?;
        tracing::trace!("Wrote sequence {} at depth {}", tag, depth);
        Ok(())
    }
}
