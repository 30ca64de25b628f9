//! This module contains the recursive-descent reader
//! which builds an element tree from an encoded DICOM data set.
//!
//! The reader walks the data set one element at a time.
//! Sequences are parsed recursively, item by item,
//! whether they are framed by explicit lengths,
//! by delimitation items,
//! or by a mix of both.
use super::DEFAULT_MAX_DEPTH;
use byteordered::byteorder::{LittleEndian, ReadBytesExt};
use dcmtree_core::header::{DataElementHeader, Length, SequenceItemHeader, SequenceItemHeaderError};
use dcmtree_core::tree::{ElementTree, NodeId, NodeKind, TreeError};
use dcmtree_core::{Tag, VR};
use dcmtree_encoding::decode::{Decode, Error as DecodeError, ExplicitVRLittleEndianDecoder};
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use std::io::{self, Read, Seek, SeekFrom};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// Could not read an element header,
    /// either because of an I/O error
    /// or because the header is malformed
    #[snafu(display("Could not read element header"))]
    ReadHeader {
        #[snafu(backtrace)]
        source: DecodeError,
    },
    #[snafu(display("Could not read item length in sequence {}", tag))]
    ReadItemLength {
        tag: Tag,
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Could not read length of delimiter {}", tag))]
    ReadDelimiterLength {
        tag: Tag,
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Could not read {} value bytes for element tagged {}", len, tag))]
    ReadValue {
        len: u32,
        tag: Tag,
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Could not reposition the data source"))]
    Seek {
        backtrace: Backtrace,
        source: io::Error,
    },
    /// The data set ended before the declared end of a value
    #[snafu(display(
        "Value of element {} truncated: expected {} bytes, found {}",
        tag,
        len,
        read
    ))]
    Truncated {
        tag: Tag,
        len: u32,
        read: u64,
        backtrace: Backtrace,
    },
    /// A value of undefined length has no default length to fall back to
    #[snafu(display("Element {} ({}) has undefined length", tag, vr))]
    UnknownLength {
        tag: Tag,
        vr: VR,
        backtrace: Backtrace,
    },
    /// The data set ended inside a sequence
    #[snafu(display("Sequence {} is not terminated", tag))]
    MissingSequenceDelimiter { tag: Tag, backtrace: Backtrace },
    /// Malformed header: a delimiter with a non-zero length
    #[snafu(display("Malformed header: delimiter {} has length {}", tag, len))]
    MalformedDelimiter {
        tag: Tag,
        len: Length,
        backtrace: Backtrace,
    },
    /// Malformed header: sequences are nested too deeply
    #[snafu(display(
        "Malformed header: sequence {} exceeds the nesting limit of {}",
        tag,
        max_depth
    ))]
    MaxDepthExceeded {
        tag: Tag,
        max_depth: usize,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not attach element {} to the tree", tag))]
    Attach {
        tag: Tag,
        #[snafu(backtrace)]
        source: TreeError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The set of options for the data set reader.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct DataSetReaderOptions {
    /// whether to skip the values of pixel data elements
    /// (group 0x7FE0 with a non-zero element number, or group 0x7FE1)
    pub header_only: bool,
    /// the maximum number of nested sequence levels
    pub max_depth: usize,
}

impl Default for DataSetReaderOptions {
    fn default() -> Self {
        DataSetReaderOptions {
            header_only: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DataSetReaderOptions {
    /// Create the default set of options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip pixel data values,
    /// keeping only their headers in the tree.
    pub fn header_only(mut self, header_only: bool) -> Self {
        self.header_only = header_only;
        self
    }

    /// Replace the maximum number of nested sequence levels.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// What the reader found when asked for the next element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Outcome {
    /// the data source has no more bytes
    NoMoreElements,
    /// the current item ended
    EndOfItem,
    /// an element was read and attached to the tree
    Element(NodeId),
}

/// A recursive-descent reader of a DICOM data set
/// in the Explicit VR Little Endian transfer syntax.
///
/// The source must be positioned at the first element of the data set,
/// which for a DICOM file is right after the magic code.
#[derive(Debug)]
pub struct DataSetReader<S> {
    source: S,
    decoder: ExplicitVRLittleEndianDecoder,
    options: DataSetReaderOptions,
    /// the offset of the next element to parse
    position: u64,
    /// a tag read ahead, which the next element starts with
    peeked: Option<Tag>,
}

/// Read a full data set into a new element tree.
///
/// On error, nothing of the data set is returned.
pub fn read_dataset<S>(source: S, options: DataSetReaderOptions) -> Result<ElementTree>
where
    S: Read + Seek,
{
    DataSetReader::new(source, options).read_tree()
}

impl<S> DataSetReader<S>
where
    S: Read + Seek,
{
    /// Create a new reader over the given source.
    pub fn new(source: S, options: DataSetReaderOptions) -> Self {
        DataSetReader {
            source,
            decoder: ExplicitVRLittleEndianDecoder,
            options,
            position: 0,
            peeked: None,
        }
    }

    /// The number of bytes of the data set parsed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Retrieve the inner data source.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Read elements until the end of the source
    /// into a new element tree.
    ///
    /// The tree is only returned if the whole data set was read.
    pub fn read_tree(&mut self) -> Result<ElementTree> {
        let mut tree = ElementTree::new();
        loop {
            match self.parse_element(&mut tree, None, None, 0)? {
                Outcome::Element(_) => {}
                // not produced outside of items
                Outcome::NoMoreElements | Outcome::EndOfItem => return Ok(tree),
            }
        }
    }

    /// Parse the next element and attach it to `parent`.
    ///
    /// `depth` is the number of sequences enclosing the element.
    /// Inside an item, `item_end` is the offset at which the item
    /// or one of its enclosing sequences ends, if either has a defined length.
    fn parse_element(
        &mut self,
        tree: &mut ElementTree,
        parent: Option<NodeId>,
        item_end: Option<u64>,
        depth: usize,
    ) -> Result<Outcome> {
        let tag = match self.next_tag()? {
            Some(tag) => tag,
            None => return Ok(Outcome::NoMoreElements),
        };

        if parent.is_some() {
            if tag == Tag::ITEM_DELIMITER {
                self.read_delimiter_length(tag)?;
                return Ok(Outcome::EndOfItem);
            }
            if tag == Tag::ITEM || tag == Tag::SEQUENCE_DELIMITER {
                // the item ended without a delimiter,
                // leave this header to the sequence
                self.put_back(tag);
                return Ok(Outcome::EndOfItem);
            }
        }

        let (vr, len, bytes_read) = self
            .decoder
            .decode_vr_length(&mut self.source)
            .context(ReadHeaderSnafu)?;
        self.position += bytes_read as u64;
        tracing::trace!("{} {} {}", tag, vr, len);

        if vr == VR::SQ {
            self.parse_sequence(tree, parent, tag, len, item_end, depth)
        } else {
            self.parse_leaf(tree, parent, tag, vr, len)
        }
    }

    fn parse_leaf(
        &mut self,
        tree: &mut ElementTree,
        parent: Option<NodeId>,
        tag: Tag,
        vr: VR,
        len: Length,
    ) -> Result<Outcome> {
        let len = match len.get() {
            Some(len) => len,
            None => {
                let default = vr.default_length();
                ensure!(default > 0, UnknownLengthSnafu { tag, vr });
                tracing::warn!(
                    "Element {} ({}) has undefined length, reading {} bytes",
                    tag,
                    vr,
                    default
                );
                default as u32
            }
        };

        let value = if self.options.header_only && tag.is_pixel_data() {
            self.skip_value(tag, len)?;
            None
        } else if len == 0 {
            None
        } else {
            Some(self.read_value(tag, len)?)
        };

        let id = tree
            .attach(
                parent,
                NodeKind::Element,
                DataElementHeader::new(tag, vr, Length(len)),
                value,
            )
            .context(AttachSnafu { tag })?;
        Ok(Outcome::Element(id))
    }

    fn parse_sequence(
        &mut self,
        tree: &mut ElementTree,
        parent: Option<NodeId>,
        tag: Tag,
        len: Length,
        item_end: Option<u64>,
        depth: usize,
    ) -> Result<Outcome> {
        ensure!(
            depth < self.options.max_depth,
            MaxDepthExceededSnafu {
                tag,
                max_depth: self.options.max_depth
            }
        );

        let seq = tree
            .attach(
                parent,
                NodeKind::Element,
                DataElementHeader::new(tag, VR::SQ, len),
                None,
            )
            .context(AttachSnafu { tag })?;
        let content_end = len.get().map(|len| self.position + u64::from(len));
        tracing::debug!("Sequence {} starts, length {}", tag, len);

        if len == Length(0) {
            // a delimiter may follow, unless the enclosing item is over
            if item_end.map_or(true, |end| self.position < end) {
                self.skip_sequence_delimiter()?;
            }
            return Ok(Outcome::Element(seq));
        }

        let mut first = true;
        loop {
            if !first && content_end.map_or(false, |end| self.position >= end) {
                // no delimiter needed when the sequence length is explicit
                break;
            }

            let item_tag = match self.next_tag()? {
                Some(item_tag) => item_tag,
                None => return MissingSequenceDelimiterSnafu { tag }.fail(),
            };
            let item_len = match self.source.read_u32::<LittleEndian>() {
                Ok(len) => Length(len),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return MissingSequenceDelimiterSnafu { tag }.fail();
                }
                Err(e) => return Err(e).context(ReadItemLengthSnafu { tag }),
            };
            self.position += 4;

            match SequenceItemHeader::new(item_tag, item_len) {
                Ok(SequenceItemHeader::SequenceDelimiter) => break,
                Ok(SequenceItemHeader::ItemDelimiter) => {}
                Ok(SequenceItemHeader::Item { len: item_len }) => {
                    if first
                        && item_len.is_defined()
                        && content_end.map_or(false, |end| self.position >= end)
                    {
                        tracing::warn!("Sequence {} holds a single empty item", tag);
                        break;
                    }
                    self.parse_item(tree, seq, tag, item_len, content_end, depth)?;
                }
                Err(SequenceItemHeaderError::UnexpectedDelimiterLength { len, .. }) => {
                    return MalformedDelimiterSnafu { tag: item_tag, len }.fail();
                }
                Err(_) => {
                    tracing::warn!(
                        "Expected item in sequence {}, found {}; reading it as a new item",
                        tag,
                        item_tag
                    );
                    self.rewind(8)?;
                    self.parse_item(tree, seq, tag, Length::UNDEFINED, content_end, depth)?;
                }
            }
            first = false;
        }

        tracing::debug!("Sequence {} ends", tag);
        Ok(Outcome::Element(seq))
    }

    /// Create an item under the sequence and read its elements,
    /// until the item delimiter or the end of the item
    /// or sequence as given by their lengths.
    fn parse_item(
        &mut self,
        tree: &mut ElementTree,
        seq: NodeId,
        seq_tag: Tag,
        len: Length,
        seq_end: Option<u64>,
        depth: usize,
    ) -> Result<()> {
        let item = tree
            .attach(
                Some(seq),
                NodeKind::Item,
                DataElementHeader::new(Tag::ITEM, VR::UN, len),
                None,
            )
            .context(AttachSnafu { tag: Tag::ITEM })?;
        let item_end = len.get().map(|len| self.position + u64::from(len));
        let end = match (item_end, seq_end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        loop {
            if end.map_or(false, |end| self.position >= end) {
                return Ok(());
            }
            match self.parse_element(tree, Some(item), end, depth + 1)? {
                Outcome::Element(_) => {}
                Outcome::EndOfItem => return Ok(()),
                Outcome::NoMoreElements => {
                    return MissingSequenceDelimiterSnafu { tag: seq_tag }.fail();
                }
            }
        }
    }

    /// Consume a sequence delimiter if it comes next.
    fn skip_sequence_delimiter(&mut self) -> Result<()> {
        match self.next_tag()? {
            Some(Tag::SEQUENCE_DELIMITER) => self.read_delimiter_length(Tag::SEQUENCE_DELIMITER),
            Some(tag) => {
                self.put_back(tag);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Read the length field of a delimiter, which must be zero.
    fn read_delimiter_length(&mut self, tag: Tag) -> Result<()> {
        let len = self
            .source
            .read_u32::<LittleEndian>()
            .context(ReadDelimiterLengthSnafu { tag })?;
        self.position += 4;
        ensure!(
            len == 0,
            MalformedDelimiterSnafu {
                tag,
                len: Length(len)
            }
        );
        Ok(())
    }

    /// Take the tag put back by the last look-ahead,
    /// or read the next one from the source.
    /// Returns `None` at the end of the source.
    fn next_tag(&mut self) -> Result<Option<Tag>> {
        let tag = match self.peeked.take() {
            Some(tag) => Some(tag),
            None => self
                .decoder
                .try_decode_tag(&mut self.source)
                .context(ReadHeaderSnafu)?,
        };
        if tag.is_some() {
            self.position += 4;
        }
        Ok(tag)
    }

    /// Return a tag just taken with `next_tag`,
    /// so that the next element starts with it.
    fn put_back(&mut self, tag: Tag) {
        self.peeked = Some(tag);
        self.position -= 4;
    }

    fn read_value(&mut self, tag: Tag, len: u32) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let read = self
            .source
            .by_ref()
            .take(u64::from(len))
            .read_to_end(&mut buf)
            .context(ReadValueSnafu { tag, len })?;
        self.position += read as u64;
        ensure!(
            read as u64 == u64::from(len),
            TruncatedSnafu {
                tag,
                len,
                read: read as u64
            }
        );
        Ok(buf)
    }

    fn skip_value(&mut self, tag: Tag, len: u32) -> Result<()> {
        let skipped = io::copy(&mut self.source.by_ref().take(u64::from(len)), &mut io::sink())
            .context(ReadValueSnafu { tag, len })?;
        self.position += skipped;
        ensure!(
            skipped == u64::from(len),
            TruncatedSnafu {
                tag,
                len,
                read: skipped
            }
        );
        Ok(())
    }

    /// Move the source back by `n` bytes just read.
    fn rewind(&mut self, n: u64) -> Result<()> {
        self.source
            .seek(SeekFrom::Current(-(n as i64)))
            .context(SeekSnafu)?;
        self.position -= n;
        Ok(())
    }
}
