//! Reading and writing of whole data sets.
//!
//! The [`read`] module parses a data set into an [`ElementTree`],
//! and the [`write`] module serializes a tree back.
//! Both sides enforce the same limit on nested sequences.
//!
//! [`ElementTree`]: dcmtree_core::ElementTree

pub mod read;
pub mod write;

pub use self::read::{read_dataset, DataSetReader, DataSetReaderOptions};
pub use self::write::{encoded_len, write_dataset, DataSetWriter, DataSetWriterOptions};

/// The default maximum number of nested sequence levels,
/// both when reading and when writing.
pub const DEFAULT_MAX_DEPTH: usize = 3;
