//! This crate works on top of DICOM encoding primitives
//! to read and write whole data sets
//! in the Explicit VR Little Endian transfer syntax.
//!
//! A data set is parsed in a single recursive-descent pass
//! into an [`ElementTree`](dcmtree_core::ElementTree),
//! accepting sequences and items framed by explicit lengths,
//! by delimiters, or by a mix of both.
//! Writing goes the other way,
//! computing the exact length of every sequence item.
//!
//! ```no_run
//! # use std::fs::File;
//! # use std::io::{BufReader, Seek, SeekFrom};
//! use dcmtree_parser::{read_dataset, DataSetReaderOptions};
//!
//! let mut file = BufReader::new(File::open("image.dcm")?);
//! // skip the preamble and magic code
//! file.seek(SeekFrom::Start(132))?;
//! let tree = read_dataset(file, DataSetReaderOptions::new().header_only(true))?;
//! println!("{} nodes", tree.len());
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]

pub mod dataset;

pub use dataset::read::Error as ReadError;
pub use dataset::write::Error as WriteError;
pub use dataset::{
    read_dataset, write_dataset, DataSetReader, DataSetReaderOptions, DataSetWriter,
    DataSetWriterOptions, DEFAULT_MAX_DEPTH,
};
