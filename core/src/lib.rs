#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]

//! This is the core library of dcmtree,
//! containing the data structures of a DICOM data set held in memory.
//!
//! The current structure of this crate is as follows:
//!
//! - [`header`] comprises the data types of a DICOM element header:
//!   tags, value lengths and value representations,
//!   together with the registry of their wire encoding rules.
//! - [`tree`] holds the arena-based element tree,
//!   its construction and traversal methods,
//!   and the cross-level tag search.
//! - [`value`] interprets raw element values
//!   as text, integers, real numbers and dates.
//! - [`uid`] contains the tables of known transfer syntaxes
//!   and storage SOP classes.

pub mod header;
pub mod tree;
pub mod uid;
pub mod value;

pub use header::{DataElementHeader, Length, SequenceItemHeader, Tag, VR};
pub use tree::{ElementRef, ElementTree, NodeId, NodeKind};
pub use uid::TransferSyntax;

// re-export crates that are part of the public API
pub use chrono;
