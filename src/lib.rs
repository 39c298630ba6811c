#![warn(rust_2018_idioms)]

//! Run-compressed encoding of sparse, ordinal-keyed integer mappings.
//!
//! Two codecs share one segmentation engine:
//!
//! - [`cmap`] encodes and decodes TrueType/OpenType `cmap` format 4
//!   subtables (character code to glyph id),
//! - [`widths`] emits and parses the `W`/`DW` width entries of a PDF
//!   CID font dictionary (CID to advance width).
//!
//! Both take a [`mapping::SortedMapping`], enumerate the run encodings the
//! target format admits, and pick the cheapest partition with the
//! shortest-path solver in [`segment`].

/// Reading and writing of binary data.
pub mod binary;
pub mod cmap;
pub mod error;
pub mod mapping;
pub mod segment;
pub mod size;
pub mod widths;
