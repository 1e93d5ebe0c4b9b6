//! Purpose: Define the stable public surface of the crate.
//! Exports: Frame and column types, the codec, envelopes and file I/O.
//! Role: Public, additive-only boundary; internal storage modules stay private.
//! Invariants: This module is the only public path to the core primitives.

pub use crate::core::codec::{deserialize, serialize};
pub use crate::core::column::{Cell, Column, ElementKind, Flavour, NA_TEXT};
pub use crate::core::convert::{convert, copy_of, merge};
pub use crate::core::envelope::{compress, decompress, from_base64, to_base64, FILE_MAGIC};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::file::{read_file, write_file, FILE_EXTENSION};
pub use crate::core::frame::{ColumnSelector, Frame};
