//! peruse - PDF text and metadata extraction.
//!
//! The core exposes a PDF as a graph of [`model::Value`]s resolved on
//! demand through the cross-reference table, with thin wrappers for
//! pages, fonts and metadata on top. Accessors return zero values on
//! kind mismatch so broken documents can be traversed without error
//! handling; structural failures surface when opening the file or
//! reading a stream.

pub mod api;
pub mod codec;
pub mod document;
pub mod error;
pub mod font;
pub mod interp;
pub mod model;
pub mod parser;
pub mod utils;

pub use api::{Config, ParsingMode, Processor};
pub use document::page::{
    Column, Columns, Content, Outline, Page, Point, Rect, Row, Rows, Text,
};
pub use document::{AccessPermission, Meta, MetadataFull, Reader};
pub use error::{PdfError, Result};
pub use model::{Value, ValueKind};
