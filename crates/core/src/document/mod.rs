//! Document structure: reader, cross-reference, pages, metadata.

pub mod metadata;
pub mod page;
pub mod reader;
pub(crate) mod xref;

pub use metadata::{AccessPermission, Meta, MetadataFull};
pub use page::{Column, Columns, Content, Outline, Page, Point, Rect, Row, Rows, Text};
pub use reader::Reader;
