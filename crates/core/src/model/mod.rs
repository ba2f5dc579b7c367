//! PDF object model: raw objects and the reader-backed value view.

pub mod object;
pub mod value;

pub use object::{Dict, ObjDef, ObjPtr, Object, Stream};
pub use value::{Value, ValueKind};
