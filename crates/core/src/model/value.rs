//! The reader-backed value view.
//!
//! A `Value` exposes one PDF object together with the reader that can
//! resolve its children. Accessors return zero values on kind mismatch so
//! that a broken document can be walked without error handling; only
//! stream reads surface failures.

use crate::codec;
use crate::document::reader::Reader;
use crate::error::{PdfError, Result};
use crate::font::tables::PDF_DOC_ENCODING;
use crate::model::object::{ObjPtr, Object};
use crate::utils::utf16be_decode;

/// The kind of data underlying a Value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Real,
    String,
    Name,
    Dict,
    Array,
    Stream,
}

/// A single PDF value. The default value is the PDF null.
#[derive(Clone)]
pub struct Value<'r> {
    r: Option<&'r Reader>,
    pub(crate) ptr: ObjPtr,
    pub(crate) data: Object,
}

impl<'r> Value<'r> {
    pub(crate) fn new(r: &'r Reader, ptr: ObjPtr, data: Object) -> Value<'r> {
        Value {
            r: Some(r),
            ptr,
            data,
        }
    }

    /// The null value.
    pub fn null() -> Value<'static> {
        Value {
            r: None,
            ptr: ObjPtr::default(),
            data: Object::Null,
        }
    }

    /// The object pointer this value was resolved through.
    pub fn ptr(&self) -> ObjPtr {
        self.ptr
    }

    pub fn kind(&self) -> ValueKind {
        match self.data {
            Object::Null | Object::Ref(_) => ValueKind::Null,
            Object::Bool(_) => ValueKind::Bool,
            Object::Int(_) => ValueKind::Integer,
            Object::Real(_) => ValueKind::Real,
            Object::String(_) => ValueKind::String,
            Object::Name(_) => ValueKind::Name,
            Object::Dict(_) => ValueKind::Dict,
            Object::Array(_) => ValueKind::Array,
            Object::Stream(_) => ValueKind::Stream,
        }
    }

    pub fn is_null(&self) -> bool {
        self.kind() == ValueKind::Null
    }

    /// Boolean value; false on kind mismatch.
    pub fn boolean(&self) -> bool {
        matches!(self.data, Object::Bool(true))
    }

    /// Integer value; 0 on kind mismatch.
    pub fn int64(&self) -> i64 {
        match self.data {
            Object::Int(n) => n,
            _ => 0,
        }
    }

    /// Float value, coercing from integer; 0.0 on kind mismatch.
    pub fn float64(&self) -> f64 {
        match self.data {
            Object::Real(x) => x,
            Object::Int(n) => n as f64,
            _ => 0.0,
        }
    }

    /// Raw string bytes; empty on kind mismatch.
    pub fn raw_string(&self) -> &[u8] {
        match &self.data {
            Object::String(s) => s,
            _ => &[],
        }
    }

    /// The string interpreted under the "text string" convention:
    /// UTF-16BE when it carries the FE FF byte-order mark, otherwise
    /// PDFDocEncoding.
    pub fn text(&self) -> String {
        let s = self.raw_string();
        if s.len() >= 2 && s[0] == 0xFE && s[1] == 0xFF {
            return utf16be_decode(&s[2..]);
        }
        s.iter().map(|&b| PDF_DOC_ENCODING[b as usize]).collect()
    }

    /// The string interpreted as BOM-less big-endian UTF-16; empty when
    /// the length is odd or the value is not a string.
    pub fn text_utf16(&self) -> String {
        let s = self.raw_string();
        if s.is_empty() || s.len() % 2 == 1 {
            return String::new();
        }
        utf16be_decode(s)
    }

    /// Name without the leading slash; empty on kind mismatch.
    pub fn name(&self) -> &str {
        match &self.data {
            Object::Name(n) => n,
            _ => "",
        }
    }

    /// Look up and resolve a dictionary entry. For a stream this applies
    /// to its header dictionary.
    pub fn key(&self, key: &str) -> Value<'r> {
        let dict = match &self.data {
            Object::Dict(d) => d,
            Object::Stream(s) => &s.hdr,
            _ => return Value::null(),
        };
        let (r, child) = match (self.r, dict.get(key)) {
            (Some(r), Some(child)) => (r, child.clone()),
            _ => return Value::null(),
        };
        r.resolve(self.ptr, child)
    }

    /// Sorted list of dictionary (or stream header) keys.
    pub fn keys(&self) -> Vec<String> {
        let dict = match &self.data {
            Object::Dict(d) => d,
            Object::Stream(s) => &s.hdr,
            _ => return Vec::new(),
        };
        let mut keys: Vec<String> = dict.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Resolve the i'th element of an array; null when out of bounds.
    pub fn index(&self, i: usize) -> Value<'r> {
        let arr = match &self.data {
            Object::Array(a) => a,
            _ => return Value::null(),
        };
        let (r, child) = match (self.r, arr.get(i)) {
            (Some(r), Some(child)) => (r, child.clone()),
            _ => return Value::null(),
        };
        r.resolve(self.ptr, child)
    }

    /// Array length; 0 on kind mismatch.
    pub fn len(&self) -> usize {
        match &self.data {
            Object::Array(a) => a.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wrap a freshly parsed object with this value's reader and parent.
    pub(crate) fn wrap(&self, obj: Object) -> Value<'r> {
        Value {
            r: self.r,
            ptr: self.ptr,
            data: obj,
        }
    }

    /// The stream pointer when this value is a stream.
    pub(crate) fn stream_ptr(&self) -> Option<ObjPtr> {
        match &self.data {
            Object::Stream(s) => Some(s.ptr),
            _ => None,
        }
    }

    /// Read and decode the stream payload.
    ///
    /// The payload is re-read from the byte source and re-decoded through
    /// the declared filter chain on every call.
    pub fn stream_data(&self) -> Result<Vec<u8>> {
        let (r, strm) = match (self.r, &self.data) {
            (Some(r), Object::Stream(s)) => (r, s),
            _ => {
                return Err(PdfError::TypeError {
                    expected: "stream",
                    got: self.data.type_name(),
                })
            }
        };
        if r.encrypted {
            return Err(PdfError::Unsupported("encrypted stream".into()));
        }
        let length = self.key("Length").int64();
        let begin = strm.offset as usize;
        let end = begin
            .checked_add(length.max(0) as usize)
            .filter(|&e| e <= r.data.len())
            .ok_or_else(|| {
                PdfError::Syntax(format!(
                    "stream {} body out of bounds (offset {}, length {})",
                    strm.ptr, strm.offset, length
                ))
            })?;
        let raw = r.data[begin..end].to_vec();
        let filter = self.plain("Filter");
        let parms = self.plain("DecodeParms");
        codec::apply_filters(raw, &filter, &parms)
    }

    /// Resolve a header entry to a direct object, resolving array
    /// elements and dictionary values one level deep.
    fn plain(&self, key: &str) -> Object {
        let v = self.key(key);
        match &v.data {
            Object::Array(items) => {
                Object::Array((0..items.len()).map(|i| v.index(i).data).collect())
            }
            Object::Dict(d) => {
                let keys: Vec<String> = d.keys().cloned().collect();
                Object::Dict(
                    keys.into_iter()
                        .map(|k| {
                            let child = v.key(&k).data;
                            (k, child)
                        })
                        .collect(),
                )
            }
            other => other.clone(),
        }
    }
}

impl std::fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Value({:?})", self.data)
    }
}
