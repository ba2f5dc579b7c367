//! PDF reader: open, validate, build the xref, resolve objects.

use crate::document::xref::{self, XrefEnt};
use crate::error::{PdfError, Result};
use crate::model::value::Value;
use crate::model::{Dict, ObjPtr, Object};
use crate::parser::ObjectParser;
use bytes::Bytes;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, error};

/// A single PDF file open for reading.
///
/// The reader owns the byte source and the merged cross-reference table;
/// both are immutable after construction, so a reader can be shared
/// across threads. Values are constructed on demand during traversal and
/// re-parsed on every resolution.
pub struct Reader {
    pub(crate) data: Bytes,
    pub(crate) xref: Vec<XrefEnt>,
    trailer: Dict,
    trailer_ptr: ObjPtr,
    pub(crate) encrypted: bool,
    version: (u8, u8),
}

impl Reader {
    /// Open a PDF from shared bytes.
    pub fn from_bytes(data: Bytes) -> Result<Reader> {
        let version = check_header(&data)?;
        debug!(major = version.0, minor = version.1, "header accepted");
        check_eof_marker(&data)?;
        let startxref = xref::find_startxref(&data)?;
        let built = xref::read_xref(&data, startxref)?;
        let encrypted = built.trailer.contains_key("Encrypt");
        debug!(
            objects = built.table.len(),
            encrypted, "cross-reference built"
        );
        Ok(Reader {
            data,
            xref: built.table,
            trailer: built.trailer,
            trailer_ptr: built.trailer_ptr,
            encrypted,
            version,
        })
    }

    /// Open a PDF file from disk via a memory map.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Reader> {
        let file = File::open(path.as_ref())?;
        // Safety: the map is wrapped in Bytes which keeps it alive for
        // the reader's lifetime; the file is not mutated while mapped.
        let mmap = unsafe { Mmap::map(&file)? };
        debug!(path = %path.as_ref().display(), size = mmap.len(), "opened file");
        Self::from_bytes(Bytes::from_owner(mmap))
    }

    /// The PDF header version, e.g. (1, 7).
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// Whether the trailer carries an `/Encrypt` dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// The file's trailer dictionary as a Value.
    pub fn trailer(&self) -> Value<'_> {
        Value::new(self, self.trailer_ptr, Object::Dict(self.trailer.clone()))
    }

    /// Resolve a stored child object into a Value, chasing indirect
    /// references through the xref.
    ///
    /// Any failure along the way (out-of-range number, stale slot,
    /// mismatched definition, broken object stream) yields the null
    /// value: traversal never aborts.
    pub(crate) fn resolve(&self, parent: ObjPtr, obj: Object) -> Value<'_> {
        let mut parent = parent;
        let mut obj = obj;
        let mut depth = 0;
        while let Object::Ref(ptr) = obj {
            // Cycles through the xref would re-enter the same identity;
            // a fixed depth bound keeps resolution total.
            if depth > 32 {
                return Value::null();
            }
            depth += 1;
            let ent = match self.xref.get(ptr.id as usize) {
                Some(e) => *e,
                None => return Value::null(),
            };
            if ent.ptr != ptr || (!ent.in_stream && ent.offset == 0) {
                return Value::null();
            }
            obj = if ent.in_stream {
                match self.load_from_objstm(ent.stream, ptr) {
                    Ok(o) => o,
                    Err(e) => {
                        error!(ptr = %ptr, error = %e, "object stream lookup failed");
                        return Value::null();
                    }
                }
            } else {
                match self.parse_object_at(ent.offset, ptr) {
                    Ok(o) => o,
                    Err(e) => {
                        error!(ptr = %ptr, error = %e, "object load failed");
                        return Value::null();
                    }
                }
            };
            parent = ptr;
        }
        Value::new(self, parent, obj)
    }

    /// Parse the `N G obj` definition at a file offset and verify its
    /// identity against the requested pointer.
    fn parse_object_at(&self, offset: u64, want: ObjPtr) -> Result<Object> {
        if offset as usize >= self.data.len() {
            return Err(PdfError::Syntax(format!(
                "object offset {} beyond end of file",
                offset
            )));
        }
        let mut parser = ObjectParser::new(&self.data[offset as usize..], offset);
        let def = parser.parse_indirect_object()?;
        if def.ptr != want {
            return Err(PdfError::Syntax(format!(
                "loading {}: found {}",
                want, def.ptr
            )));
        }
        Ok(def.obj)
    }

    /// Find an object packed inside a `/ObjStm` object stream, following
    /// `Extends` chains as needed.
    fn load_from_objstm(&self, mut stream_ptr: ObjPtr, target: ObjPtr) -> Result<Object> {
        for _ in 0..32 {
            let strm = self.resolve(ObjPtr::default(), Object::Ref(stream_ptr));
            let hdr_type = strm.key("Type");
            if hdr_type.name() != "ObjStm" {
                return Err(PdfError::Syntax(format!(
                    "object {} is not an object stream",
                    stream_ptr
                )));
            }
            let n = strm.key("N").int64();
            let first = strm.key("First").int64();
            if first <= 0 {
                return Err(PdfError::Syntax("object stream missing First".into()));
            }
            let data = strm.stream_data()?;
            let mut parser = ObjectParser::new(&data, 0);
            parser.lex.allow_eof = true;
            for _ in 0..n {
                let id = parser.parse_object()?.as_int().unwrap_or(-1);
                let off = parser.parse_object()?.as_int().unwrap_or(-1);
                if id == target.id as i64 && off >= 0 {
                    // Object bodies carry no obj/endobj framing.
                    parser.seek_to((first + off) as u64);
                    return parser.parse_object();
                }
            }
            match strm.key("Extends").stream_ptr() {
                Some(next) => stream_ptr = next,
                None => break,
            }
        }
        Err(PdfError::Syntax(format!(
            "cannot find object {} in object stream",
            target
        )))
    }
}

/// Validate the `%PDF-M.N` header within the first bytes of the file.
///
/// A byte-order mark or other garbage may precede the header as long as
/// `%PDF-` starts within the first 10 bytes.
fn check_header(data: &[u8]) -> Result<(u8, u8)> {
    if data.is_empty() {
        return Err(PdfError::EmptyFile);
    }
    let window = &data[..data.len().min(32)];
    let pos = find_subslice(window, b"%PDF-")
        .filter(|&p| p < 10)
        .ok_or_else(|| PdfError::NotPdf("missing %PDF- header".into()))?;

    let line = &window[pos..];
    let line_end = line
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(line.len());
    let line = &line[..line_end];
    // Trailing spaces, tabs or NULs before the newline are tolerated.
    let line = trim_end_bytes(line, b" \t\x00");

    let rest = &line[b"%PDF-".len()..];
    let (major, minor) = parse_version(rest)
        .ok_or_else(|| PdfError::NotPdf("malformed header version".into()))?;
    let supported = (major == 1 && (0..=7).contains(&minor)) || (major == 2 && minor == 0);
    if !supported {
        return Err(PdfError::UnsupportedVersion { major, minor });
    }
    Ok((major as u8, minor as u8))
}

fn parse_version(bytes: &[u8]) -> Option<(i64, i64)> {
    let s = std::str::from_utf8(bytes).ok()?;
    let (maj, min) = s.split_once('.')?;
    Some((maj.parse().ok()?, min.parse().ok()?))
}

/// The last ~100 bytes, after trimming trailing whitespace and EOLs, must
/// end with the literal `%%EOF`.
fn check_eof_marker(data: &[u8]) -> Result<()> {
    const END_CHUNK: usize = 100;
    let tail = &data[data.len().saturating_sub(END_CHUNK)..];
    let tail = trim_end_bytes(tail, b"\r\n\t \x00");
    if !tail.ends_with(b"%%EOF") {
        return Err(PdfError::NotPdf("missing %%EOF".into()));
    }
    Ok(())
}

fn trim_end_bytes<'a>(mut s: &'a [u8], set: &[u8]) -> &'a [u8] {
    while let Some((&last, rest)) = s.split_last() {
        if set.contains(&last) {
            s = rest;
        } else {
            break;
        }
    }
    s
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_with_leading_garbage() {
        assert_eq!(check_header(b"junk\n%PDF-1.7\r\nrest").unwrap(), (1, 7));
    }

    #[test]
    fn header_trailing_pad_before_eol() {
        assert_eq!(check_header(b"%PDF-1.4 \t\x00\ncontent").unwrap(), (1, 4));
    }

    #[test]
    fn header_at_offset_ten_is_too_late() {
        assert!(matches!(
            check_header(b"0123456789%PDF-1.4\n"),
            Err(PdfError::NotPdf(_))
        ));
    }

    #[test]
    fn empty_input_is_distinct_error() {
        assert!(matches!(check_header(b""), Err(PdfError::EmptyFile)));
    }

    #[test]
    fn version_bounds() {
        assert_eq!(check_header(b"%PDF-2.0\n").unwrap(), (2, 0));
        assert!(matches!(
            check_header(b"%PDF-2.1\n"),
            Err(PdfError::UnsupportedVersion { major: 2, minor: 1 })
        ));
        assert!(matches!(
            check_header(b"%PDF-1.8\n"),
            Err(PdfError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn eof_marker_with_trailing_eols() {
        assert!(check_eof_marker(b"%PDF-1.4\ndata\n%%EOF\r\n\r\n").is_ok());
        assert!(check_eof_marker(b"%PDF-1.4\ndata\n%%EOFX").is_err());
    }
}
