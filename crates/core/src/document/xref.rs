//! Cross-reference construction.
//!
//! Builds the single merged table mapping object number to location by
//! walking the cross-reference section(s) from the file's end pointer:
//! classic tables, xref streams, hybrid files (`XRefStm`) and `Prev`
//! chains. Later sections never overwrite slots filled by newer ones.

use crate::codec;
use crate::error::{PdfError, Result};
use crate::model::{Dict, ObjPtr, Object, Stream};
use crate::parser::lexer::{is_whitespace, Token};
use crate::parser::ObjectParser;
use regex::bytes::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, error, warn};

/// One slot of the cross-reference table, indexed by object number.
///
/// `offset` is a file offset for uncompressed entries and the index
/// within the object stream for compressed ones. A zero `ptr` marks an
/// empty slot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct XrefEnt {
    pub ptr: ObjPtr,
    pub offset: u64,
    pub in_stream: bool,
    pub stream: ObjPtr,
}

pub(crate) struct XrefBuild {
    pub table: Vec<XrefEnt>,
    pub trailer_ptr: ObjPtr,
    pub trailer: Dict,
}

/// Search the last ~100 bytes for the final correctly-terminated
/// `startxref` and return the integer offset that follows it.
///
/// The keyword must be followed, after any run of PDF whitespace, by at
/// least one EOL; real-world producers pad with spaces, tabs or NULs
/// before the newline.
pub(crate) fn find_startxref(data: &[u8]) -> Result<u64> {
    const END_CHUNK: usize = 100;
    let tail_start = data.len().saturating_sub(END_CHUNK);
    let tail = &data[tail_start..];

    let pos = find_last_line(tail, b"startxref")
        .map(|i| tail_start + i)
        .ok_or_else(|| PdfError::Syntax("missing final startxref".into()))?;

    let mut parser = ObjectParser::new(&data[pos..], pos as u64);
    let tok = parser.next_token()?;
    if !tok.is_keyword(b"startxref") {
        return Err(PdfError::Syntax(format!(
            "missing startxref keyword, found {:?}",
            tok
        )));
    }
    match parser.next_token()? {
        Token::Int(n) if n >= 0 => {
            debug!(startxref = n, "located final startxref");
            Ok(n as u64)
        }
        other => Err(PdfError::Syntax(format!(
            "startxref not followed by integer, found {:?}",
            other
        ))),
    }
}

/// Last occurrence of `needle` in `buf` whose trailing whitespace run
/// contains an EOL.
fn find_last_line(buf: &[u8], needle: &[u8]) -> Option<usize> {
    let mut indices = Vec::new();
    let mut i = 0;
    while i + needle.len() <= buf.len() {
        if &buf[i..i + needle.len()] == needle {
            indices.push(i);
        }
        i += 1;
    }
    for &i in indices.iter().rev() {
        let start = i + needle.len();
        let mut j = start;
        while j < buf.len() && is_whitespace(buf[j]) {
            j += 1;
        }
        if j > start && (buf[j - 1] == b'\n' || buf[j - 1] == b'\r') {
            return Some(i);
        }
    }
    None
}

/// Build the merged cross-reference starting at `start`.
pub(crate) fn read_xref(data: &[u8], start: u64) -> Result<XrefBuild> {
    if start as usize >= data.len() {
        return Err(PdfError::NoValidXref);
    }
    let mut parser = ObjectParser::new(&data[start as usize..], start);
    let tok = parser.next_token()?;
    if tok.is_keyword(b"xref") {
        debug!("found classic xref table");
        return read_xref_table(data, start);
    }
    if matches!(tok, Token::Int(_)) {
        debug!("found xref stream");
        return read_xref_stream(data, start);
    }
    error!(?tok, "neither cross-reference table nor stream at startxref");
    Err(PdfError::NoValidXref)
}

fn ensure_len(table: &mut Vec<XrefEnt>, n: usize) {
    if table.len() < n {
        table.resize(n, XrefEnt::default());
    }
}

/// Record an entry only if the slot is currently empty.
fn set_if_empty(table: &mut Vec<XrefEnt>, idx: usize, ent: XrefEnt) {
    ensure_len(table, idx + 1);
    if table[idx].ptr.is_zero() {
        table[idx] = ent;
    }
}

// ---- classic table path ---------------------------------------------------

fn read_xref_table(data: &[u8], start: u64) -> Result<XrefBuild> {
    let mut table = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(start);

    let first_trailer = read_table_section(data, start, &mut table)?;
    if let Err(e) = handle_trailer_xrefstm(data, &mut table, &first_trailer) {
        // Salvage what the ASCII tables provide.
        warn!(error = %e, "XRefStm handling failed, continuing with classic tables");
    }

    let mut trailer = first_trailer.clone();
    loop {
        let prev = match trailer.get("Prev") {
            Some(p) => p
                .as_int()
                .ok_or_else(|| PdfError::Syntax("xref Prev is not an integer".into()))?,
            None => break,
        };
        let prev = prev as u64;
        if !visited.insert(prev) {
            warn!(offset = prev, "cyclic Prev chain");
            break;
        }
        let mut parser = ObjectParser::new(&data[(prev as usize).min(data.len())..], prev);
        if !parser.next_token()?.is_keyword(b"xref") {
            return Err(PdfError::Syntax("xref Prev does not point to xref".into()));
        }
        trailer = read_table_section(data, prev, &mut table)?;
        if let Err(e) = handle_trailer_xrefstm(data, &mut table, &trailer) {
            warn!(error = %e, "XRefStm handling failed in Prev chain");
        }
    }

    finalize(table, ObjPtr::default(), first_trailer)
}

/// Parse one `xref ... trailer <<...>>` section into `table`, returning
/// the section's trailer dictionary.
fn read_table_section(data: &[u8], start: u64, table: &mut Vec<XrefEnt>) -> Result<Dict> {
    let mut parser = ObjectParser::new(&data[start as usize..], start);
    let tok = parser.next_token()?;
    if !tok.is_keyword(b"xref") {
        return Err(PdfError::Syntax("expected xref keyword".into()));
    }
    loop {
        let tok = parser.next_token()?;
        if tok.is_keyword(b"trailer") {
            break;
        }
        let sub_start = match tok {
            Token::Int(n) if n >= 0 => n as usize,
            other => {
                return Err(PdfError::Syntax(format!(
                    "malformed xref subsection header: {:?}",
                    other
                )))
            }
        };
        let count = match parser.next_token()? {
            Token::Int(n) if n >= 0 => n as usize,
            other => {
                return Err(PdfError::Syntax(format!(
                    "malformed xref subsection count: {:?}",
                    other
                )))
            }
        };
        for i in 0..count {
            let off = match parser.next_token()? {
                Token::Int(n) if n >= 0 => n as u64,
                other => {
                    return Err(PdfError::Syntax(format!("malformed xref offset: {:?}", other)))
                }
            };
            let gen = match parser.next_token()? {
                Token::Int(n) if n >= 0 => n as u16,
                other => {
                    return Err(PdfError::Syntax(format!(
                        "malformed xref generation: {:?}",
                        other
                    )))
                }
            };
            let idx = sub_start + i;
            match parser.next_token()? {
                t if t.is_keyword(b"n") => set_if_empty(
                    table,
                    idx,
                    XrefEnt {
                        ptr: ObjPtr::new(idx as u32, gen),
                        offset: off,
                        ..Default::default()
                    },
                ),
                t if t.is_keyword(b"f") => ensure_len(table, idx + 1),
                other => {
                    return Err(PdfError::Syntax(format!(
                        "unexpected xref alloc token {:?}",
                        other
                    )))
                }
            }
        }
    }
    match parser.parse_object()? {
        Object::Dict(d) => Ok(d),
        other => Err(PdfError::Syntax(format!(
            "xref table not followed by trailer dictionary, got {}",
            other.type_name()
        ))),
    }
}

// ---- xref stream path -----------------------------------------------------

fn read_xref_stream(data: &[u8], start: u64) -> Result<XrefBuild> {
    let (ptr, strm) = parse_xref_stream_object(data, start)?;
    let size = xref_stream_size(&strm)?;
    let mut table = Vec::new();
    read_xref_stream_data(data, &strm, &mut table, size)?;

    // Follow and merge any Prev streams; their Size must not grow.
    let mut hdr = strm.hdr.clone();
    let mut visited = HashSet::new();
    visited.insert(start);
    loop {
        let prev = match hdr.get("Prev") {
            Some(p) => p
                .as_int()
                .ok_or_else(|| PdfError::Syntax("xref Prev is not an integer".into()))?
                as u64,
            None => break,
        };
        if !visited.insert(prev) {
            warn!(offset = prev, "cyclic Prev chain in xref streams");
            break;
        }
        let (_, prev_strm) = parse_xref_stream_object(data, prev)?;
        let psize = xref_stream_size(&prev_strm)?;
        if psize > size {
            return Err(PdfError::Syntax(
                "xref Prev stream larger than the most recent stream".into(),
            ));
        }
        read_xref_stream_data(data, &prev_strm, &mut table, psize)?;
        hdr = prev_strm.hdr;
    }

    finalize(table, ptr, strm.hdr)
}

/// Parse the object definition at `start` and require a `/Type /XRef`
/// stream body.
fn parse_xref_stream_object(data: &[u8], start: u64) -> Result<(ObjPtr, Stream)> {
    if start as usize >= data.len() {
        return Err(PdfError::Syntax("xref stream offset out of bounds".into()));
    }
    let mut parser = ObjectParser::new(&data[start as usize..], start);
    let def = parser.parse_indirect_object()?;
    let strm = match def.obj {
        Object::Stream(s) => s,
        other => {
            return Err(PdfError::Syntax(format!(
                "cross-reference stream expected, got {}",
                other.type_name()
            )))
        }
    };
    if strm.hdr.get("Type").and_then(Object::as_name) != Some("XRef") {
        return Err(PdfError::Syntax(
            "xref stream does not have type XRef".into(),
        ));
    }
    Ok((def.ptr, strm))
}

fn xref_stream_size(strm: &Stream) -> Result<i64> {
    strm.hdr
        .get("Size")
        .and_then(Object::as_int)
        .ok_or_else(|| PdfError::Syntax("xref stream missing Size".into()))
}

/// Decode an xref stream's payload with its own (direct) header entries.
///
/// Length, Filter and DecodeParms of an xref stream must be direct
/// objects since no xref exists yet to resolve references.
fn stream_payload(data: &[u8], strm: &Stream) -> Result<Vec<u8>> {
    let length = strm
        .hdr
        .get("Length")
        .and_then(Object::as_int)
        .ok_or_else(|| PdfError::Syntax("xref stream missing direct Length".into()))?;
    let begin = strm.offset as usize;
    let end = begin
        .checked_add(length.max(0) as usize)
        .filter(|&e| e <= data.len())
        .ok_or_else(|| PdfError::Syntax("xref stream body out of bounds".into()))?;
    let raw = data[begin..end].to_vec();
    let filter = strm.hdr.get("Filter").cloned().unwrap_or(Object::Null);
    let parms = strm.hdr.get("DecodeParms").cloned().unwrap_or(Object::Null);
    codec::apply_filters(raw, &filter, &parms)
}

fn decode_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn read_xref_stream_data(
    data: &[u8],
    strm: &Stream,
    table: &mut Vec<XrefEnt>,
    size: i64,
) -> Result<()> {
    let w = match strm.hdr.get("W") {
        Some(Object::Array(a)) => a
            .iter()
            .map(|x| {
                x.as_int()
                    .filter(|&v| v >= 0)
                    .map(|v| v as usize)
                    .ok_or_else(|| PdfError::Syntax("invalid W array".into()))
            })
            .collect::<Result<Vec<usize>>>()?,
        _ => return Err(PdfError::Syntax("xref stream missing W array".into())),
    };
    if w.len() < 3 {
        return Err(PdfError::Syntax("invalid W array: fewer than 3 fields".into()));
    }
    let (w0, w1, w2) = (w[0], w[1], w[2]);
    let wtotal = w0 + w1 + w2;

    let index: Vec<(i64, i64)> = match strm.hdr.get("Index") {
        None => vec![(0, size)],
        Some(Object::Array(a)) => {
            if a.len() % 2 != 0 {
                return Err(PdfError::Syntax(format!(
                    "invalid Index array of odd length {}",
                    a.len()
                )));
            }
            a.chunks(2)
                .map(|pair| {
                    match (pair[0].as_int(), pair[1].as_int()) {
                        (Some(s), Some(n)) if s >= 0 && n >= 0 => Ok((s, n)),
                        _ => Err(PdfError::Syntax("malformed Index pair".into())),
                    }
                })
                .collect::<Result<Vec<_>>>()?
        }
        Some(other) => {
            return Err(PdfError::Syntax(format!(
                "Index must be an array, got {}",
                other.type_name()
            )))
        }
    };

    let payload = stream_payload(data, strm)?;
    let mut cursor = 0usize;
    for (start, n) in index {
        for i in 0..n {
            if cursor + wtotal > payload.len() {
                return Err(PdfError::Syntax("truncated xref stream".into()));
            }
            let rec = &payload[cursor..cursor + wtotal];
            cursor += wtotal;
            let v1 = if w0 == 0 { 1 } else { decode_be(&rec[..w0]) };
            let v2 = decode_be(&rec[w0..w0 + w1]);
            let v3 = decode_be(&rec[w0 + w1..wtotal]);
            let x = (start + i) as usize;
            ensure_len(table, x + 1);
            if !table[x].ptr.is_zero() {
                continue;
            }
            match v1 {
                0 => {
                    table[x] = XrefEnt {
                        ptr: ObjPtr::FREE,
                        ..Default::default()
                    }
                }
                1 => {
                    table[x] = XrefEnt {
                        ptr: ObjPtr::new(x as u32, v3 as u16),
                        offset: v2,
                        ..Default::default()
                    }
                }
                2 => {
                    table[x] = XrefEnt {
                        ptr: ObjPtr::new(x as u32, 0),
                        in_stream: true,
                        stream: ObjPtr::new(v2 as u32, 0),
                        offset: v3,
                    }
                }
                other => warn!(kind = other, objnum = x, "ignoring unknown xref stream entry type"),
            }
        }
    }
    debug!(entries = size, "parsed xref stream section");
    Ok(())
}

// ---- hybrid files ---------------------------------------------------------

/// If the trailer carries an `XRefStm` pointer, parse that stream,
/// validate (and repair) its offsets, and merge it into `table`.
///
/// A stream whose surviving entries are more than 30% invalid is rejected
/// and the classic table stands alone.
fn handle_trailer_xrefstm(data: &[u8], table: &mut Vec<XrefEnt>, trailer: &Dict) -> Result<()> {
    let off = match trailer.get("XRefStm") {
        None => return Ok(()),
        Some(v) => v
            .as_int()
            .ok_or_else(|| PdfError::Syntax("XRefStm is not an integer".into()))? as u64,
    };
    debug!(offset = off, "found XRefStm in trailer");
    let built = read_xref_stream(data, off)?;
    let mut src = built.table;

    let (repaired, invalid) = validate_and_repair(data, &mut src);
    if repaired > 0 {
        debug!(repaired, "repaired xref stream offsets");
    }
    let total = src.iter().filter(|e| !e.ptr.is_zero()).count();
    if total > 0 && invalid as f64 / total as f64 > 0.30 {
        return Err(PdfError::Syntax(format!(
            "xref stream at {} appears invalid: {}/{} bad entries",
            off, invalid, total
        )));
    }
    merge_tables(table, &src);
    Ok(())
}

/// Merge `src` into `dest`:
/// an empty destination takes the source; when both slots are in use
/// (neither a free sentinel) the stream source wins; otherwise the
/// destination is kept.
fn merge_tables(dest: &mut Vec<XrefEnt>, src: &[XrefEnt]) {
    ensure_len(dest, src.len());
    for (i, s) in src.iter().enumerate() {
        if s.ptr.is_zero() {
            continue;
        }
        let d = dest[i];
        if d.ptr.is_zero() {
            dest[i] = *s;
            continue;
        }
        if d.ptr.gen != 65535 && s.ptr.gen != 65535 {
            dest[i] = *s;
        }
    }
}

static OBJ_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s+\d+\s+obj\b").unwrap());

/// Whether an object header, a dictionary, or a PDF header begins at `off`.
fn is_likely_object_at(data: &[u8], off: u64) -> bool {
    let off = off as usize;
    if off >= data.len() {
        return false;
    }
    let window = &data[off..data.len().min(off + 64)];
    let mut s = window;
    while let Some((&b, rest)) = s.split_first() {
        if is_whitespace(b) {
            s = rest;
        } else {
            break;
        }
    }
    OBJ_HEADER.is_match(s) || s.starts_with(b"<<") || s.starts_with(b"%PDF-")
}

/// Search ±window bytes around `approx` for `<id> <gen> obj`.
fn scan_for_object(data: &[u8], id: u32, gen: u16, approx: u64, window: u64) -> Option<u64> {
    let start = approx.saturating_sub(window) as usize;
    let end = ((approx + window) as usize).min(data.len());
    if start >= end {
        return None;
    }
    let pattern = format!(r"\b{}\s+{}\s+obj\b", id, gen);
    let re = Regex::new(&pattern).ok()?;
    let m = re.find(&data[start..end])?;
    Some((start + m.start()) as u64)
}

/// Validate each in-use entry's offset, repairing with a small-window
/// scan where possible. Returns (repaired, invalid) counts.
fn validate_and_repair(data: &[u8], table: &mut [XrefEnt]) -> (usize, usize) {
    let mut repaired = 0;
    let mut invalid = 0;
    for ent in table.iter_mut() {
        if ent.ptr.is_zero() || ent.offset == 0 || ent.in_stream {
            continue;
        }
        if is_likely_object_at(data, ent.offset) {
            continue;
        }
        match scan_for_object(data, ent.ptr.id, ent.ptr.gen, ent.offset, 1024) {
            Some(found) => {
                ent.offset = found;
                repaired += 1;
            }
            None => invalid += 1,
        }
    }
    (repaired, invalid)
}

// ---- finalisation ---------------------------------------------------------

/// Trim or grow the table to the most recent trailer's declared Size.
fn finalize(mut table: Vec<XrefEnt>, trailer_ptr: ObjPtr, trailer: Dict) -> Result<XrefBuild> {
    let size = trailer
        .get("Size")
        .and_then(Object::as_int)
        .ok_or_else(|| PdfError::Syntax("trailer missing Size entry".into()))?;
    if size < 0 {
        return Err(PdfError::Syntax("negative trailer Size".into()));
    }
    table.resize(size as usize, XrefEnt::default());
    debug!(size, "cross-reference table finalised");
    Ok(XrefBuild {
        table,
        trailer_ptr,
        trailer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startxref_accepts_padded_terminators() {
        for pad in ["\n", "\r\n", "   \r\n", "\t\t\n", "\0\0\n", " \r"] {
            let data = format!("xxstartxref{}123\n%%EOF", pad);
            assert_eq!(find_startxref(data.as_bytes()).unwrap(), 123, "pad {:?}", pad);
        }
    }

    #[test]
    fn startxref_rejects_non_eol_terminator() {
        assert!(find_startxref(b"startxref 123\n%%EOF").is_err());
        assert!(find_startxref(b"startxrefx\n123\n%%EOF").is_err());
    }

    #[test]
    fn startxref_picks_last_valid_occurrence() {
        let data = b"startxref\n1\nstartxref\n2\n%%EOF";
        assert_eq!(find_startxref(data).unwrap(), 2);
    }

    #[test]
    fn merge_prefers_stream_when_both_in_use() {
        let mut dest = vec![XrefEnt {
            ptr: ObjPtr::new(0, 0),
            ..Default::default()
        }];
        dest[0].ptr = ObjPtr::new(0, 1);
        dest[0].offset = 10;
        let src = vec![XrefEnt {
            ptr: ObjPtr::new(0, 1),
            offset: 20,
            ..Default::default()
        }];
        merge_tables(&mut dest, &src);
        assert_eq!(dest[0].offset, 20);
    }

    #[test]
    fn merge_keeps_dest_when_src_is_free() {
        let mut dest = vec![XrefEnt {
            ptr: ObjPtr::new(0, 1),
            offset: 10,
            ..Default::default()
        }];
        let src = vec![XrefEnt {
            ptr: ObjPtr::FREE,
            ..Default::default()
        }];
        merge_tables(&mut dest, &src);
        assert_eq!(dest[0].offset, 10);
    }

    #[test]
    fn likely_object_detector() {
        let data = b"junk 12 0 obj << /A 1 >> endobj";
        assert!(is_likely_object_at(data, 5));
        assert!(is_likely_object_at(b"  << /A 1 >>", 0));
        assert!(is_likely_object_at(b"%PDF-1.4", 0));
        assert!(!is_likely_object_at(b"endstream", 0));
    }

    #[test]
    fn scan_finds_object_header_in_window() {
        let data = b"xxxxxxxx 12 0 obj <<>> endobj";
        let found = scan_for_object(data, 12, 0, 0, 1024).unwrap();
        assert_eq!(&data[found as usize..found as usize + 8], b"12 0 obj");
    }
}
