//! ToUnicode CMap interpretation.
//!
//! A CMap declares the valid code spaces (byte-sequence ranges of width
//! 1 to 4) and the mappings from codes to Unicode, either one by one
//! (`bfchar`) or as ranges (`bfrange`). It is itself encoded as a
//! PostScript-like operator stream, read through the interpreter.

use crate::error::Result;
use crate::interp::interpret;
use crate::model::value::{Value, ValueKind};
use crate::utils::{decode_utf8_or_preserve, utf16be_decode};
use tracing::debug;

#[derive(Debug, Clone)]
struct ByteRange {
    lo: Vec<u8>,
    hi: Vec<u8>,
}

#[derive(Debug, Clone)]
struct BfChar {
    orig: Vec<u8>,
    repl: Vec<u8>,
}

#[derive(Debug, Clone)]
enum BfDest {
    /// UTF-16BE replacement; the last byte is incremented by the offset
    /// of the code within the range.
    Str(Vec<u8>),
    /// One UTF-16BE replacement per code in the range.
    Array(Vec<Vec<u8>>),
}

#[derive(Debug, Clone)]
struct BfRange {
    lo: Vec<u8>,
    hi: Vec<u8>,
    dst: BfDest,
}

/// A code-to-Unicode mapping.
#[derive(Debug, Default)]
pub struct CMap {
    /// Code spaces grouped by code width (1 to 4 bytes).
    space: [Vec<ByteRange>; 4],
    bfchars: Vec<BfChar>,
    bfranges: Vec<BfRange>,
}

impl CMap {
    /// Decode a byte string code by code.
    ///
    /// Bytes outside every code space, and codes inside a code space
    /// with no mapping, are preserved as raw runes rather than replaced.
    pub fn decode(&self, raw: &[u8]) -> String {
        let mut out = String::new();
        let mut rest = raw;
        while !rest.is_empty() {
            match self.find_codespace(rest) {
                None => {
                    out.extend(decode_utf8_or_preserve(&rest[..1]));
                    rest = &rest[1..];
                }
                Some(width) => {
                    let code = &rest[..width];
                    match self.resolve_code(code) {
                        Some(chars) => out.extend(chars),
                        None => out.extend(decode_utf8_or_preserve(code)),
                    }
                    rest = &rest[width..];
                }
            }
        }
        out
    }

    /// The shortest prefix (1..=4 bytes) that falls inside a code space
    /// of that width.
    fn find_codespace(&self, raw: &[u8]) -> Option<usize> {
        for n in 1..=4.min(raw.len()) {
            let prefix = &raw[..n];
            for range in &self.space[n - 1] {
                if range.lo.as_slice() <= prefix && prefix <= range.hi.as_slice() {
                    return Some(n);
                }
            }
        }
        None
    }

    fn resolve_code(&self, code: &[u8]) -> Option<Vec<char>> {
        for bc in &self.bfchars {
            if bc.orig.len() == code.len() && bc.orig == code {
                return Some(utf16be_decode(&bc.repl).chars().collect());
            }
        }
        for br in &self.bfranges {
            if br.lo.len() != code.len() {
                continue;
            }
            if !(br.lo.as_slice() <= code && code <= br.hi.as_slice()) {
                continue;
            }
            let offset = code[code.len() - 1].wrapping_sub(br.lo[br.lo.len() - 1]);
            return Some(match &br.dst {
                BfDest::Str(s) => {
                    let mut repl = s.clone();
                    if let Some(last) = repl.last_mut() {
                        *last = last.wrapping_add(offset);
                    }
                    utf16be_decode(&repl).chars().collect()
                }
                BfDest::Array(items) => match items.get(offset as usize) {
                    Some(s) => utf16be_decode(s).chars().collect(),
                    None => Vec::new(),
                },
            });
        }
        None
    }
}

/// Build a CMap by interpreting a ToUnicode stream.
///
/// Returns `None` when the stream is structurally broken; local problems
/// (unknown operators) are ignored.
pub fn read_cmap(to_unicode: &Value<'_>) -> Result<Option<CMap>> {
    let mut m = CMap::default();
    let mut n: i64 = -1;
    let mut ok = true;
    interpret(to_unicode, |stk, op| {
        if !ok {
            return Ok(());
        }
        match op {
            "findresource" => {
                stk.pop(); // category
                stk.pop(); // key
                stk.push(to_unicode.wrap(crate::model::Object::Dict(Default::default())));
            }
            "begincmap" => {
                stk.push(to_unicode.wrap(crate::model::Object::Dict(Default::default())));
            }
            "endcmap" => {
                stk.pop();
            }
            "begincodespacerange" | "beginbfchar" | "beginbfrange" => {
                n = stk.pop().int64();
            }
            "endcodespacerange" => {
                if n < 0 {
                    debug!("missing begincodespacerange");
                    ok = false;
                    return Ok(());
                }
                for _ in 0..n {
                    let hi = stk.pop().raw_string().to_vec();
                    let lo = stk.pop().raw_string().to_vec();
                    if lo.is_empty() || lo.len() != hi.len() || lo.len() > 4 {
                        debug!("bad codespace range");
                        ok = false;
                        return Ok(());
                    }
                    let width = lo.len();
                    m.space[width - 1].push(ByteRange { lo, hi });
                }
                n = -1;
            }
            "endbfchar" => {
                if n < 0 {
                    debug!("missing beginbfchar");
                    ok = false;
                    return Ok(());
                }
                for _ in 0..n {
                    let repl = stk.pop().raw_string().to_vec();
                    let orig = stk.pop().raw_string().to_vec();
                    m.bfchars.push(BfChar { orig, repl });
                }
                n = -1;
            }
            "endbfrange" => {
                if n < 0 {
                    debug!("missing beginbfrange");
                    ok = false;
                    return Ok(());
                }
                for _ in 0..n {
                    let dst = stk.pop();
                    let hi = stk.pop().raw_string().to_vec();
                    let lo = stk.pop().raw_string().to_vec();
                    let dst = match dst.kind() {
                        ValueKind::String => BfDest::Str(dst.raw_string().to_vec()),
                        ValueKind::Array => BfDest::Array(
                            (0..dst.len())
                                .map(|i| dst.index(i).raw_string().to_vec())
                                .collect(),
                        ),
                        _ => continue,
                    };
                    m.bfranges.push(BfRange { lo, hi, dst });
                }
                n = -1;
            }
            "defineresource" => {
                stk.pop(); // category
                let value = stk.pop();
                stk.pop(); // key
                stk.push(value);
            }
            other => {
                debug!(op = other, "ignoring cmap operator");
            }
        }
        Ok(())
    })?;
    if !ok {
        return Ok(None);
    }
    Ok(Some(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cmap() -> CMap {
        let mut m = CMap::default();
        m.space[0].push(ByteRange {
            lo: vec![0x01],
            hi: vec![0x01],
        });
        m.space[0].push(ByteRange {
            lo: vec![0x05],
            hi: vec![0x07],
        });
        m.space[0].push(ByteRange {
            lo: vec![0x7E],
            hi: vec![0x7E],
        });
        m.bfchars.push(BfChar {
            orig: vec![0x01],
            repl: vec![0x00, 0x41],
        });
        m.bfranges.push(BfRange {
            lo: vec![0x05],
            hi: vec![0x07],
            dst: BfDest::Str(vec![0x00, 0x44]),
        });
        m
    }

    #[test]
    fn bfchar_and_bfrange_decode() {
        let m = sample_cmap();
        assert_eq!(m.decode(&[0x01]), "A");
        assert_eq!(m.decode(&[0x05]), "D");
        assert_eq!(m.decode(&[0x06]), "E");
        assert_eq!(m.decode(&[0x07]), "F");
    }

    #[test]
    fn codespace_fallbacks_preserve_bytes() {
        let m = sample_cmap();
        // 0x7E is in a codespace but unmapped; 0xFF is outside every
        // codespace. Neither becomes a replacement character.
        assert_eq!(m.decode(&[0x01, 0x7E, 0x05, 0xFF]), "A~D\u{FF}");
    }

    #[test]
    fn array_destination_selects_by_offset() {
        let mut m = CMap::default();
        m.space[0].push(ByteRange {
            lo: vec![0x10],
            hi: vec![0x11],
        });
        m.bfranges.push(BfRange {
            lo: vec![0x10],
            hi: vec![0x11],
            dst: BfDest::Array(vec![vec![0x00, 0x58], vec![0x00, 0x59]]),
        });
        assert_eq!(m.decode(&[0x10, 0x11]), "XY");
    }

    #[test]
    fn two_byte_codespace() {
        let mut m = CMap::default();
        m.space[1].push(ByteRange {
            lo: vec![0x00, 0x00],
            hi: vec![0xFF, 0xFF],
        });
        m.bfchars.push(BfChar {
            orig: vec![0x00, 0x10],
            repl: vec![0x00, 0x5A],
        });
        assert_eq!(m.decode(&[0x00, 0x10, 0x00, 0x11]), "Z\u{0}\u{11}");
    }
}
