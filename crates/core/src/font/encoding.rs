//! Glyph-code to text decoders.
//!
//! A closed set of decoders selected per font; dispatch is a match on
//! the variant rather than trait objects.

use crate::font::cmap::CMap;
use crate::font::tables::glyph_to_char;
use crate::model::value::Value;
use std::collections::HashMap;

/// Decoder from raw glyph bytes to text.
#[derive(Debug)]
pub enum TextDecoder {
    /// Pass bytes through unchanged (one char per byte).
    Identity,
    /// Map each byte through a fixed 256-entry table.
    Byte(&'static [char; 256]),
    /// Per-byte overrides from an `Encoding` dict's `Differences` array;
    /// unlisted bytes pass through.
    Differences(HashMap<u8, char>),
    /// Multi-byte code-to-Unicode mapping from a ToUnicode CMap.
    CMap(CMap),
}

impl TextDecoder {
    pub fn decode(&self, raw: &[u8]) -> String {
        match self {
            TextDecoder::Identity => raw.iter().map(|&b| char::from(b)).collect(),
            TextDecoder::Byte(table) => raw.iter().map(|&b| table[b as usize]).collect(),
            TextDecoder::Differences(map) => raw
                .iter()
                .map(|&b| map.get(&b).copied().unwrap_or_else(|| char::from(b)))
                .collect(),
            TextDecoder::CMap(m) => m.decode(raw),
        }
    }
}

/// Build the byte-override map from a `Differences` array: integers set
/// the current code, names assign consecutive codes their glyphs.
pub(crate) fn differences_map(differences: &Value<'_>) -> HashMap<u8, char> {
    let mut map = HashMap::new();
    let mut code: i64 = -1;
    for i in 0..differences.len() {
        let item = differences.index(i);
        match item.kind() {
            crate::model::ValueKind::Integer => code = item.int64(),
            crate::model::ValueKind::Name => {
                if (0..=255).contains(&code) {
                    if let Some(ch) = glyph_to_char(item.name()) {
                        map.insert(code as u8, ch);
                    }
                    code += 1;
                }
            }
            _ => {}
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::tables::WIN_ANSI_ENCODING;

    #[test]
    fn identity_preserves_bytes() {
        assert_eq!(TextDecoder::Identity.decode(b"abc"), "abc");
        assert_eq!(TextDecoder::Identity.decode(&[0xFF]), "\u{FF}");
    }

    #[test]
    fn byte_table_decodes_specials() {
        let dec = TextDecoder::Byte(&WIN_ANSI_ENCODING);
        assert_eq!(dec.decode(&[0x41, 0x80]), "A\u{20AC}");
    }

    #[test]
    fn differences_fall_through_to_raw_byte() {
        let mut map = HashMap::new();
        map.insert(0x41u8, 'Ω');
        let dec = TextDecoder::Differences(map);
        assert_eq!(dec.decode(b"AB"), "ΩB");
    }
}
