//! Font dictionary wrapper and decoder selection.

use crate::font::cmap::read_cmap;
use crate::font::encoding::{differences_map, TextDecoder};
use crate::font::tables::{MAC_ROMAN_ENCODING, PDF_DOC_ENCODING, WIN_ANSI_ENCODING};
use crate::model::value::{Value, ValueKind};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// A font referenced from a page's resources.
///
/// The decoder is parsed lazily and cached per font instance, so callers
/// that keep fonts in a map amortise charmap parsing across pages.
#[derive(Clone)]
pub struct Font<'r> {
    v: Value<'r>,
    dec: RefCell<Option<Rc<TextDecoder>>>,
}

impl<'r> Font<'r> {
    pub(crate) fn new(v: Value<'r>) -> Font<'r> {
        Font {
            v,
            dec: RefCell::new(None),
        }
    }

    pub fn value(&self) -> &Value<'r> {
        &self.v
    }

    pub fn is_null(&self) -> bool {
        self.v.is_null()
    }

    /// The font's BaseFont name.
    pub fn base_font(&self) -> String {
        self.v.key("BaseFont").name().to_string()
    }

    /// Code point of the first character covered by `Widths`.
    pub fn first_char(&self) -> i64 {
        self.v.key("FirstChar").int64()
    }

    /// Code point of the last character covered by `Widths`.
    pub fn last_char(&self) -> i64 {
        self.v.key("LastChar").int64()
    }

    /// All glyph widths, indexed from `first_char`.
    pub fn widths(&self) -> Vec<f64> {
        let w = self.v.key("Widths");
        (0..w.len()).map(|i| w.index(i).float64()).collect()
    }

    /// Width of a single code point; 0 outside the declared range.
    pub fn width(&self, code: i64) -> f64 {
        let first = self.first_char();
        let last = self.last_char();
        if code < first || last < code {
            return 0.0;
        }
        self.v.key("Widths").index((code - first) as usize).float64()
    }

    /// The decoder from glyph code sequences to text.
    pub fn decoder(&self) -> Rc<TextDecoder> {
        if let Some(dec) = self.dec.borrow().as_ref() {
            return Rc::clone(dec);
        }
        let dec = Rc::new(self.build_decoder());
        *self.dec.borrow_mut() = Some(Rc::clone(&dec));
        dec
    }

    /// Select the decoder in priority order: named byte encodings, then
    /// Identity-H / absent via ToUnicode with PDFDocEncoding fallback,
    /// then Differences dicts; anything else passes bytes through.
    fn build_decoder(&self) -> TextDecoder {
        let enc = self.v.key("Encoding");
        match enc.kind() {
            ValueKind::Name => match enc.name() {
                "WinAnsiEncoding" => TextDecoder::Byte(&WIN_ANSI_ENCODING),
                "MacRomanEncoding" => TextDecoder::Byte(&MAC_ROMAN_ENCODING),
                "Identity-H" => self.charmap_decoder(),
                other => {
                    debug!(encoding = other, "unknown named encoding");
                    TextDecoder::Identity
                }
            },
            ValueKind::Dict => TextDecoder::Differences(differences_map(&enc.key("Differences"))),
            ValueKind::Null => self.charmap_decoder(),
            other => {
                debug!(kind = ?other, "unexpected Encoding value");
                TextDecoder::Identity
            }
        }
    }

    fn charmap_decoder(&self) -> TextDecoder {
        let to_unicode = self.v.key("ToUnicode");
        if to_unicode.kind() == ValueKind::Stream {
            debug!("reading ToUnicode CMap");
            match read_cmap(&to_unicode) {
                Ok(Some(m)) => return TextDecoder::CMap(m),
                Ok(None) => return TextDecoder::Identity,
                Err(e) => {
                    debug!(error = %e, "ToUnicode stream unreadable");
                    return TextDecoder::Identity;
                }
            }
        }
        TextDecoder::Byte(&PDF_DOC_ENCODING)
    }
}
