//! Fixed byte-to-rune encoding tables.
//!
//! Based on PDF Reference 1.6 Appendix D, "Latin Character Set and
//! Encodings". Each table maps a source byte to a char; slots a given
//! encoding leaves undefined map to U+FFFD.

use std::collections::HashMap;
use std::sync::LazyLock;

const NO_CHAR: char = '\u{FFFD}';

fn base_table(latin1_high: bool) -> [char; 256] {
    let mut t = [NO_CHAR; 256];
    for b in 0x20..=0x7E {
        t[b] = char::from(b as u8);
    }
    if latin1_high {
        for b in 0xA0..=0xFF_usize {
            t[b] = char::from_u32(b as u32).unwrap();
        }
    }
    t
}

fn with_overrides(mut t: [char; 256], overrides: &[(u8, char)]) -> [char; 256] {
    for &(b, c) in overrides {
        t[b as usize] = c;
    }
    t
}

/// WinAnsiEncoding (Windows code page 1252).
pub static WIN_ANSI_ENCODING: LazyLock<[char; 256]> = LazyLock::new(|| {
    with_overrides(
        base_table(true),
        &[
            (0x80, '\u{20AC}'), // Euro
            (0x82, '\u{201A}'),
            (0x83, '\u{0192}'),
            (0x84, '\u{201E}'),
            (0x85, '\u{2026}'),
            (0x86, '\u{2020}'),
            (0x87, '\u{2021}'),
            (0x88, '\u{02C6}'),
            (0x89, '\u{2030}'),
            (0x8A, '\u{0160}'),
            (0x8B, '\u{2039}'),
            (0x8C, '\u{0152}'),
            (0x8E, '\u{017D}'),
            (0x91, '\u{2018}'),
            (0x92, '\u{2019}'),
            (0x93, '\u{201C}'),
            (0x94, '\u{201D}'),
            (0x95, '\u{2022}'),
            (0x96, '\u{2013}'),
            (0x97, '\u{2014}'),
            (0x98, '\u{02DC}'),
            (0x99, '\u{2122}'),
            (0x9A, '\u{0161}'),
            (0x9B, '\u{203A}'),
            (0x9C, '\u{0153}'),
            (0x9E, '\u{017E}'),
            (0x9F, '\u{0178}'),
        ],
    )
});

/// MacRomanEncoding.
pub static MAC_ROMAN_ENCODING: LazyLock<[char; 256]> = LazyLock::new(|| {
    with_overrides(
        base_table(false),
        &[
            (0x80, 'Ä'), (0x81, 'Å'), (0x82, 'Ç'), (0x83, 'É'),
            (0x84, 'Ñ'), (0x85, 'Ö'), (0x86, 'Ü'), (0x87, 'á'),
            (0x88, 'à'), (0x89, 'â'), (0x8A, 'ä'), (0x8B, 'ã'),
            (0x8C, 'å'), (0x8D, 'ç'), (0x8E, 'é'), (0x8F, 'è'),
            (0x90, 'ê'), (0x91, 'ë'), (0x92, 'í'), (0x93, 'ì'),
            (0x94, 'î'), (0x95, 'ï'), (0x96, 'ñ'), (0x97, 'ó'),
            (0x98, 'ò'), (0x99, 'ô'), (0x9A, 'ö'), (0x9B, 'õ'),
            (0x9C, 'ú'), (0x9D, 'ù'), (0x9E, 'û'), (0x9F, 'ü'),
            (0xA0, '\u{2020}'), (0xA1, '°'), (0xA2, '¢'), (0xA3, '£'),
            (0xA4, '§'), (0xA5, '\u{2022}'), (0xA6, '¶'), (0xA7, 'ß'),
            (0xA8, '®'), (0xA9, '©'), (0xAA, '\u{2122}'), (0xAB, '´'),
            (0xAC, '¨'), (0xAD, '\u{2260}'), (0xAE, 'Æ'), (0xAF, 'Ø'),
            (0xB0, '\u{221E}'), (0xB1, '±'), (0xB2, '\u{2264}'), (0xB3, '\u{2265}'),
            (0xB4, '¥'), (0xB5, 'µ'), (0xB6, '\u{2202}'), (0xB7, '\u{2211}'),
            (0xB8, '\u{220F}'), (0xB9, '\u{03C0}'), (0xBA, '\u{222B}'), (0xBB, 'ª'),
            (0xBC, 'º'), (0xBD, '\u{03A9}'), (0xBE, 'æ'), (0xBF, 'ø'),
            (0xC0, '¿'), (0xC1, '¡'), (0xC2, '¬'), (0xC3, '\u{221A}'),
            (0xC4, '\u{0192}'), (0xC5, '\u{2248}'), (0xC6, '\u{2206}'), (0xC7, '«'),
            (0xC8, '»'), (0xC9, '\u{2026}'), (0xCA, '\u{00A0}'), (0xCB, 'À'),
            (0xCC, 'Ã'), (0xCD, 'Õ'), (0xCE, '\u{0152}'), (0xCF, '\u{0153}'),
            (0xD0, '\u{2013}'), (0xD1, '\u{2014}'), (0xD2, '\u{201C}'), (0xD3, '\u{201D}'),
            (0xD4, '\u{2018}'), (0xD5, '\u{2019}'), (0xD6, '÷'), (0xD7, '\u{25CA}'),
            (0xD8, 'ÿ'), (0xD9, '\u{0178}'), (0xDA, '\u{2044}'), (0xDB, '\u{20AC}'),
            (0xDC, '\u{2039}'), (0xDD, '\u{203A}'), (0xDE, '\u{FB01}'), (0xDF, '\u{FB02}'),
            (0xE0, '\u{2021}'), (0xE1, '·'), (0xE2, '\u{201A}'), (0xE3, '\u{201E}'),
            (0xE4, '\u{2030}'), (0xE5, 'Â'), (0xE6, 'Ê'), (0xE7, 'Á'),
            (0xE8, 'Ë'), (0xE9, 'È'), (0xEA, 'Í'), (0xEB, 'Î'),
            (0xEC, 'Ï'), (0xED, 'Ì'), (0xEE, 'Ó'), (0xEF, 'Ô'),
            (0xF0, '\u{F8FF}'), (0xF1, 'Ò'), (0xF2, 'Ú'), (0xF3, 'Û'),
            (0xF4, 'Ù'), (0xF5, '\u{0131}'), (0xF6, '\u{02C6}'), (0xF7, '\u{02DC}'),
            (0xF8, '¯'), (0xF9, '\u{02D8}'), (0xFA, '\u{02D9}'), (0xFB, '\u{02DA}'),
            (0xFC, '¸'), (0xFD, '\u{02DD}'), (0xFE, '\u{02DB}'), (0xFF, '\u{02C7}'),
        ],
    )
});

/// PDFDocEncoding, used for text strings without a UTF-16 byte-order
/// mark. Undefined slots map to U+FFFD.
pub static PDF_DOC_ENCODING: LazyLock<[char; 256]> = LazyLock::new(|| {
    let mut t = base_table(true);
    t[0x09] = '\t';
    t[0x0A] = '\n';
    t[0x0D] = '\r';
    t[0xA0] = '\u{20AC}'; // Euro
    t[0xAD] = NO_CHAR;
    with_overrides(
        t,
        &[
            (0x18, '\u{02D8}'), (0x19, '\u{02C7}'), (0x1A, '\u{02C6}'),
            (0x1B, '\u{02D9}'), (0x1C, '\u{02DD}'), (0x1D, '\u{02DB}'),
            (0x1E, '\u{02DA}'), (0x1F, '\u{02DC}'),
            (0x80, '\u{2022}'), (0x81, '\u{2020}'), (0x82, '\u{2021}'),
            (0x83, '\u{2026}'), (0x84, '\u{2014}'), (0x85, '\u{2013}'),
            (0x86, '\u{0192}'), (0x87, '\u{2044}'), (0x88, '\u{2039}'),
            (0x89, '\u{203A}'), (0x8A, '\u{2212}'), (0x8B, '\u{2030}'),
            (0x8C, '\u{201E}'), (0x8D, '\u{201C}'), (0x8E, '\u{201D}'),
            (0x8F, '\u{2018}'), (0x90, '\u{2019}'), (0x91, '\u{201A}'),
            (0x92, '\u{2122}'), (0x93, '\u{FB01}'), (0x94, '\u{FB02}'),
            (0x95, '\u{0141}'), (0x96, '\u{0152}'), (0x97, '\u{0160}'),
            (0x98, '\u{0178}'), (0x99, '\u{017D}'), (0x9A, '\u{0131}'),
            (0x9B, '\u{0142}'), (0x9C, '\u{0153}'), (0x9D, '\u{0161}'),
            (0x9E, '\u{017E}'),
        ],
    )
});

/// Glyph names used by `Differences` arrays, beyond single-character
/// names and the `uniXXXX`/`uXXXXXX` forms handled in `glyph_to_char`.
static GLYPHS: &[(&str, char)] = &[
    ("AE", 'Æ'), ("Aacute", 'Á'), ("Acircumflex", 'Â'), ("Adieresis", 'Ä'),
    ("Agrave", 'À'), ("Aring", 'Å'), ("Atilde", 'Ã'), ("Ccedilla", 'Ç'),
    ("Delta", '\u{2206}'), ("Eacute", 'É'), ("Ecircumflex", 'Ê'),
    ("Edieresis", 'Ë'), ("Egrave", 'È'), ("Eth", 'Ð'), ("Euro", '\u{20AC}'),
    ("Iacute", 'Í'), ("Icircumflex", 'Î'), ("Idieresis", 'Ï'), ("Igrave", 'Ì'),
    ("Lslash", '\u{0141}'), ("Ntilde", 'Ñ'), ("OE", '\u{0152}'),
    ("Oacute", 'Ó'), ("Ocircumflex", 'Ô'), ("Odieresis", 'Ö'),
    ("Ograve", 'Ò'), ("Omega", '\u{03A9}'), ("Oslash", 'Ø'), ("Otilde", 'Õ'),
    ("Scaron", '\u{0160}'), ("Thorn", 'Þ'), ("Uacute", 'Ú'),
    ("Ucircumflex", 'Û'), ("Udieresis", 'Ü'), ("Ugrave", 'Ù'),
    ("Yacute", 'Ý'), ("Ydieresis", '\u{0178}'), ("Zcaron", '\u{017D}'),
    ("aacute", 'á'), ("acircumflex", 'â'), ("acute", '´'), ("adieresis", 'ä'),
    ("ae", 'æ'), ("agrave", 'à'), ("ampersand", '&'), ("aring", 'å'),
    ("asciicircum", '^'), ("asciitilde", '~'), ("asterisk", '*'), ("at", '@'),
    ("atilde", 'ã'), ("backslash", '\\'), ("bar", '|'), ("braceleft", '{'),
    ("braceright", '}'), ("bracketleft", '['), ("bracketright", ']'),
    ("breve", '\u{02D8}'), ("brokenbar", '¦'), ("bullet", '\u{2022}'),
    ("caron", '\u{02C7}'), ("ccedilla", 'ç'), ("cedilla", '¸'), ("cent", '¢'),
    ("circumflex", '\u{02C6}'), ("colon", ':'), ("comma", ','),
    ("copyright", '©'), ("currency", '¤'), ("dagger", '\u{2020}'),
    ("daggerdbl", '\u{2021}'), ("degree", '°'), ("dieresis", '¨'),
    ("divide", '÷'), ("dollar", '$'), ("dotaccent", '\u{02D9}'),
    ("dotlessi", '\u{0131}'), ("eacute", 'é'), ("ecircumflex", 'ê'),
    ("edieresis", 'ë'), ("egrave", 'è'), ("eight", '8'),
    ("ellipsis", '\u{2026}'), ("emdash", '\u{2014}'), ("endash", '\u{2013}'),
    ("equal", '='), ("eth", 'ð'), ("exclam", '!'), ("exclamdown", '¡'),
    ("fi", '\u{FB01}'), ("five", '5'), ("fl", '\u{FB02}'),
    ("florin", '\u{0192}'), ("four", '4'), ("fraction", '\u{2044}'),
    ("germandbls", 'ß'), ("grave", '`'), ("greater", '>'),
    ("guillemotleft", '«'), ("guillemotright", '»'),
    ("guilsinglleft", '\u{2039}'), ("guilsinglright", '\u{203A}'),
    ("hungarumlaut", '\u{02DD}'), ("hyphen", '-'), ("iacute", 'í'),
    ("icircumflex", 'î'), ("idieresis", 'ï'), ("igrave", 'ì'),
    ("less", '<'), ("logicalnot", '¬'), ("lslash", '\u{0142}'),
    ("macron", '¯'), ("minus", '\u{2212}'), ("mu", 'µ'), ("multiply", '×'),
    ("nbspace", '\u{00A0}'), ("nine", '9'), ("ntilde", 'ñ'),
    ("numbersign", '#'), ("oacute", 'ó'), ("ocircumflex", 'ô'),
    ("odieresis", 'ö'), ("oe", '\u{0153}'), ("ogonek", '\u{02DB}'),
    ("ograve", 'ò'), ("one", '1'), ("onehalf", '½'), ("onequarter", '¼'),
    ("ordfeminine", 'ª'), ("ordmasculine", 'º'), ("oslash", 'ø'),
    ("otilde", 'õ'), ("paragraph", '¶'), ("parenleft", '('),
    ("parenright", ')'), ("percent", '%'), ("period", '.'),
    ("periodcentered", '·'), ("perthousand", '\u{2030}'), ("plus", '+'),
    ("plusminus", '±'), ("question", '?'), ("questiondown", '¿'),
    ("quotedbl", '"'), ("quotedblbase", '\u{201E}'),
    ("quotedblleft", '\u{201C}'), ("quotedblright", '\u{201D}'),
    ("quoteleft", '\u{2018}'), ("quoteright", '\u{2019}'),
    ("quotesinglbase", '\u{201A}'), ("quotesingle", '\''),
    ("registered", '®'), ("ring", '\u{02DA}'), ("scaron", '\u{0161}'),
    ("section", '§'), ("semicolon", ';'), ("seven", '7'), ("six", '6'),
    ("slash", '/'), ("space", ' '), ("sterling", '£'), ("thorn", 'þ'),
    ("three", '3'), ("threequarters", '¾'), ("tilde", '\u{02DC}'),
    ("trademark", '\u{2122}'), ("two", '2'), ("underscore", '_'),
    ("yacute", 'ý'), ("ydieresis", 'ÿ'), ("yen", '¥'), ("zcaron", '\u{017E}'),
    ("zero", '0'),
];

static GLYPH_TO_CHAR: LazyLock<HashMap<&'static str, char>> =
    LazyLock::new(|| GLYPHS.iter().copied().collect());

/// Resolve an Adobe glyph name to a char.
///
/// Handles single-character names, the `uniXXXX` and `uXXXXXX` hex
/// forms, and the Latin glyph list above.
pub fn glyph_to_char(name: &str) -> Option<char> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii() {
            return Some(c);
        }
    }
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() >= 4 {
            if let Ok(cp) = u32::from_str_radix(&hex[..4], 16) {
                return char::from_u32(cp);
            }
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            if let Ok(cp) = u32::from_str_radix(hex, 16) {
                return char::from_u32(cp);
            }
        }
    }
    GLYPH_TO_CHAR.get(name).copied()
}
