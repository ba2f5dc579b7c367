//! Small text helpers shared by the value graph and the CMap decoder.

/// Decode big-endian UTF-16 bytes to a String.
///
/// Surrogate pairs are combined; unpaired surrogates become U+FFFD. A
/// trailing odd byte is dropped.
pub fn utf16be_decode(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Encode a string as big-endian UTF-16 bytes.
pub fn utf16be_encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Interpret bytes as UTF-8 where valid; otherwise preserve each raw byte
/// as the rune with that value. Never drops input and never substitutes a
/// replacement character for a lone byte.
pub fn decode_utf8_or_preserve(bytes: &[u8]) -> Vec<char> {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.chars().collect(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
