//! ASCII85Decode (PDF variant).
//!
//! The raw source first passes through an alphabet filter that drops any
//! byte outside the base-85 alphabet (`!`..`u` and `z`); decoding stops at
//! the `~>` terminator. `z` expands to four zero bytes.

use crate::error::{PdfError, Result};

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    // Optional <~ prefix used by some producers.
    let data = if data.starts_with(b"<~") { &data[2..] } else { data };

    // Everything after '~' (the EOD marker) is ignored.
    let data = match data.iter().position(|&b| b == b'~') {
        Some(pos) => &data[..pos],
        None => data,
    };

    // Alphabet filter with z-expansion.
    let mut filtered = Vec::with_capacity(data.len());
    for &b in data {
        match b {
            b'z' => filtered.extend_from_slice(b"!!!!!"),
            b'!'..=b'u' => filtered.push(b),
            _ => {}
        }
    }

    let mut out = Vec::with_capacity(filtered.len() / 5 * 4 + 4);
    for chunk in filtered.chunks(5) {
        if chunk.len() == 1 {
            return Err(PdfError::Decode(
                "ascii85: a final group cannot be a single character".into(),
            ));
        }
        let mut padded = [b'u'; 5];
        padded[..chunk.len()].copy_from_slice(chunk);
        let mut value: u32 = 0;
        for &byte in &padded {
            value = value
                .checked_mul(85)
                .and_then(|v| v.checked_add((byte - b'!') as u32))
                .ok_or_else(|| PdfError::Decode("ascii85: group overflow".into()))?;
        }
        let bytes = value.to_be_bytes();
        if chunk.len() == 5 {
            out.extend_from_slice(&bytes);
        } else {
            out.extend_from_slice(&bytes[..chunk.len() - 1]);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hello_world() {
        assert_eq!(decode(b"87cURD]i,\"Ebo80~>").unwrap(), b"Hello World!");
    }

    #[test]
    fn strips_markers_and_whitespace() {
        assert_eq!(
            decode(b"<~87cURD ]i,\"\nEbo80~>").unwrap(),
            b"Hello World!"
        );
    }

    #[test]
    fn z_expands_to_four_zero_bytes() {
        assert_eq!(decode(b"z~>").unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn partial_final_group() {
        // "ab" encodes to three base-85 digits.
        assert_eq!(decode(b"@:0~>").unwrap(), b"ab");
    }

    #[test]
    fn missing_terminator_is_tolerated() {
        assert_eq!(decode(b"@:0").unwrap(), b"ab");
    }
}
