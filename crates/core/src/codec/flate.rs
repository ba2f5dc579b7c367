//! FlateDecode: zlib inflate plus the PNG-Up predictor.

use crate::error::{PdfError, Result};
use std::io::Read;

/// Inflate a raw zlib-deflate body.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 3);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PdfError::Decode(format!("flate: {}", e)))?;
    Ok(out)
}

/// Reverse the PNG "Up" predictor (type 2).
///
/// Input is framed in records of `1 + columns` bytes. The leading filter
/// tag must be 2; each remaining byte is added modulo 256 to the same
/// position of the running history row, and the history (minus the tag)
/// is the output. `n` complete rows produce exactly `n * columns` bytes.
pub fn png_up(data: &[u8], columns: usize) -> Result<Vec<u8>> {
    let row = 1 + columns;
    if data.len() % row != 0 {
        return Err(PdfError::Decode(format!(
            "PNG-Up input length {} is not a multiple of row size {}",
            data.len(),
            row
        )));
    }
    let mut hist = vec![0u8; columns];
    let mut out = Vec::with_capacity(data.len() / row * columns);
    for rec in data.chunks_exact(row) {
        if rec[0] != 2 {
            return Err(PdfError::Decode(format!(
                "malformed PNG-Up encoding: filter tag {}",
                rec[0]
            )));
        }
        for (h, &b) in hist.iter_mut().zip(&rec[1..]) {
            *h = h.wrapping_add(b);
        }
        out.extend_from_slice(&hist);
    }
    Ok(out)
}
