//! Stream filter pipeline.
//!
//! A stream's decoded bytes are produced by composing the decoders named
//! by the header's `Filter` entry (a name or an array of names), each
//! optionally parameterised by the corresponding `DecodeParms` entry.
//! Unknown filters fail the containing stream read.

pub mod ascii85;
pub mod flate;

use crate::error::{PdfError, Result};
use crate::model::{Dict, Object};

/// Apply the filter chain declared by `filter`/`parms` to `raw`.
///
/// Both arguments must already be resolved to direct objects (the caller
/// chases indirect references; xref streams only ever carry direct
/// entries).
pub fn apply_filters(raw: Vec<u8>, filter: &Object, parms: &Object) -> Result<Vec<u8>> {
    match filter {
        Object::Null => Ok(raw),
        Object::Name(name) => apply_one(raw, name, parms),
        Object::Array(names) => {
            let mut data = raw;
            for (i, f) in names.iter().enumerate() {
                let name = f.as_name().ok_or_else(|| {
                    PdfError::Syntax(format!("filter name expected, got {}", f.type_name()))
                })?;
                let parm = match parms {
                    Object::Array(ps) => ps.get(i).cloned().unwrap_or(Object::Null),
                    // A single dict applies to a single-element chain only.
                    other if i == 0 => other.clone(),
                    _ => Object::Null,
                };
                data = apply_one(data, name, &parm)?;
            }
            Ok(data)
        }
        other => Err(PdfError::Syntax(format!(
            "bad Filter entry of type {}",
            other.type_name()
        ))),
    }
}

fn apply_one(raw: Vec<u8>, name: &str, parms: &Object) -> Result<Vec<u8>> {
    match name {
        "FlateDecode" => {
            let inflated = flate::inflate(&raw)?;
            match predictor_of(parms) {
                None => Ok(inflated),
                Some(12) => {
                    let columns = columns_of(parms);
                    flate::png_up(&inflated, columns)
                }
                Some(other) => Err(PdfError::Unsupported(format!(
                    "flate predictor {}",
                    other
                ))),
            }
        }
        "ASCII85Decode" => ascii85::decode(&raw),
        other => Err(PdfError::Unsupported(format!("filter {}", other))),
    }
}

fn parms_dict(parms: &Object) -> Option<&Dict> {
    match parms {
        Object::Dict(d) => Some(d),
        _ => None,
    }
}

/// Predictor from DecodeParms; absent or 1 means none.
fn predictor_of(parms: &Object) -> Option<i64> {
    let d = parms_dict(parms)?;
    match d.get("Predictor").and_then(Object::as_int) {
        None | Some(1) => None,
        Some(p) => Some(p),
    }
}

/// Columns defaults to 1 when DecodeParms omits it.
fn columns_of(parms: &Object) -> usize {
    parms_dict(parms)
        .and_then(|d| d.get("Columns"))
        .and_then(Object::as_int)
        .filter(|&c| c > 0)
        .map(|c| c as usize)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flate_compress(data: &[u8]) -> Vec<u8> {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn unknown_filter_is_fatal() {
        let err = apply_filters(
            b"x".to_vec(),
            &Object::Name("LZWDecode".into()),
            &Object::Null,
        )
        .unwrap_err();
        assert!(matches!(err, PdfError::Unsupported(_)));
    }

    #[test]
    fn flate_roundtrip_through_chain() {
        let raw = flate_compress(b"hello filter pipeline");
        let out = apply_filters(raw, &Object::Name("FlateDecode".into()), &Object::Null).unwrap();
        assert_eq!(out, b"hello filter pipeline");
    }

    #[test]
    fn filter_array_applies_in_order() {
        // ASCII85 wrapping a flate body.
        let flated = flate_compress(b"nested");
        let mut a85 = Vec::new();
        // Encode manually in 4-byte groups.
        for chunk in flated.chunks(4) {
            let mut buf = [0u8; 4];
            buf[..chunk.len()].copy_from_slice(chunk);
            let mut v = u32::from_be_bytes(buf);
            let mut digits = [0u8; 5];
            for d in (0..5).rev() {
                digits[d] = (v % 85) as u8 + b'!';
                v /= 85;
            }
            a85.extend_from_slice(&digits[..chunk.len() + 1]);
        }
        a85.extend_from_slice(b"~>");

        let filter = Object::Array(vec![
            Object::Name("ASCII85Decode".into()),
            Object::Name("FlateDecode".into()),
        ]);
        let out = apply_filters(a85, &filter, &Object::Null).unwrap();
        assert_eq!(out, b"nested");
    }

    #[test]
    fn unsupported_predictor_rejected() {
        let mut d = Dict::new();
        d.insert("Predictor".into(), Object::Int(15));
        let raw = flate_compress(b"abcd");
        let err = apply_filters(raw, &Object::Name("FlateDecode".into()), &Object::Dict(d))
            .unwrap_err();
        assert!(matches!(err, PdfError::Unsupported(_)));
    }
}
