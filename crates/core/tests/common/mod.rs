//! Shared helpers that assemble minimal PDFs in memory.
#![allow(dead_code)]

/// Incremental PDF writer with offset bookkeeping.
pub struct PdfBuilder {
    buf: Vec<u8>,
    offsets: Vec<(u32, u64)>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::with_header("%PDF-1.4\n")
    }

    pub fn with_header(header: &str) -> Self {
        PdfBuilder {
            buf: header.as_bytes().to_vec(),
            offsets: Vec::new(),
        }
    }

    /// Current absolute offset.
    pub fn offset(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Recorded (id, offset) pairs.
    pub fn offsets(&self) -> &[(u32, u64)] {
        &self.offsets
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append `id 0 obj <body> endobj`.
    pub fn obj(&mut self, id: u32, body: &str) -> &mut Self {
        self.offsets.push((id, self.buf.len() as u64));
        self.raw(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes())
    }

    /// Append a stream object; `extra` lands in the header dict after
    /// the automatic `/Length`.
    pub fn stream_obj(&mut self, id: u32, extra: &str, data: &[u8]) -> &mut Self {
        self.offsets.push((id, self.buf.len() as u64));
        self.raw(format!("{} 0 obj\n<< /Length {}{} >>\nstream\n", id, data.len(), extra).as_bytes());
        self.raw(data);
        self.raw(b"\nendstream\nendobj\n")
    }

    /// Write a classic xref covering objects 0..=max_id (ids must have
    /// been added contiguously from 1), the trailer, startxref and EOF.
    pub fn finish(mut self, root: u32, extra_trailer: &str) -> Vec<u8> {
        let mut offsets = self.offsets.clone();
        offsets.sort_by_key(|&(id, _)| id);
        let count = offsets.len();
        let xref_pos = self.buf.len();
        let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", count + 1);
        for (_, off) in &offsets {
            tail.push_str(&format!("{:010} 00000 n \n", off));
        }
        tail.push_str(&format!(
            "trailer\n<< /Size {} /Root {} 0 R{} >>\nstartxref\n{}\n%%EOF",
            count + 1,
            root,
            extra_trailer,
            xref_pos
        ));
        self.buf.extend_from_slice(tail.as_bytes());
        self.buf
    }

    /// Append a custom tail (trailer/startxref/EOF written by the test).
    pub fn finish_raw(mut self, tail: &str) -> Vec<u8> {
        self.buf.extend_from_slice(tail.as_bytes());
        self.buf
    }
}

/// Standard-14 Helvetica font object body.
pub const HELVETICA: &str = "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>";

/// A one-content-stream page body.
pub fn page_body(parent: u32, contents: u32, font_id: u32) -> String {
    format!(
        "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
        parent, font_id, contents
    )
}

/// Two pages showing "Hello" and "World" through a shared Helvetica
/// resource, with a classic xref.
pub fn hello_world_pdf() -> Vec<u8> {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>");
    b.obj(3, &page_body(2, 5, 7));
    b.obj(4, &page_body(2, 6, 7));
    b.stream_obj(5, "", b"BT /F1 12 Tf 72 200 Td (Hello) Tj ET");
    b.stream_obj(6, "", b"BT /F1 12 Tf 72 200 Td (World) Tj ET");
    b.obj(7, HELVETICA);
    b.finish(1, "")
}

/// One page whose content stream is the argument.
pub fn single_page_pdf(content: &[u8]) -> Vec<u8> {
    single_page_pdf_with_font(content, HELVETICA)
}

/// One page with a custom font object body.
pub fn single_page_pdf_with_font(content: &[u8], font: &str) -> Vec<u8> {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.obj(3, &page_body(2, 4, 5));
    b.stream_obj(4, "", content);
    b.obj(5, font);
    b.finish(1, "")
}

/// Zlib-compress a buffer (for FlateDecode fixtures).
pub fn flate_compress(data: &[u8]) -> Vec<u8> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Frame rows with the PNG-Up predictor (tag byte 2, byte-wise deltas)
/// so that decoding reproduces `rows`.
pub fn png_up_encode(rows: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut prev: Vec<u8> = rows.first().map(|r| vec![0; r.len()]).unwrap_or_default();
    for row in rows {
        out.push(2);
        for (i, &b) in row.iter().enumerate() {
            out.push(b.wrapping_sub(prev[i]));
        }
        prev = row.clone();
    }
    out
}
