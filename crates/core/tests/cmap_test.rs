//! ToUnicode CMap decoding through real font dictionaries.

mod common;

use bytes::Bytes;
use common::{page_body, PdfBuilder};
use peruse_core::Reader;

fn open(pdf: Vec<u8>) -> Reader {
    Reader::from_bytes(Bytes::from(pdf)).expect("failed to open PDF")
}

const CMAP: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
3 begincodespacerange
<01> <01>
<05> <07>
<7E> <7E>
endcodespacerange
1 beginbfchar
<01> <0041>
endbfchar
1 beginbfrange
<05> <07> <0044>
endbfrange
endcmap
CMap currentdict /CMap defineresource pop
end
end";

/// One page with a ToUnicode-mapped font and the given raw show bytes.
fn cmap_pdf(encoding: &str, show: &[u8]) -> Vec<u8> {
    let mut content = b"BT /F1 12 Tf (".to_vec();
    content.extend_from_slice(show);
    content.extend_from_slice(b") Tj ET");

    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.obj(3, &page_body(2, 4, 5));
    b.stream_obj(4, "", &content);
    b.obj(
        5,
        &format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /Mapped{} /ToUnicode 6 0 R >>",
            encoding
        ),
    );
    b.stream_obj(6, "", CMAP);
    b.finish(1, "")
}

#[test]
fn bfchar_bfrange_and_preserving_fallbacks() {
    // 01 -> A (bfchar), 7E unmapped but in a codespace -> '~' preserved,
    // 05 -> D (bfrange), FF outside every codespace -> raw rune.
    let pdf = cmap_pdf("", &[0x01, 0x7E, 0x05, 0xFF]);
    let r = open(pdf);
    let text = r.page(1).plain_text(None).unwrap();
    assert!(text.contains("A~D\u{FF}"), "got {:?}", text);
}

#[test]
fn identity_h_uses_tounicode() {
    let pdf = cmap_pdf(" /Encoding /Identity-H", &[0x05, 0x06, 0x07]);
    let r = open(pdf);
    let text = r.page(1).plain_text(None).unwrap();
    assert!(text.contains("DEF"), "got {:?}", text);
}

#[test]
fn bfrange_increments_last_replacement_byte() {
    let pdf = cmap_pdf("", &[0x05, 0x07]);
    let r = open(pdf);
    let text = r.page(1).plain_text(None).unwrap();
    assert!(text.contains("DF"), "got {:?}", text);
}

#[test]
fn missing_tounicode_falls_back_to_pdfdoc() {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.obj(3, &page_body(2, 4, 5));
    b.stream_obj(4, "", b"BT /F1 12 Tf (Plain) Tj ET");
    b.obj(5, "<< /Type /Font /Subtype /Type1 /BaseFont /NoMap >>");
    let r = open(b.finish(1, ""));
    assert!(r.page(1).plain_text(None).unwrap().contains("Plain"));
}

#[test]
fn differences_encoding_remaps_codes() {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.obj(3, &page_body(2, 4, 5));
    b.stream_obj(4, "", b"BT /F1 12 Tf (AB) Tj ET");
    b.obj(
        5,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Diffs \
         /Encoding << /Differences [ 65 /ydieresis /Euro ] >> >>",
    );
    let r = open(b.finish(1, ""));
    let text = r.page(1).plain_text(None).unwrap();
    assert!(text.contains("\u{FF}\u{20AC}"), "got {:?}", text);
}

#[test]
fn win_ansi_encoding_maps_high_bytes() {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.obj(3, &page_body(2, 4, 5));
    // 0x93/0x94 are curly quotes in WinAnsi.
    b.stream_obj(4, "", &[b"BT /F1 12 Tf (" as &[u8], &[0x93, 0x41, 0x94], b") Tj ET"].concat());
    b.obj(
        5,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Win /Encoding /WinAnsiEncoding >>",
    );
    let r = open(b.finish(1, ""));
    let text = r.page(1).plain_text(None).unwrap();
    assert!(text.contains("\u{201C}A\u{201D}"), "got {:?}", text);
}
