//! Text extraction: the content engine, plain text, grouping, outline.

mod common;

use bytes::Bytes;
use common::{
    flate_compress, hello_world_pdf, page_body, single_page_pdf, single_page_pdf_with_font,
    PdfBuilder, HELVETICA,
};
use peruse_core::Reader;

fn open(pdf: Vec<u8>) -> Reader {
    Reader::from_bytes(Bytes::from(pdf)).expect("failed to open PDF")
}

const WIDTHS_FONT: &str = "<< /Type /Font /Subtype /Type1 /BaseFont /ABCDEF+Helvetica \
     /FirstChar 65 /LastChar 66 /Widths [500 600] /Encoding /WinAnsiEncoding >>";

#[test]
fn two_page_hello_world() {
    let r = open(hello_world_pdf());
    assert_eq!(r.num_pages(), 2);
    let text = r.plain_text().unwrap();
    assert!(text.contains("Hello"), "missing Hello in {:?}", text);
    assert!(text.contains("World"), "missing World in {:?}", text);
    let hello = text.find("Hello").unwrap();
    let world = text.find("World").unwrap();
    assert!(hello < world, "pages out of order");
}

#[test]
fn per_page_plain_text() {
    let r = open(hello_world_pdf());
    assert!(r.page(1).plain_text(None).unwrap().contains("Hello"));
    assert!(r.page(2).plain_text(None).unwrap().contains("World"));
    assert!(r.page(3).is_null());
}

#[test]
fn content_positions_and_advance() {
    let r = open(single_page_pdf_with_font(
        b"BT /F1 12 Tf 100 700 Td (AB) Tj ET",
        WIDTHS_FONT,
    ));
    let content = r.page(1).content().unwrap();
    assert_eq!(content.text.len(), 2);

    let a = &content.text[0];
    assert_eq!(a.s, "A");
    assert_eq!(a.font, "Helvetica"); // subset prefix stripped
    assert!((a.x - 100.0).abs() < 1e-9);
    assert!((a.y - 700.0).abs() < 1e-9);
    assert!((a.font_size - 12.0).abs() < 1e-9);
    assert!((a.w - 6.0).abs() < 1e-9); // 500/1000 * 12

    let b = &content.text[1];
    assert_eq!(b.s, "B");
    assert!((b.x - 106.0).abs() < 1e-9); // advanced by A's width
    assert!((b.w - 7.2).abs() < 1e-9);
}

#[test]
fn tj_numeric_adjustments_move_the_pen() {
    let r = open(single_page_pdf_with_font(
        b"BT /F1 12 Tf [ (A) -1000 (B) ] TJ ET",
        WIDTHS_FONT,
    ));
    let content = r.page(1).content().unwrap();
    assert_eq!(content.text.len(), 2);
    assert!((content.text[0].x - 0.0).abs() < 1e-9);
    // A advances 6pt, then -1000 thousandths adds 12pt.
    assert!((content.text[1].x - 18.0).abs() < 1e-9);
}

#[test]
fn ctm_scales_positions_and_size() {
    let r = open(single_page_pdf_with_font(
        b"q 2 0 0 2 0 0 cm BT /F1 12 Tf 10 10 Td (A) Tj ET Q",
        WIDTHS_FONT,
    ));
    let content = r.page(1).content().unwrap();
    let a = &content.text[0];
    assert!((a.x - 20.0).abs() < 1e-9);
    assert!((a.y - 20.0).abs() < 1e-9);
    assert!((a.font_size - 24.0).abs() < 1e-9);
}

#[test]
fn rectangles_are_recorded() {
    let r = open(single_page_pdf(b"0 0 100 50 re f"));
    let content = r.page(1).content().unwrap();
    assert_eq!(content.rect.len(), 1);
    let rect = content.rect[0];
    assert_eq!((rect.min.x, rect.min.y), (0.0, 0.0));
    assert_eq!((rect.max.x, rect.max.y), (100.0, 50.0));
}

#[test]
fn quote_operators_show_text() {
    let r = open(single_page_pdf(
        b"BT /F1 12 Tf 14 TL (one) Tj (two) ' 1 2 (three) \" ET",
    ));
    let text = r.page(1).plain_text(None).unwrap();
    assert!(text.contains("one"));
    assert!(text.contains("two"));
    assert!(text.contains("three"));
}

#[test]
fn flate_compressed_content_stream() {
    let data = flate_compress(b"BT /F1 12 Tf (Squeezed) Tj ET");
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.obj(3, &page_body(2, 4, 5));
    b.stream_obj(4, " /Filter /FlateDecode", &data);
    b.obj(5, HELVETICA);
    let r = open(b.finish(1, ""));
    assert!(r.page(1).plain_text(None).unwrap().contains("Squeezed"));
}

#[test]
fn columns_group_by_x_and_sort_top_down() {
    let r = open(single_page_pdf(
        b"BT /F1 12 Tf \
          1 0 0 1 100 300 Tm (A) Tj \
          1 0 0 1 100 250 Tm (B) Tj \
          1 0 0 1 200 300 Tm (C) Tj \
          1 0 0 1 200 100 Tm (D) Tj ET",
    ));
    let cols = r.page(1).text_by_column().unwrap();
    assert_eq!(cols.len(), 2);

    assert_eq!(cols[0].position, 100);
    let texts: Vec<&str> = cols[0].content.iter().map(|t| t.s.as_str()).collect();
    assert_eq!(texts, ["A", "B"]);

    assert_eq!(cols[1].position, 200);
    let texts: Vec<&str> = cols[1].content.iter().map(|t| t.s.as_str()).collect();
    assert_eq!(texts, ["C", "D"]);
}

#[test]
fn rows_group_by_y_and_sort_left_right() {
    let r = open(single_page_pdf(
        b"BT /F1 12 Tf \
          1 0 0 1 200 300 Tm (B) Tj \
          1 0 0 1 100 300 Tm (A) Tj \
          1 0 0 1 100 100 Tm (C) Tj ET",
    ));
    let rows = r.page(1).text_by_row().unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].position, 300);
    let texts: Vec<&str> = rows[0].content.iter().map(|t| t.s.as_str()).collect();
    assert_eq!(texts, ["A", "B"]);

    assert_eq!(rows[1].position, 100);
    assert_eq!(rows[1].content[0].s, "C");
}

#[test]
fn resources_inherit_through_parent_chain() {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(
        2,
        "<< /Type /Pages /Kids [3 0 R] /Count 1 \
         /Resources << /Font << /F1 5 0 R >> >> >>",
    );
    // The page itself declares no resources.
    b.obj(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>");
    b.stream_obj(4, "", b"BT /F1 10 Tf (inherited) Tj ET");
    b.obj(5, HELVETICA);
    let r = open(b.finish(1, ""));

    let page = r.page(1);
    assert_eq!(page.fonts(), vec!["F1".to_string()]);
    assert!(page.plain_text(None).unwrap().contains("inherited"));
}

#[test]
fn empty_page_extracts_nothing() {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.obj(3, "<< /Type /Page /Parent 2 0 R >>");
    let r = open(b.finish(1, ""));
    assert_eq!(r.page(1).plain_text(None).unwrap(), "");
    assert!(r.page(1).content().unwrap().text.is_empty());
}

#[test]
fn outline_tree() {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R /Outlines 4 0 R >>");
    b.obj(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.obj(3, "<< /Type /Page /Parent 2 0 R >>");
    b.obj(4, "<< /Type /Outlines /First 5 0 R /Last 6 0 R >>");
    b.obj(
        5,
        "<< /Title (Chapter One) /Next 6 0 R /First 7 0 R >>",
    );
    b.obj(6, "<< /Title (Chapter Two) >>");
    b.obj(7, "<< /Title (Section 1.1) >>");
    let r = open(b.finish(1, ""));

    let outline = r.outline();
    assert_eq!(outline.title, "");
    assert_eq!(outline.child.len(), 2);
    assert_eq!(outline.child[0].title, "Chapter One");
    assert_eq!(outline.child[0].child.len(), 1);
    assert_eq!(outline.child[0].child[0].title, "Section 1.1");
    assert_eq!(outline.child[1].title, "Chapter Two");
}
