//! The worker-pool processor: ordering, truncation, failure modes.

mod common;

use bytes::Bytes;
use common::{flate_compress, page_body, PdfBuilder, HELVETICA};
use peruse_core::error::PdfError;
use peruse_core::{Config, ParsingMode, Processor, Reader};

fn three_page_pdf(break_page_two: bool) -> Vec<u8> {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(
        2,
        "<< /Type /Pages /Kids [3 0 R 4 0 R 5 0 R] /Count 3 >>",
    );
    b.obj(3, &page_body(2, 6, 9));
    b.obj(4, &page_body(2, 7, 9));
    b.obj(5, &page_body(2, 8, 9));
    b.stream_obj(6, "", b"BT /F1 12 Tf (PageOne) Tj ET");
    if break_page_two {
        // Declares flate but carries garbage, so the stream read fails.
        b.stream_obj(7, " /Filter /FlateDecode", b"this is not zlib");
    } else {
        b.stream_obj(7, "", b"BT /F1 12 Tf (PageTwo) Tj ET");
    }
    b.stream_obj(8, "", b"BT /F1 12 Tf (PageThree) Tj ET");
    b.obj(9, HELVETICA);
    b.finish(1, "")
}

fn reader(pdf: Vec<u8>) -> Reader {
    Reader::from_bytes(Bytes::from(pdf)).expect("failed to open PDF")
}

#[test]
fn pages_are_emitted_in_order_with_parallel_workers() {
    let r = reader(three_page_pdf(false));
    let processor = Processor::new(Config {
        max_workers_per_pdf: 3,
        ..Config::default()
    })
    .unwrap();
    let (text, truncated) = processor.extract_reader(&r).unwrap();
    assert!(!truncated);
    let one = text.find("PageOne").expect("PageOne missing");
    let two = text.find("PageTwo").expect("PageTwo missing");
    let three = text.find("PageThree").expect("PageThree missing");
    assert!(one < two && two < three, "pages out of order: {:?}", text);
}

#[test]
fn truncation_caps_output_and_sets_flag() {
    let r = reader(three_page_pdf(false));
    let processor = Processor::new(Config {
        max_total_chars: 8,
        ..Config::default()
    })
    .unwrap();
    let (text, truncated) = processor.extract_reader(&r).unwrap();
    assert!(truncated);
    assert!(text.chars().count() <= 8);
}

#[test]
fn zero_char_budget_means_unlimited() {
    let r = reader(three_page_pdf(false));
    let processor = Processor::new(Config::default()).unwrap();
    let (text, truncated) = processor.extract_reader(&r).unwrap();
    assert!(!truncated);
    assert!(text.contains("PageThree"));
}

#[test]
fn strict_mode_fails_on_first_broken_page() {
    let r = reader(three_page_pdf(true));
    let processor = Processor::new(Config {
        parsing_mode: ParsingMode::Strict,
        ..Config::default()
    })
    .unwrap();
    match processor.extract_reader(&r) {
        Err(PdfError::PageFailed { page, .. }) => assert_eq!(page, 2),
        other => panic!("expected PageFailed, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn best_effort_skips_broken_pages() {
    let r = reader(three_page_pdf(true));
    let processor = Processor::new(Config::default()).unwrap();
    let (text, _) = processor.extract_reader(&r).unwrap();
    assert!(text.contains("PageOne"));
    assert!(!text.contains("PageTwo"));
    assert!(text.contains("PageThree"));
}

#[test]
fn empty_document_extracts_nothing() {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(2, "<< /Type /Pages /Kids [] /Count 0 >>");
    let r = reader(b.finish(1, ""));
    let processor = Processor::new(Config::default()).unwrap();
    let (text, truncated) = processor.extract_reader(&r).unwrap();
    assert_eq!(text, "");
    assert!(!truncated);
}

#[test]
fn rejects_invalid_config() {
    assert!(Processor::new(Config {
        max_workers_per_pdf: 0,
        ..Config::default()
    })
    .is_err());
}

#[test]
fn compressed_pages_round_trip_through_the_pool() {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.obj(3, &page_body(2, 4, 5));
    let data = flate_compress(b"BT /F1 12 Tf (Deflated) Tj ET");
    b.stream_obj(4, " /Filter /FlateDecode", &data);
    b.obj(5, HELVETICA);
    let r = reader(b.finish(1, ""));
    let processor = Processor::new(Config::default()).unwrap();
    let (text, _) = processor.extract_reader(&r).unwrap();
    assert!(text.contains("Deflated"));
}
