//! Pages, the content-stream text engine, and the document outline.

use crate::document::reader::Reader;
use crate::error::{PdfError, Result};
use crate::font::{Font, TextDecoder};
use crate::interp::interpret;
use crate::model::value::{Value, ValueKind};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// A single piece of text drawn on a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Text {
    /// Font name, with any subset prefix stripped.
    pub font: String,
    /// Effective font size in points.
    pub font_size: f64,
    /// X coordinate in points, increasing left to right.
    pub x: f64,
    /// Y coordinate in points, increasing bottom to top.
    pub y: f64,
    /// Width of the text in points.
    pub w: f64,
    /// The UTF-8 text.
    pub s: String,
}

/// An X, Y pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A rectangle appended to the path with `re`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

/// Basic page content: positioned text runs and drawn rectangles.
#[derive(Debug, Clone, Default)]
pub struct Content {
    pub text: Vec<Text>,
    pub rect: Vec<Rect>,
}

/// Text items grouped at one X position, top to bottom.
#[derive(Debug, Clone)]
pub struct Column {
    pub position: i64,
    pub content: Vec<Text>,
}

pub type Columns = Vec<Column>;

/// Text items grouped at one Y position, left to right.
#[derive(Debug, Clone)]
pub struct Row {
    pub position: i64,
    pub content: Vec<Text>,
}

pub type Rows = Vec<Row>;

/// The outline (table of contents) tree. The root typically has no
/// title; its children are the top-level entries.
#[derive(Debug, Clone, Default)]
pub struct Outline {
    pub title: String,
    pub child: Vec<Outline>,
}

// ---- matrices -------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([[f64; 3]; 3]);

const IDENT: Matrix = Matrix([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

impl Matrix {
    fn mul(self, y: Matrix) -> Matrix {
        let mut z = [[0.0; 3]; 3];
        for (i, zi) in z.iter_mut().enumerate() {
            for (j, zij) in zi.iter_mut().enumerate() {
                for k in 0..3 {
                    *zij += self.0[i][k] * y.0[k][j];
                }
            }
        }
        Matrix(z)
    }

    fn translation(tx: f64, ty: f64) -> Matrix {
        Matrix([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [tx, ty, 1.0]])
    }
}

/// Read a 6-number operand list as an affine matrix.
fn matrix_from_args(args: &[Value<'_>]) -> Matrix {
    let mut m = [[0.0; 3]; 3];
    for (i, arg) in args.iter().take(6).enumerate() {
        m[i / 2][i % 2] = arg.float64();
    }
    m[2][2] = 1.0;
    Matrix(m)
}

// ---- graphics state -------------------------------------------------------

#[derive(Clone)]
struct GState<'r> {
    tc: f64,
    tw: f64,
    th: f64,
    tl: f64,
    tf: Option<Font<'r>>,
    tfs: f64,
    tmode: i64,
    trise: f64,
    tm: Matrix,
    tlm: Matrix,
    ctm: Matrix,
}

impl<'r> GState<'r> {
    fn new() -> GState<'r> {
        GState {
            tc: 0.0,
            tw: 0.0,
            th: 1.0,
            tl: 0.0,
            tf: None,
            tfs: 0.0,
            tmode: 0,
            trise: 0.0,
            tm: IDENT,
            tlm: IDENT,
            ctm: IDENT,
        }
    }

    /// Move to the start of the next line: translate Tlm by (0, -Tl).
    fn next_line(&mut self) {
        self.tlm = Matrix::translation(0.0, -self.tl).mul(self.tlm);
        self.tm = self.tlm;
    }
}

fn expect_args(op: &str, args: &[Value<'_>], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(PdfError::Syntax(format!(
            "bad {} operator: {} operands",
            op,
            args.len()
        )));
    }
    Ok(())
}

/// Emit one positioned Text run per displayed character and advance the
/// text matrix by the glyph width plus character spacing.
fn show_text<'r>(g: &mut GState<'r>, dec: &TextDecoder, out: &mut Vec<Text>, s: &[u8]) {
    let decoded = dec.decode(s);
    let mut n = 0;
    for ch in decoded.chars() {
        let w0 = match (&g.tf, s.get(n)) {
            (Some(f), Some(&b)) => f.width(b as i64),
            _ => 0.0,
        };
        n += 1;

        let mut font = g.tf.as_ref().map(|f| f.base_font()).unwrap_or_default();
        if let Some(i) = font.find('+') {
            font = font[i + 1..].to_string();
        }

        let trm = Matrix([
            [g.tfs * g.th, 0.0, 0.0],
            [0.0, g.tfs, 0.0],
            [0.0, g.trise, 1.0],
        ])
        .mul(g.tm)
        .mul(g.ctm);

        out.push(Text {
            font,
            font_size: trm.0[0][0],
            x: trm.0[2][0],
            y: trm.0[2][1],
            w: w0 / 1000.0 * trm.0[0][0],
            s: ch.to_string(),
        });

        let tx = (w0 / 1000.0 * g.tfs + g.tc) * g.th;
        g.tm = Matrix::translation(tx, 0.0).mul(g.tm);
    }
}

// ---- pages ----------------------------------------------------------------

/// A single page. The methods interpret the Page dictionary stored in
/// `v`.
#[derive(Clone)]
pub struct Page<'r> {
    pub v: Value<'r>,
}

impl Reader {
    /// The number of pages in the document.
    pub fn num_pages(&self) -> usize {
        let n = self
            .trailer()
            .key("Root")
            .key("Pages")
            .key("Count")
            .int64();
        n.max(0) as usize
    }

    /// The page with the given number, indexed from 1. An unknown page
    /// yields a Page whose value is null.
    pub fn page(&self, num: usize) -> Page<'_> {
        debug!(page = num, "looking up page");
        if num == 0 {
            return Page { v: Value::null() };
        }
        let mut num = num - 1;
        let mut page = self.trailer().key("Root").key("Pages");
        'search: while page.key("Type").name() == "Pages" {
            let count = page.key("Count").int64() as usize;
            if count < num {
                return Page { v: Value::null() };
            }
            let kids = page.key("Kids");
            for i in 0..kids.len() {
                let kid = kids.index(i);
                match kid.key("Type").name() {
                    "Pages" => {
                        let c = kid.key("Count").int64() as usize;
                        if num < c {
                            page = kid;
                            continue 'search;
                        }
                        num -= c;
                    }
                    "Page" => {
                        if num == 0 {
                            return Page { v: kid };
                        }
                        num -= 1;
                    }
                    _ => {}
                }
            }
            break;
        }
        Page { v: Value::null() }
    }

    /// The document outline tree.
    pub fn outline(&self) -> Outline {
        build_outline(&self.trailer().key("Root").key("Outlines"), 0)
    }

    /// Plain text of every page, in page order. A shared font cache
    /// amortises charmap parsing across pages.
    pub fn plain_text(&self) -> Result<String> {
        let mut out = String::new();
        let mut fonts = HashMap::new();
        for i in 1..=self.num_pages() {
            let p = self.page(i);
            for name in p.fonts() {
                fonts
                    .entry(name.clone())
                    .or_insert_with(|| p.font(&name));
            }
            out.push_str(&p.plain_text(Some(&fonts))?);
        }
        Ok(out)
    }
}

fn build_outline(entry: &Value<'_>, depth: usize) -> Outline {
    let mut x = Outline {
        title: entry.key("Title").text(),
        child: Vec::new(),
    };
    if depth > 64 {
        return x;
    }
    let mut child = entry.key("First");
    while child.kind() == ValueKind::Dict {
        x.child.push(build_outline(&child, depth + 1));
        child = child.key("Next");
        if x.child.len() > 4096 {
            break;
        }
    }
    x
}

impl<'r> Page<'r> {
    pub fn is_null(&self) -> bool {
        self.v.is_null()
    }

    fn find_inherited(&self, key: &str) -> Value<'r> {
        let mut v = self.v.clone();
        let mut depth = 0;
        while !v.is_null() && depth < 64 {
            let r = v.key(key);
            if !r.is_null() {
                return r;
            }
            v = v.key("Parent");
            depth += 1;
        }
        Value::null()
    }

    /// The page's resource dictionary, walking the Parent chain for
    /// inherited resources.
    pub fn resources(&self) -> Value<'r> {
        self.find_inherited("Resources")
    }

    /// Names of the fonts referenced by the page's resources.
    pub fn fonts(&self) -> Vec<String> {
        self.resources().key("Font").keys()
    }

    /// The font with the given resource name.
    pub fn font(&self, name: &str) -> Font<'r> {
        Font::new(self.resources().key("Font").key(name))
    }

    fn contents(&self) -> Option<Value<'r>> {
        if self.v.is_null() {
            return None;
        }
        let strm = self.v.key("Contents");
        if strm.kind() == ValueKind::Null {
            return None;
        }
        Some(strm)
    }

    /// The page's positioned text runs and rectangles.
    pub fn content(&self) -> Result<Content> {
        let strm = match self.contents() {
            Some(s) => s,
            None => return Ok(Content::default()),
        };
        let mut dec: Rc<TextDecoder> = Rc::new(TextDecoder::Identity);
        let mut g = GState::new();
        let mut gstack: Vec<GState> = Vec::new();
        let mut text: Vec<Text> = Vec::new();
        let mut rect: Vec<Rect> = Vec::new();

        interpret(&strm, |stk, op| {
            let args = stk.take_all();
            match op {
                "cm" => {
                    expect_args("cm", &args, 6)?;
                    g.ctm = matrix_from_args(&args).mul(g.ctm);
                }
                "re" => {
                    expect_args("re", &args, 4)?;
                    let (x, y, w, h) = (
                        args[0].float64(),
                        args[1].float64(),
                        args[2].float64(),
                        args[3].float64(),
                    );
                    rect.push(Rect {
                        min: Point { x, y },
                        max: Point { x: x + w, y: y + h },
                    });
                }
                "q" => gstack.push(g.clone()),
                "Q" => {
                    if let Some(prev) = gstack.pop() {
                        g = prev;
                    }
                }
                "BT" => {
                    g.tm = IDENT;
                    g.tlm = IDENT;
                }
                "ET" => {}
                "T*" => g.next_line(),
                "Tc" => {
                    expect_args("Tc", &args, 1)?;
                    g.tc = args[0].float64();
                }
                "Tw" => {
                    expect_args("Tw", &args, 1)?;
                    g.tw = args[0].float64();
                }
                "Tz" => {
                    expect_args("Tz", &args, 1)?;
                    g.th = args[0].float64() / 100.0;
                }
                "TL" => {
                    expect_args("TL", &args, 1)?;
                    g.tl = args[0].float64();
                }
                "Tr" => {
                    expect_args("Tr", &args, 1)?;
                    g.tmode = args[0].int64();
                }
                "Ts" => {
                    expect_args("Ts", &args, 1)?;
                    g.trise = args[0].float64();
                }
                "Td" | "TD" => {
                    expect_args("Td", &args, 2)?;
                    let (tx, ty) = (args[0].float64(), args[1].float64());
                    if op == "TD" {
                        g.tl = -ty;
                    }
                    g.tlm = Matrix::translation(tx, ty).mul(g.tlm);
                    g.tm = g.tlm;
                }
                "Tm" => {
                    expect_args("Tm", &args, 6)?;
                    let m = matrix_from_args(&args);
                    g.tm = m;
                    g.tlm = m;
                }
                "Tf" => {
                    expect_args("Tf", &args, 2)?;
                    let font = self.font(args[0].name());
                    dec = font.decoder();
                    g.tf = Some(font);
                    g.tfs = args[1].float64();
                }
                "Tj" => {
                    expect_args("Tj", &args, 1)?;
                    show_text(&mut g, &dec, &mut text, args[0].raw_string());
                }
                "'" => {
                    expect_args("'", &args, 1)?;
                    g.next_line();
                    show_text(&mut g, &dec, &mut text, args[0].raw_string());
                }
                "\"" => {
                    expect_args("\"", &args, 3)?;
                    g.tw = args[0].float64();
                    g.tc = args[1].float64();
                    g.next_line();
                    show_text(&mut g, &dec, &mut text, args[2].raw_string());
                }
                "TJ" => {
                    expect_args("TJ", &args, 1)?;
                    let v = &args[0];
                    for i in 0..v.len() {
                        let x = v.index(i);
                        if x.kind() == ValueKind::String {
                            show_text(&mut g, &dec, &mut text, x.raw_string());
                        } else {
                            let tx = -x.float64() / 1000.0 * g.tfs * g.th;
                            g.tm = Matrix::translation(tx, 0.0).mul(g.tm);
                        }
                    }
                }
                _ => {}
            }
            Ok(())
        })?;

        Ok(Content { text, rect })
    }

    /// The page's plain text, preserving reading order as far as the
    /// content stream allows.
    ///
    /// A prebuilt resource-name to font map may be passed to reuse
    /// decoders across pages.
    pub fn plain_text(&self, fonts: Option<&HashMap<String, Font<'r>>>) -> Result<String> {
        let strm = match self.contents() {
            Some(s) => s,
            None => return Ok(String::new()),
        };

        let local;
        let fonts = match fonts {
            Some(f) => f,
            None => {
                local = self
                    .fonts()
                    .into_iter()
                    .map(|name| {
                        let f = self.font(&name);
                        (name, f)
                    })
                    .collect::<HashMap<_, _>>();
                &local
            }
        };

        let mut dec: Rc<TextDecoder> = Rc::new(TextDecoder::Identity);
        let mut out = String::new();
        interpret(&strm, |stk, op| {
            let args = stk.take_all();
            match op {
                // A blank line between text objects keeps paragraphs apart.
                "BT" => out.push('\n'),
                "T*" => out.push('\n'),
                "Tf" => {
                    expect_args("Tf", &args, 2)?;
                    dec = match fonts.get(args[0].name()) {
                        Some(f) => f.decoder(),
                        None => Rc::new(TextDecoder::Identity),
                    };
                }
                "Tj" => {
                    expect_args("Tj", &args, 1)?;
                    out.push_str(&dec.decode(args[0].raw_string()));
                }
                "'" => {
                    expect_args("'", &args, 1)?;
                    out.push('\n');
                    out.push_str(&dec.decode(args[0].raw_string()));
                }
                "\"" => {
                    expect_args("\"", &args, 3)?;
                    out.push('\n');
                    out.push_str(&dec.decode(args[2].raw_string()));
                }
                "TJ" => {
                    expect_args("TJ", &args, 1)?;
                    let v = &args[0];
                    for i in 0..v.len() {
                        let x = v.index(i);
                        if x.kind() == ValueKind::String {
                            out.push_str(&dec.decode(x.raw_string()));
                        }
                    }
                }
                _ => {}
            }
            Ok(())
        })?;
        Ok(out)
    }

    /// Walk text-showing operators, calling back with the active decoder,
    /// the current text position (tracked through `Tm`), and the raw
    /// string bytes.
    pub fn walk_text_blocks<F>(&self, mut walker: F) -> Result<()>
    where
        F: FnMut(&TextDecoder, f64, f64, &[u8]),
    {
        let strm = match self.contents() {
            Some(s) => s,
            None => return Ok(()),
        };
        let fonts: HashMap<String, Font> = self
            .fonts()
            .into_iter()
            .map(|name| {
                let f = self.font(&name);
                (name, f)
            })
            .collect();

        let mut dec: Rc<TextDecoder> = Rc::new(TextDecoder::Identity);
        let mut x = 0.0f64;
        let mut y = 0.0f64;
        interpret(&strm, |stk, op| {
            let args = stk.take_all();
            match op {
                "Tf" => {
                    expect_args("Tf", &args, 2)?;
                    dec = match fonts.get(args[0].name()) {
                        Some(f) => f.decoder(),
                        None => Rc::new(TextDecoder::Identity),
                    };
                }
                "Tm" => {
                    expect_args("Tm", &args, 6)?;
                    x = args[4].float64();
                    y = args[5].float64();
                }
                "Tj" => {
                    expect_args("Tj", &args, 1)?;
                    walker(&dec, x, y, args[0].raw_string());
                }
                "'" => {
                    expect_args("'", &args, 1)?;
                    walker(&dec, x, y, args[0].raw_string());
                }
                "\"" => {
                    expect_args("\"", &args, 3)?;
                    walker(&dec, x, y, args[2].raw_string());
                }
                "TJ" => {
                    expect_args("TJ", &args, 1)?;
                    let v = &args[0];
                    for i in 0..v.len() {
                        let item = v.index(i);
                        if item.kind() == ValueKind::String {
                            walker(&dec, x, y, item.raw_string());
                        }
                    }
                }
                _ => {}
            }
            Ok(())
        })
    }

    /// All text grouped by row. Rows sort top to bottom; within a row,
    /// items sort left to right.
    pub fn text_by_row(&self) -> Result<Rows> {
        let mut rows: Rows = Vec::new();
        self.walk_text_blocks(|dec, x, y, raw| {
            let text = Text {
                s: dec.decode(raw),
                x,
                y,
                ..Default::default()
            };
            let position = y as i64;
            match rows.iter_mut().find(|r| r.position == position) {
                Some(row) => row.content.push(text),
                None => rows.push(Row {
                    position,
                    content: vec![text],
                }),
            }
        })?;
        for row in &mut rows {
            row.content.sort_by(|a, b| {
                a.x.partial_cmp(&b.x)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal))
            });
        }
        rows.sort_by(|a, b| b.position.cmp(&a.position));
        Ok(rows)
    }

    /// All text grouped by column. Columns sort left to right; within a
    /// column, items sort top to bottom.
    pub fn text_by_column(&self) -> Result<Columns> {
        let mut cols: Columns = Vec::new();
        self.walk_text_blocks(|dec, x, y, raw| {
            let text = Text {
                s: dec.decode(raw),
                x,
                y,
                ..Default::default()
            };
            let position = x as i64;
            match cols.iter_mut().find(|c| c.position == position) {
                Some(col) => col.content.push(text),
                None => cols.push(Column {
                    position,
                    content: vec![text],
                }),
            }
        })?;
        for col in &mut cols {
            col.content.sort_by(|a, b| {
                b.y.partial_cmp(&a.y)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
            });
        }
        cols.sort_by(|a, b| a.position.cmp(&b.position));
        Ok(cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_multiplication_is_row_by_column() {
        let a = Matrix::translation(3.0, 4.0);
        let b = Matrix::translation(1.0, 1.0);
        let c = a.mul(b);
        assert_eq!(c.0[2][0], 4.0);
        assert_eq!(c.0[2][1], 5.0);
    }

    #[test]
    fn next_line_translates_by_leading() {
        let mut g = GState::new();
        g.tl = 14.0;
        g.next_line();
        assert_eq!(g.tm.0[2][1], -14.0);
        g.next_line();
        assert_eq!(g.tm.0[2][1], -28.0);
    }
}
