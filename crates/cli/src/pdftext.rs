//! pdftext - extract text from PDF files.
//!
//! Emits plain text in reading order by default, or text grouped by row
//! or column for tabular layouts.

use clap::{ArgAction, Parser, ValueEnum};
use peruse_core::error::Result;
use peruse_core::{Config, ParsingMode, Processor, Reader};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::filter::LevelFilter;

/// Output grouping for the extracted text.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum Mode {
    /// Plain text in reading order (default)
    #[default]
    Text,
    /// Text grouped by row, top to bottom
    Rows,
    /// Text grouped by column, left to right
    Columns,
}

/// Extract text from PDF files.
#[derive(Parser, Debug)]
#[command(name = "pdftext")]
#[command(version, about, long_about = None)]
struct Args {
    /// One or more paths to PDF files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output grouping
    #[arg(short, long, value_enum, default_value_t = Mode::Text)]
    mode: Mode,

    /// Comma-separated list of page numbers to extract (1-indexed)
    #[arg(long = "pages", value_delimiter = ',')]
    pages: Vec<usize>,

    /// Worker threads per document
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Stop after this many characters of output (0 = unlimited)
    #[arg(long = "max-chars", default_value_t = 0)]
    max_chars: usize,

    /// Fail the whole document when a single page fails
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "best_effort")]
    strict: bool,

    /// Log and skip pages that fail to parse (the default)
    #[arg(long = "best-effort", action = ArgAction::SetTrue)]
    best_effort: bool,

    /// Use debug logging level
    #[arg(short, long, action = ArgAction::SetTrue)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut status = ExitCode::SUCCESS;
    for file in &args.files {
        if let Err(e) = run_file(&args, file) {
            eprintln!("{}: {}", file.display(), e);
            status = ExitCode::FAILURE;
        }
    }
    status
}

fn run_file(args: &Args, file: &PathBuf) -> Result<()> {
    match args.mode {
        Mode::Text => {
            // The flags conflict; best-effort is also the default.
            let parsing_mode = if args.strict && !args.best_effort {
                ParsingMode::Strict
            } else {
                ParsingMode::BestEffort
            };
            let cfg = Config {
                max_workers_per_pdf: args.workers.clamp(1, 10),
                parsing_mode,
                max_total_chars: args.max_chars,
            };
            let processor = Processor::new(cfg)?;
            let (text, truncated) = if args.pages.is_empty() {
                processor.extract(file)?
            } else {
                let reader = Reader::open(file)?;
                let mut out = String::new();
                for &num in &args.pages {
                    out.push_str(&reader.page(num).plain_text(None)?);
                }
                (out, false)
            };
            print!("{}", text);
            if truncated {
                eprintln!("(output truncated at {} characters)", args.max_chars);
            }
        }
        Mode::Rows => {
            let reader = Reader::open(file)?;
            for num in selected_pages(args, &reader) {
                for row in reader.page(num).text_by_row()? {
                    let line: Vec<String> = row.content.into_iter().map(|t| t.s).collect();
                    println!("{}\t{}", row.position, line.join(" "));
                }
            }
        }
        Mode::Columns => {
            let reader = Reader::open(file)?;
            for num in selected_pages(args, &reader) {
                for col in reader.page(num).text_by_column()? {
                    let cells: Vec<String> = col.content.into_iter().map(|t| t.s).collect();
                    println!("{}\t{}", col.position, cells.join(" "));
                }
            }
        }
    }
    Ok(())
}

fn selected_pages(args: &Args, reader: &Reader) -> Vec<usize> {
    if args.pages.is_empty() {
        (1..=reader.num_pages()).collect()
    } else {
        args.pages.clone()
    }
}
