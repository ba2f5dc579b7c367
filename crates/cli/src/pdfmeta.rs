//! pdfmeta - dump PDF metadata as JSON.
//!
//! Synthesises the document information dictionary with the embedded XMP
//! stream and prints the full structural report to stdout.

use clap::{ArgAction, Parser};
use peruse_core::Reader;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::filter::LevelFilter;

/// Dump PDF metadata as pretty JSON.
#[derive(Parser, Debug)]
#[command(name = "pdfmeta")]
#[command(version, about, long_about = None)]
struct Args {
    /// One or more paths to PDF files
    #[arg(required = true)]
    files: Vec<PathBuf>,

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
    let mut stdout = std::io::stdout();
    for file in &args.files {
        let result = Reader::open(file).and_then(|r| r.metadata_json(&mut stdout));
        if let Err(e) = result {
            eprintln!("{}: {}", file.display(), e);
            status = ExitCode::FAILURE;
        }
    }
    status
}
