//! Worker-pool extraction over the single-threaded core.
//!
//! The reader is immutable after construction, so page extraction
//! parallelises by sharing one reader across scoped worker threads.
//! Pages are always emitted in order; output can be capped at a total
//! character budget.

use crate::document::reader::Reader;
use crate::error::{PdfError, Result};
use crate::font::Font;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use tracing::{debug, warn};

/// How page-level failures are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsingMode {
    /// The first failing page fails the whole document.
    Strict,
    /// Failing pages are logged and skipped.
    #[default]
    BestEffort,
}

/// Extraction configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Worker threads per document (1 to 10).
    pub max_workers_per_pdf: usize,
    pub parsing_mode: ParsingMode,
    /// Total output character budget; 0 means unlimited.
    pub max_total_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_workers_per_pdf: 1,
            parsing_mode: ParsingMode::BestEffort,
            max_total_chars: 0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.max_workers_per_pdf) {
            return Err(PdfError::Config(format!(
                "max_workers_per_pdf must be within 1..=10, got {}",
                self.max_workers_per_pdf
            )));
        }
        Ok(())
    }
}

/// Drives per-page extraction with a small worker pool.
pub struct Processor {
    cfg: Config,
}

impl Processor {
    pub fn new(cfg: Config) -> Result<Processor> {
        cfg.validate()?;
        debug!(
            workers = cfg.max_workers_per_pdf,
            mode = ?cfg.parsing_mode,
            max_chars = cfg.max_total_chars,
            "processor initialised"
        );
        Ok(Processor { cfg })
    }

    /// Extract a file's text in page order. Returns the text and whether
    /// it was truncated at the configured character budget.
    pub fn extract<P: AsRef<Path>>(&self, path: P) -> Result<(String, bool)> {
        let reader = Reader::open(path)?;
        self.extract_reader(&reader)
    }

    /// Extract from an already-open reader.
    pub fn extract_reader(&self, reader: &Reader) -> Result<(String, bool)> {
        let total = reader.num_pages();
        debug!(pages = total, "starting extraction");
        if total == 0 {
            return Ok((String::new(), false));
        }

        let workers = self
            .cfg
            .max_workers_per_pdf
            .min(total)
            .min(available_workers());
        let next = AtomicUsize::new(1);
        let (tx, rx) = mpsc::channel::<(usize, Result<String>)>();

        std::thread::scope(|scope| {
            for id in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || {
                    debug!(worker = id, "worker started");
                    // Fonts parsed by this worker are reused across its
                    // pages; charmaps are only built once per name.
                    let mut fonts: HashMap<String, Font> = HashMap::new();
                    loop {
                        let page_num = next.fetch_add(1, Ordering::Relaxed);
                        if page_num > total {
                            break;
                        }
                        let result = extract_page(reader, page_num, &mut fonts);
                        if tx.send((page_num, result)).is_err() {
                            break;
                        }
                    }
                    debug!(worker = id, "worker finished");
                });
            }
            drop(tx);

            let mut pending: HashMap<usize, String> = HashMap::new();
            let mut out = String::new();
            let mut next_page = 1;
            let mut truncated = false;
            for (page_num, result) in rx {
                let text = match result {
                    Ok(t) => t,
                    Err(e) => match self.cfg.parsing_mode {
                        ParsingMode::Strict => {
                            return Err(PdfError::PageFailed {
                                page: page_num,
                                source: Box::new(e),
                            })
                        }
                        ParsingMode::BestEffort => {
                            warn!(page = page_num, error = %e, "skipping page");
                            String::new()
                        }
                    },
                };
                pending.insert(page_num, text);

                while let Some(text) = pending.remove(&next_page) {
                    if self.append_limited(&mut out, &text) {
                        truncated = true;
                        break;
                    }
                    next_page += 1;
                }
                if truncated {
                    break;
                }
            }
            debug!(chars = out.len(), truncated, "extraction complete");
            Ok((out, truncated))
        })
    }

    /// Append `text` to `out` honouring the character budget. Returns
    /// true when the budget was hit.
    fn append_limited(&self, out: &mut String, text: &str) -> bool {
        if self.cfg.max_total_chars == 0 {
            out.push_str(text);
            return false;
        }
        let used = out.chars().count();
        let remaining = self.cfg.max_total_chars.saturating_sub(used);
        if remaining == 0 {
            return true;
        }
        if text.chars().count() > remaining {
            out.extend(text.chars().take(remaining));
            return true;
        }
        out.push_str(text);
        false
    }

    /// Write a file's full metadata report as pretty JSON.
    pub fn metadata_json<P: AsRef<Path>, W: Write>(&self, path: P, w: &mut W) -> Result<()> {
        let reader = Reader::open(path)?;
        reader.metadata_json(w)
    }
}

fn extract_page<'r>(
    reader: &'r Reader,
    page_num: usize,
    fonts: &mut HashMap<String, Font<'r>>,
) -> Result<String> {
    let page = reader.page(page_num);
    if page.is_null() {
        return Err(PdfError::Syntax(format!("page {} not found", page_num)));
    }
    for name in page.fonts() {
        if !fonts.contains_key(&name) {
            let f = page.font(&name);
            debug!(font = %name, "cached font");
            fonts.insert(name, f);
        }
    }
    page.plain_text(Some(fonts))
}

fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation_bounds_workers() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_ok());
        cfg.max_workers_per_pdf = 0;
        assert!(cfg.validate().is_err());
        cfg.max_workers_per_pdf = 11;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn append_limited_respects_char_boundaries() {
        let p = Processor::new(Config {
            max_total_chars: 4,
            ..Config::default()
        })
        .unwrap();
        let mut out = String::new();
        let truncated = p.append_limited(&mut out, "héllo");
        assert!(truncated);
        assert_eq!(out, "héll");
    }
}
