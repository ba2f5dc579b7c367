//! High-level extraction API.

pub mod processor;

pub use processor::{Config, ParsingMode, Processor};
