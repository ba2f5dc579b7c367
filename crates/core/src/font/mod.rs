//! Fonts: dictionary wrapper, decoder selection, CMaps, encoding tables.

pub mod cmap;
pub mod encoding;
pub mod pdffont;
pub mod tables;

pub use cmap::CMap;
pub use encoding::TextDecoder;
pub use pdffont::Font;
