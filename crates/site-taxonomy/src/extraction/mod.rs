//! Content extraction: turn fetched markup into structured page fields.

pub mod html;

pub use html::{extract, link_targets, ExtractedPage};
