//! Subcommand implementations for the `site-taxonomy` binary.

pub mod categories_cmd;
pub mod crawl_cmd;
pub mod output;
