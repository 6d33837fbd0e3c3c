//! JSON output to stdout or a file.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Pretty-print `value` as JSON to `path`, or to stdout when no path is
/// given. Logs go to stderr, so stdout carries only this document.
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let mut rendered = serde_json::to_string_pretty(value).context("serialising output")?;
    rendered.push('\n');

    match path {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .context("writing to stdout")?;
            stdout.flush()?;
        }
    }
    Ok(())
}
