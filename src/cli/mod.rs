//! CLI module for mtgjudge
//!
//! Handles command-line argument parsing and batch question files.

pub mod args;

pub use args::{Args, AskArgs, Commands, Verbosity};

use std::io::Read;
use std::path::Path;

use crate::errors::Result;

/// One question per non-empty line; lines starting with `#` are comments
pub fn parse_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a question file, or stdin when `path` is `-`
pub fn load_questions(path: &Path) -> Result<Vec<String>> {
    let text = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(parse_questions(&text))
}
