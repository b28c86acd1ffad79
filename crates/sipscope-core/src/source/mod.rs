//! Line and row sources.
//!
//! Sources are the only place the core touches the filesystem. The log
//! pipeline pulls `RawLine`s from a `LineSource`; the table pipeline pulls
//! `TableRow`s from a `RowSource`. In-memory implementations serve tests and
//! embedding callers.

mod memory;
mod tabular;
mod text;

use std::path::PathBuf;

pub use memory::{TextSource, VecRowSource};
pub use tabular::CsvFileSource;
pub use text::TextFileSource;

use thiserror::Error;

use crate::sip::RawLine;
use crate::table::TableRow;

pub trait LineSource {
    /// Next line in input order, with its 0-based index.
    fn next_line(&mut self) -> Result<Option<RawLine>, SourceError>;

    /// Size of the underlying input in bytes, when known.
    fn input_bytes(&self) -> u64 {
        0
    }
}

pub trait RowSource {
    /// Column names in header order.
    fn headers(&self) -> &[String];
    fn next_row(&mut self) -> Result<Option<TableRow>, SourceError>;

    fn input_bytes(&self) -> u64 {
        0
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("input not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
