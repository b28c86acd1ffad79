use std::collections::VecDeque;

use crate::sip::RawLine;
use crate::source::{LineSource, RowSource, SourceError};
use crate::table::TableRow;

/// Lines of an in-memory text.
#[derive(Debug, Clone)]
pub struct TextSource {
    lines: VecDeque<String>,
    index: usize,
    bytes: u64,
}

impl TextSource {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            index: 0,
            bytes: text.len() as u64,
        }
    }
}

impl LineSource for TextSource {
    fn next_line(&mut self) -> Result<Option<RawLine>, SourceError> {
        Ok(self.lines.pop_front().map(|text| {
            let line = RawLine::new(self.index, text);
            self.index += 1;
            line
        }))
    }

    fn input_bytes(&self) -> u64 {
        self.bytes
    }
}

/// Rows held in memory, paired with a header.
#[derive(Debug, Clone)]
pub struct VecRowSource {
    headers: Vec<String>,
    rows: VecDeque<Vec<String>>,
}

impl VecRowSource {
    pub fn new<H, R, V>(headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = Vec<V>>,
        V: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }
}

impl RowSource for VecRowSource {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn next_row(&mut self) -> Result<Option<TableRow>, SourceError> {
        Ok(self
            .rows
            .pop_front()
            .map(|values| TableRow::new(self.headers.iter().cloned().zip(values))))
    }
}
