use std::fs::File;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder, Trim};

use crate::source::{RowSource, SourceError};
use crate::table::TableRow;

/// Reads a CSV call-record export. The first row must be the header.
///
/// Cells are decoded lossily, so a non-UTF-8 export (Windows-1252 names)
/// still yields every row.
pub struct CsvFileSource {
    reader: csv::Reader<File>,
    headers: Vec<String>,
    record: ByteRecord,
    bytes: u64,
}

impl CsvFileSource {
    /// # Errors
    /// `SourceError::NotFound` when `path` does not exist, `SourceError::Io`
    /// or `SourceError::Csv` when the file or its header cannot be read.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let bytes = file.metadata()?.len();
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(file);
        let headers = reader.byte_headers()?.iter().map(lossy).collect();
        Ok(Self {
            reader,
            headers,
            record: ByteRecord::new(),
            bytes,
        })
    }
}

impl RowSource for CsvFileSource {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn next_row(&mut self) -> Result<Option<TableRow>, SourceError> {
        if !self.reader.read_byte_record(&mut self.record)? {
            return Ok(None);
        }
        Ok(Some(TableRow::new(
            self.headers.iter().cloned().zip(self.record.iter().map(lossy)),
        )))
    }

    fn input_bytes(&self) -> u64 {
        self.bytes
    }
}

fn lossy(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::CsvFileSource;
    use crate::source::RowSource;

    #[test]
    fn rows_follow_header_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "Final SIP code,Final Microsoft subcode,Final SIP Phrase\n200, 0 ,OK\n487,560487\n"
        )
        .unwrap();

        let mut source = CsvFileSource::open(file.path()).unwrap();
        assert_eq!(source.headers().len(), 3);

        let first = source.next_row().unwrap().unwrap();
        assert_eq!(first.get("Final Microsoft subcode"), Some("0"));
        assert_eq!(first.get("Final SIP Phrase"), Some("OK"));

        let short = source.next_row().unwrap().unwrap();
        assert_eq!(short.get("Final SIP code"), Some("487"));
        assert_eq!(short.get("Final SIP Phrase"), None);

        assert!(source.next_row().unwrap().is_none());
    }

    #[test]
    fn non_utf8_cells_do_not_end_the_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"\xef\xbb\xbfDisplay Name,Final SIP code,Final Microsoft subcode,Final SIP Phrase\n\
              Ana,200,0,OK\n\
              Jos\xe9,486,560486,Busy Here\n\
              Ben,404,560404,Not Found\n",
        )
        .unwrap();

        let mut source = CsvFileSource::open(file.path()).unwrap();
        assert_eq!(source.headers()[0], "Display Name");

        let mut names = Vec::new();
        while let Some(row) = source.next_row().unwrap() {
            names.push(row.get("Display Name").unwrap_or_default().to_string());
        }
        assert_eq!(names, vec!["Ana", "Jos\u{fffd}", "Ben"]);
    }
}
