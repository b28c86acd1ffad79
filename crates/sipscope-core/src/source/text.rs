use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::sip::RawLine;
use crate::source::{LineSource, SourceError};

/// Reads a log file line by line.
///
/// Invalid UTF-8 is replaced rather than rejected; trailing `\n` and `\r\n`
/// are stripped.
pub struct TextFileSource {
    reader: BufReader<File>,
    buf: Vec<u8>,
    index: usize,
    bytes: u64,
}

impl TextFileSource {
    /// # Errors
    /// `SourceError::NotFound` when `path` does not exist, `SourceError::Io`
    /// when it cannot be opened.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let bytes = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            buf: Vec::new(),
            index: 0,
            bytes,
        })
    }
}

impl LineSource for TextFileSource {
    fn next_line(&mut self) -> Result<Option<RawLine>, SourceError> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        let mut line = self.buf.as_slice();
        if let Some(rest) = line.strip_suffix(b"\n") {
            line = rest;
        }
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
        let raw = RawLine::new(self.index, String::from_utf8_lossy(line));
        self.index += 1;
        Ok(Some(raw))
    }

    fn input_bytes(&self) -> u64 {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::TextFileSource;
    use crate::source::{LineSource, SourceError};

    #[test]
    fn reads_lines_and_replaces_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"10:00:00.000 a\r\nbody \xff\nlast").unwrap();

        let mut source = TextFileSource::open(file.path()).unwrap();
        assert_eq!(source.input_bytes(), 27);
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().unwrap() {
            lines.push(line);
        }
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "10:00:00.000 a");
        assert_eq!(lines[1].text, "body \u{fffd}");
        assert_eq!(lines[2].index, 2);
        assert_eq!(lines[2].text, "last");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = match TextFileSource::open(&dir.path().join("absent.log")) {
            Ok(_) => panic!("expected missing file to be rejected"),
            Err(err) => err,
        };
        assert!(matches!(err, SourceError::NotFound(_)));
    }
}
