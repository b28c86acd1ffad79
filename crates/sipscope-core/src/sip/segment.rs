use serde::{Deserialize, Serialize};

use super::reader::timestamp_re;

/// One 0-indexed line of the source log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLine {
    pub index: usize,
    pub text: String,
}

impl RawLine {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// Contiguous lines forming one protocol message.
///
/// The first line carries the message timestamp, except for text preceding
/// the first timestamp-led line (or a log with none at all), which is kept
/// as one block of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBlock {
    lines: Vec<RawLine>,
}

impl MessageBlock {
    pub fn lines(&self) -> &[RawLine] {
        &self.lines
    }

    pub fn first_line(&self) -> Option<&RawLine> {
        self.lines.first()
    }

    /// Lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|line| line.text.trim().is_empty())
    }

    fn push(&mut self, line: RawLine) {
        self.lines.push(line);
    }
}

/// Whether `line` opens a new block (leading `HH:MM:SS.mmm`).
pub fn is_block_start(line: &str) -> bool {
    timestamp_re().is_match(line)
}

/// Incremental line classifier.
///
/// Feed lines in file order with `push`; a completed block is returned when
/// the next timestamp-led line arrives. Call `finish` at end of input to
/// flush the last block. Blank blocks are never returned.
#[derive(Debug, Default)]
pub struct Segmenter {
    current: MessageBlock,
}

impl Segmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: RawLine) -> Option<MessageBlock> {
        let completed = if is_block_start(&line.text) && !self.current.lines.is_empty() {
            non_blank(std::mem::take(&mut self.current))
        } else {
            None
        };
        self.current.push(line);
        completed
    }

    pub fn finish(&mut self) -> Option<MessageBlock> {
        non_blank(std::mem::take(&mut self.current))
    }
}

fn non_blank(block: MessageBlock) -> Option<MessageBlock> {
    if block.is_blank() { None } else { Some(block) }
}

/// Group lines into message blocks, preserving order.
///
/// # Examples
/// ```
/// use sipscope_core::sip::segment;
///
/// let blocks = segment(["10:00:00.000 INVITE", "FROM: <a@x>", "10:00:01.000 ACK"]);
/// assert_eq!(blocks.len(), 2);
/// assert_eq!(blocks[0].lines().len(), 2);
/// ```
pub fn segment<I, S>(lines: I) -> Vec<MessageBlock>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut segmenter = Segmenter::new();
    let mut blocks: Vec<MessageBlock> = lines
        .into_iter()
        .enumerate()
        .filter_map(|(index, text)| segmenter.push(RawLine::new(index, text)))
        .collect();
    blocks.extend(segmenter.finish());
    blocks
}

#[cfg(test)]
mod tests {
    use super::{is_block_start, segment};

    #[test]
    fn no_timestamp_lines_yield_single_block() {
        let lines = ["header only", "  continued", "tail"];
        let blocks = segment(lines);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines().len(), 3);
        assert_eq!(blocks[0].text(), "header only\n  continued\ntail");
    }

    #[test]
    fn each_timestamp_line_opens_a_block() {
        let lines = [
            "10:00:00.000 one",
            "body a",
            "body b",
            "10:00:00.100 two",
            "10:00:00.200 three",
            "body c",
        ];
        let blocks = segment(lines);
        assert_eq!(blocks.len(), 3);
        for block in &blocks {
            let first = block.first_line().unwrap();
            assert!(is_block_start(&first.text));
        }
        assert_eq!(blocks[0].lines().len(), 3);
        assert_eq!(blocks[1].lines().len(), 1);
        assert_eq!(blocks[2].lines()[1].index, 5);
    }

    #[test]
    fn blank_blocks_are_dropped() {
        let blocks = segment(["", "   ", "10:00:00.000 x", ""]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].first_line().unwrap().index, 2);
        assert!(segment(Vec::<String>::new()).is_empty());
        assert!(segment(["", " \t"]).is_empty());
    }

    #[test]
    fn indented_timestamp_does_not_open_block() {
        let blocks = segment(["10:00:00.000 a", " 10:00:01.000 b"]);
        assert_eq!(blocks.len(), 1);
    }
}
