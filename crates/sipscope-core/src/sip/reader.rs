use std::sync::OnceLock;

use regex::Regex;
use time::Time;

use super::layout;

macro_rules! pattern {
    ($name:ident, $source:expr) => {
        pub(crate) fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($source).expect(concat!("valid ", stringify!($name))))
        }
    };
}

pattern!(timestamp_re, layout::TIMESTAMP_PATTERN);
pattern!(ipv4_re, layout::IPV4_PATTERN);
pattern!(sid_re, layout::SID_PATTERN);
pattern!(message_type_re, layout::MESSAGE_TYPE_PATTERN);
pattern!(status_line_re, layout::STATUS_LINE_PATTERN);
pattern!(ip_group_re, layout::IP_GROUP_PATTERN);
pattern!(termination_reason_re, layout::TERMINATION_REASON_PATTERN);

/// Tolerant, read-only view over one message block's text.
///
/// Every accessor returns `None` (or an empty iterator) when its pattern is
/// absent; nothing here errors.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use sipscope_core::sip::reader::BlockReader;
///
/// let reader = BlockReader::new("FROM: \"Al\" <sip:a@x>;tag=1");
/// assert_eq!(reader.header("FROM:"), Some("\"Al\" <sip:a@x>;tag=1"));
/// assert_eq!(reader.angle_header("FROM:"), Some("sip:a@x"));
/// ```
pub struct BlockReader<'a> {
    text: &'a str,
}

impl<'a> BlockReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn contains(&self, marker: &str) -> bool {
        self.text.contains(marker)
    }

    /// First capture group of `re`, if it matched.
    pub fn capture(&self, re: &Regex) -> Option<&'a str> {
        re.captures(self.text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Whole text of the first match of `re`.
    pub fn find(&self, re: &Regex) -> Option<&'a str> {
        re.find(self.text).map(|m| m.as_str())
    }

    pub fn ipv4s(&self) -> impl Iterator<Item = &'a str> + 'a {
        let text = self.text;
        ipv4_re().find_iter(text).map(|m| m.as_str())
    }

    /// Non-empty values after each occurrence of a case-sensitive header
    /// label, up to end of line.
    fn header_values<'l>(&self, label: &'l str) -> impl Iterator<Item = &'a str> + use<'a, 'l> {
        let text = self.text;
        text.match_indices(label).filter_map(move |(idx, _)| {
            let rest = &text[idx + label.len()..];
            let line = rest.split(['\r', '\n']).next().unwrap_or("");
            let value = line.trim();
            (!value.is_empty()).then_some(value)
        })
    }

    /// First non-empty value of a header.
    pub fn header(&self, label: &str) -> Option<&'a str> {
        self.header_values(label).next()
    }

    /// The `<...>` portion of the first header value that carries one.
    pub fn angle_header(&self, label: &str) -> Option<&'a str> {
        self.header_values(label).find_map(angle_part)
    }
}

fn angle_part(value: &str) -> Option<&str> {
    let open = value.find('<')?;
    let inner = &value[open + 1..];
    let close = inner.find('>')?;
    let inner = inner[..close].trim();
    (!inner.is_empty()).then_some(inner)
}

/// Parse a leading `HH:MM:SS.mmm` into a time of day.
///
/// Returns `None` when the prefix is missing or out of range (e.g. `25:00`).
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use sipscope_core::sip::reader::parse_timestamp;
///
/// let t = parse_timestamp("10:00:01.250 INVITE").unwrap();
/// assert_eq!(t.millisecond(), 250);
/// ```
pub fn parse_timestamp(text: &str) -> Option<Time> {
    let caps = timestamp_re().captures(text)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u16>().ok());
    Time::from_hms_milli(
        field(1)? as u8,
        field(2)? as u8,
        field(3)? as u8,
        field(4)?,
    )
    .ok()
}

/// Seconds elapsed from `start` to `end`, wrapping once past midnight.
pub fn elapsed_seconds(start: Time, end: Time) -> f64 {
    let secs = (end - start).as_seconds_f64();
    if secs < 0.0 { secs + 86_400.0 } else { secs }
}
