use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::layout;
use super::reader::{
    BlockReader, ip_group_re, message_type_re, sid_re, status_line_re, termination_reason_re,
    timestamp_re,
};
use super::segment::MessageBlock;

/// Message direction, decided by fixed markers in the block text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Incoming,
    Outgoing,
    #[default]
    Internal,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Incoming => "Incoming",
            Direction::Outgoing => "Outgoing",
            Direction::Internal => "Internal",
        }
    }

    fn detect(reader: &BlockReader<'_>) -> Self {
        if reader.contains(layout::INCOMING_MARKER) {
            Direction::Incoming
        } else if reader.contains(layout::OUTGOING_MARKER) {
            Direction::Outgoing
        } else {
            Direction::Internal
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys of a `FieldRecord`, in output order.
pub const FIELD_KEYS: [&str; 12] = [
    "timestamp",
    "ip",
    "remote_ip",
    "sid",
    "message_type",
    "status_code",
    "call_id",
    "from_uri",
    "to_uri",
    "user_agent",
    "ip_group",
    "direction",
];

/// Flat fields extracted from one message block. Absent fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub timestamp: String,
    pub ip: String,
    pub remote_ip: String,
    pub sid: String,
    pub message_type: String,
    pub status_code: String,
    pub call_id: String,
    pub from_uri: String,
    pub to_uri: String,
    pub user_agent: String,
    pub ip_group: String,
    pub direction: Direction,
}

impl FieldRecord {
    /// Value of one field by key; `None` only for unknown keys.
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "timestamp" => &self.timestamp,
            "ip" => &self.ip,
            "remote_ip" => &self.remote_ip,
            "sid" => &self.sid,
            "message_type" => &self.message_type,
            "status_code" => &self.status_code,
            "call_id" => &self.call_id,
            "from_uri" => &self.from_uri,
            "to_uri" => &self.to_uri,
            "user_agent" => &self.user_agent,
            "ip_group" => &self.ip_group,
            "direction" => return Some(self.direction.as_str()),
            _ => return None,
        };
        Some(value.as_str())
    }

    /// All fields keyed by name; always `FIELD_KEYS.len()` entries.
    pub fn to_map(&self) -> BTreeMap<&'static str, String> {
        FIELD_KEYS
            .iter()
            .map(|key| (*key, self.get(key).unwrap_or_default().to_string()))
            .collect()
    }
}

/// Correlation hints that span lines and are not part of `FieldRecord`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSignals {
    pub caller: Option<String>,
    pub callee: Option<String>,
    pub termination_reason: Option<String>,
    /// Reason phrase of a status line (`SIP/2.0 486 Busy Here`).
    pub phrase: Option<String>,
    pub call_end: bool,
}

/// A block's fields together with its session signals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    pub fields: FieldRecord,
    pub signals: SessionSignals,
}

/// Extract the flat field record of one block. Never fails.
///
/// # Examples
/// ```
/// use sipscope_core::sip::{Direction, extract, segment};
///
/// let blocks = segment([
///     "10:00:00.000 Incoming SIP Message from 10.0.0.1 to 10.0.0.2 [SID=ab:1]",
///     "SIP/2.0 486 Busy Here",
/// ]);
/// let record = extract(&blocks[0]);
/// assert_eq!(record.status_code, "486");
/// assert_eq!(record.remote_ip, "10.0.0.2");
/// assert_eq!(record.direction, Direction::Incoming);
/// ```
pub fn extract(block: &MessageBlock) -> FieldRecord {
    let text = block.text();
    extract_text(&text)
}

fn extract_text(text: &str) -> FieldRecord {
    let reader = BlockReader::new(text);
    let mut ips = reader.ipv4s();
    let ip = ips.next().unwrap_or_default();
    let remote_ip = ips.next().unwrap_or_default();
    let status = reader.capture(status_line_re()).unwrap_or_default();

    FieldRecord {
        timestamp: own(reader.find(timestamp_re())),
        ip: ip.to_string(),
        remote_ip: remote_ip.to_string(),
        sid: own(reader.capture(sid_re())),
        message_type: own(reader.capture(message_type_re())),
        status_code: status.to_string(),
        call_id: own(reader.header(layout::CALL_ID_HEADER)),
        from_uri: own(reader.header(layout::FROM_HEADER)),
        to_uri: own(reader.header(layout::TO_HEADER)),
        user_agent: own(reader.header(layout::USER_AGENT_HEADER)),
        ip_group: own(reader.capture(ip_group_re())),
        direction: Direction::detect(&reader),
    }
}

/// Extract the correlation hints of one block.
pub fn signals(block: &MessageBlock) -> SessionSignals {
    let text = block.text();
    signals_text(&text)
}

fn signals_text(text: &str) -> SessionSignals {
    let reader = BlockReader::new(text);
    let phrase = status_line_re()
        .captures(text)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().trim())
        .filter(|phrase| !phrase.is_empty());

    SessionSignals {
        caller: reader.angle_header(layout::FROM_HEADER).map(str::to_string),
        callee: reader.angle_header(layout::TO_HEADER).map(str::to_string),
        termination_reason: reader
            .capture(termination_reason_re())
            .map(|reason| reason.trim().to_string()),
        phrase: phrase.map(str::to_string),
        call_end: layout::CALL_END_MARKERS
            .iter()
            .any(|marker| reader.contains(marker)),
    }
}

/// Fields and signals of one block, sharing a single text join.
pub fn observe(block: &MessageBlock) -> Observation {
    let text = block.text();
    Observation {
        fields: extract_text(&text),
        signals: signals_text(&text),
    }
}

fn own(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}
