/// Leading `HH:MM:SS.mmm` at position 0 of a line.
pub const TIMESTAMP_PATTERN: &str = r"^(\d{2}):(\d{2}):(\d{2})\.(\d{3})";
pub const IPV4_PATTERN: &str = r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}";
pub const SID_PATTERN: &str = r"\[SID=([A-Za-z0-9_:]+)\]";
pub const MESSAGE_TYPE_PATTERN: &str =
    r"(OPTIONS|INVITE|ACK|BYE|CANCEL|REGISTER|NOTIFY|SIP/2\.0 \d{3})";
pub const STATUS_LINE_PATTERN: &str = r"SIP/2\.0 (\d{3})(?: ([^\r\n]*))?";
pub const IP_GROUP_PATTERN: &str = r"IPG_(\w+)";
pub const TERMINATION_REASON_PATTERN: &str = r"(?m)Call End Reason: ([^\r\n]+)$";

pub const CALL_ID_HEADER: &str = "CALL-ID:";
pub const FROM_HEADER: &str = "FROM:";
pub const TO_HEADER: &str = "TO:";
pub const USER_AGENT_HEADER: &str = "USER-AGENT:";

/// Checked in order; the first marker present decides.
pub const INCOMING_MARKER: &str = "Incoming SIP Message";
pub const OUTGOING_MARKER: &str = "Outgoing SIP Message";

pub const CALL_END_MARKERS: [&str; 2] = ["Call End", "Released"];

/// Applied when a call ends without an explicit reason.
pub const DEFAULT_TERMINATION_REASON: &str = "Normal";
/// Applied to sessions flushed at end of input.
pub const INCOMPLETE_TERMINATION_REASON: &str = "Incomplete";
