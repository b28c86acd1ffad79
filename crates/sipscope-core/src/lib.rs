//! sipscope core library for offline SIP trace and call-record analysis.
//!
//! This crate implements the analysis pipeline used by the CLI: line and row
//! sources feed the SIP decoders (layout/reader/segment/parser), a session
//! correlator folds message blocks into call records, the taxonomy classifier
//! annotates each record, and the aggregator builds a deterministic report.
//! Decoding, classification and aggregation are pure; all file I/O is
//! isolated in `source` modules.
//!
//! Invariants:
//! - Every call record carries a non-empty end time.
//! - Pattern and taxonomy misses never fail; they yield empty fields or
//!   explicit "unknown" placeholders.
//! - Structural problems (missing input, missing table columns) fail; a
//!   malformed table row is skipped and recorded, never fatal.
//! - Report ordering is stable across runs.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use sipscope_core::{AnalysisOptions, analyze_log_file};
//!
//! let report = analyze_log_file(Path::new("sbc.log"), &AnalysisOptions::default())?;
//! println!("calls: {}", report.summary.total);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod aggregate;
mod analysis;
pub mod classify;
pub mod correlate;
pub mod sip;
mod source;
pub mod table;
pub mod taxonomy;

pub use aggregate::{
    Tally, error_summary, group_by_ip, group_by_session, summarize, summarize_messages,
};
pub use analysis::{
    AnalysisError, AnalysisOptions, analyze_log_file, analyze_log_source, analyze_log_text,
    analyze_table_file, analyze_table_source,
};
pub use classify::{Classifier, classify, classify_status};
pub use correlate::{CorrelationMode, SessionContext, SessionCorrelator, SessionState, fold};
pub use sip::Direction;
pub use source::{
    CsvFileSource, LineSource, RowSource, SourceError, TextFileSource, TextSource, VecRowSource,
};
pub use table::{REQUIRED_COLUMNS, RowError, TableError, TableRow, validate_columns};
pub use taxonomy::{ErrorCategory, StatusCode, TAXONOMY_VERSION, Taxonomy};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when the caller does not stamp the report.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Aggregated analysis report with deterministic ordering.
///
/// # Examples
/// ```
/// use sipscope_core::{InputKind, make_stub_report};
///
/// let report = make_stub_report("sbc.log", InputKind::Log, 123);
/// assert_eq!(report.report_version, sipscope_core::REPORT_VERSION);
/// assert!(report.calls.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// RFC3339 timestamp representing the report generation time.
    pub generated_at: String,
    /// Input metadata.
    pub input: InputInfo,
    /// Version of the taxonomy tables used for classification.
    pub taxonomy_version: u32,

    /// Message-level statistics (log input only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<MessageStats>,
    /// Classified call records in input order.
    pub calls: Vec<ClassifiedRecord>,
    /// Scalar statistics over `calls`.
    pub summary: SummaryStats,
    /// Calls grouped by session id, sorted by id.
    pub sessions: Vec<SessionGroup>,
    /// Calls grouped by remote IP, sorted by IP.
    pub ips: Vec<IpGroup>,
    /// Calls per error category and status code, most frequent first.
    pub errors: Vec<ErrorSummaryRow>,
    /// Table rows that were skipped, in row order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_rows: Vec<SkippedRow>,
    /// Whether processing stopped early at the configured block limit.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

/// Tool metadata embedded in reports.
///
/// # Examples
/// ```
/// use sipscope_core::ToolInfo;
///
/// let tool = ToolInfo {
///     name: "sipscope".to_string(),
///     version: "0.1.0".to_string(),
/// };
/// assert_eq!(tool.name, "sipscope");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name (e.g., "sipscope").
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Kind of input that produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Free-form SIP signalling log.
    Log,
    /// Call-record table (CSV export).
    Table,
}

/// Input metadata embedded in reports.
///
/// # Examples
/// ```
/// use sipscope_core::{InputInfo, InputKind};
///
/// let input = InputInfo {
///     path: "calls.csv".to_string(),
///     kind: InputKind::Table,
///     bytes: 1024,
/// };
/// assert_eq!(input.bytes, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path or label as provided to the analyzer.
    pub path: String,
    pub kind: InputKind,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Finalized snapshot of one completed call.
///
/// Log input fills the party and network fields from the correlated session;
/// table input fills the code fields and `user`.
///
/// # Examples
/// ```
/// use sipscope_core::CallRecord;
///
/// let record = CallRecord::ended_at("10:00:05.000");
/// assert_eq!(record.termination_reason, "Normal");
/// assert!(record.duration.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Timestamp of the call-end event (never empty).
    pub end_time: String,
    /// Session id, empty when the log carried none.
    pub session_id: String,
    pub ip_group: String,
    pub caller: String,
    pub callee: String,
    pub direction: Direction,
    pub remote_ip: String,
    /// Reason reported at call end, `"Normal"` when none was logged.
    pub termination_reason: String,
    /// Call duration in seconds, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Final SIP status code, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<StatusCode>,
    /// Vendor subcode, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcode: Option<u32>,
    /// Reason phrase accompanying the status code.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phrase: String,
    /// Display name of the user (table input).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl CallRecord {
    /// Empty record ending at `end_time`, with the default termination reason.
    pub fn ended_at(end_time: impl Into<String>) -> Self {
        Self {
            end_time: end_time.into(),
            session_id: String::new(),
            ip_group: String::new(),
            caller: String::new(),
            callee: String::new(),
            direction: Direction::Internal,
            remote_ip: String::new(),
            termination_reason: sip::layout::DEFAULT_TERMINATION_REASON.to_string(),
            duration: None,
            status_code: None,
            subcode: None,
            phrase: String::new(),
            user: None,
        }
    }
}

/// Coarse call verdict derived from the status code's leading digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CallStatus {
    Success,
    Failure,
    Warning,
    Info,
}

impl CallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Success => "Success",
            CallStatus::Failure => "Failure",
            CallStatus::Warning => "Warning",
            CallStatus::Info => "Info",
        }
    }
}

/// A call record annotated with taxonomy diagnostics.
///
/// # Examples
/// ```
/// use sipscope_core::{CallRecord, CallStatus, StatusCode, classify};
///
/// let mut record = CallRecord::ended_at("10:00:05.000");
/// record.status_code = StatusCode::new(486);
/// let classified = classify(record);
/// assert_eq!(classified.status, CallStatus::Failure);
/// assert_eq!(classified.category, "Client Error");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub call: CallRecord,
    pub status: CallStatus,
    /// Status class name (e.g., "Client Error").
    pub category: String,
    pub error_category: ErrorCategory,
    /// Short operator-facing explanation of the status code.
    pub explanation: String,
    /// Technical explanation of the status code.
    pub detailed_explanation: String,
    pub subcode_description: String,
    pub cause: String,
    pub resolution: String,
    /// `SIP <code> - <phrase>` summary line.
    pub technical_details: String,
}

impl ClassifiedRecord {
    /// Multi-line diagnostic block for reports and terminal output.
    pub fn diagnostic_summary(&self) -> String {
        let code = self
            .call
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());
        let subcode = self
            .call
            .subcode
            .map(|subcode| subcode.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "Category: {} ({})\nSIP Code {}: {}\nSubcode {}: {}\nCause: {}\nResolution: {}\nOriginal Phrase: {}",
            self.category,
            self.error_category,
            code,
            self.explanation,
            subcode,
            self.subcode_description,
            self.cause,
            self.resolution,
            self.call.phrase,
        )
    }
}

/// Scalar statistics over a set of classified records.
///
/// Duration statistics only consider records with a valid non-negative
/// duration. "Attempted" calls are those with a duration above zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total: u64,
    pub by_direction: BTreeMap<Direction, u64>,
    pub by_status: BTreeMap<CallStatus, u64>,
    pub by_error_category: BTreeMap<ErrorCategory, u64>,
    /// Distinct non-empty session ids.
    pub unique_sessions: u64,
    pub attempted: u64,
    /// Attempted calls per verdict.
    pub successful: u64,
    pub failed: u64,
    pub warning: u64,
    pub info: u64,
    /// Average duration in seconds, rounded to 2 decimals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<f64>,
    /// `successful / attempted * 100`, rounded to 2 decimals; 0 when nothing was attempted.
    pub success_rate: f64,
}

/// Records sharing one session id.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
///
/// use sipscope_core::SessionGroup;
///
/// let group = SessionGroup {
///     session_id: "4f2a:7".to_string(),
///     count: 3,
///     directions: BTreeMap::new(),
///     status_codes: BTreeMap::new(),
/// };
/// assert_eq!(group.count, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionGroup {
    pub session_id: String,
    pub count: u64,
    pub directions: BTreeMap<Direction, u64>,
    /// Occurrences per status code; entries without a code are not counted.
    pub status_codes: BTreeMap<StatusCode, u64>,
}

/// Records sharing one IP address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpGroup {
    pub ip: String,
    pub count: u64,
    pub directions: BTreeMap<Direction, u64>,
}

/// Count of calls per (error category, status code).
///
/// # Examples
/// ```
/// use sipscope_core::{ErrorCategory, ErrorSummaryRow, StatusCode};
///
/// let row = ErrorSummaryRow {
///     error_category: ErrorCategory::Routing,
///     status_code: StatusCode::new(404),
///     count: 7,
/// };
/// assert_eq!(row.error_category.as_str(), "Routing");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummaryRow {
    pub error_category: ErrorCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<StatusCode>,
    pub count: u64,
}

/// Occurrences of one message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTypeCount {
    pub message_type: String,
    pub count: u64,
}

/// Message-level statistics over every extracted block of a log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageStats {
    pub total: u64,
    pub by_direction: BTreeMap<Direction, u64>,
    pub unique_sessions: u64,
    /// Most frequent first; blocks without a recognised type are not listed.
    pub message_types: Vec<MessageTypeCount>,
    pub options: u64,
    /// 2xx responses.
    pub success_responses: u64,
    /// 4xx responses.
    pub client_errors: u64,
    /// 5xx responses.
    pub server_errors: u64,
    pub sessions: Vec<SessionGroup>,
    pub ips: Vec<IpGroup>,
}

/// A table row that could not be turned into a call record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// 1-based data row number (the header row is not counted).
    pub row: usize,
    pub reason: String,
}

/// Build a stub report with base fields filled and empty aggregates.
///
/// # Examples
/// ```
/// use sipscope_core::{InputKind, make_stub_report};
///
/// let report = make_stub_report("calls.csv", InputKind::Table, 0);
/// assert_eq!(report.summary.success_rate, 0.0);
/// assert!(report.messages.is_none());
/// ```
pub fn make_stub_report(input_path: &str, kind: InputKind, input_bytes: u64) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "sipscope".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            kind,
            bytes: input_bytes,
        },
        taxonomy_version: TAXONOMY_VERSION,
        messages: None,
        calls: vec![],
        summary: SummaryStats::default(),
        sessions: vec![],
        ips: vec![],
        errors: vec![],
        skipped_rows: vec![],
        truncated: false,
    }
}
