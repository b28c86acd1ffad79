use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::correlate::CorrelationMode;
use crate::source::{
    CsvFileSource, LineSource, RowSource, SourceError, TextFileSource, TextSource,
};
use crate::table::TableError;
use crate::{
    ClassifiedRecord, DEFAULT_GENERATED_AT, InputKind, Report, error_summary, group_by_ip,
    group_by_session, make_stub_report, summarize,
};

mod calls;
mod logs;

use calls::CallTable;
use logs::LogPipeline;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

/// Knobs for the log pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub correlation: CorrelationMode,
    /// Emit sessions still open at end of input with reason `"Incomplete"`.
    pub flush_open_sessions: bool,
    /// Stop after this many message blocks; the report is marked truncated.
    pub max_blocks: Option<usize>,
}

/// Analyse a SIP log file.
///
/// # Errors
/// Returns `AnalysisError::Source` when the file is missing or unreadable.
pub fn analyze_log_file(path: &Path, options: &AnalysisOptions) -> Result<Report, AnalysisError> {
    let source = TextFileSource::open(path)?;
    let mut report = analyze_log_source(&path.display().to_string(), source, options)?;
    report.generated_at = modified_rfc3339(path);
    Ok(report)
}

/// Analyse any line source; `label` is recorded as the input path.
///
/// # Errors
/// Propagates the first error returned by `source`.
pub fn analyze_log_source<S: LineSource>(
    label: &str,
    mut source: S,
    options: &AnalysisOptions,
) -> Result<Report, AnalysisError> {
    let mut pipeline = LogPipeline::new(options);
    while let Some(line) = source.next_line()? {
        if !pipeline.push(line) {
            break;
        }
    }
    Ok(log_report(label, source.input_bytes(), pipeline))
}

/// Analyse log text held in memory.
///
/// # Examples
/// ```
/// use sipscope_core::{AnalysisOptions, analyze_log_text};
///
/// let text = "10:00:00.000 INVITE FROM: <a@x> [SID=S1]\n10:00:04.000 Call End [SID=S1]\n";
/// let report = analyze_log_text("inline", text, &AnalysisOptions::default());
/// assert_eq!(report.calls.len(), 1);
/// assert_eq!(report.calls[0].call.caller, "a@x");
/// ```
pub fn analyze_log_text(label: &str, text: &str, options: &AnalysisOptions) -> Report {
    let mut pipeline = LogPipeline::new(options);
    let mut source = TextSource::new(text);
    // In-memory lines never fail.
    while let Ok(Some(line)) = source.next_line() {
        if !pipeline.push(line) {
            break;
        }
    }
    log_report(label, source.input_bytes(), pipeline)
}

fn log_report(label: &str, bytes: u64, pipeline: LogPipeline) -> Report {
    let output = pipeline.finish();
    let mut report = make_stub_report(label, InputKind::Log, bytes);
    report.messages = Some(output.messages);
    report.truncated = output.truncated;
    fill_call_sections(&mut report, output.calls);
    tracing::info!(
        input = label,
        blocks = output.blocks,
        calls = report.calls.len(),
        truncated = report.truncated,
        "log analysis finished"
    );
    report
}

/// Analyse a CSV call-record table.
///
/// # Errors
/// Returns `AnalysisError::Source` when the file is missing or unreadable and
/// `AnalysisError::Table` when required columns are absent.
pub fn analyze_table_file(path: &Path) -> Result<Report, AnalysisError> {
    let source = CsvFileSource::open(path)?;
    let mut report = analyze_table_source(&path.display().to_string(), source)?;
    report.generated_at = modified_rfc3339(path);
    Ok(report)
}

/// Analyse any row source; `label` is recorded as the input path.
///
/// Rows that fail to convert are skipped and listed in `skipped_rows`.
///
/// # Errors
/// Returns `AnalysisError::Table` before reading any row when required
/// columns are absent, or the first error returned by `source`.
pub fn analyze_table_source<S: RowSource>(
    label: &str,
    mut source: S,
) -> Result<Report, AnalysisError> {
    let mut table = CallTable::new(source.headers())?;
    while let Some(row) = source.next_row()? {
        table.push(&row);
    }

    let mut report = make_stub_report(label, InputKind::Table, source.input_bytes());
    report.skipped_rows = table.skipped;
    fill_call_sections(&mut report, table.calls);
    tracing::info!(
        input = label,
        calls = report.calls.len(),
        skipped = report.skipped_rows.len(),
        "table analysis finished"
    );
    Ok(report)
}

fn fill_call_sections(report: &mut Report, calls: Vec<ClassifiedRecord>) {
    report.summary = summarize(&calls);
    report.sessions = group_by_session(&calls);
    report.ips = group_by_ip(&calls);
    report.errors = error_summary(&calls);
    report.calls = calls;
}

/// Input modification time, so repeated runs over one file stamp alike.
fn modified_rfc3339(path: &Path) -> String {
    path.metadata()
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| OffsetDateTime::from(modified).replace_nanosecond(0).ok())
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::VecRowSource;
    use crate::{CallStatus, Direction};

    const LOG: &str = "\
10:00:00.000 Incoming SIP Message from 10.0.0.1 to 10.0.0.2 IPG_Teams [SID=A1]
INVITE sip:+15550100@sbc.example.com SIP/2.0
FROM: <sip:+15550199@pbx.example.com>;tag=1
TO: <sip:+15550100@sbc.example.com>
10:00:00.400 Outgoing SIP Message to 10.0.0.1 from 10.0.0.2 IPG_Teams [SID=A1]
SIP/2.0 200 OK
10:00:30.000 Incoming SIP Message from 10.0.0.1 to 10.0.0.2 IPG_Teams [SID=A1] Call End
Call End Reason: Remote hangup
";

    #[test]
    fn log_text_yields_classified_call() {
        let report = analyze_log_text("inline", LOG, &AnalysisOptions::default());
        assert_eq!(report.calls.len(), 1);
        let call = &report.calls[0];
        assert_eq!(call.status, CallStatus::Success);
        assert_eq!(call.call.session_id, "A1");
        assert_eq!(call.call.ip_group, "Teams");
        assert_eq!(call.call.direction, Direction::Incoming);
        assert_eq!(call.call.remote_ip, "10.0.0.2");
        assert_eq!(call.call.termination_reason, "Remote hangup");
        assert_eq!(call.call.duration, Some(30.0));
        assert_eq!(call.call.phrase, "OK");

        let messages = report.messages.as_ref().unwrap();
        assert_eq!(messages.total, 3);
        assert_eq!(messages.success_responses, 1);
        assert_eq!(report.summary.success_rate, 100.0);
        assert_eq!(report.sessions.len(), 1);
        assert!(!report.truncated);
    }

    #[test]
    fn block_limit_truncates() {
        let options = AnalysisOptions {
            max_blocks: Some(2),
            ..AnalysisOptions::default()
        };
        let report = analyze_log_text("inline", LOG, &options);
        assert!(report.truncated);
        assert!(report.calls.is_empty());
        assert_eq!(report.messages.unwrap().total, 2);
    }

    #[test]
    fn flushing_reports_open_session() {
        let options = AnalysisOptions {
            flush_open_sessions: true,
            max_blocks: Some(2),
            ..AnalysisOptions::default()
        };
        let report = analyze_log_text("inline", LOG, &options);
        assert_eq!(report.calls.len(), 1);
        assert_eq!(report.calls[0].call.termination_reason, "Incomplete");
        assert_eq!(report.calls[0].call.end_time, "10:00:00.400");
    }

    #[test]
    fn table_rows_are_classified_and_bad_rows_skipped() {
        let source = VecRowSource::new(
            ["Final SIP code", "Final Microsoft subcode", "Final SIP Phrase", "Duration (seconds)"],
            vec![
                vec!["200", "0", "OK", "42"],
                vec!["oops", "0", "?", "1"],
                vec!["404", "560404", "Not Found", "3"],
            ],
        );
        let report = analyze_table_source("calls.csv", source).unwrap();
        assert_eq!(report.calls.len(), 2);
        assert_eq!(report.skipped_rows.len(), 1);
        assert_eq!(report.skipped_rows[0].row, 2);
        assert_eq!(report.summary.success_rate, 50.0);
        assert_eq!(report.input.kind, InputKind::Table);
        assert!(report.messages.is_none());
    }

    #[test]
    fn missing_columns_fail_before_rows() {
        let source = VecRowSource::new(["Final SIP code"], vec![vec!["200"]]);
        let err = analyze_table_source("calls.csv", source).unwrap_err();
        match err {
            AnalysisError::Table(TableError::MissingFields(missing)) => {
                assert_eq!(missing, vec!["Final Microsoft subcode", "Final SIP Phrase"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
