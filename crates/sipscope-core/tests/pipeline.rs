use std::path::PathBuf;

use sipscope_core::{
    AnalysisError, AnalysisOptions, CallStatus, CorrelationMode, Direction, ErrorCategory,
    InputKind, SourceError, StatusCode, TableError, analyze_log_file, analyze_table_file,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn sbc_log_produces_two_finished_calls() {
    let report =
        analyze_log_file(&fixture("sbc_sample.log"), &AnalysisOptions::default()).unwrap();
    assert_eq!(report.input.kind, InputKind::Log);
    assert_eq!(report.calls.len(), 2);

    let answered = &report.calls[0];
    assert_eq!(answered.call.session_id, "7c1e:44:1801");
    assert_eq!(answered.call.caller, "sip:+15550199@sip.pstnhub.microsoft.com");
    assert_eq!(answered.call.callee, "sip:+15550100@sbc.example.com");
    assert_eq!(answered.call.end_time, "09:14:47.520");
    assert_eq!(answered.call.ip_group, "Teams");
    assert_eq!(answered.call.remote_ip, "10.20.0.5");
    assert_eq!(answered.call.termination_reason, "Remote hangup");
    assert_eq!(answered.call.status_code, StatusCode::new(200));
    assert_eq!(answered.status, CallStatus::Success);
    let duration = answered.call.duration.unwrap();
    assert!((duration - 45.42).abs() < 1e-6, "duration {duration}");

    let busy = &report.calls[1];
    assert_eq!(busy.call.session_id, "7c1e:44:1803");
    assert_eq!(busy.call.callee, "sip:2001@10.30.1.9");
    assert_eq!(busy.call.termination_reason, "User busy");
    assert_eq!(busy.call.ip_group, "PBX");
    assert_eq!(busy.call.direction, Direction::Internal);
    assert_eq!(busy.status, CallStatus::Failure);
    assert_eq!(busy.error_category, ErrorCategory::Capacity);
    assert_eq!(busy.technical_details, "SIP 486 - Busy Here");

    assert_eq!(report.summary.attempted, 2);
    assert_eq!(report.summary.success_rate, 50.0);
    assert_eq!(report.summary.unique_sessions, 2);
    assert_eq!(report.sessions.len(), 2);
    assert_eq!(report.errors.len(), 2);
}

#[test]
fn sbc_log_message_statistics() {
    let report =
        analyze_log_file(&fixture("sbc_sample.log"), &AnalysisOptions::default()).unwrap();
    let messages = report.messages.expect("log reports carry message stats");
    assert_eq!(messages.total, 12);
    assert_eq!(messages.unique_sessions, 3);
    assert_eq!(messages.options, 1);
    assert_eq!(messages.success_responses, 2);
    assert_eq!(messages.client_errors, 1);
    assert_eq!(messages.server_errors, 0);
    assert_eq!(messages.by_direction[&Direction::Outgoing], 5);
    assert_eq!(messages.by_direction[&Direction::Incoming], 4);
    assert_eq!(messages.sessions.len(), 3);
}

#[test]
fn flushing_adds_the_unfinished_options_session() {
    let options = AnalysisOptions {
        flush_open_sessions: true,
        ..AnalysisOptions::default()
    };
    let report = analyze_log_file(&fixture("sbc_sample.log"), &options).unwrap();
    assert_eq!(report.calls.len(), 3);
    let open = &report.calls[2];
    assert_eq!(open.call.session_id, "7c1e:44:1802");
    assert_eq!(open.call.termination_reason, "Incomplete");
    assert_eq!(open.call.end_time, "09:14:03.041");
}

#[test]
fn shared_mode_still_finalizes_on_each_call_end() {
    let options = AnalysisOptions {
        correlation: CorrelationMode::Shared,
        ..AnalysisOptions::default()
    };
    let report = analyze_log_file(&fixture("sbc_sample.log"), &options).unwrap();
    assert_eq!(report.calls.len(), 2);
    assert_eq!(report.calls[0].call.session_id, "7c1e:44:1801");
}

#[test]
fn report_is_stable_across_runs() {
    let path = fixture("sbc_sample.log");
    let first = analyze_log_file(&path, &AnalysisOptions::default()).unwrap();
    let second = analyze_log_file(&path, &AnalysisOptions::default()).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn usage_table_classifies_rows_and_skips_malformed() {
    let report = analyze_table_file(&fixture("pstn_usage.csv")).unwrap();
    assert_eq!(report.input.kind, InputKind::Table);
    assert_eq!(report.calls.len(), 4);
    assert_eq!(report.skipped_rows.len(), 1);
    assert_eq!(report.skipped_rows[0].row, 4);
    assert!(report.skipped_rows[0].reason.contains("Duration (seconds)"));

    let not_found = &report.calls[1];
    assert!(not_found.explanation.to_lowercase().contains("not found"));
    assert_eq!(not_found.error_category, ErrorCategory::Routing);
    assert_eq!(not_found.call.user.as_deref(), Some("Ben Ito"));

    assert_eq!(report.calls[2].call.user.as_deref(), Some("cara@contoso.com"));
    assert_eq!(report.calls[2].call.direction, Direction::Outgoing);

    assert_eq!(report.summary.attempted, 3);
    assert_eq!(report.summary.successful, 1);
    assert_eq!(report.summary.failed, 2);
    assert_eq!(report.summary.success_rate, 33.33);
    assert_eq!(report.summary.max_duration, Some(45.0));
}

#[test]
fn missing_input_is_not_found() {
    let err = analyze_log_file(&fixture("absent.log"), &AnalysisOptions::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::Source(SourceError::NotFound(_))));
}

#[test]
fn table_without_required_columns_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calls.csv");
    std::fs::write(&path, "Start time,Final SIP code\n2024-11-22,200\n").unwrap();

    let err = analyze_table_file(&path).unwrap_err();
    match err {
        AnalysisError::Table(TableError::MissingFields(missing)) => {
            assert_eq!(missing, vec!["Final Microsoft subcode", "Final SIP Phrase"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn windows_1252_names_keep_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calls.csv");
    std::fs::write(
        &path,
        b"Display Name,Final SIP code,Final Microsoft subcode,Final SIP Phrase\n\
          Ana,200,0,OK\n\
          Jos\xe9,486,560486,Busy Here\n\
          Ben,404,560404,Not Found\n",
    )
    .unwrap();

    let report = analyze_table_file(&path).unwrap();
    assert!(report.skipped_rows.is_empty());
    assert_eq!(report.calls.len(), 3);
    assert_eq!(report.calls[1].call.user.as_deref(), Some("Jos\u{fffd}"));
    assert_eq!(report.calls[1].call.status_code, StatusCode::new(486));
    assert_eq!(report.calls[2].status, CallStatus::Failure);
}
