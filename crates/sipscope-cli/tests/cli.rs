use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("sipscope"))
}

fn repo_root() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root")
        .to_path_buf()
}

fn fixture(name: &str) -> std::path::PathBuf {
    repo_root().join("tests").join("fixtures").join(name)
}

fn stdout_json(args: &[&str], input: std::path::PathBuf) -> Value {
    let assert = cmd()
        .args(args)
        .arg(input)
        .arg("--stdout")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn help_supports_analyse_and_analyze() {
    for group in ["log", "calls"] {
        for verb in ["analyse", "analyze"] {
            cmd().arg(group).arg(verb).arg("--help").assert().success();
        }
    }
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.log");
    let report = temp.path().join("report.json");

    cmd()
        .arg("log")
        .arg("analyze")
        .arg(missing)
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn log_stdout_outputs_report() {
    let json = stdout_json(&["log", "analyse"], fixture("sbc_sample.log"));
    assert_eq!(json["input"]["kind"], "log");
    assert_eq!(json["calls"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["calls"][0]["status"], "Success");
    assert_eq!(json["calls"][1]["status_code"], 486);
    assert_eq!(json["summary"]["success_rate"], 50.0);
    assert_eq!(json["messages"]["options"], 1);
}

#[test]
fn flush_open_reports_incomplete_session() {
    let json = stdout_json(&["log", "analyse", "--flush-open"], fixture("sbc_sample.log"));
    assert_eq!(json["calls"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["calls"][2]["termination_reason"], "Incomplete");
}

#[test]
fn max_blocks_marks_report_truncated() {
    let json = stdout_json(&["log", "analyse", "--max-blocks", "3"], fixture("sbc_sample.log"));
    assert_eq!(json["truncated"], true);
    assert_eq!(json["messages"]["total"], 3);
}

#[test]
fn calls_stdout_lists_skipped_rows() {
    let json = stdout_json(&["calls", "analyse"], fixture("pstn_usage.csv"));
    assert_eq!(json["input"]["kind"], "table");
    assert_eq!(json["calls"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["skipped_rows"][0]["row"], 4);
}

#[test]
fn calls_rejects_non_csv_input() {
    cmd()
        .arg("calls")
        .arg("analyse")
        .arg(fixture("sbc_sample.log"))
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("unsupported input format").and(contains("hint:")));
}

#[test]
fn missing_columns_are_named() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("calls.csv");
    std::fs::write(&input, "Final SIP code,Start time\n200,2024-11-22\n").expect("write csv");

    cmd()
        .arg("calls")
        .arg("analyse")
        .arg(input)
        .arg("--stdout")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("Final Microsoft subcode").and(contains("Final SIP Phrase")));
}

#[test]
fn stdout_and_report_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("log")
        .arg("analyze")
        .arg(fixture("sbc_sample.log"))
        .arg("--stdout")
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn pretty_and_compact_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("log")
        .arg("analyze")
        .arg(fixture("sbc_sample.log"))
        .arg("-o")
        .arg(report)
        .arg("--pretty")
        .arg("--compact")
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn report_written_to_file() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("out").join("report.json");

    cmd()
        .arg("log")
        .arg("analyse")
        .arg(fixture("sbc_sample.log"))
        .arg("-o")
        .arg(&report)
        .arg("--pretty")
        .assert()
        .success()
        .stderr(contains("OK: report written"));

    let text = std::fs::read_to_string(&report).expect("report file");
    let json: Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(json["report_version"], 1);
    assert_eq!(json["tool"]["name"], "sipscope");
}

#[test]
fn quiet_suppresses_ok_message() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("log")
        .arg("analyze")
        .arg(fixture("sbc_sample.log"))
        .arg("-o")
        .arg(report)
        .arg("--quiet")
        .assert()
        .success()
        .stderr(predicates::str::contains("OK:").not());
}

#[test]
fn report_path_must_differ_from_input() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("trace.log");
    std::fs::copy(fixture("sbc_sample.log"), &input).expect("copy fixture");

    cmd()
        .arg("log")
        .arg("analyse")
        .arg(&input)
        .arg("-o")
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("report path must differ from input"));
}

#[test]
fn glob_must_match_exactly_one_file() {
    let temp = TempDir::new().expect("tempdir");
    std::fs::copy(fixture("sbc_sample.log"), temp.path().join("a.log")).expect("copy");
    std::fs::copy(fixture("sbc_sample.log"), temp.path().join("b.log")).expect("copy");
    let pattern = temp.path().join("*.log");

    cmd()
        .arg("log")
        .arg("analyse")
        .arg(pattern)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("multiple files match pattern"));

    let single = temp.path().join("a.*");
    cmd()
        .arg("log")
        .arg("analyse")
        .arg(single)
        .arg("--stdout")
        .assert()
        .success();
}

#[test]
fn list_failures_outputs_categories() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("calls")
        .arg("analyse")
        .arg(fixture("pstn_usage.csv"))
        .arg("-o")
        .arg(report)
        .arg("--list-failures")
        .assert()
        .success()
        .stderr(
            contains("Call failures:")
                .and(contains("Routing 404 (1)"))
                .and(contains("Skipped rows:"))
                .and(contains("row 4:")),
        );
}

#[test]
fn strict_fails_when_calls_failed() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("log")
        .arg("analyse")
        .arg(fixture("sbc_sample.log"))
        .arg("-o")
        .arg(report)
        .arg("--strict")
        .assert()
        .failure()
        .stderr(contains("failed calls or skipped rows detected"));
}
