use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use sipscope_core::{
    AnalysisError, AnalysisOptions, CallStatus, CorrelationMode, REQUIRED_COLUMNS, Report,
    SourceError,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SIPSCOPE_BUILD_COMMIT"),
    " ",
    env!("SIPSCOPE_BUILD_DATE"),
    ")"
);

const EXAMPLES: &str = concat!(
    "Examples:\n",
    "  sipscope log analyse sbc.log -o report.json\n",
    "  sipscope log analyze 'logs/*.txt' --stdout --pretty\n",
    "  sipscope calls analyse pstn_usage.csv --report report.json --list-failures"
);

#[derive(Parser, Debug)]
#[command(name = "sipscope")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Offline analyzer for SIP signalling logs and PSTN call-record exports.",
    long_about = None,
    after_help = EXAMPLES
)]
struct Cli {
    /// Log debug events to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on SIP signalling logs.
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Operations on call-record tables (CSV).
    Calls {
        #[command(subcommand)]
        command: CallsCommands,
    },
}

#[derive(Subcommand, Debug)]
enum LogCommands {
    /// Correlate a SIP log into classified calls and write a JSON report.
    #[command(alias = "analyze")]
    #[command(after_help = EXAMPLES)]
    Analyse {
        /// Path to a SIP log file (a glob pattern must match exactly one file)
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        /// Keep one session context for the whole log instead of one per SID
        #[arg(long)]
        shared_session: bool,

        /// Report sessions still open at end of input as "Incomplete"
        #[arg(long)]
        flush_open: bool,

        /// Stop after N message blocks
        #[arg(long, value_name = "N")]
        max_blocks: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum CallsCommands {
    /// Classify a call-record export and write a JSON report.
    #[command(alias = "analyze")]
    #[command(after_help = EXAMPLES)]
    Analyse {
        /// Path to a .csv call-record export (a glob pattern must match exactly one file)
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output report path (JSON)
    #[arg(short = 'o', long, required_unless_present = "stdout")]
    report: Option<PathBuf>,

    /// Write JSON report to stdout
    #[arg(long, conflicts_with = "report")]
    stdout: bool,

    /// Pretty-print JSON output
    #[arg(long, conflicts_with = "compact")]
    pretty: bool,

    /// Compact JSON output (default)
    #[arg(long)]
    compact: bool,

    /// Suppress non-error output
    #[arg(long)]
    quiet: bool,

    /// Exit with a non-zero code if any call failed or any row was skipped
    #[arg(long)]
    strict: bool,

    /// List failed calls and skipped rows after analysis
    #[arg(long)]
    list_failures: bool,
}

#[derive(Debug, Clone, Copy)]
enum InputFormat {
    Log,
    Table,
}

impl Commands {
    fn output(&self) -> &OutputArgs {
        match self {
            Commands::Log {
                command: LogCommands::Analyse { output, .. },
            } => output,
            Commands::Calls {
                command: CallsCommands::Analyse { output, .. },
            } => output,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.command.output().quiet);

    let result = match cli.command {
        Commands::Log { command } => match command {
            LogCommands::Analyse {
                input,
                output,
                shared_session,
                flush_open,
                max_blocks,
            } => {
                let options = AnalysisOptions {
                    correlation: if shared_session {
                        CorrelationMode::Shared
                    } else {
                        CorrelationMode::PerSession
                    },
                    flush_open_sessions: flush_open,
                    max_blocks,
                };
                cmd_analyse(input, &output, InputFormat::Log, &options)
            }
        },
        Commands::Calls { command } => match command {
            CallsCommands::Analyse { input, output } => cmd_analyse(
                input,
                &output,
                InputFormat::Table,
                &AnalysisOptions::default(),
            ),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

impl From<AnalysisError> for CliError {
    fn from(err: AnalysisError) -> Self {
        let hint = match &err {
            AnalysisError::Source(SourceError::NotFound(_)) => {
                Some("check the input path".to_string())
            }
            AnalysisError::Source(SourceError::Csv(_)) => {
                Some("the call table must be a comma-separated file with a header row".to_string())
            }
            AnalysisError::Table(_) => Some(format!(
                "the call table must contain the columns: {}",
                REQUIRED_COLUMNS.join(", ")
            )),
            _ => None,
        };
        CliError::new(format!("analysis failed: {err}"), hint)
    }
}

fn cmd_analyse(
    input: PathBuf,
    output: &OutputArgs,
    format: InputFormat,
    options: &AnalysisOptions,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input, format)?;
    validate_input_file(&resolved_input, format)?;
    debug!(input = %resolved_input.display(), ?format, "resolved input");
    let report = if output.stdout {
        None
    } else {
        Some(output.report.clone().ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };
    if let Some(report_path) = report.as_ref() {
        ensure_distinct_paths(&resolved_input, report_path)?;
    }

    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some(format.expected().to_string()),
        ));
    }

    let rep = match format {
        InputFormat::Log => sipscope_core::analyze_log_file(&resolved_input, options)?,
        InputFormat::Table => sipscope_core::analyze_table_file(&resolved_input)?,
    };
    let json = serialize_report(&rep, output.pretty, output.compact)?;

    match report {
        None => print!("{}", json),
        Some(report) => {
            if let Some(parent) = report.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(&report, json)
                .with_context(|| format!("Failed to write report: {}", report.display()))?;
            if !output.quiet {
                eprintln!("OK: report written -> {}", report.display());
            }
        }
    }

    if output.list_failures && !output.quiet {
        print_failures(&rep);
    }
    if output.strict && has_failures(&rep) {
        return Err(CliError::new(
            "failed calls or skipped rows detected",
            Some("use --list-failures to inspect".to_string()),
        ));
    }
    Ok(())
}

fn ensure_distinct_paths(input: &Path, report_path: &Path) -> Result<(), CliError> {
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    let report_dir = match report_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => match fs::canonicalize(parent) {
            Ok(dir) => dir,
            // Directory does not exist yet, so the report cannot alias the input.
            Err(_) => return Ok(()),
        },
        _ => fs::canonicalize(".").context("Failed to resolve current directory")?,
    };
    let file_name = report_path.file_name().ok_or_else(|| {
        CliError::new(
            format!("invalid report path: {}", report_path.display()),
            Some("the report path must name a file".to_string()),
        )
    })?;
    if report_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!(
                "report path must differ from input: {}",
                report_path.display()
            ),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn serialize_report(rep: &Report, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn has_failures(rep: &Report) -> bool {
    !rep.skipped_rows.is_empty() || rep.calls.iter().any(|call| call.status == CallStatus::Failure)
}

fn print_failures(rep: &Report) {
    eprintln!("Call failures:");
    for row in &rep.errors {
        let Some(code) = row.status_code.filter(|code| code.class_digit() >= 4) else {
            continue;
        };
        eprintln!("  {} {} ({})", row.error_category, code, row.count);
    }
    if !rep.skipped_rows.is_empty() {
        eprintln!("Skipped rows:");
        for skipped in &rep.skipped_rows {
            eprintln!("  row {}: {}", skipped.row, skipped.reason);
        }
    }
}

impl InputFormat {
    fn expected(self) -> &'static str {
        match self {
            InputFormat::Log => "use a SIP log text file",
            InputFormat::Table => "use a .csv call-record export",
        }
    }
}

fn validate_input_file(input: &Path, format: InputFormat) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some(format.expected().to_string()),
        ));
    }
    if let InputFormat::Table = format {
        let ext = input
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if ext != "csv" {
            return Err(CliError::new(
                format!("unsupported input format '{}'", input.display()),
                Some("export the call records as .csv".to_string()),
            ));
        }
    }
    Ok(())
}

fn resolve_input_path(input: &Path, format: InputFormat) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some(format!(
                "check the path or quote the pattern; {}",
                format.expected()
            )),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single input file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
