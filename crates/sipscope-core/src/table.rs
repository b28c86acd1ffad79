//! Call-record tables (PSTN usage exports).
//!
//! A table must carry every column in `REQUIRED_COLUMNS`; other columns are
//! optional. Column validation happens once before any row is read, and a
//! row that cannot be converted is reported as a `RowError` for the caller to
//! skip.

use thiserror::Error;

use crate::CallRecord;
use crate::sip::Direction;
use crate::taxonomy::StatusCode;

pub const SIP_CODE_COLUMN: &str = "Final SIP code";
pub const SUBCODE_COLUMN: &str = "Final Microsoft subcode";
pub const PHRASE_COLUMN: &str = "Final SIP Phrase";
pub const DURATION_COLUMN: &str = "Duration (seconds)";
pub const START_TIME_COLUMN: &str = "Start time";
pub const DISPLAY_NAME_COLUMN: &str = "Display Name";
pub const UPN_COLUMN: &str = "UPN";
pub const SESSION_ID_COLUMN: &str = "Session ID";
pub const CALLER_COLUMN: &str = "Caller Number";
pub const CALLEE_COLUMN: &str = "Callee Number";
pub const CALL_TYPE_COLUMN: &str = "Call Type";

pub const REQUIRED_COLUMNS: [&str; 3] = [SIP_CODE_COLUMN, SUBCODE_COLUMN, PHRASE_COLUMN];

/// End time used when a row has no start time.
pub const UNKNOWN_START_TIME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("malformed numeric value {value:?} in column '{column}'")]
    MalformedNumeric { column: String, value: String },
    #[error("status code {0} is outside 100..=999")]
    StatusOutOfRange(u16),
}

/// Check that every required column is present.
///
/// # Examples
/// ```
/// use sipscope_core::{TableError, validate_columns};
///
/// let headers = ["Final SIP code", "Final Microsoft subcode", "Final SIP Phrase"];
/// assert!(validate_columns(&headers).is_ok());
/// let err = validate_columns(&["Final SIP code"]).unwrap_err();
/// assert_eq!(
///     err,
///     TableError::MissingFields(vec![
///         "Final Microsoft subcode".to_string(),
///         "Final SIP Phrase".to_string(),
///     ])
/// );
/// ```
///
/// # Errors
/// Returns `TableError::MissingFields` naming all missing columns, in
/// `REQUIRED_COLUMNS` order.
pub fn validate_columns<S: AsRef<str>>(headers: &[S]) -> Result<(), TableError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|header| header.as_ref().trim() == **required))
        .map(|required| required.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(TableError::MissingFields(missing))
    }
}

/// One data row as ordered (column, value) pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    cells: Vec<(String, String)>,
}

impl TableRow {
    pub fn new<I, K, V>(cells: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: cells
                .into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        }
    }

    /// Trimmed value of the first cell under `column`.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name.trim() == column)
            .map(|(_, value)| value.trim())
    }

    fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|value| !value.is_empty())
    }

    /// Convert the row into a call record.
    ///
    /// # Examples
    /// ```
    /// use sipscope_core::{StatusCode, TableRow};
    ///
    /// let row = TableRow::new([
    ///     ("Final SIP code", "486"),
    ///     ("Final Microsoft subcode", "560486"),
    ///     ("Final SIP Phrase", "Busy Here"),
    ///     ("Duration (seconds)", "0"),
    /// ]);
    /// let record = row.to_call_record().unwrap();
    /// assert_eq!(record.status_code, StatusCode::new(486));
    /// assert_eq!(record.end_time, "Unknown");
    /// ```
    ///
    /// # Errors
    /// Returns `RowError` when a numeric column is malformed or the status
    /// code is not three digits.
    pub fn to_call_record(&self) -> Result<CallRecord, RowError> {
        let code = parse_integer(SIP_CODE_COLUMN, self.get(SIP_CODE_COLUMN).unwrap_or_default())?;
        let code = u16::try_from(code).map_err(|_| malformed(SIP_CODE_COLUMN, self))?;
        let status_code = StatusCode::new(code).ok_or(RowError::StatusOutOfRange(code))?;

        let subcode = parse_integer(SUBCODE_COLUMN, self.get(SUBCODE_COLUMN).unwrap_or_default())?;
        let subcode = u32::try_from(subcode).map_err(|_| malformed(SUBCODE_COLUMN, self))?;

        let duration = match self.non_empty(DURATION_COLUMN) {
            Some(raw) => Some(parse_duration(raw)?),
            None => None,
        };

        let mut record =
            CallRecord::ended_at(self.non_empty(START_TIME_COLUMN).unwrap_or(UNKNOWN_START_TIME));
        record.status_code = Some(status_code);
        record.subcode = Some(subcode);
        record.phrase = self.get(PHRASE_COLUMN).unwrap_or_default().to_string();
        record.duration = duration;
        record.user = self
            .non_empty(DISPLAY_NAME_COLUMN)
            .or_else(|| self.non_empty(UPN_COLUMN))
            .map(str::to_string);
        record.session_id = self.get(SESSION_ID_COLUMN).unwrap_or_default().to_string();
        record.caller = self.get(CALLER_COLUMN).unwrap_or_default().to_string();
        record.callee = self.get(CALLEE_COLUMN).unwrap_or_default().to_string();
        record.direction = self
            .non_empty(CALL_TYPE_COLUMN)
            .map_or(Direction::Internal, direction_of_call_type);
        Ok(record)
    }
}

fn malformed(column: &str, row: &TableRow) -> RowError {
    RowError::MalformedNumeric {
        column: column.to_string(),
        value: row.get(column).unwrap_or_default().to_string(),
    }
}

/// Integers may be exported as `404` or `404.0`.
fn parse_integer(column: &str, raw: &str) -> Result<u64, RowError> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u64>() {
        return Ok(value);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 => {
            Ok(value as u64)
        }
        _ => Err(RowError::MalformedNumeric {
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn parse_duration(raw: &str) -> Result<f64, RowError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(RowError::MalformedNumeric {
            column: DURATION_COLUMN.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// `ByotIn`, `user_in` and similar are inbound; anything mentioning `out` is outbound.
fn direction_of_call_type(call_type: &str) -> Direction {
    let call_type = call_type.to_ascii_lowercase();
    if call_type.contains("out") {
        Direction::Outgoing
    } else if call_type.ends_with("in") || call_type.contains("incoming") {
        Direction::Incoming
    } else {
        Direction::Internal
    }
}
