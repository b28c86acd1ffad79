use tracing::warn;

use crate::classify::Classifier;
use crate::table::{TableError, TableRow, validate_columns};
use crate::{ClassifiedRecord, SkippedRow};

/// Row-by-row classification of a call-record table.
pub(crate) struct CallTable {
    classifier: Classifier,
    rows: usize,
    pub calls: Vec<ClassifiedRecord>,
    pub skipped: Vec<SkippedRow>,
}

impl CallTable {
    pub fn new(headers: &[String]) -> Result<Self, TableError> {
        validate_columns(headers)?;
        Ok(Self {
            classifier: Classifier::default(),
            rows: 0,
            calls: Vec::new(),
            skipped: Vec::new(),
        })
    }

    pub fn push(&mut self, row: &TableRow) {
        self.rows += 1;
        match row.to_call_record() {
            Ok(record) => self.calls.push(self.classifier.classify(record)),
            Err(err) => {
                warn!(row = self.rows, error = %err, "skipping table row");
                self.skipped.push(SkippedRow {
                    row: self.rows,
                    reason: err.to_string(),
                });
            }
        }
    }
}
