//! Taxonomy classification of finalized call records.
//!
//! Classification is fail-soft: unknown status codes and subcodes produce
//! synthesized placeholder text, and a record without any status code is
//! classified as `Info`. Lookups are pure functions of the codes, so
//! classifying the same record twice yields identical text.

use crate::taxonomy::{
    ErrorCategory, NO_SUBCODE, StatusCode, StatusLookup, SubcodeLookup, Taxonomy, UNKNOWN_CATEGORY,
};
use crate::{CallRecord, CallStatus, ClassifiedRecord};

const NO_STATUS_EXPLANATION: &str = "No final status code recorded";
const NO_DETAILED_EXPLANATION: &str = "No detailed explanation available";
const UNKNOWN_SUBCODE_CAUSE: &str = "Unknown";
const UNKNOWN_SUBCODE_RESOLUTION: &str = "Contact support for more information";

/// Verdict for a status code, by leading digit.
///
/// # Examples
/// ```
/// use sipscope_core::{CallStatus, StatusCode, classify_status};
///
/// assert_eq!(classify_status(StatusCode::new(200)), CallStatus::Success);
/// assert_eq!(classify_status(StatusCode::new(180)), CallStatus::Info);
/// assert_eq!(classify_status(StatusCode::new(404)), CallStatus::Failure);
/// assert_eq!(classify_status(StatusCode::new(302)), CallStatus::Warning);
/// assert_eq!(classify_status(None), CallStatus::Info);
/// ```
pub fn classify_status(code: Option<StatusCode>) -> CallStatus {
    match code.map(StatusCode::class_digit) {
        Some(2) => CallStatus::Success,
        Some(3) => CallStatus::Warning,
        Some(4..=6) => CallStatus::Failure,
        _ => CallStatus::Info,
    }
}

/// Classifier bound to a taxonomy instance.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    taxonomy: &'static Taxonomy,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Taxonomy::global())
    }
}

impl Classifier {
    pub fn new(taxonomy: &'static Taxonomy) -> Self {
        Self { taxonomy }
    }

    pub fn classify(&self, call: CallRecord) -> ClassifiedRecord {
        let taxonomy = self.taxonomy;
        let code = call.status_code;

        let (category, error_category, explanation, detailed_explanation) = match code {
            Some(code) => {
                let (explanation, detailed) = match taxonomy.status(code) {
                    StatusLookup::Known(entry) => {
                        (entry.explanation.to_string(), entry.technical.to_string())
                    }
                    StatusLookup::Unknown(code) => (
                        format!("Unknown call issue: {code}"),
                        NO_DETAILED_EXPLANATION.to_string(),
                    ),
                };
                (
                    taxonomy.category(code).to_string(),
                    taxonomy.error_category(code),
                    explanation,
                    detailed,
                )
            }
            None => (
                UNKNOWN_CATEGORY.to_string(),
                ErrorCategory::Uncategorized,
                NO_STATUS_EXPLANATION.to_string(),
                NO_DETAILED_EXPLANATION.to_string(),
            ),
        };

        let subcode = call.subcode.unwrap_or(NO_SUBCODE);
        let (subcode_description, cause, resolution) = match taxonomy.subcode(subcode) {
            SubcodeLookup::Known(entry) => (
                entry.description.to_string(),
                entry.cause.to_string(),
                entry.resolution.to_string(),
            ),
            SubcodeLookup::Unknown(subcode) => (
                format!("Unrecognized network condition: {subcode}"),
                UNKNOWN_SUBCODE_CAUSE.to_string(),
                UNKNOWN_SUBCODE_RESOLUTION.to_string(),
            ),
        };

        let technical_details = match code {
            Some(code) if call.phrase.is_empty() => format!("SIP {code}"),
            Some(code) => format!("SIP {code} - {}", call.phrase),
            None => "SIP -".to_string(),
        };

        ClassifiedRecord {
            status: classify_status(code),
            category,
            error_category,
            explanation,
            detailed_explanation,
            subcode_description,
            cause,
            resolution,
            technical_details,
            call,
        }
    }
}

/// Classify with the shared taxonomy.
pub fn classify(call: CallRecord) -> ClassifiedRecord {
    Classifier::default().classify(call)
}
