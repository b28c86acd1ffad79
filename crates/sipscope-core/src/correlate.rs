//! Session correlation.
//!
//! SIP call legs are logged as interleaved multi-line exchanges. The
//! correlator is a small accumulator, not a dialog state machine: only the
//! parties, termination reason, timing and final status survive across
//! blocks, and correlation is best effort by textual session id.
//!
//! `fold` is the pure step over one context. `SessionCorrelator` drives it
//! over a log, keeping one context per session id (or a single shared one in
//! `CorrelationMode::Shared`). Blocks without a session id always share the
//! empty-id context, so sid-less calls that interleave merge their fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Time;
use tracing::{debug, trace};

use crate::CallRecord;
use crate::sip::layout::{DEFAULT_TERMINATION_REASON, INCOMPLETE_TERMINATION_REASON};
use crate::sip::reader::{elapsed_seconds, parse_timestamp};
use crate::sip::{FieldRecord, Observation};
use crate::taxonomy::StatusCode;

/// How blocks are routed to session contexts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMode {
    /// One context per session id.
    #[default]
    PerSession,
    /// A single context for the whole log.
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Accumulating,
}

/// Running state of one in-progress call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    pub caller: Option<String>,
    pub callee: Option<String>,
    pub termination_reason: Option<String>,
    /// Seconds elapsed since `started_at`, as of the latest block.
    pub duration: Option<f64>,
    pub started_at: Option<Time>,
    /// Raw timestamp of the latest block.
    pub last_timestamp: Option<String>,
    pub status_code: Option<StatusCode>,
    pub phrase: Option<String>,
}

impl SessionContext {
    pub fn state(&self) -> SessionState {
        if *self == Self::default() {
            SessionState::Idle
        } else {
            SessionState::Accumulating
        }
    }

    fn absorb(&mut self, observation: &Observation) {
        let fields = &observation.fields;
        let signals = &observation.signals;

        if let Some(ts) = parse_timestamp(&fields.timestamp) {
            let start = *self.started_at.get_or_insert(ts);
            self.duration = Some(elapsed_seconds(start, ts));
            self.last_timestamp = Some(fields.timestamp.clone());
        }
        if let Some(caller) = &signals.caller {
            self.caller = Some(caller.clone());
        }
        if let Some(callee) = &signals.callee {
            self.callee = Some(callee.clone());
        }
        if let Some(reason) = &signals.termination_reason {
            self.termination_reason = Some(reason.clone());
        }
        if let Some(code) = parse_status(&fields.status_code) {
            // A final response is not overwritten by a late provisional one.
            let final_seen = self.status_code.is_some_and(|seen| seen.class_digit() >= 2);
            if !(final_seen && code.class_digit() == 1) {
                self.status_code = Some(code);
                self.phrase = signals.phrase.clone();
            }
        }
    }

    fn into_record(self, end_time: String, fields: Option<&FieldRecord>) -> CallRecord {
        let mut record = CallRecord::ended_at(end_time);
        if let Some(fields) = fields {
            record.session_id = fields.sid.clone();
            record.ip_group = fields.ip_group.clone();
            record.direction = fields.direction;
            record.remote_ip = fields.remote_ip.clone();
        }
        record.caller = self.caller.unwrap_or_default();
        record.callee = self.callee.unwrap_or_default();
        record.termination_reason = self
            .termination_reason
            .unwrap_or_else(|| DEFAULT_TERMINATION_REASON.to_string());
        record.duration = self.duration;
        record.status_code = self.status_code;
        record.phrase = self.phrase.unwrap_or_default();
        record
    }
}

fn parse_status(raw: &str) -> Option<StatusCode> {
    raw.parse::<u16>().ok().and_then(StatusCode::new)
}

/// Fold one observation into `context`.
///
/// Returns the updated context and, when the block marks a call end, the
/// finalized record; the context is then reset to idle. A call-end block
/// without a timestamp is absorbed but does not finalize the call.
///
/// # Examples
/// ```
/// use sipscope_core::correlate::{SessionContext, SessionState, fold};
/// use sipscope_core::sip::{observe, segment};
///
/// let blocks = segment(["10:00:00.000 INVITE FROM: <a@x>", "10:00:03.000 Call End"]);
/// let (ctx, record) = fold(&observe(&blocks[0]), SessionContext::default());
/// assert!(record.is_none());
/// let (ctx, record) = fold(&observe(&blocks[1]), ctx);
/// assert_eq!(ctx.state(), SessionState::Idle);
/// assert_eq!(record.unwrap().caller, "a@x");
/// ```
pub fn fold(
    observation: &Observation,
    mut context: SessionContext,
) -> (SessionContext, Option<CallRecord>) {
    context.absorb(observation);
    let fields = &observation.fields;
    if observation.signals.call_end && !fields.timestamp.is_empty() {
        let record = context.into_record(fields.timestamp.clone(), Some(fields));
        return (SessionContext::default(), Some(record));
    }
    (context, None)
}

/// Drives `fold` over a log in input order.
#[derive(Debug, Default)]
pub struct SessionCorrelator {
    mode: CorrelationMode,
    flush_open_sessions: bool,
    contexts: BTreeMap<String, SessionContext>,
}

impl SessionCorrelator {
    pub fn new(mode: CorrelationMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Emit still-open sessions from `finish` instead of discarding them.
    pub fn with_flush_open_sessions(mut self, flush: bool) -> Self {
        self.flush_open_sessions = flush;
        self
    }

    pub fn open_sessions(&self) -> usize {
        self.contexts.len()
    }

    pub fn push(&mut self, observation: &Observation) -> Option<CallRecord> {
        let key = match self.mode {
            CorrelationMode::PerSession => observation.fields.sid.clone(),
            CorrelationMode::Shared => String::new(),
        };
        let context = self.contexts.remove(&key).unwrap_or_default();
        let (context, record) = fold(observation, context);
        if context.state() == SessionState::Accumulating {
            self.contexts.insert(key, context);
        }
        match &record {
            Some(record) => debug!(
                session_id = %record.session_id,
                end_time = %record.end_time,
                "call finalized"
            ),
            None => trace!(open = self.contexts.len(), "block absorbed"),
        }
        record
    }

    /// End of input. Open sessions are dropped unless flushing is enabled.
    pub fn finish(self) -> Vec<CallRecord> {
        if !self.flush_open_sessions {
            if !self.contexts.is_empty() {
                debug!(open = self.contexts.len(), "discarding unterminated sessions");
            }
            return Vec::new();
        }
        self.contexts
            .into_iter()
            .filter_map(|(key, mut context)| {
                let end_time = context.last_timestamp.clone()?;
                if context.termination_reason.is_none() {
                    context.termination_reason = Some(INCOMPLETE_TERMINATION_REASON.to_string());
                }
                let mut record = context.into_record(end_time, None);
                record.session_id = key;
                Some(record)
            })
            .collect()
    }
}
