//! Statistics and groupings over extracted and classified records.
//!
//! All outputs use ordered maps or explicitly sorted vectors so a report is
//! byte-identical across runs for the same input.

use std::collections::{BTreeMap, BTreeSet};

use crate::sip::{Direction, FieldRecord};
use crate::taxonomy::{ErrorCategory, StatusCode};
use crate::{
    CallStatus, ClassifiedRecord, ErrorSummaryRow, IpGroup, MessageStats, MessageTypeCount,
    SessionGroup, SummaryStats,
};

/// Keys shared by everything the groupings can count.
pub trait Tally {
    fn session_id(&self) -> &str;
    fn ip(&self) -> &str;
    fn direction(&self) -> Direction;
    fn status_code(&self) -> Option<StatusCode>;
}

impl Tally for FieldRecord {
    fn session_id(&self) -> &str {
        &self.sid
    }

    fn ip(&self) -> &str {
        &self.ip
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn status_code(&self) -> Option<StatusCode> {
        self.status_code.parse::<u16>().ok().and_then(StatusCode::new)
    }
}

impl Tally for ClassifiedRecord {
    fn session_id(&self) -> &str {
        &self.call.session_id
    }

    fn ip(&self) -> &str {
        &self.call.remote_ip
    }

    fn direction(&self) -> Direction {
        self.call.direction
    }

    fn status_code(&self) -> Option<StatusCode> {
        self.call.status_code
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn unique_sessions<T: Tally>(records: &[T]) -> u64 {
    records
        .iter()
        .map(Tally::session_id)
        .filter(|sid| !sid.is_empty())
        .collect::<BTreeSet<_>>()
        .len() as u64
}

fn count_directions<'a, T: Tally + 'a>(
    records: impl IntoIterator<Item = &'a T>,
) -> BTreeMap<Direction, u64> {
    let mut directions = BTreeMap::new();
    for record in records {
        *directions.entry(record.direction()).or_insert(0) += 1;
    }
    directions
}

/// Scalar statistics over classified records.
///
/// # Examples
/// ```
/// use sipscope_core::summarize;
///
/// let stats = summarize(&[]);
/// assert_eq!(stats.total, 0);
/// assert_eq!(stats.success_rate, 0.0);
/// assert!(stats.average_duration.is_none());
/// ```
pub fn summarize(records: &[ClassifiedRecord]) -> SummaryStats {
    let mut stats = SummaryStats {
        total: records.len() as u64,
        by_direction: count_directions(records),
        unique_sessions: unique_sessions(records),
        ..SummaryStats::default()
    };

    let mut duration_sum = 0.0;
    let mut duration_count = 0u64;
    let mut duration_max: Option<f64> = None;

    for record in records {
        *stats.by_status.entry(record.status).or_insert(0) += 1;
        *stats
            .by_error_category
            .entry(record.error_category)
            .or_insert(0) += 1;

        let Some(duration) = record.call.duration.filter(|d| d.is_finite() && *d >= 0.0) else {
            continue;
        };
        duration_sum += duration;
        duration_count += 1;
        duration_max = Some(duration_max.map_or(duration, |max| max.max(duration)));

        if duration > 0.0 {
            stats.attempted += 1;
            match record.status {
                CallStatus::Success => stats.successful += 1,
                CallStatus::Failure => stats.failed += 1,
                CallStatus::Warning => stats.warning += 1,
                CallStatus::Info => stats.info += 1,
            }
        }
    }

    if duration_count > 0 {
        stats.average_duration = Some(round2(duration_sum / duration_count as f64));
        stats.max_duration = duration_max.map(round2);
    }
    if stats.attempted > 0 {
        stats.success_rate = round2(stats.successful as f64 / stats.attempted as f64 * 100.0);
    }
    stats
}

/// Records grouped by non-empty session id, sorted by id.
pub fn group_by_session<T: Tally>(records: &[T]) -> Vec<SessionGroup> {
    let mut groups: BTreeMap<&str, Vec<&T>> = BTreeMap::new();
    for record in records {
        let sid = record.session_id();
        if !sid.is_empty() {
            groups.entry(sid).or_default().push(record);
        }
    }

    groups
        .into_iter()
        .map(|(session_id, members)| {
            let mut status_codes = BTreeMap::new();
            for code in members.iter().filter_map(|record| record.status_code()) {
                *status_codes.entry(code).or_insert(0) += 1;
            }
            SessionGroup {
                session_id: session_id.to_string(),
                count: members.len() as u64,
                directions: count_directions(members.iter().copied()),
                status_codes,
            }
        })
        .collect()
}

/// Records grouped by non-empty IP address, sorted by address text.
pub fn group_by_ip<T: Tally>(records: &[T]) -> Vec<IpGroup> {
    let mut groups: BTreeMap<&str, Vec<&T>> = BTreeMap::new();
    for record in records {
        let ip = record.ip();
        if !ip.is_empty() {
            groups.entry(ip).or_default().push(record);
        }
    }

    groups
        .into_iter()
        .map(|(ip, members)| IpGroup {
            ip: ip.to_string(),
            count: members.len() as u64,
            directions: count_directions(members.iter().copied()),
        })
        .collect()
}

/// Count per (error category, status code), most frequent first.
///
/// Ties are ordered by category, then by code with absent codes first.
pub fn error_summary(records: &[ClassifiedRecord]) -> Vec<ErrorSummaryRow> {
    let mut counts: BTreeMap<(ErrorCategory, Option<StatusCode>), u64> = BTreeMap::new();
    for record in records {
        *counts
            .entry((record.error_category, record.call.status_code))
            .or_insert(0) += 1;
    }

    let mut rows: Vec<ErrorSummaryRow> = counts
        .into_iter()
        .map(|((error_category, status_code), count)| ErrorSummaryRow {
            error_category,
            status_code,
            count,
        })
        .collect();
    // Stable sort keeps the key order from the map for equal counts.
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// Message-level statistics over every extracted block.
pub fn summarize_messages(records: &[FieldRecord]) -> MessageStats {
    let mut types: BTreeMap<&str, u64> = BTreeMap::new();
    let mut stats = MessageStats {
        total: records.len() as u64,
        by_direction: count_directions(records),
        unique_sessions: unique_sessions(records),
        sessions: group_by_session(records),
        ips: group_by_ip(records),
        ..MessageStats::default()
    };

    for record in records {
        if !record.message_type.is_empty() {
            *types.entry(record.message_type.as_str()).or_insert(0) += 1;
        }
        if record.message_type == "OPTIONS" {
            stats.options += 1;
        }
        match Tally::status_code(record).map(StatusCode::class_digit) {
            Some(2) => stats.success_responses += 1,
            Some(4) => stats.client_errors += 1,
            Some(5) => stats.server_errors += 1,
            _ => {}
        }
    }

    let mut message_types: Vec<MessageTypeCount> = types
        .into_iter()
        .map(|(message_type, count)| MessageTypeCount {
            message_type: message_type.to_string(),
            count,
        })
        .collect();
    message_types.sort_by(|a, b| b.count.cmp(&a.count));
    stats.message_types = message_types;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallRecord, classify};

    fn call(code: u16, duration: Option<f64>, sid: &str, ip: &str) -> ClassifiedRecord {
        let mut record = CallRecord::ended_at("10:00:00.000");
        record.status_code = StatusCode::new(code);
        record.duration = duration;
        record.session_id = sid.to_string();
        record.remote_ip = ip.to_string();
        classify(record)
    }

    fn field(sid: &str, ip: &str, message_type: &str, status: &str) -> FieldRecord {
        FieldRecord {
            sid: sid.to_string(),
            ip: ip.to_string(),
            message_type: message_type.to_string(),
            status_code: status.to_string(),
            ..FieldRecord::default()
        }
    }

    #[test]
    fn even_split_gives_half_success_rate() {
        let records = vec![
            call(200, Some(30.0), "a", ""),
            call(486, Some(4.0), "b", ""),
            call(200, Some(12.0), "c", ""),
            call(404, Some(1.0), "d", ""),
        ];
        let stats = summarize(&records);
        assert_eq!(stats.attempted, 4);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.success_rate, 50.0);
        assert_eq!(stats.unique_sessions, 4);
    }

    #[test]
    fn unattempted_calls_do_not_count_towards_rate() {
        let records = vec![
            call(200, Some(0.0), "", ""),
            call(180, None, "", ""),
            call(302, Some(3.0), "", ""),
            call(200, Some(-1.0), "", ""),
        ];
        let stats = summarize(&records);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.attempted, 1);
        assert_eq!(stats.warning, 1);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.average_duration, Some(1.5));
        assert_eq!(stats.max_duration, Some(3.0));
        assert_eq!(stats.unique_sessions, 0);
        assert_eq!(stats.by_status[&CallStatus::Success], 2);
        assert_eq!(stats.by_status[&CallStatus::Info], 1);
    }

    #[test]
    fn durations_round_to_two_decimals() {
        let records = vec![
            call(200, Some(1.0), "", ""),
            call(200, Some(1.0), "", ""),
            call(486, Some(2.0), "", ""),
        ];
        let stats = summarize(&records);
        assert_eq!(stats.average_duration, Some(1.33));
        assert_eq!(stats.success_rate, 66.67);
    }

    #[test]
    fn sessions_group_with_status_breakdown() {
        let records = vec![
            field("S1", "10.0.0.1", "INVITE", ""),
            field("S1", "10.0.0.2", "SIP/2.0 180", "180"),
            field("S1", "10.0.0.2", "SIP/2.0 200", "200"),
            field("S0", "10.0.0.1", "OPTIONS", ""),
            field("", "", "", ""),
        ];
        let groups = group_by_session(&records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].session_id, "S0");
        assert_eq!(groups[1].count, 3);
        assert_eq!(groups[1].directions[&Direction::Internal], 3);
        assert_eq!(groups[1].status_codes.len(), 2);

        let ips = group_by_ip(&records);
        assert_eq!(ips.len(), 2);
        assert_eq!(ips[0].ip, "10.0.0.1");
        assert_eq!(ips[0].count, 2);
    }

    #[test]
    fn error_summary_orders_by_count_then_key() {
        let records = vec![
            call(404, None, "", ""),
            call(486, None, "", ""),
            call(404, None, "", ""),
            call(401, None, "", ""),
            call(200, None, "", ""),
        ];
        let rows = error_summary(&records);
        assert_eq!(rows[0].error_category, ErrorCategory::Routing);
        assert_eq!(rows[0].count, 2);
        let rest: Vec<_> = rows[1..].iter().map(|row| row.error_category).collect();
        assert_eq!(
            rest,
            vec![
                ErrorCategory::Authentication,
                ErrorCategory::Capacity,
                ErrorCategory::Uncategorized,
            ]
        );
    }

    #[test]
    fn message_stats_count_types_and_responses() {
        let records = vec![
            field("S1", "10.0.0.1", "OPTIONS", ""),
            field("S1", "10.0.0.1", "OPTIONS", ""),
            field("S2", "10.0.0.3", "INVITE", ""),
            field("S2", "10.0.0.3", "SIP/2.0 404", "404"),
            field("S2", "10.0.0.3", "SIP/2.0 503", "503"),
            field("S2", "10.0.0.3", "SIP/2.0 200", "200"),
            field("", "", "", ""),
        ];
        let stats = summarize_messages(&records);
        assert_eq!(stats.total, 7);
        assert_eq!(stats.unique_sessions, 2);
        assert_eq!(stats.options, 2);
        assert_eq!(stats.success_responses, 1);
        assert_eq!(stats.client_errors, 1);
        assert_eq!(stats.server_errors, 1);
        assert_eq!(stats.message_types[0].message_type, "OPTIONS");
        assert_eq!(stats.message_types[0].count, 2);
        assert_eq!(stats.message_types.len(), 5);
        assert_eq!(stats.sessions.len(), 2);
    }
}
