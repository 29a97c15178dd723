//! Elapsed-hours resolution for outage records.
//!
//! Two sources are tried in order: the occurrence/restoration timestamps,
//! then the server's pre-formatted `HH:MM:SS` duration. Different OMS
//! environments populate one or the other, so both are kept.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::oms::OutageRecord;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DurationError {
    #[error("cannot parse duration: {0}")]
    Parse(String),

    /// Restoration recorded before occurrence. Reported, never clamped.
    #[error("negative duration: restored at {restored} before occurred at {occurred}")]
    NegativeDuration { occurred: String, restored: String },
}

/// Elapsed hours for `record`, measuring ongoing outages against `now`.
///
/// When both strategies fail, the timestamp error is returned if the record
/// had an occurrence time at all, otherwise the formatted-duration error.
pub fn resolve_at(record: &OutageRecord, now: DateTime<Utc>) -> Result<f64, DurationError> {
    let primary = match from_timestamps(
        &record.outage_occur_at,
        record.outage_restore_at.as_deref(),
        now,
    ) {
        Ok(hours) => return Ok(hours),
        Err(err) => err,
    };
    if matches!(primary, DurationError::NegativeDuration { .. }) {
        warn!(
            outage_id = %record.id,
            error = %primary,
            "restoration precedes occurrence, trying duration string"
        );
    } else {
        debug!(
            outage_id = %record.id,
            error = %primary,
            "timestamps unusable, trying duration string"
        );
    }

    from_formatted(&record.duration).map_err(|fallback| {
        if record.outage_occur_at.trim().is_empty() {
            fallback
        } else {
            primary
        }
    })
}

/// Hours between two RFC 3339 timestamps. A missing or blank restoration
/// time means the outage is still ongoing, so `now` is used instead.
pub fn from_timestamps(
    occurred_at: &str,
    restored_at: Option<&str>,
    now: DateTime<Utc>,
) -> Result<f64, DurationError> {
    let occurred_at = occurred_at.trim();
    if occurred_at.is_empty() {
        return Err(DurationError::Parse("occurrence time is empty".into()));
    }
    let occurred = parse_timestamp(occurred_at, "occurrence")?;

    let restored_at = restored_at.map(str::trim).filter(|s| !s.is_empty());
    let restored = match restored_at {
        Some(raw) => parse_timestamp(raw, "restoration")?,
        None => now,
    };

    let elapsed = restored - occurred;
    if elapsed.num_milliseconds() < 0 {
        return Err(DurationError::NegativeDuration {
            occurred: occurred_at.to_string(),
            restored: restored_at.map_or_else(|| now.to_rfc3339(), str::to_string),
        });
    }
    Ok(elapsed.num_milliseconds() as f64 / 3_600_000.0)
}

fn parse_timestamp(raw: &str, which: &str) -> Result<DateTime<Utc>, DurationError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DurationError::Parse(format!("{which} time {raw:?}: {e}")))
}

/// Parses `HH:MM:SS` (fractional seconds are discarded) into hours.
/// Hours may exceed 24; minutes and seconds must be below 60.
pub fn from_formatted(raw: &str) -> Result<f64, DurationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DurationError::Parse("duration is empty".into()));
    }

    let whole = raw.split_once('.').map_or(raw, |(whole, _)| whole);
    let parts: Vec<&str> = whole.split(':').collect();
    let [h, m, s] = parts.as_slice() else {
        return Err(DurationError::Parse(format!(
            "expected HH:MM:SS, got {raw:?}"
        )));
    };

    let hours = segment(h, "hours", raw)?;
    let minutes = segment(m, "minutes", raw)?;
    let seconds = segment(s, "seconds", raw)?;
    if minutes >= 60 || seconds >= 60 {
        return Err(DurationError::Parse(format!(
            "minutes and seconds must be below 60 in {raw:?}"
        )));
    }

    Ok(hours as f64 + minutes as f64 / 60.0 + seconds as f64 / 3600.0)
}

fn segment(value: &str, name: &str, raw: &str) -> Result<u64, DurationError> {
    value
        .parse::<u64>()
        .map_err(|_| DurationError::Parse(format!("invalid {name} {value:?} in {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn timestamps_three_and_a_half_hours() {
        let hours = from_timestamps(
            "2026-01-22T10:00:00Z",
            Some("2026-01-22T13:30:00Z"),
            Utc::now(),
        )
        .unwrap();
        assert!(close(hours, 3.5));
    }

    #[test]
    fn timestamps_with_offsets_and_millis() {
        let hours = from_timestamps(
            "2026-01-22T10:48:53.816Z",
            Some("2026-01-22T17:18:53.816+05:30"),
            Utc::now(),
        )
        .unwrap();
        assert!(close(hours, 1.0));
    }

    #[test]
    fn timestamps_ongoing_uses_now() {
        let now = at("2026-01-22T12:00:00Z");
        assert!(close(
            from_timestamps("2026-01-22T10:00:00Z", None, now).unwrap(),
            2.0
        ));
        assert!(close(
            from_timestamps("2026-01-22T10:00:00Z", Some("  "), now).unwrap(),
            2.0
        ));
    }

    #[test]
    fn timestamps_negative_is_an_error() {
        let err = from_timestamps(
            "2026-01-22T13:30:00Z",
            Some("2026-01-22T10:00:00Z"),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DurationError::NegativeDuration { .. }));
    }

    #[test]
    fn timestamps_empty_or_garbage() {
        assert!(matches!(
            from_timestamps("", None, Utc::now()),
            Err(DurationError::Parse(_))
        ));
        assert!(matches!(
            from_timestamps("22/01/2026 10:00", None, Utc::now()),
            Err(DurationError::Parse(_))
        ));
        assert!(matches!(
            from_timestamps("2026-01-22T10:00:00Z", Some("later"), Utc::now()),
            Err(DurationError::Parse(_))
        ));
    }

    #[test]
    fn formatted_with_millis() {
        assert!(close(from_formatted("04:30:00.123").unwrap(), 4.5));
    }

    #[test]
    fn formatted_beyond_a_day() {
        assert!(close(from_formatted("26:15:00").unwrap(), 26.25));
    }

    #[test]
    fn formatted_no_cause_value() {
        let hours = from_formatted("15:43:48").unwrap();
        assert!((hours - 15.73).abs() < 1e-6);
    }

    #[test]
    fn formatted_rejects_out_of_range_minutes() {
        assert!(matches!(
            from_formatted("04:75:00"),
            Err(DurationError::Parse(_))
        ));
        assert!(matches!(
            from_formatted("04:00:60"),
            Err(DurationError::Parse(_))
        ));
    }

    #[test]
    fn formatted_rejects_bad_structure() {
        for raw in ["", "04:30", "1:2:3:4", "aa:00:00", "-1:00:00", "04::00"] {
            assert!(
                matches!(from_formatted(raw), Err(DurationError::Parse(_))),
                "{raw:?} should not parse"
            );
        }
    }

    fn record(occur: &str, restore: Option<&str>, duration: &str) -> OutageRecord {
        OutageRecord {
            id: "OUT-1".into(),
            outage_occur_at: occur.into(),
            outage_restore_at: restore.map(str::to_string),
            duration: duration.into(),
            ..OutageRecord::default()
        }
    }

    #[test]
    fn resolve_prefers_timestamps() {
        let r = record(
            "2026-01-22T10:00:00Z",
            Some("2026-01-22T13:30:00Z"),
            "01:00:00",
        );
        assert!(close(resolve_at(&r, Utc::now()).unwrap(), 3.5));
    }

    #[test]
    fn resolve_falls_back_to_duration_string() {
        let r = record("", None, "04:30:00.123");
        assert!(close(resolve_at(&r, Utc::now()).unwrap(), 4.5));

        let negative = record(
            "2026-01-22T13:30:00Z",
            Some("2026-01-22T10:00:00Z"),
            "02:00:00",
        );
        assert!(close(resolve_at(&negative, Utc::now()).unwrap(), 2.0));
    }

    #[test]
    fn resolve_reports_timestamp_error_when_both_fail() {
        let r = record("2026-01-22T13:30:00Z", Some("2026-01-22T10:00:00Z"), "");
        assert!(matches!(
            resolve_at(&r, Utc::now()),
            Err(DurationError::NegativeDuration { .. })
        ));
    }

    #[test]
    fn resolve_reports_duration_error_without_occurrence() {
        let r = record("", None, "04:75:00");
        let err = resolve_at(&r, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("below 60"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn negative_timestamps_are_warned_even_when_fallback_succeeds() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let negative = record(
            "2026-01-22T13:30:00Z",
            Some("2026-01-22T10:00:00Z"),
            "02:00:00",
        );
        let hours = tracing::subscriber::with_default(subscriber, || {
            resolve_at(&negative, Utc::now()).unwrap()
        });
        assert!(close(hours, 2.0));

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("OUT-1"), "{output}");
        assert!(output.contains("negative duration"), "{output}");
    }

    #[test]
    fn unparsable_timestamps_are_not_warned() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let r = record("", None, "01:00:00");
        tracing::subscriber::with_default(subscriber, || resolve_at(&r, Utc::now()).unwrap());
        assert!(captured.0.lock().unwrap().is_empty());
    }

    #[test]
    fn resolve_at_ongoing_outage() {
        let r = record("2026-01-22T10:00:00Z", None, "");
        let hours = resolve_at(&r, at("2026-01-22T10:15:00Z")).unwrap();
        assert!(close(hours, 0.25));
    }
}
