//! Aggregation periods
//!
//! Weeks start on Monday 00:00:00 UTC and end on the following Sunday
//! 23:59:59 UTC. The Monday date is the grouping key for weekly scoring and
//! for the snapshot document id, so recomputing a week always lands on the
//! same key.

use crate::error::ComputeError;
use crate::types::{MetricKind, MetricSample, MetricValues};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Monday of the week containing `date`.
///
/// `None` when that Monday precedes the earliest representable date.
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    let days_back = date.weekday().num_days_from_monday();
    date.checked_sub_signed(Duration::days(i64::from(days_back)))
}

/// Monday of the UTC week containing `instant`
pub fn week_start_of(instant: DateTime<Utc>) -> Option<NaiveDate> {
    week_start(instant.date_naive())
}

/// `YYYY-MM-DD` key of the UTC week containing `instant`
pub fn week_start_key(instant: DateTime<Utc>) -> Option<String> {
    week_start_of(instant).map(format_date)
}

fn out_of_range(date: NaiveDate) -> ComputeError {
    ComputeError::DateOutOfRange(format!("no representable week around {date}"))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Storage id for a user's weekly record
pub fn document_id(user_id: &str, week_start: NaiveDate) -> String {
    format!("{}_{}", user_id, format_date(week_start))
}

/// Parse either a plain `YYYY-MM-DD` date or an RFC 3339 timestamp
pub fn parse_date(input: &str) -> Result<NaiveDate, ComputeError> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|e| ComputeError::DateParseError(format!("{trimmed}: {e}")))
}

/// Monday-to-Sunday window in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationPeriod {
    /// Monday 00:00:00 UTC
    pub start: DateTime<Utc>,
    /// Sunday 23:59:59 UTC
    pub end: DateTime<Utc>,
}

impl AggregationPeriod {
    /// Period for the week beginning on the Monday of `date`
    pub fn for_week(date: NaiveDate) -> Result<Self, ComputeError> {
        let monday = week_start(date).ok_or_else(|| out_of_range(date))?;
        let start = Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN));
        let next_week = start
            .checked_add_signed(Duration::days(7))
            .ok_or_else(|| out_of_range(date))?;
        Ok(Self {
            start,
            end: next_week - Duration::seconds(1),
        })
    }

    /// Period containing `instant`
    pub fn containing(instant: DateTime<Utc>) -> Result<Self, ComputeError> {
        Self::for_week(instant.date_naive())
    }

    pub fn week_start(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Whether `instant` falls inside this week, including sub-second
    /// instants after `end`
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end + Duration::seconds(1)
    }
}

/// Group samples by the Monday of their capture week, in week order.
///
/// Samples captured before the first representable Monday are dropped.
pub fn group_by_week(samples: &[MetricSample]) -> BTreeMap<NaiveDate, Vec<MetricSample>> {
    let mut weeks: BTreeMap<NaiveDate, Vec<MetricSample>> = BTreeMap::new();
    for sample in samples {
        let Some(monday) = week_start_of(sample.captured_at) else {
            tracing::warn!(captured_at = %sample.captured_at, "dropping sample outside representable weeks");
            continue;
        };
        weeks.entry(monday).or_default().push(sample.clone());
    }
    weeks
}

/// Arithmetic mean per metric over valid samples; metrics without any valid
/// sample stay absent
pub fn aggregate(samples: &[MetricSample]) -> MetricValues {
    // Running mean stays finite for any finite inputs
    let mut means: HashMap<MetricKind, (f64, usize)> = HashMap::new();
    for sample in samples.iter().filter(|s| s.is_valid()) {
        let (mean, count) = means.entry(sample.kind).or_insert((0.0, 0));
        *count += 1;
        *mean += (sample.value - *mean) / *count as f64;
    }

    let mut values = MetricValues::default();
    for (kind, (mean, _)) in means {
        values.set(kind, Some(mean));
    }
    values
}

/// Number of samples with a finite value
pub fn valid_sample_count(samples: &[MetricSample]) -> usize {
    samples.iter().filter(|s| s.is_valid()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_week_start_rolls_back_to_monday() {
        // 2024-01-15 is a Monday
        assert_eq!(week_start(date("2024-01-15")), Some(date("2024-01-15")));
        assert_eq!(week_start(date("2024-01-17")), Some(date("2024-01-15")));
        // Sunday rolls back six days
        assert_eq!(week_start(date("2024-01-21")), Some(date("2024-01-15")));
        assert_eq!(week_start(date("2024-01-22")), Some(date("2024-01-22")));
    }

    #[test]
    fn test_week_start_is_idempotent_monday() {
        let mut day = date("2023-12-20");
        for _ in 0..60 {
            let monday = week_start(day).unwrap();
            assert_eq!(monday.weekday(), Weekday::Mon);
            assert_eq!(week_start(monday), Some(monday));
            assert!(day - monday < Duration::days(7));
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_week_start_uses_utc() {
        // Sunday 23:30 in UTC-5 is Monday 04:30 UTC
        let instant = DateTime::parse_from_rfc3339("2024-01-21T23:30:00-05:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(week_start_key(instant).as_deref(), Some("2024-01-22"));
    }

    #[test]
    fn test_week_start_before_first_monday() {
        assert_ne!(NaiveDate::MIN.weekday(), Weekday::Mon);
        assert_eq!(week_start(NaiveDate::MIN), None);
        assert_eq!(week_start_of(DateTime::<Utc>::MIN_UTC), None);
        assert_eq!(week_start_key(DateTime::<Utc>::MIN_UTC), None);
        assert!(matches!(
            AggregationPeriod::containing(DateTime::<Utc>::MIN_UTC),
            Err(ComputeError::DateOutOfRange(_))
        ));
        assert!(matches!(
            AggregationPeriod::containing(DateTime::<Utc>::MAX_UTC),
            Err(ComputeError::DateOutOfRange(_))
        ));
    }

    #[test]
    fn test_period_bounds() {
        let period = AggregationPeriod::containing(at("2024-01-18T12:00:00Z")).unwrap();
        assert_eq!(period.start, at("2024-01-15T00:00:00Z"));
        assert_eq!(period.end, at("2024-01-21T23:59:59Z"));
        assert!(period.contains(at("2024-01-21T23:59:59Z")));
        assert!(!period.contains(at("2024-01-22T00:00:00Z")));
        assert!(!period.contains(at("2024-01-14T23:59:59Z")));
        assert_eq!(period.week_start(), date("2024-01-15"));
    }

    #[test]
    fn test_document_id() {
        assert_eq!(document_id("user-1", date("2024-01-15")), "user-1_2024-01-15");
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-01-17").unwrap(), date("2024-01-17"));
        assert_eq!(
            parse_date("2024-01-17T08:00:00Z").unwrap(),
            date("2024-01-17")
        );
        assert!(matches!(
            parse_date("yesterday"),
            Err(ComputeError::DateParseError(_))
        ));
    }

    #[test]
    fn test_group_and_aggregate() {
        let samples = vec![
            MetricSample::new(MetricKind::Glucose, 90.0, at("2024-01-15T08:00:00Z")),
            MetricSample::new(MetricKind::Glucose, 110.0, at("2024-01-16T08:00:00Z")),
            MetricSample::new(MetricKind::Glucose, f64::NAN, at("2024-01-16T09:00:00Z")),
            MetricSample::new(MetricKind::Sleep, 7.5, at("2024-01-17T07:00:00Z")),
            MetricSample::new(MetricKind::Glucose, 200.0, at("2024-01-22T08:00:00Z")),
        ];

        let weeks = group_by_week(&samples);
        assert_eq!(weeks.len(), 2);

        let first = &weeks[&date("2024-01-15")];
        assert_eq!(first.len(), 4);
        assert_eq!(valid_sample_count(first), 3);

        let values = aggregate(first);
        assert_eq!(values.glucose, Some(100.0));
        assert_eq!(values.sleep, Some(7.5));
        assert_eq!(values.aqi, None);
    }

    #[test]
    fn test_group_drops_unrepresentable_weeks() {
        let samples = vec![
            MetricSample::new(MetricKind::Glucose, 90.0, DateTime::<Utc>::MIN_UTC),
            MetricSample::new(MetricKind::Glucose, 110.0, at("2024-01-16T08:00:00Z")),
        ];
        let weeks = group_by_week(&samples);
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[&date("2024-01-15")].len(), 1);
    }

    #[test]
    fn test_aggregate_large_readings_stay_finite() {
        let samples = vec![
            MetricSample::new(MetricKind::Glucose, 1e308, at("2024-01-15T08:00:00Z")),
            MetricSample::new(MetricKind::Glucose, 1e308, at("2024-01-16T08:00:00Z")),
            MetricSample::new(MetricKind::Glucose, f64::MAX, at("2024-01-17T08:00:00Z")),
        ];
        let glucose = aggregate(&samples).glucose.unwrap();
        assert!(glucose.is_finite());
        assert!(glucose >= 1e308);
    }
}
