//! Weekly snapshot gate
//!
//! Decides whether a new biosignature snapshot is due and assembles it.
//! A snapshot is due when none exists yet or the latest one is strictly
//! older than the cadence (7 days by default, compared in milliseconds).
//! Repeated calls inside the same window are no-ops.
//!
//! The gate does not lock. Two concurrent writers for one user can both pass
//! it; storage should key snapshots on `document_id` to make that harmless.

use crate::config::{DefaultProfile, DEFAULT_SNAPSHOT_CADENCE_DAYS, SNAPSHOT_UNKNOWN_SCORE};
use crate::error::ComputeError;
use crate::period::{document_id, week_start_of};
use crate::types::{BiosignatureSnapshot, EnvironmentReading, MetricKind, MetricValues};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Metric whose absence prevents snapshot creation
pub const PRIMARY_METRIC: MetricKind = MetricKind::Glucose;

/// Why no snapshot was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The latest snapshot is still inside the cadence window
    NotDue { next_eligible_at: DateTime<Utc> },
    /// The aggregate has no value for the primary metric
    MissingPrimarySignal,
    /// `now` falls before the first representable Monday
    WeekOutOfRange,
}

/// Outcome of a snapshot evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "detail", rename_all = "snake_case")]
pub enum SnapshotDecision {
    Created(BiosignatureSnapshot),
    Skipped(SkipReason),
}

impl SnapshotDecision {
    pub fn snapshot(&self) -> Option<&BiosignatureSnapshot> {
        match self {
            SnapshotDecision::Created(snapshot) => Some(snapshot),
            SnapshotDecision::Skipped(_) => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SnapshotDecision::Created(_))
    }
}

/// Snapshot cadence enforcement and payload assembly
#[derive(Debug, Clone, Copy)]
pub struct SnapshotGate {
    cadence_ms: i64,
    unknown: DefaultProfile,
}

impl Default for SnapshotGate {
    fn default() -> Self {
        Self {
            cadence_ms: i64::from(DEFAULT_SNAPSHOT_CADENCE_DAYS) * MILLIS_PER_DAY,
            unknown: DefaultProfile::uniform(SNAPSHOT_UNKNOWN_SCORE),
        }
    }
}

impl SnapshotGate {
    /// Create a gate with a cadence in days and the sentinel values written
    /// for unknown sub-metrics
    pub fn new(cadence_days: u32, unknown: DefaultProfile) -> Result<Self, ComputeError> {
        if cadence_days == 0 {
            return Err(ComputeError::InvalidConfig(
                "snapshot cadence must be at least one day".to_string(),
            ));
        }
        Ok(Self {
            cadence_ms: i64::from(cadence_days) * MILLIS_PER_DAY,
            unknown,
        })
    }

    pub fn cadence(&self) -> Duration {
        Duration::milliseconds(self.cadence_ms)
    }

    /// True when no snapshot exists or the latest is older than the cadence
    pub fn should_snapshot(&self, latest_created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match latest_created_at {
            None => true,
            Some(latest) => now.timestamp_millis() - latest.timestamp_millis() > self.cadence_ms,
        }
    }

    /// Earliest instant at which a snapshot after `latest` becomes due,
    /// saturating at the latest representable instant
    pub fn next_eligible_at(&self, latest: DateTime<Utc>) -> DateTime<Utc> {
        latest
            .checked_add_signed(Duration::milliseconds(self.cadence_ms + 1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Assemble a snapshot from a period aggregate.
    ///
    /// Skips when the primary metric is absent. Other absent metrics are
    /// written as the unknown sentinel and listed in `health_notes`. A finite
    /// AQI from `latest_env` takes precedence over the aggregate's AQI.
    pub fn build_snapshot(
        &self,
        values: &MetricValues,
        latest_env: Option<&EnvironmentReading>,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> SnapshotDecision {
        let Some(glucose) = values.get(PRIMARY_METRIC).filter(|v| v.is_finite()) else {
            tracing::warn!(user_id, "skipping snapshot: primary signal missing");
            return SnapshotDecision::Skipped(SkipReason::MissingPrimarySignal);
        };
        let Some(week_start) = week_start_of(now) else {
            tracing::warn!(user_id, %now, "skipping snapshot: week start out of range");
            return SnapshotDecision::Skipped(SkipReason::WeekOutOfRange);
        };

        let mut values = values.clone();
        if let Some(env) = latest_env.filter(|env| env.aqi.is_finite()) {
            values.aqi = Some(env.aqi);
        }

        let unknown_kinds = values.absent_kinds();
        let value_of = |kind: MetricKind| {
            values
                .get(kind)
                .filter(|v| v.is_finite())
                .unwrap_or_else(|| self.unknown.get(kind))
        };

        let health_notes = if unknown_kinds.is_empty() {
            None
        } else {
            let names: Vec<&str> = unknown_kinds.iter().map(|k| k.as_str()).collect();
            Some(format!("unknown: {}", names.join(", ")))
        };

        let snapshot = BiosignatureSnapshot {
            document_id: document_id(user_id, week_start),
            user_id: user_id.to_string(),
            week_start,
            glucose,
            activity: value_of(MetricKind::Activity),
            recovery: value_of(MetricKind::Recovery),
            strain: value_of(MetricKind::Strain),
            aqi: value_of(MetricKind::Aqi),
            heart_rate: value_of(MetricKind::HeartRate),
            sleep: value_of(MetricKind::Sleep),
            pattern_hash: pattern_hash(glucose, now),
            health_notes,
            created_at: now,
        };

        tracing::info!(
            user_id,
            document_id = %snapshot.document_id,
            unknown = unknown_kinds.len(),
            "biosignature snapshot created"
        );
        SnapshotDecision::Created(snapshot)
    }

    /// Gate check followed by assembly
    pub fn evaluate(
        &self,
        latest_created_at: Option<DateTime<Utc>>,
        values: &MetricValues,
        latest_env: Option<&EnvironmentReading>,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> SnapshotDecision {
        if let Some(latest) = latest_created_at {
            if !self.should_snapshot(Some(latest), now) {
                let next_eligible_at = self.next_eligible_at(latest);
                tracing::debug!(user_id, %next_eligible_at, "snapshot not due");
                return SnapshotDecision::Skipped(SkipReason::NotDue { next_eligible_at });
            }
        }
        self.build_snapshot(values, latest_env, user_id, now)
    }
}

/// Display-level fingerprint: primary metric plus creation time
pub fn pattern_hash(glucose: f64, created_at: DateTime<Utc>) -> String {
    format!("{:.1}-{}", glucose, created_at.timestamp_millis())
}

/// Gate check with the default 7-day cadence
pub fn should_snapshot(latest_created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    SnapshotGate::default().should_snapshot(latest_created_at, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-17T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn full_values() -> MetricValues {
        MetricValues {
            glucose: Some(95.0),
            activity: Some(9.0),
            recovery: Some(80.0),
            strain: Some(11.0),
            aqi: Some(40.0),
            heart_rate: Some(70.0),
            sleep: Some(8.0),
        }
    }

    #[test]
    fn test_gate_boundaries() {
        let now = now();
        assert!(should_snapshot(None, now));
        assert!(should_snapshot(Some(now - Duration::days(8)), now));
        assert!(!should_snapshot(Some(now - Duration::days(1)), now));
        assert!(!should_snapshot(Some(now - Duration::days(7)), now));
        assert!(should_snapshot(
            Some(now - Duration::days(7) - Duration::milliseconds(1)),
            now
        ));
    }

    #[test]
    fn test_gate_is_idempotent_within_window() {
        let gate = SnapshotGate::default();
        let latest = now();
        for hours in [0, 1, 24, 72, 167] {
            assert!(!gate.should_snapshot(Some(latest), latest + Duration::hours(hours)));
        }
    }

    #[test]
    fn test_build_full_snapshot() {
        let gate = SnapshotGate::default();
        let decision = gate.build_snapshot(&full_values(), None, "user-1", now());

        let snapshot = decision.snapshot().unwrap();
        assert_eq!(snapshot.document_id, "user-1_2024-01-15");
        assert_eq!(snapshot.glucose, 95.0);
        assert_eq!(snapshot.sleep, 8.0);
        assert_eq!(snapshot.health_notes, None);
        assert_eq!(
            snapshot.pattern_hash,
            format!("95.0-{}", now().timestamp_millis())
        );
    }

    #[test]
    fn test_missing_primary_skips() {
        let gate = SnapshotGate::default();
        let values = MetricValues {
            glucose: None,
            ..full_values()
        };
        assert_eq!(
            gate.build_snapshot(&values, None, "user-1", now()),
            SnapshotDecision::Skipped(SkipReason::MissingPrimarySignal)
        );

        let values = MetricValues {
            glucose: Some(f64::NAN),
            ..full_values()
        };
        assert!(!gate.build_snapshot(&values, None, "user-1", now()).is_created());
    }

    #[test]
    fn test_unknown_sub_metrics_are_zero_and_noted() {
        let gate = SnapshotGate::default();
        let values = MetricValues::default().with(MetricKind::Glucose, 130.0);
        let decision = gate.build_snapshot(&values, None, "user-1", now());

        let snapshot = decision.snapshot().unwrap();
        assert_eq!(snapshot.activity, 0.0);
        assert_eq!(snapshot.aqi, 0.0);
        assert_eq!(
            snapshot.health_notes.as_deref(),
            Some("unknown: activity, recovery, strain, aqi, heart_rate, sleep")
        );
    }

    #[test]
    fn test_environment_overrides_aqi() {
        let gate = SnapshotGate::default();
        let env = EnvironmentReading {
            aqi: 62.0,
            captured_at: now(),
        };
        let values = MetricValues {
            aqi: None,
            ..full_values()
        };
        let decision = gate.build_snapshot(&values, Some(&env), "user-1", now());
        let snapshot = decision.snapshot().unwrap();
        assert_eq!(snapshot.aqi, 62.0);
        assert_eq!(snapshot.health_notes, None);
    }

    #[test]
    fn test_evaluate_not_due() {
        let gate = SnapshotGate::default();
        let latest = now() - Duration::days(2);
        let decision = gate.evaluate(Some(latest), &full_values(), None, "user-1", now());
        assert_eq!(
            decision,
            SnapshotDecision::Skipped(SkipReason::NotDue {
                next_eligible_at: latest + Duration::days(7) + Duration::milliseconds(1)
            })
        );

        let decision = gate.evaluate(None, &full_values(), None, "user-1", now());
        assert!(decision.is_created());
    }

    #[test]
    fn test_custom_cadence() {
        let unknown = DefaultProfile::uniform(SNAPSHOT_UNKNOWN_SCORE);
        let gate = SnapshotGate::new(1, unknown).unwrap();
        assert!(gate.should_snapshot(Some(now() - Duration::hours(25)), now()));
        assert!(SnapshotGate::new(0, unknown).is_err());
    }

    #[test]
    fn test_default_gate_writes_unknown_sentinel() {
        let gate = SnapshotGate::default();
        let values = MetricValues::default().with(MetricKind::Glucose, 100.0);
        let snapshot = gate
            .build_snapshot(&values, None, "user-1", now())
            .snapshot()
            .cloned()
            .unwrap();
        for value in [snapshot.recovery, snapshot.strain, snapshot.heart_rate] {
            assert_eq!(value, SNAPSHOT_UNKNOWN_SCORE);
        }
    }

    #[test]
    fn test_extreme_instants_do_not_panic() {
        let gate = SnapshotGate::default();
        assert_eq!(
            gate.build_snapshot(&full_values(), None, "user-1", DateTime::<Utc>::MIN_UTC),
            SnapshotDecision::Skipped(SkipReason::WeekOutOfRange)
        );
        assert_eq!(
            gate.next_eligible_at(DateTime::<Utc>::MAX_UTC),
            DateTime::<Utc>::MAX_UTC
        );
    }
}
