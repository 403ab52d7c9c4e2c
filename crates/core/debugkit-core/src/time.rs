//! Time windows requested by callers and the ranges they resolve to.

use crate::error::ValidationError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A resolved, half-open time range `[start, end)`. Always `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range, rejecting empty and inverted ranges
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The range ending at `end` and lasting `minutes`
    pub fn ending_at(end: DateTime<Utc>, minutes: u32) -> Result<Self, ValidationError> {
        Self::new(end - Duration::minutes(i64::from(minutes)), end)
    }

    /// Range start
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Range end
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Range start as epoch seconds (inclusive bound)
    #[must_use]
    pub fn time_geq(&self) -> i64 {
        self.start.timestamp()
    }

    /// Range end as epoch seconds (exclusive bound)
    #[must_use]
    pub fn time_lt(&self) -> i64 {
        self.end.timestamp()
    }

    /// Length of the range
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// The time inputs of one call, before resolution.
///
/// Exactly one derivation applies: an explicit `start_time`/`end_time` pair,
/// or `[now - duration_minutes, now]`. When neither is given the caller's
/// default duration is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Explicit range start
    pub start_time: Option<DateTime<Utc>>,
    /// Explicit range end
    pub end_time: Option<DateTime<Utc>>,
    /// Length of a range ending now
    pub duration_minutes: Option<u32>,
}

impl TimeWindow {
    /// A window of the last `minutes` minutes
    #[must_use]
    pub fn last_minutes(minutes: u32) -> Self {
        Self {
            duration_minutes: Some(minutes),
            ..Self::default()
        }
    }

    /// An explicit window
    #[must_use]
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start_time: Some(start),
            end_time: Some(end),
            duration_minutes: None,
        }
    }

    /// Resolve against the current time
    pub fn resolve(&self, default_duration_minutes: u32) -> Result<TimeRange, ValidationError> {
        self.resolve_at(Utc::now(), default_duration_minutes)
    }

    /// Resolve against a given `now`
    pub fn resolve_at(
        &self,
        now: DateTime<Utc>,
        default_duration_minutes: u32,
    ) -> Result<TimeRange, ValidationError> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                if let Some(minutes) = self.duration_minutes {
                    debug!(minutes, "explicit range given, ignoring duration_minutes");
                }
                TimeRange::new(start, end)
            }
            (Some(_), None) => Err(ValidationError::PartialTimeRange {
                given: "start_time".to_string(),
            }),
            (None, Some(_)) => Err(ValidationError::PartialTimeRange {
                given: "end_time".to_string(),
            }),
            (None, None) => {
                let minutes = self.duration_minutes.unwrap_or(default_duration_minutes);
                TimeRange::ending_at(now, minutes)
            }
        }
    }
}
