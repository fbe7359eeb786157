// Time Mapper - Slider position <-> calendar instant
// The slider runs over [0, 1000] and maps affinely onto a [min, max] date range.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest slider position.
pub const SLIDER_MIN: f64 = 0.0;

/// Highest slider position.
pub const SLIDER_MAX: f64 = 1000.0;

/// Julian date of the Unix epoch (1970-01-01T00:00:00Z)
pub const UNIX_EPOCH_JD: f64 = 2440587.5;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeRangeError {
    #[error("date range is empty: start {start} is not before end {end}")]
    EmptyRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

// =============================================================================
// SLIDER RANGE
// =============================================================================

/// The `[min, max]` window the slider spans. Always non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliderRange {
    min: DateTime<Utc>,
    max: DateTime<Utc>,
}

impl SliderRange {
    pub fn new(min: DateTime<Utc>, max: DateTime<Utc>) -> Result<Self, TimeRangeError> {
        if max <= min {
            return Err(TimeRangeError::EmptyRange {
                start: min,
                end: max,
            });
        }
        Ok(Self { min, max })
    }

    /// Range from two calendar dates, each taken at UTC midnight.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, TimeRangeError> {
        Self::new(midnight_utc(start), midnight_utc(end))
    }

    pub fn min(&self) -> DateTime<Utc> {
        self.min
    }

    pub fn max(&self) -> DateTime<Utc> {
        self.max
    }

    pub fn start_date(&self) -> NaiveDate {
        self.min.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.max.date_naive()
    }

    pub fn span(&self) -> Duration {
        self.max - self.min
    }

    /// Instant for a slider position.
    pub fn date_at(&self, value: f64) -> DateTime<Utc> {
        slider_to_date(value, self)
    }

    /// Slider position for an instant, clamped to the slider's travel.
    pub fn value_at(&self, time: DateTime<Utc>) -> f64 {
        let offset = (time - self.min).num_milliseconds() as f64;
        let span = self.span().num_milliseconds() as f64;
        (offset / span * SLIDER_MAX).clamp(SLIDER_MIN, SLIDER_MAX)
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

/// `min + (value / 1000) * (max - min)`, rounded to the millisecond.
///
/// Values outside `[0, 1000]` are clamped; non-finite values map to `min`.
pub fn slider_to_date(value: f64, range: &SliderRange) -> DateTime<Utc> {
    let value = if value.is_finite() {
        value.clamp(SLIDER_MIN, SLIDER_MAX)
    } else {
        SLIDER_MIN
    };
    let fraction = value / SLIDER_MAX;
    let span_ms = range.span().num_milliseconds() as f64;
    range.min + Duration::milliseconds((fraction * span_ms).round() as i64)
}

/// Julian date (UTC-based) for an instant.
pub fn julian_date(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / MILLIS_PER_DAY + UNIX_EPOCH_JD
}

pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
