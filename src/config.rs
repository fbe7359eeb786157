// Config - Viewer settings from `.env` and the process environment

use chrono::{Duration, NaiveDate, Utc};
use std::str::FromStr;
use thiserror::Error;

use crate::api_client::DEFAULT_BASE_URL;
use crate::label_projector::{Viewport, DEFAULT_MOON_LABEL_MAX_DISTANCE_KM};
use crate::time_mapper::{SliderRange, TimeRangeError};

/// Longest accepted trail window (about a century).
pub const MAX_TRAIL_DAYS: i64 = 36_525;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    Range(#[from] TimeRangeError),
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub api_base_url: String,
    pub range: SliderRange,
    pub neo_id: Option<String>,
    pub trail_samples: usize,
    pub earth_trail_days: i64,
    pub moon_trail_days: i64,
    pub frame_rate: u32,
    pub playback_seconds: u64,
    pub viewport: Viewport,
    pub moon_label_max_distance_km: f64,
}

impl ViewerConfig {
    /// Load `.env` (if present) and read `NEO_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenv::dotenv() {
            log::debug!("no .env loaded: {}", err);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let today = Utc::now().date_naive();
        let start: NaiveDate = parse_or(&lookup, "NEO_START_DATE", today)?;
        let end: NaiveDate = parse_or(&lookup, "NEO_END_DATE", start + Duration::days(30))?;

        let frame_rate: u32 = parse_or(&lookup, "NEO_FRAME_RATE", 60)?;
        if frame_rate == 0 {
            return Err(ConfigError::Invalid {
                key: "NEO_FRAME_RATE",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            api_base_url: lookup("NEO_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            range: SliderRange::from_dates(start, end)?,
            neo_id: lookup("NEO_ID").filter(|id| !id.trim().is_empty()),
            trail_samples: parse_or(&lookup, "NEO_TRAIL_SAMPLES", 1000)?,
            earth_trail_days: trail_days(&lookup, "NEO_EARTH_TRAIL_DAYS", 365)?,
            moon_trail_days: trail_days(&lookup, "NEO_MOON_TRAIL_DAYS", 27)?,
            frame_rate,
            playback_seconds: parse_or(&lookup, "NEO_PLAYBACK_SECONDS", 10)?,
            viewport: Viewport::new(
                parse_or(&lookup, "NEO_VIEWPORT_WIDTH", 1280.0)?,
                parse_or(&lookup, "NEO_VIEWPORT_HEIGHT", 720.0)?,
            ),
            moon_label_max_distance_km: parse_or(
                &lookup,
                "NEO_MOON_LABEL_MAX_DISTANCE_KM",
                DEFAULT_MOON_LABEL_MAX_DISTANCE_KM,
            )?,
        })
    }
}

fn trail_days<F>(lookup: &F, key: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let days: i64 = parse_or(lookup, key, default)?;
    if !(1..=MAX_TRAIL_DAYS).contains(&days) {
        return Err(ConfigError::Invalid {
            key,
            value: days.to_string(),
            reason: format!("must be between 1 and {} days", MAX_TRAIL_DAYS),
        });
    }
    Ok(days)
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: err.to_string(),
        }),
    }
}
