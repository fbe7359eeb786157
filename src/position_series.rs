// Position Series - Meteoroid geocentric positions over time
// Fetched wholesale from the backend (or propagated locally from orbital
// elements) and queried by nearest timestamp. The backend sends ecliptic J2000
// vectors; samples are held in the scene's Earth-equatorial J2000 axes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ephemeris_engine::{ecliptic_to_equatorial, OrbitalElements, Vector3, AU_KM};
use crate::time_mapper::julian_date;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Milliseconds since the Unix epoch on the wire
    #[serde(with = "epoch_millis")]
    pub timestamp: DateTime<Utc>,
    /// Earth-equatorial J2000 axes, km
    #[serde(rename = "geocentric_position_km", with = "ecliptic_km")]
    pub geocentric_km: Vector3,
}

/// Ordered `(timestamp, geocentric km)` samples for one object. Replaced as a
/// whole on every fetch, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeteoroidPositionSeries {
    pub positions: Vec<PositionSample>,
}

impl MeteoroidPositionSeries {
    pub fn new(positions: Vec<PositionSample>) -> Self {
        Self { positions }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PositionSample> {
        self.positions.iter()
    }

    /// Sample closest to `time` by absolute timestamp difference. On a tie the
    /// earlier entry in scan order wins.
    pub fn nearest(&self, time: DateTime<Utc>) -> Option<&PositionSample> {
        let target = time.timestamp_millis();
        let mut best: Option<(&PositionSample, i64)> = None;
        for sample in &self.positions {
            let diff = (sample.timestamp.timestamp_millis() - target).abs();
            if best.map_or(true, |(_, closest)| diff < closest) {
                best = Some((sample, diff));
            }
        }
        best.map(|(sample, _)| sample)
    }

    /// Propagate `elements` and Earth over `[start, end]` with `resolution + 1`
    /// evenly spaced samples, rotated into Earth-equatorial axes (km).
    pub fn from_orbital_elements(
        elements: &OrbitalElements,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        resolution: usize,
    ) -> Self {
        let earth = OrbitalElements::earth();
        let steps = resolution.max(1);
        let span_ms = (end - start).num_milliseconds() as f64;

        let positions = (0..=steps)
            .map(|step| {
                let offset = span_ms * step as f64 / steps as f64;
                let timestamp = start + Duration::milliseconds(offset.round() as i64);
                let jd = julian_date(timestamp);
                let geocentric_au = elements.position_au(jd).sub(&earth.position_au(jd));
                PositionSample {
                    timestamp,
                    geocentric_km: ecliptic_to_equatorial(&geocentric_au.scale(AU_KM)),
                }
            })
            .collect();

        Self { positions }
    }
}

mod ecliptic_km {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::ephemeris_engine::{ecliptic_to_equatorial, equatorial_to_ecliptic, Vector3};

    pub fn serialize<S: Serializer>(v: &Vector3, serializer: S) -> Result<S::Ok, S::Error> {
        equatorial_to_ecliptic(v).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vector3, D::Error> {
        Vector3::deserialize(deserializer).map(|v| ecliptic_to_equatorial(&v))
    }
}

mod epoch_millis {
    use chrono::{DateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(time.timestamp_millis())
    }

    // The backend emits float milliseconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let millis = f64::deserialize(deserializer)?;
        if !millis.is_finite() {
            return Err(D::Error::custom("timestamp is not a finite number"));
        }
        DateTime::from_timestamp_millis(millis.round() as i64)
            .ok_or_else(|| D::Error::custom(format!("timestamp {} out of range", millis)))
    }
}
