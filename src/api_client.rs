// NEO API Client
// One-shot requests against the NEO backend: lists, details and position series.
// No retry and no caching; callers own that policy.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ephemeris_engine::OrbitalElements;
use crate::position_series::MeteoroidPositionSeries;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("a NEO identifier is required")]
    MissingId,
    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

// =============================================================================
// API RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo {
    pub id: String,
    pub name: String,
    pub nasa_jpl_url: Option<String>,
    pub absolute_magnitude_h: Option<f64>,
    pub estimated_diameter: Option<EstimatedDiameter>,
    pub is_potentially_hazardous_asteroid: Option<bool>,
    pub close_approach_data: Option<Vec<CloseApproachData>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeoDetails {
    pub id: String,
    pub neo_reference_id: Option<String>,
    pub name: String,
    pub nasa_jpl_url: Option<String>,
    pub absolute_magnitude_h: Option<f64>,
    pub estimated_diameter: Option<EstimatedDiameter>,
    pub is_potentially_hazardous_asteroid: Option<bool>,
    pub close_approach_data: Option<Vec<CloseApproachData>>,
    pub orbital_data: Option<OrbitalData>,
    pub is_sentry_object: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatedDiameter {
    pub kilometers: Option<DiameterRange>,
    pub meters: Option<DiameterRange>,
    pub miles: Option<DiameterRange>,
    pub feet: Option<DiameterRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiameterRange {
    pub estimated_diameter_min: f64,
    pub estimated_diameter_max: f64,
}

impl DiameterRange {
    pub fn mean(&self) -> f64 {
        (self.estimated_diameter_min + self.estimated_diameter_max) / 2.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseApproachData {
    pub close_approach_date: Option<String>,
    pub close_approach_date_full: Option<String>,
    pub epoch_date_close_approach: Option<i64>,
    pub relative_velocity: Option<RelativeVelocity>,
    pub miss_distance: Option<MissDistance>,
    pub orbiting_body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelativeVelocity {
    pub kilometers_per_second: Option<String>,
    pub kilometers_per_hour: Option<String>,
    pub miles_per_hour: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissDistance {
    pub astronomical: Option<String>,
    pub lunar: Option<String>,
    pub kilometers: Option<String>,
    pub miles: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitalData {
    pub orbit_id: Option<String>,
    pub epoch_osculation: Option<String>,
    pub eccentricity: Option<String>,
    pub semi_major_axis: Option<String>,
    pub inclination: Option<String>,
    pub ascending_node_longitude: Option<String>,
    pub orbital_period: Option<String>,
    pub perihelion_distance: Option<String>,
    pub perihelion_argument: Option<String>,
    pub aphelion_distance: Option<String>,
    pub mean_anomaly: Option<String>,
    pub mean_motion: Option<String>,
    pub orbit_class: Option<OrbitClass>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitClass {
    pub orbit_class_type: Option<String>,
    pub orbit_class_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RangeResponse {
    neos: Vec<Neo>,
}

// =============================================================================
// PROCESSED DATA
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedCloseApproach {
    pub date: String,
    pub miss_distance_km: f64,
    pub velocity_km_s: f64,
    pub orbiting_body: String,
}

impl CloseApproachData {
    pub fn to_processed(&self) -> ProcessedCloseApproach {
        ProcessedCloseApproach {
            date: self.close_approach_date.clone().unwrap_or_default(),
            miss_distance_km: self
                .miss_distance
                .as_ref()
                .and_then(|m| m.kilometers.as_ref())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0),
            velocity_km_s: self
                .relative_velocity
                .as_ref()
                .and_then(|v| v.kilometers_per_second.as_ref())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0),
            orbiting_body: self
                .orbiting_body
                .clone()
                .unwrap_or_else(|| "Earth".to_string()),
        }
    }
}

fn parse_field(field: &Option<String>) -> Option<f64> {
    field.as_ref().and_then(|s| s.trim().parse::<f64>().ok())
}

impl NeoDetails {
    /// Mean estimated diameter in metres.
    pub fn mean_diameter_m(&self) -> Option<f64> {
        self.estimated_diameter
            .as_ref()
            .and_then(|d| d.meters.as_ref())
            .map(DiameterRange::mean)
    }

    /// Close approaches to Earth, nearest first.
    pub fn earth_approaches(&self) -> Vec<ProcessedCloseApproach> {
        let mut approaches: Vec<ProcessedCloseApproach> = self
            .close_approach_data
            .iter()
            .flatten()
            .map(CloseApproachData::to_processed)
            .filter(|ca| ca.orbiting_body == "Earth")
            .collect();
        approaches.sort_by(|a, b| a.miss_distance_km.total_cmp(&b.miss_distance_km));
        approaches
    }

    /// Keplerian elements for local propagation; `None` when any element is
    /// missing or unparseable.
    pub fn orbital_elements(&self) -> Option<OrbitalElements> {
        let data = self.orbital_data.as_ref()?;
        let period = parse_field(&data.orbital_period)?;
        if period <= 0.0 {
            return None;
        }
        Some(OrbitalElements {
            semi_major_axis: parse_field(&data.semi_major_axis)?,
            eccentricity: parse_field(&data.eccentricity)?,
            inclination: parse_field(&data.inclination)?.to_radians(),
            longitude_ascending_node: parse_field(&data.ascending_node_longitude)?.to_radians(),
            argument_perihelion: parse_field(&data.perihelion_argument)?.to_radians(),
            mean_anomaly: parse_field(&data.mean_anomaly)?.to_radians(),
            epoch: parse_field(&data.epoch_osculation)?,
            orbital_period: period,
        })
    }
}

// =============================================================================
// API CLIENT
// =============================================================================

#[derive(Debug, Clone)]
pub struct NeoApiClient {
    base_url: String,
    client: reqwest::Client,
}

fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn require_id(id: &str) -> Result<&str, RequestError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(RequestError::MissingId);
    }
    Ok(id)
}

impl NeoApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// NEOs with close approaches between `start` and `end`.
    pub async fn list_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Neo>, RequestError> {
        let response: RangeResponse = self
            .get_json(
                "/api/neos/range",
                &[("start_date", iso_date(start)), ("end_date", iso_date(end))],
            )
            .await?;
        Ok(response.neos)
    }

    /// NEOs around a single center date.
    pub async fn list_by_center_date(&self, date: NaiveDate) -> Result<Vec<Neo>, RequestError> {
        self.get_json("/api/neos/range", &[("center_date", iso_date(date))])
            .await
    }

    /// Geocentric position series for `id`. Fails before any I/O when `id` is blank.
    pub async fn positions_of(
        &self,
        id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MeteoroidPositionSeries, RequestError> {
        let id = require_id(id)?;
        self.get_json(
            &format!("/api/neos/{}/positions", id),
            &[("start_date", iso_date(start)), ("end_date", iso_date(end))],
        )
        .await
    }

    pub async fn details_of(&self, id: &str) -> Result<NeoDetails, RequestError> {
        let id = require_id(id)?;
        self.get_json(&format!("/api/neos/{}", id), &[]).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, RequestError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| RequestError::Transport {
                endpoint: path.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(RequestError::Status {
                endpoint: path.to_string(),
                status: response.status(),
            });
        }

        response.json::<T>().await.map_err(|source| RequestError::Decode {
            endpoint: path.to_string(),
            source,
        })
    }
}
