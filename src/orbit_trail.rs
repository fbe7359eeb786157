// Orbit Trail - Fading polylines behind each body
// A trail samples the ephemeris across a trailing window ending at the current
// time. At most one trail per body is live in the scene.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ephemeris_engine::{Body, EphemerisAdapter, EphemerisProvider, Frame, Vector3};
use crate::position_series::MeteoroidPositionSeries;
use crate::scene::{BodyId, GeometryHandle, SceneBackend};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailPoint {
    pub position: Vector3, // km
    /// 0 at the oldest sample, 1 at the current time
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitTrail {
    pub body: BodyId,
    pub points: Vec<TrailPoint>,
}

/// How a body's trail is sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailConfig {
    pub frame: Frame,
    pub window: Duration,
    pub sample_count: usize,
}

/// Sample `sample_count + 1` evenly spaced times over `[end - window, end]`.
///
/// A `sample_count` of 0 is treated as 1 so both endpoints are always present.
pub fn build_trail<P: EphemerisProvider>(
    adapter: &EphemerisAdapter<P>,
    body: Body,
    frame: Frame,
    end: DateTime<Utc>,
    window: Duration,
    sample_count: usize,
) -> OrbitTrail {
    let samples = sample_count.max(1);
    let start = end - window;
    let window_ms = window.num_milliseconds() as f64;

    let points = (0..=samples)
        .map(|i| {
            let alpha = i as f64 / samples as f64;
            let time = if i == samples {
                end
            } else {
                start + Duration::milliseconds((alpha * window_ms).round() as i64)
            };
            TrailPoint {
                position: adapter.display_position_of(body, time, frame),
                alpha,
            }
        })
        .collect();

    OrbitTrail {
        body: body.into(),
        points,
    }
}

/// Full meteoroid path, fully opaque. Each geocentric sample is offset by
/// Earth's heliocentric position at that sample's time.
pub fn meteoroid_path<P: EphemerisProvider>(
    adapter: &EphemerisAdapter<P>,
    series: &MeteoroidPositionSeries,
) -> OrbitTrail {
    let points = series
        .iter()
        .map(|sample| {
            let earth = adapter.position_of(Body::Earth, sample.timestamp, Frame::Heliocentric);
            TrailPoint {
                position: earth.add(&sample.geocentric_km),
                alpha: 1.0,
            }
        })
        .collect();

    OrbitTrail {
        body: BodyId::Meteoroid,
        points,
    }
}

// =============================================================================
// LIVE TRAIL REGISTRY
// =============================================================================

#[derive(Debug)]
struct LiveTrail {
    trail: OrbitTrail,
    handle: GeometryHandle,
}

/// Trails currently uploaded to the scene, one per body.
#[derive(Debug, Default)]
pub struct TrailSet {
    live: HashMap<BodyId, LiveTrail>,
}

impl TrailSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `trail`, releasing whatever trail its body had before.
    pub fn install<S: SceneBackend + ?Sized>(&mut self, scene: &mut S, trail: OrbitTrail) -> GeometryHandle {
        self.remove(scene, trail.body);
        let handle = scene.upload_trail(&trail);
        self.live.insert(trail.body, LiveTrail { trail, handle });
        handle
    }

    pub fn remove<S: SceneBackend + ?Sized>(&mut self, scene: &mut S, body: BodyId) {
        if let Some(previous) = self.live.remove(&body) {
            scene.release_geometry(previous.handle);
        }
    }

    pub fn clear<S: SceneBackend + ?Sized>(&mut self, scene: &mut S) {
        for (_, previous) in self.live.drain() {
            scene.release_geometry(previous.handle);
        }
    }

    pub fn get(&self, body: BodyId) -> Option<&OrbitTrail> {
        self.live.get(&body).map(|live| &live.trail)
    }

    pub fn handle(&self, body: BodyId) -> Option<GeometryHandle> {
        self.live.get(&body).map(|live| live.handle)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
