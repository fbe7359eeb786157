// Scene - Rendering collaborator seam
// The renderer owns meshes, line geometry and the camera; the core talks to it
// through `SceneBackend`. `HeadlessScene` records everything in memory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ephemeris_engine::{Body, Vector3};
use crate::label_projector::Camera;
use crate::orbit_trail::OrbitTrail;

// =============================================================================
// BODY IDENTITY & STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyId {
    Earth,
    Moon,
    Sun,
    Meteoroid,
}

impl BodyId {
    pub const ALL: [BodyId; 4] = [BodyId::Earth, BodyId::Moon, BodyId::Sun, BodyId::Meteoroid];

    /// Sphere radius used when drawing the body (km).
    pub fn display_radius_km(&self) -> f64 {
        match self {
            BodyId::Earth => 6357.0,
            BodyId::Moon => 1737.0,
            BodyId::Sun => 696_000.0,
            // exaggerated so the marker stays visible at Earth-Moon scale
            BodyId::Meteoroid => 500_000.0,
        }
    }
}

impl From<Body> for BodyId {
    fn from(body: Body) -> Self {
        match body {
            Body::Sun => BodyId::Sun,
            Body::Earth => BodyId::Earth,
            Body::Moon => BodyId::Moon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CelestialBodyState {
    pub id: BodyId,
    pub position: Vector3, // km, heliocentric display frame
    pub radius: f64,       // km
    pub visible: bool,
}

impl CelestialBodyState {
    pub fn hidden(id: BodyId) -> Self {
        Self {
            id,
            position: Vector3::zero(),
            radius: id.display_radius_km(),
            visible: false,
        }
    }
}

// =============================================================================
// SCENE BACKEND
// =============================================================================

/// Opaque handle to line geometry owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeometryHandle(pub u64);

pub trait SceneBackend {
    fn place_body(&mut self, id: BodyId, position: Vector3);
    fn hide_body(&mut self, id: BodyId);
    /// Allocate line geometry for a trail.
    fn upload_trail(&mut self, trail: &OrbitTrail) -> GeometryHandle;
    /// Free geometry and material behind `handle`.
    fn release_geometry(&mut self, handle: GeometryHandle);
    fn set_camera(&mut self, camera: &Camera);
}

/// In-memory scene used by the headless driver and tests.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    bodies: HashMap<BodyId, CelestialBodyState>,
    live_geometry: HashMap<GeometryHandle, usize>,
    next_handle: u64,
    released: usize,
    camera: Option<Camera>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(&self, id: BodyId) -> Option<&CelestialBodyState> {
        self.bodies.get(&id)
    }

    pub fn live_geometry_count(&self) -> usize {
        self.live_geometry.len()
    }

    pub fn is_live(&self, handle: GeometryHandle) -> bool {
        self.live_geometry.contains_key(&handle)
    }

    pub fn released_count(&self) -> usize {
        self.released
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }
}

impl SceneBackend for HeadlessScene {
    fn place_body(&mut self, id: BodyId, position: Vector3) {
        self.bodies.insert(
            id,
            CelestialBodyState {
                id,
                position,
                radius: id.display_radius_km(),
                visible: true,
            },
        );
    }

    fn hide_body(&mut self, id: BodyId) {
        self.bodies
            .entry(id)
            .and_modify(|state| state.visible = false)
            .or_insert_with(|| CelestialBodyState::hidden(id));
    }

    fn upload_trail(&mut self, trail: &OrbitTrail) -> GeometryHandle {
        self.next_handle += 1;
        let handle = GeometryHandle(self.next_handle);
        self.live_geometry.insert(handle, trail.points.len());
        handle
    }

    fn release_geometry(&mut self, handle: GeometryHandle) {
        if self.live_geometry.remove(&handle).is_some() {
            self.released += 1;
        } else {
            log::warn!("release of unknown geometry {:?}", handle);
        }
    }

    fn set_camera(&mut self, camera: &Camera) {
        self.camera = Some(*camera);
    }
}
