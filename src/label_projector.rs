// Label Projector - World positions to screen pixels for HTML overlay labels

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};

use crate::ephemeris_engine::Vector3;
use crate::scene::BodyId;

/// Default distance (km) beyond which the Moon label is hidden.
pub const DEFAULT_MOON_LABEL_MAX_DISTANCE_KM: f64 = 2_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

// =============================================================================
// CAMERA
// =============================================================================

/// Perspective camera orbiting a target point. Distances in km.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: DVec3,
    pub target: DVec3,
    pub up: DVec3,
    pub fov_y_deg: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: DVec3::new(0.0, 0.0, 15_000.0),
            target: DVec3::ZERO,
            up: DVec3::Y,
            fov_y_deg: 75.0,
            near: 0.1,
            far: 1.0e10,
        }
    }
}

impl Camera {
    pub fn view_projection(&self, aspect: f64) -> DMat4 {
        let projection = DMat4::perspective_rh_gl(self.fov_y_deg.to_radians(), aspect, self.near, self.far);
        let view = DMat4::look_at_rh(self.position, self.target, self.up);
        projection * view
    }

    pub fn distance_to_target(&self) -> f64 {
        self.position.distance(self.target)
    }

    pub fn distance_to(&self, point: Vector3) -> f64 {
        self.position.distance(point.into())
    }

    /// Re-aim at `point` keeping the current viewing offset (and so the
    /// current distance).
    pub fn focus_on(&mut self, point: Vector3) {
        let offset = self.position - self.target;
        let point: DVec3 = point.into();
        self.target = point;
        self.position = point + offset;
    }
}

// =============================================================================
// PROJECTION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenLabel {
    pub x: f64,
    pub y: f64,
    pub visible: bool,
}

/// Project a world position to pixel coordinates (origin top-left).
/// Invisible when the projected depth leaves [-1, 1].
pub fn project(position: Vector3, camera: &Camera, viewport: &Viewport) -> ScreenLabel {
    let ndc = camera
        .view_projection(viewport.aspect())
        .project_point3(position.into());
    ScreenLabel {
        x: (ndc.x * 0.5 + 0.5) * viewport.width,
        y: (-ndc.y * 0.5 + 0.5) * viewport.height,
        visible: ndc.z.is_finite() && (-1.0..=1.0).contains(&ndc.z),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LabelProjector {
    pub moon_label_max_distance_km: f64,
}

impl Default for LabelProjector {
    fn default() -> Self {
        Self {
            moon_label_max_distance_km: DEFAULT_MOON_LABEL_MAX_DISTANCE_KM,
        }
    }
}

impl LabelProjector {
    pub fn new(moon_label_max_distance_km: f64) -> Self {
        Self {
            moon_label_max_distance_km,
        }
    }

    /// Depth-culled projection; the Moon label is also dropped when the camera
    /// is farther than `moon_label_max_distance_km` from it.
    pub fn project_body(&self, id: BodyId, position: Vector3, camera: &Camera, viewport: &Viewport) -> ScreenLabel {
        let mut label = project(position, camera, viewport);
        if id == BodyId::Moon && camera.distance_to(position) > self.moon_label_max_distance_km {
            label.visible = false;
        }
        label
    }
}
