// Ephemeris Engine - Sun, Earth and Moon positions in kilometres
// Wraps an ephemeris provider (AU, Earth-equatorial J2000 axes) and converts its
// output to km vectors. The display-only axial tilt lives apart from the physics.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::time_mapper::julian_date;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Kilometres per astronomical unit
pub const AU_KM: f64 = 149_597_870.7;

/// Earth's axial tilt used for the display rotation (degrees)
pub const AXIAL_TILT_DEG: f64 = 23.44;

/// Mean obliquity of the ecliptic at J2000 (degrees)
pub const OBLIQUITY_J2000_DEG: f64 = 23.439_291_1;

/// J2000.0 epoch as a Julian date
pub const J2000_JD: f64 = 2451545.0;

pub const DAYS_PER_JULIAN_CENTURY: f64 = 36525.0;

/// Speed of light (km/s)
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// Earth equatorial radius (km), used for lunar parallax
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.14;

// =============================================================================
// 3D VECTOR MATHEMATICS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn scale(&self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    pub fn add(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    pub fn sub(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn distance_to(&self, other: &Vector3) -> f64 {
        self.sub(other).magnitude()
    }

    /// Right-handed rotation about the x-axis by `angle` radians.
    pub fn rotate_x(&self, angle: f64) -> Vector3 {
        let (sin, cos) = angle.sin_cos();
        Vector3 {
            x: self.x,
            y: self.y * cos - self.z * sin,
            z: self.y * sin + self.z * cos,
        }
    }
}

impl From<Vector3> for glam::DVec3 {
    fn from(v: Vector3) -> Self {
        glam::DVec3::new(v.x, v.y, v.z)
    }
}

impl From<glam::DVec3> for Vector3 {
    fn from(v: glam::DVec3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

// =============================================================================
// KEPLERIAN ORBITAL ELEMENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Semi-major axis (AU)
    pub semi_major_axis: f64,
    /// Eccentricity (0-1 for elliptical)
    pub eccentricity: f64,
    /// Inclination (radians)
    pub inclination: f64,
    /// Longitude of ascending node (radians)
    pub longitude_ascending_node: f64,
    /// Argument of perihelion (radians)
    pub argument_perihelion: f64,
    /// Mean anomaly at epoch (radians)
    pub mean_anomaly: f64,
    /// Epoch (Julian Date)
    pub epoch: f64,
    /// Orbital period (days)
    pub orbital_period: f64,
}

impl OrbitalElements {
    /// Earth's J2000 mean elements, ecliptic frame.
    pub fn earth() -> Self {
        Self {
            semi_major_axis: 1.000_002_61,
            eccentricity: 0.016_711_23,
            inclination: (-0.000_015_31_f64).to_radians(),
            longitude_ascending_node: 0.0,
            argument_perihelion: 102.937_681_93_f64.to_radians(),
            // mean longitude 100.46457166 minus longitude of perihelion
            mean_anomaly: (-2.473_110_27_f64).to_radians(),
            epoch: J2000_JD,
            orbital_period: 365.256_363_004,
        }
    }

    /// Heliocentric ecliptic position (AU) at Julian date `jd`.
    pub fn position_au(&self, jd: f64) -> Vector3 {
        let a = self.semi_major_axis;
        let e = self.eccentricity;
        let i = self.inclination;
        let omega_big = self.longitude_ascending_node; // Ω
        let omega_small = self.argument_perihelion; // ω

        let mean_motion = TAU / self.orbital_period;
        let m = (self.mean_anomaly + mean_motion * (jd - self.epoch)).rem_euclid(TAU);
        let eccentric_anomaly = solve_kepler_equation(m, e);

        // Position in orbital plane (perifocal frame)
        let x_orb = a * (eccentric_anomaly.cos() - e);
        let y_orb = a * (1.0 - e * e).sqrt() * eccentric_anomaly.sin();

        let cos_omega = omega_big.cos();
        let sin_omega = omega_big.sin();
        let cos_w = omega_small.cos();
        let sin_w = omega_small.sin();
        let cos_i = i.cos();
        let sin_i = i.sin();

        let r11 = cos_omega * cos_w - sin_omega * sin_w * cos_i;
        let r12 = -cos_omega * sin_w - sin_omega * cos_w * cos_i;
        let r21 = sin_omega * cos_w + cos_omega * sin_w * cos_i;
        let r22 = -sin_omega * sin_w + cos_omega * cos_w * cos_i;
        let r31 = sin_w * sin_i;
        let r32 = cos_w * sin_i;

        Vector3::new(
            r11 * x_orb + r12 * y_orb,
            r21 * x_orb + r22 * y_orb,
            r31 * x_orb + r32 * y_orb,
        )
    }
}

/// Solve Kepler's equation M = E - e*sin(E) using Newton-Raphson
pub fn solve_kepler_equation(mean_anomaly: f64, eccentricity: f64) -> f64 {
    let mut e_anom = mean_anomaly;
    let tolerance = 1e-12;
    let max_iterations = 50;

    for _ in 0..max_iterations {
        let f = e_anom - eccentricity * e_anom.sin() - mean_anomaly;
        let f_prime = 1.0 - eccentricity * e_anom.cos();
        let delta = f / f_prime;
        e_anom -= delta;

        if delta.abs() < tolerance {
            break;
        }
    }

    e_anom
}

// =============================================================================
// EPHEMERIS PROVIDER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Body {
    Sun,
    Earth,
    Moon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frame {
    /// Relative to Earth's centre
    Geocentric,
    /// Relative to the Sun's centre
    Heliocentric,
}

/// Source of raw body positions in AU, Earth-equatorial J2000 axes.
///
/// Implementations must be deterministic for a given `(body, time)`.
pub trait EphemerisProvider {
    /// Position of `body` relative to Earth's centre. With `aberration` set the
    /// body is seen where its light left it (light-time corrected).
    fn geo_vector_au(&self, body: Body, time: DateTime<Utc>, aberration: bool) -> Vector3;

    /// Earth's position relative to the Sun's centre. Other heliocentric
    /// positions are composed from this and geocentric vectors.
    fn earth_helio_vector_au(&self, time: DateTime<Utc>) -> Vector3;
}

/// Analytic provider: Earth from J2000 mean Keplerian elements, Moon from a
/// truncated lunar series (good to a few tenths of a degree).
#[derive(Debug, Clone)]
pub struct AnalyticEphemeris {
    earth: OrbitalElements,
}

impl Default for AnalyticEphemeris {
    fn default() -> Self {
        Self {
            earth: OrbitalElements::earth(),
        }
    }
}

impl AnalyticEphemeris {
    /// Geometric geocentric position, ecliptic axes, AU.
    fn geometric_geo_ecliptic(&self, body: Body, jd: f64) -> Vector3 {
        match body {
            Body::Earth => Vector3::zero(),
            Body::Sun => self.earth.position_au(jd).scale(-1.0),
            Body::Moon => {
                let (lambda, beta, distance_km) = moon_ecliptic(jd);
                let (sin_l, cos_l) = lambda.to_radians().sin_cos();
                let (sin_b, cos_b) = beta.to_radians().sin_cos();
                Vector3::new(cos_b * cos_l, cos_b * sin_l, sin_b).scale(distance_km / AU_KM)
            }
        }
    }
}

impl EphemerisProvider for AnalyticEphemeris {
    fn geo_vector_au(&self, body: Body, time: DateTime<Utc>, aberration: bool) -> Vector3 {
        let jd = julian_date(time);
        let mut position = self.geometric_geo_ecliptic(body, jd);
        if aberration && body != Body::Earth {
            let light_seconds = position.magnitude() * AU_KM / SPEED_OF_LIGHT_KM_S;
            let emitted = time - Duration::microseconds((light_seconds * 1e6).round() as i64);
            position = self.geometric_geo_ecliptic(body, julian_date(emitted));
        }
        ecliptic_to_equatorial(&position)
    }

    fn earth_helio_vector_au(&self, time: DateTime<Utc>) -> Vector3 {
        ecliptic_to_equatorial(&self.earth.position_au(julian_date(time)))
    }
}

/// Geocentric ecliptic longitude (deg), latitude (deg) and distance (km) of the Moon.
pub fn moon_ecliptic(jd: f64) -> (f64, f64, f64) {
    let t = (jd - J2000_JD) / DAYS_PER_JULIAN_CENTURY;
    let s = |deg: f64| deg.to_radians().sin();
    let c = |deg: f64| deg.to_radians().cos();

    let lambda = 218.32 + 481_267.881 * t
        + 6.29 * s(135.0 + 477_198.87 * t)
        - 1.27 * s(259.3 - 413_335.36 * t)
        + 0.66 * s(235.7 + 890_534.22 * t)
        + 0.21 * s(269.9 + 954_397.74 * t)
        - 0.19 * s(357.5 + 35_999.05 * t)
        - 0.11 * s(186.5 + 966_404.03 * t);

    let beta = 5.13 * s(93.3 + 483_202.02 * t) + 0.28 * s(228.2 + 960_400.89 * t)
        - 0.28 * s(318.3 + 6_003.15 * t)
        - 0.17 * s(217.6 - 407_332.21 * t);

    let parallax = 0.9508
        + 0.0518 * c(135.0 + 477_198.87 * t)
        + 0.0095 * c(259.3 - 413_335.36 * t)
        + 0.0078 * c(235.7 + 890_534.22 * t)
        + 0.0028 * c(269.9 + 954_397.74 * t);

    let distance_km = EARTH_EQUATORIAL_RADIUS_KM / parallax.to_radians().sin();
    (lambda.rem_euclid(360.0), beta, distance_km)
}

/// Ecliptic J2000 axes to Earth-equatorial J2000 axes (the scene's axes).
pub fn ecliptic_to_equatorial(v: &Vector3) -> Vector3 {
    v.rotate_x(OBLIQUITY_J2000_DEG.to_radians())
}

pub fn equatorial_to_ecliptic(v: &Vector3) -> Vector3 {
    v.rotate_x(-OBLIQUITY_J2000_DEG.to_radians())
}

// =============================================================================
// EPHEMERIS ADAPTER
// =============================================================================

/// Display-only rotation by Earth's axial tilt about the x-axis.
///
/// This lines the Moon's equatorial-frame offset up with the rendered ecliptic
/// plane. It is a presentation transform, not an astronomical correction; never
/// feed its output back into physical calculations.
pub fn display_tilt(v: &Vector3) -> Vector3 {
    v.rotate_x(-AXIAL_TILT_DEG.to_radians())
}

/// Kilometre-scale positions of the Sun, Earth and Moon.
#[derive(Debug, Clone, Default)]
pub struct EphemerisAdapter<P = AnalyticEphemeris> {
    provider: P,
}

impl<P: EphemerisProvider> EphemerisAdapter<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Physical position (km). Geocentric queries are light-time corrected;
    /// the heliocentric Moon is heliocentric Earth plus geocentric Moon.
    pub fn position_of(&self, body: Body, time: DateTime<Utc>, frame: Frame) -> Vector3 {
        match (frame, body) {
            (Frame::Geocentric, _) => self.provider.geo_vector_au(body, time, true).scale(AU_KM),
            (Frame::Heliocentric, Body::Moon) => {
                let earth = self.position_of(Body::Earth, time, Frame::Heliocentric);
                let moon = self.position_of(Body::Moon, time, Frame::Geocentric);
                earth.add(&moon)
            }
            (Frame::Heliocentric, Body::Sun) => Vector3::zero(),
            (Frame::Heliocentric, Body::Earth) => self.provider.earth_helio_vector_au(time).scale(AU_KM),
        }
    }

    /// Position as rendered. Only the Moon differs from [`Self::position_of`]:
    /// its geocentric vector is passed through [`display_tilt`].
    pub fn display_position_of(&self, body: Body, time: DateTime<Utc>, frame: Frame) -> Vector3 {
        if body != Body::Moon {
            return self.position_of(body, time, frame);
        }
        let moon = display_tilt(&self.position_of(Body::Moon, time, Frame::Geocentric));
        match frame {
            Frame::Geocentric => moon,
            Frame::Heliocentric => self
                .position_of(Body::Earth, time, Frame::Heliocentric)
                .add(&moon),
        }
    }
}
