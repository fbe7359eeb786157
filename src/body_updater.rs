// Body Position Updater - Re-places every tracked body for a new time
// Scene frame: heliocentric km, Sun at the origin, Moon shown with the display tilt.

use chrono::{DateTime, Utc};
use std::time::Instant;

use crate::ephemeris_engine::{AnalyticEphemeris, Body, EphemerisAdapter, EphemerisProvider, Frame, Vector3};
use crate::scene::{BodyId, CelestialBodyState, SceneBackend};
use crate::state_manager::AppState;

pub struct BodyPositionUpdater<P = AnalyticEphemeris> {
    adapter: EphemerisAdapter<P>,
}

impl Default for BodyPositionUpdater<AnalyticEphemeris> {
    fn default() -> Self {
        Self::new(EphemerisAdapter::default())
    }
}

impl<P: EphemerisProvider> BodyPositionUpdater<P> {
    pub fn new(adapter: EphemerisAdapter<P>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &EphemerisAdapter<P> {
        &self.adapter
    }

    /// Place Sun, Earth, Moon and the meteoroid marker for `time`, schedule the
    /// debounced trail redraw and center-date lookup, and re-apply any focus.
    pub fn update<S: SceneBackend + ?Sized>(
        &self,
        state: &mut AppState,
        scene: &mut S,
        time: DateTime<Utc>,
        now: Instant,
    ) {
        state.current_time = time;

        let earth = self.adapter.position_of(Body::Earth, time, Frame::Heliocentric);
        let moon = self.adapter.display_position_of(Body::Moon, time, Frame::Heliocentric);
        let sun = self.adapter.position_of(Body::Sun, time, Frame::Heliocentric);

        place(state, scene, BodyId::Sun, sun);
        place(state, scene, BodyId::Earth, earth);
        place(state, scene, BodyId::Moon, moon);

        let meteoroid = state
            .meteoroid_series
            .as_ref()
            .and_then(|series| series.nearest(time))
            .map(|sample| sample.geocentric_km);
        match meteoroid {
            Some(geocentric) => place(state, scene, BodyId::Meteoroid, earth.add(&geocentric)),
            None => {
                scene.hide_body(BodyId::Meteoroid);
                state
                    .bodies
                    .insert(BodyId::Meteoroid, CelestialBodyState::hidden(BodyId::Meteoroid));
            }
        }

        state.trail_redraw.schedule(now);
        state.center_lookup.schedule(now);

        if let Some(target) = state.focus {
            state.apply_focus(scene, target);
        }
    }
}

fn place<S: SceneBackend + ?Sized>(state: &mut AppState, scene: &mut S, id: BodyId, position: Vector3) {
    scene.place_body(id, position);
    state.bodies.insert(
        id,
        CelestialBodyState {
            id,
            position,
            radius: id.display_radius_km(),
            visible: true,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::position_series::{MeteoroidPositionSeries, PositionSample};
    use crate::scene::HeadlessScene;
    use chrono::{Duration, TimeZone};

    fn state() -> AppState {
        let config = ViewerConfig::from_lookup(|key| match key {
            "NEO_START_DATE" => Some("2024-06-01".to_string()),
            "NEO_END_DATE" => Some("2024-07-01".to_string()),
            _ => None,
        })
        .unwrap();
        AppState::new(&config)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_update_places_sun_earth_moon() {
        let updater = BodyPositionUpdater::default();
        let mut state = state();
        let mut scene = HeadlessScene::new();
        updater.update(&mut state, &mut scene, noon(), Instant::now());

        let adapter = updater.adapter();
        assert_eq!(state.current_time, noon());
        assert_eq!(scene.body(BodyId::Sun).unwrap().position, Vector3::zero());
        assert_eq!(
            scene.body(BodyId::Earth).unwrap().position,
            adapter.position_of(Body::Earth, noon(), Frame::Heliocentric)
        );
        assert_eq!(
            state.bodies[&BodyId::Moon].position,
            adapter.display_position_of(Body::Moon, noon(), Frame::Heliocentric)
        );
        assert!(state.trail_redraw.is_pending());
        assert!(state.center_lookup.is_pending());
    }

    #[test]
    fn test_meteoroid_hidden_without_series() {
        let updater = BodyPositionUpdater::default();
        let mut state = state();
        let mut scene = HeadlessScene::new();
        updater.update(&mut state, &mut scene, noon(), Instant::now());
        assert!(!scene.body(BodyId::Meteoroid).unwrap().visible);

        state.meteoroid_series = Some(MeteoroidPositionSeries::default());
        updater.update(&mut state, &mut scene, noon(), Instant::now());
        assert!(!state.bodies[&BodyId::Meteoroid].visible);
    }

    #[test]
    fn test_meteoroid_uses_nearest_sample() {
        let updater = BodyPositionUpdater::default();
        let mut state = state();
        let mut scene = HeadlessScene::new();
        state.meteoroid_series = Some(MeteoroidPositionSeries::new(vec![
            PositionSample {
                timestamp: noon() - Duration::hours(6),
                geocentric_km: Vector3::new(1.0e6, 0.0, 0.0),
            },
            PositionSample {
                timestamp: noon() + Duration::hours(1),
                geocentric_km: Vector3::new(2.0e6, 0.0, 0.0),
            },
        ]));
        updater.update(&mut state, &mut scene, noon(), Instant::now());

        let earth = updater.adapter().position_of(Body::Earth, noon(), Frame::Heliocentric);
        let marker = scene.body(BodyId::Meteoroid).unwrap();
        assert!(marker.visible);
        assert_eq!(marker.position, earth.add(&Vector3::new(2.0e6, 0.0, 0.0)));
    }

    #[test]
    fn test_focus_follows_body_at_same_distance() {
        let updater = BodyPositionUpdater::default();
        let mut state = state();
        let mut scene = HeadlessScene::new();
        updater.update(&mut state, &mut scene, noon(), Instant::now());
        state.focus(&mut scene, Some(BodyId::Earth));
        let distance = state.camera.distance_to_target();

        let later = noon() + Duration::days(3);
        updater.update(&mut state, &mut scene, later, Instant::now());
        let earth = updater.adapter().position_of(Body::Earth, later, Frame::Heliocentric);
        assert_eq!(Vector3::from(state.camera.target), earth);
        assert!((state.camera.distance_to_target() - distance).abs() / distance < 1e-6);
        assert_eq!(scene.camera(), Some(&state.camera));
    }
}
