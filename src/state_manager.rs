// State Manager - Application state and fetch orchestration
// All UI state lives in `AppState`; handlers get it by reference. Fetches are
// tagged with sequence tokens so a late response for a superseded request is
// dropped instead of overwriting newer data.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

use crate::api_client::{Neo, NeoApiClient, NeoDetails, RequestError};
use crate::body_updater::BodyPositionUpdater;
use crate::config::{ViewerConfig, MAX_TRAIL_DAYS};
use crate::details_panel::render_details;
use crate::ephemeris_engine::{Body, EphemerisProvider, Frame};
use crate::label_projector::{Camera, LabelProjector, ScreenLabel, Viewport};
use crate::orbit_trail::{build_trail, meteoroid_path, TrailConfig, TrailSet};
use crate::position_series::MeteoroidPositionSeries;
use crate::scene::{BodyId, CelestialBodyState, SceneBackend};
use crate::scheduling::{Debouncer, RequestSequencer, RequestToken, CENTER_LOOKUP_DELAY, TRAIL_REDRAW_DELAY};
use crate::time_mapper::{SliderRange, TimeRangeError, SLIDER_MAX, SLIDER_MIN};

// =============================================================================
// FETCH REQUESTS & RESPONSES
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FetchRequest {
    NeoList {
        token: RequestToken,
        start: NaiveDate,
        end: NaiveDate,
    },
    Positions {
        token: RequestToken,
        id: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    CenterDate {
        token: RequestToken,
        date: NaiveDate,
    },
    Details {
        token: RequestToken,
        id: String,
    },
}

#[derive(Debug)]
pub enum FetchResponse {
    NeoList {
        token: RequestToken,
        result: Result<Vec<Neo>, RequestError>,
    },
    Positions {
        token: RequestToken,
        result: Result<MeteoroidPositionSeries, RequestError>,
    },
    CenterDate {
        token: RequestToken,
        result: Result<Vec<Neo>, RequestError>,
    },
    Details {
        token: RequestToken,
        result: Result<NeoDetails, RequestError>,
    },
}

pub async fn execute(client: &NeoApiClient, request: FetchRequest) -> FetchResponse {
    match request {
        FetchRequest::NeoList { token, start, end } => FetchResponse::NeoList {
            token,
            result: client.list_by_date_range(start, end).await,
        },
        FetchRequest::Positions { token, id, start, end } => FetchResponse::Positions {
            token,
            result: client.positions_of(&id, start, end).await,
        },
        FetchRequest::CenterDate { token, date } => FetchResponse::CenterDate {
            token,
            result: client.list_by_center_date(date).await,
        },
        FetchRequest::Details { token, id } => FetchResponse::Details {
            token,
            result: client.details_of(&id).await,
        },
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

pub struct AppState {
    pub range: SliderRange,
    pub slider_value: f64,
    pub current_time: DateTime<Utc>,
    pub selected_neo: Option<String>,
    pub meteoroid_series: Option<MeteoroidPositionSeries>,
    pub neo_list: Vec<Neo>,
    pub nearby_neos: Vec<Neo>,
    pub details_text: Option<String>,
    pub focus: Option<BodyId>,
    pub camera: Camera,
    pub viewport: Viewport,
    pub bodies: HashMap<BodyId, CelestialBodyState>,
    pub trails: TrailSet,
    pub trail_configs: Vec<(Body, TrailConfig)>,
    propagation_resolution: usize,
    pub(crate) trail_redraw: Debouncer,
    pub(crate) center_lookup: Debouncer,
    list_requests: RequestSequencer,
    positions_requests: RequestSequencer,
    center_requests: RequestSequencer,
    details_requests: RequestSequencer,
    needs_refresh: bool,
}

impl AppState {
    pub fn new(config: &ViewerConfig) -> Self {
        let trail_configs = vec![
            (
                Body::Earth,
                TrailConfig {
                    frame: Frame::Heliocentric,
                    window: trail_window(config.earth_trail_days),
                    sample_count: config.trail_samples,
                },
            ),
            (
                Body::Moon,
                TrailConfig {
                    frame: Frame::Heliocentric,
                    window: trail_window(config.moon_trail_days),
                    sample_count: config.trail_samples,
                },
            ),
        ];

        Self {
            range: config.range,
            slider_value: SLIDER_MIN,
            current_time: config.range.min(),
            selected_neo: config.neo_id.clone(),
            meteoroid_series: None,
            neo_list: Vec::new(),
            nearby_neos: Vec::new(),
            details_text: None,
            focus: None,
            camera: Camera::default(),
            viewport: config.viewport,
            bodies: HashMap::new(),
            trails: TrailSet::new(),
            trail_configs,
            propagation_resolution: config.trail_samples,
            trail_redraw: Debouncer::new(TRAIL_REDRAW_DELAY),
            center_lookup: Debouncer::new(CENTER_LOOKUP_DELAY),
            list_requests: RequestSequencer::new(),
            positions_requests: RequestSequencer::new(),
            center_requests: RequestSequencer::new(),
            details_requests: RequestSequencer::new(),
            needs_refresh: false,
        }
    }

    /// Slider input: bodies move immediately, network-bound work is debounced.
    pub fn set_slider<P, S>(&mut self, value: f64, updater: &BodyPositionUpdater<P>, scene: &mut S, now: Instant)
    where
        P: EphemerisProvider,
        S: SceneBackend + ?Sized,
    {
        self.slider_value = if value.is_finite() {
            value.clamp(SLIDER_MIN, SLIDER_MAX)
        } else {
            SLIDER_MIN
        };
        let time = self.range.date_at(self.slider_value);
        updater.update(self, scene, time, now);
    }

    /// New start/end dates. Returns the list fetch and, when a NEO is
    /// selected, its positions fetch. Rejects an empty or inverted range.
    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) -> Result<Vec<FetchRequest>, TimeRangeError> {
        self.range = SliderRange::from_dates(start, end)?;
        self.current_time = self.range.date_at(self.slider_value);
        self.needs_refresh = true;
        log::info!("date range set to {} .. {}", start, end);

        let mut requests = vec![FetchRequest::NeoList {
            token: self.list_requests.issue(),
            start,
            end,
        }];
        requests.extend(self.positions_request());
        Ok(requests)
    }

    /// Track `id`: fetch its positions for the current range and its details.
    pub fn select_neo(&mut self, id: &str) -> Vec<FetchRequest> {
        if self.selected_neo.as_deref() != Some(id) {
            // the previous object's samples must not be drawn under the new id
            self.meteoroid_series = None;
            self.needs_refresh = true;
        }
        self.selected_neo = Some(id.to_string());
        let mut requests: Vec<FetchRequest> = self.positions_request().into_iter().collect();
        requests.push(self.details_request(id));
        requests
    }

    pub fn details_request(&mut self, id: &str) -> FetchRequest {
        FetchRequest::Details {
            token: self.details_requests.issue(),
            id: id.to_string(),
        }
    }

    fn positions_request(&mut self) -> Option<FetchRequest> {
        let id = self.selected_neo.clone()?;
        Some(FetchRequest::Positions {
            token: self.positions_requests.issue(),
            id,
            start: self.range.start_date(),
            end: self.range.end_date(),
        })
    }

    /// Apply a finished fetch. Returns false when the response was stale.
    pub fn apply(&mut self, response: FetchResponse) -> bool {
        match response {
            FetchResponse::NeoList { token, result } => {
                if !accept(&self.list_requests, token, "NEO list") {
                    return false;
                }
                match result {
                    Ok(neos) => {
                        log::info!("loaded {} NEOs", neos.len());
                        self.neo_list = neos;
                    }
                    Err(err) => log::warn!("NEO list request failed: {}", err),
                }
            }
            FetchResponse::Positions { token, result } => {
                if !accept(&self.positions_requests, token, "positions") {
                    return false;
                }
                match result {
                    Ok(series) => {
                        log::info!("loaded {} meteoroid positions", series.len());
                        self.meteoroid_series = Some(series);
                        self.needs_refresh = true;
                    }
                    Err(err) => log::warn!("positions request failed: {}", err),
                }
            }
            FetchResponse::CenterDate { token, result } => {
                if !accept(&self.center_requests, token, "center-date") {
                    return false;
                }
                match result {
                    Ok(neos) => self.nearby_neos = neos,
                    Err(err) => log::warn!("center-date request failed: {}", err),
                }
            }
            FetchResponse::Details { token, result } => {
                if !accept(&self.details_requests, token, "details") {
                    return false;
                }
                self.details_text = Some(render_details(&result));
                if let Ok(details) = &result {
                    self.propagate_if_missing(details);
                }
            }
        }
        true
    }

    /// No series from the backend yet: fall back to propagating the selected
    /// object's own orbital elements over the current range.
    fn propagate_if_missing(&mut self, details: &NeoDetails) {
        if self.meteoroid_series.is_some() || self.selected_neo.as_deref() != Some(details.id.as_str()) {
            return;
        }
        if let Some(elements) = details.orbital_elements() {
            log::info!("propagating {} locally from orbital elements", details.name);
            self.meteoroid_series = Some(MeteoroidPositionSeries::from_orbital_elements(
                &elements,
                self.range.min(),
                self.range.max(),
                self.propagation_resolution,
            ));
            self.needs_refresh = true;
        }
    }

    /// Per-frame housekeeping: re-place bodies after new data, run due
    /// debounced work, and hand back any fetches that became due.
    pub fn tick<P, S>(&mut self, updater: &BodyPositionUpdater<P>, scene: &mut S, now: Instant) -> Vec<FetchRequest>
    where
        P: EphemerisProvider,
        S: SceneBackend + ?Sized,
    {
        if self.needs_refresh {
            self.needs_refresh = false;
            let time = self.current_time;
            updater.update(self, scene, time, now);
        }

        if self.trail_redraw.poll(now) {
            self.rebuild_trails(updater, scene);
        }

        let mut requests = Vec::new();
        if self.center_lookup.poll(now) {
            log::debug!("center-date lookup for {}", self.current_time.date_naive());
            requests.push(FetchRequest::CenterDate {
                token: self.center_requests.issue(),
                date: self.current_time.date_naive(),
            });
        }
        requests
    }

    pub fn rebuild_trails<P, S>(&mut self, updater: &BodyPositionUpdater<P>, scene: &mut S)
    where
        P: EphemerisProvider,
        S: SceneBackend + ?Sized,
    {
        for (body, config) in &self.trail_configs {
            let trail = build_trail(
                updater.adapter(),
                *body,
                config.frame,
                self.current_time,
                config.window,
                config.sample_count,
            );
            self.trails.install(scene, trail);
        }

        match &self.meteoroid_series {
            Some(series) if !series.is_empty() => {
                self.trails.install(scene, meteoroid_path(updater.adapter(), series));
            }
            _ => self.trails.remove(scene, BodyId::Meteoroid),
        }
        log::debug!("rebuilt {} trails at {}", self.trails.len(), self.current_time);
    }

    /// Track `target` with the camera (keeping its distance), or release it.
    pub fn focus<S: SceneBackend + ?Sized>(&mut self, scene: &mut S, target: Option<BodyId>) {
        self.focus = target;
        if let Some(id) = target {
            self.apply_focus(scene, id);
        }
    }

    pub(crate) fn apply_focus<S: SceneBackend + ?Sized>(&mut self, scene: &mut S, id: BodyId) {
        let position = self
            .bodies
            .get(&id)
            .filter(|body| body.visible)
            .map(|body| body.position);
        if let Some(position) = position {
            self.camera.focus_on(position);
            scene.set_camera(&self.camera);
        }
    }

    /// Screen labels for every visible body.
    pub fn labels(&self, projector: &LabelProjector) -> Vec<(BodyId, ScreenLabel)> {
        BodyId::ALL
            .iter()
            .filter_map(|id| self.bodies.get(id).filter(|body| body.visible))
            .map(|body| {
                (
                    body.id,
                    projector.project_body(body.id, body.position, &self.camera, &self.viewport),
                )
            })
            .collect()
    }
}

fn trail_window(days: i64) -> Duration {
    Duration::days(days.clamp(1, MAX_TRAIL_DAYS))
}

fn accept(sequencer: &RequestSequencer, token: RequestToken, kind: &str) -> bool {
    if sequencer.is_current(token) {
        true
    } else {
        log::debug!("dropping stale {} response #{}", kind, token.sequence());
        false
    }
}

// =============================================================================
// SHARED STATE & DRIVER LOOP
// =============================================================================

pub type SharedState = Arc<RwLock<AppState>>;

/// Fire off `requests`; each response is applied to `shared` as it lands.
pub fn spawn_fetches(shared: &SharedState, client: &NeoApiClient, requests: Vec<FetchRequest>) -> Vec<JoinHandle<()>> {
    requests
        .into_iter()
        .map(|request| {
            let shared = shared.clone();
            let client = client.clone();
            tokio::spawn(async move {
                let response = execute(&client, request).await;
                shared.write().apply(response);
            })
        })
        .collect()
}

/// Sweep the slider from 0 to 1000 over `playback`, one step per frame, until
/// done or interrupted. Pending debounced work is flushed before returning.
pub async fn run_playback<P, S>(
    shared: SharedState,
    client: NeoApiClient,
    updater: BodyPositionUpdater<P>,
    scene: &mut S,
    projector: LabelProjector,
    frame_rate: u32,
    playback: std::time::Duration,
) where
    P: EphemerisProvider,
    S: SceneBackend,
{
    let frame = std::time::Duration::from_secs_f64(1.0 / f64::from(frame_rate.max(1)));
    let mut interval = tokio::time::interval(frame);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let started = Instant::now();
    let mut last_report = started;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut ctrl_c => {
                log::info!("interrupted, stopping playback");
                break;
            }
        }

        let now = Instant::now();
        let progress = if playback.is_zero() {
            1.0
        } else {
            ((now - started).as_secs_f64() / playback.as_secs_f64()).min(1.0)
        };

        let requests = {
            let mut state = shared.write();
            state.set_slider(progress * SLIDER_MAX, &updater, scene, now);
            let requests = state.tick(&updater, scene, now);

            if now.duration_since(last_report) >= std::time::Duration::from_secs(1) {
                last_report = now;
                let visible = state.labels(&projector).iter().filter(|(_, l)| l.visible).count();
                log::info!(
                    "t = {} (slider {:.0}), {} labels visible",
                    state.current_time.format("%Y-%m-%d %H:%M"),
                    state.slider_value,
                    visible
                );
            }
            requests
        };
        spawn_fetches(&shared, &client, requests);

        if progress >= 1.0 {
            break;
        }
    }

    let settle = Instant::now() + CENTER_LOOKUP_DELAY;
    let requests = shared.write().tick(&updater, scene, settle);
    for handle in spawn_fetches(&shared, &client, requests) {
        if let Err(err) = handle.await {
            log::warn!("fetch task failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position_series::PositionSample;
    use crate::scene::HeadlessScene;
    use crate::test_support::{stub_client, Route, StubServer};
    use chrono::TimeZone;
    use std::time::Duration as StdDuration;

    fn config() -> ViewerConfig {
        ViewerConfig::from_lookup(|key| match key {
            "NEO_START_DATE" => Some("2024-06-01".to_string()),
            "NEO_END_DATE" => Some("2024-07-01".to_string()),
            "NEO_TRAIL_SAMPLES" => Some("50".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn one_sample_series() -> MeteoroidPositionSeries {
        MeteoroidPositionSeries::new(vec![PositionSample {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap(),
            geocentric_km: crate::ephemeris_engine::Vector3::new(5.0e5, 0.0, 0.0),
        }])
    }

    #[test]
    fn test_date_range_without_selection_only_lists() {
        let mut state = AppState::new(&config());
        let requests = state.set_date_range(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(requests.len(), 1);
        assert!(matches!(requests[0], FetchRequest::NeoList { .. }));
    }

    #[test]
    fn test_inverted_date_range_is_rejected_and_keeps_range() {
        let mut state = AppState::new(&config());
        let before = state.range;
        assert!(state.set_date_range(date(2024, 2, 1), date(2024, 1, 1)).is_err());
        assert_eq!(state.range, before);
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut state = AppState::new(&config());
        let first = state.set_date_range(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let second = state.set_date_range(date(2024, 2, 1), date(2024, 2, 29)).unwrap();
        let token_of = |requests: &[FetchRequest]| match &requests[0] {
            FetchRequest::NeoList { token, .. } => *token,
            other => panic!("unexpected {:?}", other),
        };

        let neo = |name: &str| Neo {
            id: name.to_string(),
            name: name.to_string(),
            nasa_jpl_url: None,
            absolute_magnitude_h: None,
            estimated_diameter: None,
            is_potentially_hazardous_asteroid: None,
            close_approach_data: None,
        };

        // newer response lands first, older one arrives late
        assert!(state.apply(FetchResponse::NeoList {
            token: token_of(&second),
            result: Ok(vec![neo("february")]),
        }));
        assert!(!state.apply(FetchResponse::NeoList {
            token: token_of(&first),
            result: Ok(vec![neo("january")]),
        }));
        assert_eq!(state.neo_list[0].name, "february");
    }

    #[test]
    fn test_failed_positions_keep_previous_series() {
        let mut state = AppState::new(&config());
        state.select_neo("42");
        state.meteoroid_series = Some(one_sample_series());
        let requests = state.select_neo("42");
        let token = match &requests[0] {
            FetchRequest::Positions { token, .. } => *token,
            other => panic!("unexpected {:?}", other),
        };
        assert!(state.apply(FetchResponse::Positions {
            token,
            result: Err(RequestError::MissingId),
        }));
        assert_eq!(state.meteoroid_series, Some(one_sample_series()));
    }

    #[test]
    fn test_failed_details_show_fallback() {
        let mut state = AppState::new(&config());
        let request = state.details_request("42");
        let token = match request {
            FetchRequest::Details { token, .. } => token,
            other => panic!("unexpected {:?}", other),
        };
        state.apply(FetchResponse::Details {
            token,
            result: Err(RequestError::MissingId),
        });
        assert_eq!(state.details_text.as_deref(), Some("Failed to load details"));
    }

    fn eros_details() -> NeoDetails {
        serde_json::from_str(
            r#"{
                "id": "2000433",
                "name": "433 Eros (A898 PA)",
                "orbital_data": {
                    "epoch_osculation": "2461000.5",
                    "eccentricity": "0.2228",
                    "semi_major_axis": "1.4580",
                    "inclination": "10.828",
                    "ascending_node_longitude": "304.29",
                    "orbital_period": "643.02",
                    "perihelion_argument": "178.93",
                    "mean_anomaly": "310.55"
                }
            }"#,
        )
        .unwrap()
    }

    /// Select Eros and answer its details request, seeding a propagated series.
    fn select_eros(state: &mut AppState) {
        let token = match state.select_neo("2000433").pop() {
            Some(FetchRequest::Details { token, .. }) => token,
            other => panic!("unexpected {:?}", other),
        };
        state.apply(FetchResponse::Details {
            token,
            result: Ok(eros_details()),
        });
    }

    #[test]
    fn test_details_with_elements_fill_missing_series() {
        let mut state = AppState::new(&config());
        select_eros(&mut state);

        let series = state.meteoroid_series.as_ref().unwrap();
        assert_eq!(series.len(), 51);
        assert_eq!(series.iter().next().unwrap().timestamp, state.range.min());
        assert_eq!(series.iter().last().unwrap().timestamp, state.range.max());
    }

    #[test]
    fn test_marker_sits_at_object_heliocentric_distance() {
        let updater = BodyPositionUpdater::default();
        let mut state = AppState::new(&config());
        let mut scene = HeadlessScene::new();
        select_eros(&mut state);
        state.set_slider(0.0, &updater, &mut scene, Instant::now());

        let elements = eros_details().orbital_elements().unwrap();
        let jd = crate::time_mapper::julian_date(state.range.min());
        let expected = elements.position_au(jd).magnitude() * crate::ephemeris_engine::AU_KM;
        let marker = scene.body(BodyId::Meteoroid).unwrap();
        assert!(marker.visible);
        assert!(
            (marker.position.magnitude() - expected).abs() < 1.0,
            "marker at {} km from the Sun, object at {} km",
            marker.position.magnitude(),
            expected
        );
    }

    #[test]
    fn test_new_selection_drops_previous_series() {
        let updater = BodyPositionUpdater::default();
        let mut state = AppState::new(&config());
        let mut scene = HeadlessScene::new();
        let t0 = Instant::now();
        select_eros(&mut state);
        state.set_slider(0.0, &updater, &mut scene, t0);
        // first tick re-places bodies for the new series, second draws trails
        state.tick(&updater, &mut scene, t0 + StdDuration::from_millis(60));
        state.tick(&updater, &mut scene, t0 + StdDuration::from_millis(120));
        assert!(scene.body(BodyId::Meteoroid).unwrap().visible);
        assert!(state.trails.get(BodyId::Meteoroid).is_some());

        let token = match state.select_neo("3542519").remove(0) {
            FetchRequest::Positions { token, .. } => token,
            other => panic!("unexpected {:?}", other),
        };
        state.apply(FetchResponse::Positions {
            token,
            result: Err(RequestError::Status {
                endpoint: "/api/neos/3542519/positions".to_string(),
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            }),
        });
        assert_eq!(state.selected_neo.as_deref(), Some("3542519"));
        assert!(state.meteoroid_series.is_none());

        state.tick(&updater, &mut scene, t0 + StdDuration::from_millis(200));
        assert!(!scene.body(BodyId::Meteoroid).unwrap().visible);
        state.tick(&updater, &mut scene, t0 + StdDuration::from_millis(300));
        assert!(state.trails.get(BodyId::Meteoroid).is_none());
    }

    #[test]
    fn test_debounced_trails_and_center_lookup() {
        let updater = BodyPositionUpdater::default();
        let mut state = AppState::new(&config());
        let mut scene = HeadlessScene::new();
        let t0 = Instant::now();

        state.set_slider(500.0, &updater, &mut scene, t0);
        assert_eq!(state.current_time, Utc.with_ymd_and_hms(2024, 6, 16, 0, 0, 0).unwrap());
        assert!(state.tick(&updater, &mut scene, t0 + StdDuration::from_millis(49)).is_empty());
        assert_eq!(scene.live_geometry_count(), 0);

        // a second slider event restarts both timers
        state.set_slider(600.0, &updater, &mut scene, t0 + StdDuration::from_millis(30));
        assert!(state.tick(&updater, &mut scene, t0 + StdDuration::from_millis(60)).is_empty());
        assert_eq!(scene.live_geometry_count(), 0);

        assert!(state.tick(&updater, &mut scene, t0 + StdDuration::from_millis(80)).is_empty());
        assert_eq!(scene.live_geometry_count(), 2);
        assert_eq!(state.trails.get(BodyId::Earth).unwrap().points.len(), 51);

        let requests = state.tick(&updater, &mut scene, t0 + StdDuration::from_millis(530));
        assert_eq!(requests.len(), 1);
        match &requests[0] {
            FetchRequest::CenterDate { date: d, .. } => assert_eq!(*d, state.current_time.date_naive()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rebuilding_trails_keeps_one_per_body() {
        let updater = BodyPositionUpdater::default();
        let mut state = AppState::new(&config());
        let mut scene = HeadlessScene::new();
        state.meteoroid_series = Some(one_sample_series());

        state.rebuild_trails(&updater, &mut scene);
        state.rebuild_trails(&updater, &mut scene);
        assert_eq!(scene.live_geometry_count(), 3);
        assert_eq!(scene.released_count(), 3);

        state.meteoroid_series = None;
        state.rebuild_trails(&updater, &mut scene);
        assert_eq!(scene.live_geometry_count(), 2);
        assert!(state.trails.get(BodyId::Meteoroid).is_none());
    }

    #[test]
    fn test_new_series_refreshes_marker_on_next_tick() {
        let updater = BodyPositionUpdater::default();
        let mut state = AppState::new(&config());
        let mut scene = HeadlessScene::new();
        let t0 = Instant::now();
        state.set_slider(300.0, &updater, &mut scene, t0);
        assert!(!scene.body(BodyId::Meteoroid).unwrap().visible);

        let token = match state.select_neo("42").remove(0) {
            FetchRequest::Positions { token, .. } => token,
            other => panic!("unexpected {:?}", other),
        };
        state.apply(FetchResponse::Positions {
            token,
            result: Ok(one_sample_series()),
        });
        state.tick(&updater, &mut scene, t0 + StdDuration::from_millis(1));
        assert!(scene.body(BodyId::Meteoroid).unwrap().visible);
    }

    #[test]
    fn test_labels_cover_visible_bodies_only() {
        let updater = BodyPositionUpdater::default();
        let mut state = AppState::new(&config());
        let mut scene = HeadlessScene::new();
        state.set_slider(0.0, &updater, &mut scene, Instant::now());
        state.focus(&mut scene, Some(BodyId::Earth));

        let labels = state.labels(&LabelProjector::default());
        let ids: Vec<BodyId> = labels.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![BodyId::Earth, BodyId::Moon, BodyId::Sun]);
        let earth = labels[0].1;
        assert!(earth.visible);
        assert!((earth.x - state.viewport.width / 2.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_date_range_end_to_end() {
        let server = StubServer::spawn(vec![
            Route::ok(
                "/api/neos/range",
                Some("start_date"),
                r#"{"neos": [{"id": "3542519", "name": "(2010 PK9)"}]}"#,
            ),
            Route::ok(
                "/api/neos/3542519/positions",
                None,
                r#"{"positions": [
                    {"timestamp": 1717200000000.0, "geocentric_position_km": {"x": 4.0e6, "y": 0.0, "z": 0.0}},
                    {"timestamp": 1719792000000.0, "geocentric_position_km": {"x": 3.0e6, "y": 1.0e5, "z": 0.0}}
                ]}"#,
            ),
        ])
        .await;
        let client = stub_client(&server);
        let shared: SharedState = Arc::new(RwLock::new(AppState::new(&config())));
        shared.write().selected_neo = Some("3542519".to_string());

        let requests = shared
            .write()
            .set_date_range(date(2024, 6, 1), date(2024, 7, 1))
            .unwrap();
        assert_eq!(requests.len(), 2);
        for handle in spawn_fetches(&shared, &client, requests) {
            handle.await.unwrap();
        }

        assert_eq!(server.hit_count(), 2);
        assert_eq!(server.hits_matching("/api/neos/range?"), 1);
        assert_eq!(server.hits_matching("/positions?"), 1);

        let state = shared.read();
        assert_eq!(state.neo_list.len(), 1);
        assert_eq!(state.meteoroid_series.as_ref().map(|s| s.len()), Some(2));
        let mid = state.range.date_at(500.0);
        let expected = Utc.with_ymd_and_hms(2024, 6, 16, 0, 0, 0).unwrap();
        assert!((mid - expected).num_milliseconds().abs() <= 1);
    }
}
