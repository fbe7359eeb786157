// NEO Orbit Viewer - Time-driven Earth/Moon/meteoroid position model
// Library entry point and headless driver

pub mod api_client;
pub mod body_updater;
pub mod config;
pub mod details_panel;
pub mod ephemeris_engine;
pub mod label_projector;
pub mod orbit_trail;
pub mod position_series;
pub mod scene;
pub mod scheduling;
pub mod state_manager;
pub mod time_mapper;

#[cfg(test)]
mod test_support;

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use api_client::{NeoApiClient, RequestError};
use body_updater::BodyPositionUpdater;
use config::{ConfigError, ViewerConfig};
use label_projector::LabelProjector;
use scene::{BodyId, HeadlessScene};
use state_manager::{run_playback, spawn_fetches, AppState, SharedState};
use time_mapper::{TimeRangeError, SLIDER_MIN};

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid time range: {0}")]
    Range(#[from] TimeRangeError),
    #[error("request failed: {0}")]
    Request(#[from] RequestError),
}

/// Fetch the configured range, then play the slider through it once against
/// a headless scene.
pub async fn run(config: ViewerConfig) -> Result<(), ViewerError> {
    log::info!(
        "NEO orbit viewer: {} .. {} via {}",
        config.range.start_date(),
        config.range.end_date(),
        config.api_base_url
    );

    let client = NeoApiClient::new(config.api_base_url.clone());
    let updater = BodyPositionUpdater::default();
    let projector = LabelProjector::new(config.moon_label_max_distance_km);
    let mut scene = HeadlessScene::new();
    let shared: SharedState = Arc::new(RwLock::new(AppState::new(&config)));

    let initial = {
        let mut state = shared.write();
        let mut requests = state.set_date_range(config.range.start_date(), config.range.end_date())?;
        if let Some(id) = config.neo_id.as_deref() {
            requests.push(state.details_request(id));
        }
        state.set_slider(SLIDER_MIN, &updater, &mut scene, Instant::now());
        state.focus(&mut scene, Some(BodyId::Earth));
        requests
    };
    for handle in spawn_fetches(&shared, &client, initial) {
        if let Err(err) = handle.await {
            log::warn!("initial fetch task failed: {}", err);
        }
    }

    run_playback(
        shared.clone(),
        client,
        updater,
        &mut scene,
        projector,
        config.frame_rate,
        Duration::from_secs(config.playback_seconds),
    )
    .await;

    let state = shared.read();
    log::info!(
        "playback finished at {}: {} NEOs in range, {} near the final date, {} trails",
        state.current_time.format("%Y-%m-%d %H:%M"),
        state.neo_list.len(),
        state.nearby_neos.len(),
        state.trails.len()
    );
    if let Some(text) = &state.details_text {
        log::info!("details:\n{}", text);
    }
    Ok(())
}
