// Details Panel - Text for the selected NEO

use crate::api_client::{NeoDetails, RequestError};

pub const DETAILS_FAILED: &str = "Failed to load details";

pub fn render_details(result: &Result<NeoDetails, RequestError>) -> String {
    match result {
        Ok(details) => describe(details),
        Err(err) => {
            log::warn!("details request failed: {}", err);
            DETAILS_FAILED.to_string()
        }
    }
}

fn describe(details: &NeoDetails) -> String {
    let mut lines = vec![details.name.clone()];

    let hazardous = details.is_potentially_hazardous_asteroid.unwrap_or(false);
    lines.push(format!(
        "Potentially hazardous: {}",
        if hazardous { "yes" } else { "no" }
    ));

    if let Some(h) = details.absolute_magnitude_h {
        lines.push(format!("Absolute magnitude (H): {:.1}", h));
    }
    if let Some(diameter) = details.mean_diameter_m() {
        lines.push(format!("Estimated diameter: {:.0} m", diameter));
    }
    if let Some(closest) = details.earth_approaches().first() {
        lines.push(format!(
            "Closest approach: {} at {:.0} km, {:.2} km/s",
            closest.date, closest.miss_distance_km, closest.velocity_km_s
        ));
    }
    if let Some(url) = &details.nasa_jpl_url {
        lines.push(format!("JPL: {}", url));
    }

    lines.join("\n")
}
