use std::collections::BTreeSet;

// Recoverable conditions collected over a run and surfaced to the operator
#[derive(Debug, Default)]
pub struct RunReport {
    pub skipped_horizons: Vec<String>,
    pub textures_not_found: Vec<(String, String)>,
    pub horizons_without_texture: Vec<String>,
    pub horizon_id_collisions: BTreeSet<String>,
    pub excluded_horizons: usize,
    pub excluded_components: usize,
    pub fragments_without_area: Vec<(String, i64)>,
    pub unmatched_map_units: BTreeSet<String>,
    pub unmatched_land_cover: BTreeSet<i64>,
    pub hillslopes_without_element: Vec<i64>,
    pub channels_without_hillslopes: Vec<i64>,
    pub channel_type_not_found: Option<String>,
}

impl RunReport {
    pub fn new() -> Self {
        RunReport::default()
    }

    pub fn skip_horizon(&mut self, reason: String) {
        log::warn!("Skipping horizon: {}", reason);
        self.skipped_horizons.push(reason);
    }

    pub fn texture_not_found(&mut self, horizon: &str, texture: &str) {
        log::warn!(
            "Texture '{}' of horizon {} is not in the reference texture table",
            texture,
            horizon
        );
        self.textures_not_found
            .push((horizon.to_string(), texture.to_string()));
    }

    pub fn fragment_without_area(&mut self, table: &str, hillslope_id: i64) {
        log::warn!(
            "Fragment of hillslope {} in {} has no area and is ignored",
            hillslope_id,
            table
        );
        self.fragments_without_area
            .push((table.to_string(), hillslope_id));
    }

    /// Element files built from a run with unresolved textures lack SMax, CV,
    /// Distribution and BPressure for those horizons.
    pub fn is_complete(&self) -> bool {
        self.textures_not_found.is_empty() && self.horizons_without_texture.is_empty()
    }

    pub fn log_summary(&self) {
        log::info!("Run summary:");
        log::info!("  Horizons skipped (bad values): {}", self.skipped_horizons.len());
        log::info!("  Horizons with unknown texture: {}", self.textures_not_found.len());
        log::info!("  Horizons without texture: {}", self.horizons_without_texture.len());
        log::info!("  Horizons with non-positive thickness: {}", self.excluded_horizons);
        log::info!("  Components with non-positive percentage: {}", self.excluded_components);
        if !self.horizon_id_collisions.is_empty() {
            log::warn!(
                "  Horizon ids shared across components: {:?}",
                self.horizon_id_collisions
            );
        }
        if !self.fragments_without_area.is_empty() {
            log::warn!(
                "  Fragments without area: {}",
                self.fragments_without_area.len()
            );
        }
        if !self.unmatched_map_units.is_empty() {
            log::warn!("  Unmatched map units: {:?}", self.unmatched_map_units);
        }
        if !self.unmatched_land_cover.is_empty() {
            log::warn!("  Unmatched land cover classes: {:?}", self.unmatched_land_cover);
        }
        if !self.hillslopes_without_element.is_empty() {
            log::warn!(
                "  Hillslopes without an element row: {:?}",
                self.hillslopes_without_element
            );
        }
        if !self.channels_without_hillslopes.is_empty() {
            log::warn!(
                "  Channels without adjacent hillslopes: {:?}",
                self.channels_without_hillslopes
            );
        }
        if let Some(channel_type) = &self.channel_type_not_found {
            log::warn!("  Channel type not found: {}", channel_type);
        }
        if !self.is_complete() {
            log::warn!("Parameter set is incomplete; element files built from it will not run");
        }
    }
}
