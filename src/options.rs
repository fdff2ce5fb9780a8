use serde::Deserialize;

/// Options for GPX/TCX to GeoJSON conversion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Shape of each LineString position (default: extended)
    #[serde(default)]
    pub layout: CoordinateLayout,

    /// Include track stats / lap summary in properties (default: true)
    #[serde(default = "default_true")]
    pub include_properties: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            layout: CoordinateLayout::default(),
            include_properties: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateLayout {
    /// `[lon, lat, ele, time, cumulative_distance, velocity]` per position.
    /// Consumers must accept positions longer than three elements.
    #[default]
    Extended,
    /// Strict GeoJSON `[lon, lat, ele]` positions; times, distances and
    /// velocities go to `properties.coordinateProperties`.
    Standard,
}

fn default_true() -> bool {
    true
}
