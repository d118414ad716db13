use serde::{Deserialize, Serialize};

pub const STATE_HOME: &str = "home";
pub const STATE_NOT_HOME: &str = "not_home";

/// Mean Earth radius in metres
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Circular area around a centre point
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(default = "default_zone_name")]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius in metres
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_zone_name() -> String {
    STATE_HOME.to_string()
}

fn default_radius() -> f64 {
    100.0
}

impl Zone {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64, radius: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            radius,
        }
    }

    /// Whether a position, widened by its accuracy, falls inside the zone
    pub fn contains(&self, latitude: f64, longitude: f64, accuracy: f64) -> bool {
        distance(self.latitude, self.longitude, latitude, longitude) - accuracy.max(0.0)
            <= self.radius
    }
}

/// Great-circle (haversine) distance in metres
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}
