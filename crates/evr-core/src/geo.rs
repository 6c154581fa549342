//! Geographic coordinate type and great-circle distance.

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Mean Earth radius in kilometres.
    pub const EARTH_RADIUS_KM: f64 = 6_371.0;

    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance in kilometres.
    pub fn distance_km(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        Self::EARTH_RADIUS_KM * c
    }

    /// Half-widths in degrees `(lat, lon)` of a box that contains every point
    /// within `radius_km` of `self`.  Used to pre-filter spatial queries
    /// before the exact haversine check.
    pub fn degree_box(self, radius_km: f64) -> (f64, f64) {
        let km_per_deg = Self::EARTH_RADIUS_KM.to_radians();
        let half_lat = radius_km / km_per_deg;
        let cos_lat = self.lat.to_radians().cos().abs().max(1e-6);
        let half_lon = (radius_km / (km_per_deg * cos_lat)).min(180.0);
        (half_lat, half_lon)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}
