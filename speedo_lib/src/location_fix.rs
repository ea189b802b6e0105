use chrono::{DateTime, Utc};
use geo::{Distance, Geodesic, Haversine};
use geo_types::Point;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the distance between two consecutive fixes is measured.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceModel {
    /// WGS84 ellipsoid. Close to what phone location APIs report.
    #[default]
    Geodesic,
    /// Great circle on a sphere. Cheaper, off by up to ~0.5%.
    Haversine,
}

impl DistanceModel {
    /// Distance in meters.
    pub fn measure(&self, from: Point, to: Point) -> f64 {
        match self {
            DistanceModel::Geodesic => Geodesic.distance(from, to),
            DistanceModel::Haversine => Haversine.distance(from, to),
        }
    }
}

/// One position + speed sample reported by the location provider.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    /// x is longitude, y is latitude
    pub position: Point,
    /// Instantaneous speed in m/s, as reported by the provider
    pub speed: f32,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, speed: f32, timestamp: DateTime<Utc>) -> Self {
        Self {
            position: Point::new(longitude, latitude),
            // Providers report NaN or negative values when they have no estimate
            speed: if speed.is_finite() { speed.max(0.0) } else { 0.0 },
            timestamp,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.position.y()
    }

    pub fn longitude(&self) -> f64 {
        self.position.x()
    }

    /// Meters from `self` to `other`.
    pub fn distance_to(&self, other: &LocationFix, model: DistanceModel) -> f64 {
        model.measure(self.position, other.position)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(lat: f64, lon: f64) -> LocationFix {
        LocationFix::new(lat, lon, 0.0, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn coordinates_are_stored_lon_lat() {
        let fix = at(56.15, 10.2);
        assert_eq!(fix.latitude(), 56.15);
        assert_eq!(fix.longitude(), 10.2);
        assert_eq!(fix.position.x(), 10.2);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let a = at(0.0, 0.0);
        let b = at(1.0, 0.0);

        let geodesic = a.distance_to(&b, DistanceModel::Geodesic);
        let haversine = a.distance_to(&b, DistanceModel::Haversine);

        assert!((geodesic - 110_574.0).abs() < 5.0, "geodesic was {geodesic}");
        assert!((haversine - 111_195.0).abs() < 10.0, "haversine was {haversine}");
    }

    #[test]
    fn distance_is_symmetric_and_zero_for_same_point() {
        let a = at(56.1572, 10.2107);
        let b = at(56.1600, 10.2150);

        assert_eq!(a.distance_to(&a, DistanceModel::default()), 0.0);
        let ab = a.distance_to(&b, DistanceModel::default());
        let ba = b.distance_to(&a, DistanceModel::default());
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn bogus_speed_is_clamped() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(LocationFix::new(0.0, 0.0, -3.0, ts).speed, 0.0);
        assert_eq!(LocationFix::new(0.0, 0.0, f32::NAN, ts).speed, 0.0);
        assert_eq!(LocationFix::new(0.0, 0.0, 7.5, ts).speed, 7.5);
    }
}
