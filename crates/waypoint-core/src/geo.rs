//! Spatial math for route distance calculations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("coordinate component is not a finite number")]
    NotFinite,
}

/// A latitude/longitude pair in decimal degrees.
///
/// Deserialization validates ranges; use [`Coordinate::unchecked`] for
/// values that were already validated upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = GeoError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.lat, raw.lng)
    }
}

impl Coordinate {
    /// Create a coordinate, rejecting NaN, infinities and out-of-range degrees.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(GeoError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Create a coordinate without validation. NaN inputs propagate through
    /// distance calculations.
    pub const fn unchecked(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let dphi = (to.lat - from.lat).to_radians();
    let dlambda = (to.lng - from.lng).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1 for near-antipodal points. NaN stays NaN.
    let a = if a > 1.0 { 1.0 } else { a };
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Total length of a path in kilometers, summing each consecutive segment.
///
/// Returns 0 for paths with fewer than two points. The result is not rounded;
/// use [`round_km`] for display.
pub fn route_distance_km(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum()
}

/// Round a distance to two decimal places for display.
pub fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// An ordered list of points; insertion order is traversal order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route {
    points: Vec<Coordinate>,
}

impl Route {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    /// Build a route from `(lat, lng)` pairs, validating every point.
    pub fn try_from_pairs(pairs: &[(f64, f64)]) -> Result<Self, GeoError> {
        let points = pairs
            .iter()
            .map(|&(lat, lng)| Coordinate::new(lat, lng))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { points })
    }

    pub fn push(&mut self, point: Coordinate) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn distance_km(&self) -> f64 {
        route_distance_km(&self.points)
    }

    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn empty_and_single_point_routes_are_zero() {
        assert_eq!(route_distance_km(&[]), 0.0);
        assert_eq!(route_distance_km(&[pt(45.5, -73.5)]), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let dist = haversine_km(pt(0.0, 0.0), pt(1.0, 0.0));
        assert!((dist - 111.195).abs() < 0.01, "got {dist}");
    }

    #[test]
    fn montreal_short_hop_matches_known_value() {
        let dist = route_distance_km(&[pt(45.5017, -73.5673), pt(45.5025, -73.5680)]);
        assert!((dist - 0.097).abs() < 0.01, "got {dist}");
        assert_eq!(round_km(dist), 0.1);
    }

    #[test]
    fn reversed_route_has_same_length() {
        let points = vec![
            pt(33.6846, -117.8265),
            pt(33.6900, -117.8200),
            pt(33.7000, -117.8300),
            pt(33.7000, -117.8300),
            pt(33.7100, -117.8100),
        ];
        let forward = route_distance_km(&points);
        let mut reversed = points.clone();
        reversed.reverse();
        let backward = route_distance_km(&reversed);
        assert!((forward - backward).abs() < 1e-9);
    }

    #[test]
    fn there_and_back_doubles() {
        let a = pt(51.5074, -0.1278);
        let b = pt(48.8566, 2.3522);
        let one_way = route_distance_km(&[a, b]);
        let round_trip = route_distance_km(&[a, b, a]);
        assert!((round_trip - 2.0 * one_way).abs() < 1e-9);
    }

    #[test]
    fn consecutive_duplicates_add_nothing() {
        let a = pt(10.0, 10.0);
        let b = pt(10.1, 10.1);
        assert!((route_distance_km(&[a, a, b, b]) - route_distance_km(&[a, b])).abs() < 1e-12);
    }

    #[test]
    fn antipodal_points_are_half_the_circumference() {
        let half = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!((haversine_km(pt(0.0, 0.0), pt(0.0, 180.0)) - half).abs() < 1e-6);
        assert!((haversine_km(pt(90.0, 0.0), pt(-90.0, 0.0)) - half).abs() < 1e-6);

        // Mirrored pairs sweep the whole valid range.
        for i in 0..2000 {
            let lat = -90.0 + 180.0 * (i as f64) / 1999.0;
            let lng = (0.1803 * i as f64) % 360.0 - 180.0;
            let from = pt(lat, lng);
            let to = pt(-lat, if lng < 0.0 { lng + 180.0 } else { lng - 180.0 });
            let dist = haversine_km(from, to);
            assert!(dist.is_finite(), "{from:?} -> {to:?} gave {dist}");
            assert!(dist >= 0.0 && dist <= half + 1e-6, "{from:?} -> {to:?} gave {dist}");
        }

        let dist = haversine_km(pt(-87.843, -177.9717), pt(87.843, 2.0283));
        assert!((dist - half).abs() < 1e-3, "got {dist}");
    }

    #[test]
    fn unchecked_nan_propagates() {
        let dist = route_distance_km(&[Coordinate::unchecked(f64::NAN, 0.0), pt(1.0, 1.0)]);
        assert!(dist.is_nan());
    }

    #[test]
    fn validation_rejects_out_of_range_and_nan() {
        assert_eq!(
            Coordinate::new(91.0, 0.0),
            Err(GeoError::LatitudeOutOfRange(91.0))
        );
        assert_eq!(
            Coordinate::new(0.0, -180.5),
            Err(GeoError::LongitudeOutOfRange(-180.5))
        );
        assert_eq!(Coordinate::new(f64::NAN, 0.0), Err(GeoError::NotFinite));
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Coordinate = serde_json::from_str(r#"{"lat": 45.0, "lng": -73.0}"#).unwrap();
        assert_eq!(ok, pt(45.0, -73.0));
        assert!(serde_json::from_str::<Coordinate>(r#"{"lat": 123.4, "lng": 0.0}"#).is_err());

        let route: Route =
            serde_json::from_str(r#"[{"lat": 0.0, "lng": 0.0}, {"lat": 1.0, "lng": 0.0}]"#)
                .unwrap();
        assert_eq!(route.len(), 2);
        assert!((route.distance_km() - 111.195).abs() < 0.01);
    }

    #[test]
    fn try_from_pairs_stops_on_first_bad_point() {
        let err = Route::try_from_pairs(&[(0.0, 0.0), (0.0, 200.0)]).unwrap_err();
        assert_eq!(err, GeoError::LongitudeOutOfRange(200.0));
    }
}
