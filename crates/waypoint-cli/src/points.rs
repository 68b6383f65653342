//! Coordinate input parsing.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use waypoint_core::Coordinate;

/// Accepts `{"lat": .., "lng": ..}` objects or `[lat, lng]` pairs.
#[derive(Deserialize)]
#[serde(untagged)]
enum PointInput {
    Object(Coordinate),
    Pair([f64; 2]),
}

/// Parse a `lat,lng` command line value.
pub fn parse_point(value: &str) -> Result<Coordinate> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| anyhow!("expected lat,lng but got '{}'", value))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .with_context(|| format!("invalid latitude in '{}'", value))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .with_context(|| format!("invalid longitude in '{}'", value))?;
    Ok(Coordinate::new(lat, lng)?)
}

/// Parse a JSON array of points.
pub fn parse_points_json(json: &str) -> Result<Vec<Coordinate>> {
    let inputs: Vec<PointInput> =
        serde_json::from_str(json).context("expected a JSON array of points")?;
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| match input {
            PointInput::Object(coordinate) => Ok(coordinate),
            PointInput::Pair([lat, lng]) => Coordinate::new(lat, lng)
                .with_context(|| format!("point {} is invalid", index)),
        })
        .collect()
}

pub fn load_points_file(path: &Path) -> Result<Vec<Coordinate>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_points_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lat_lng_argument() {
        let point = parse_point("40.7128, -74.0060").unwrap();
        assert_eq!(point.lat, 40.7128);
        assert_eq!(point.lng, -74.0060);
    }

    #[test]
    fn rejects_malformed_arguments() {
        assert!(parse_point("40.7128").is_err());
        assert!(parse_point("north,-74").is_err());
        assert!(parse_point("95,0").is_err());
    }

    #[test]
    fn json_accepts_objects_and_pairs() {
        let points = parse_points_json(r#"[{"lat": 1.0, "lng": 2.0}, [3.0, 4.0]]"#).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].lat, 3.0);
        assert_eq!(points[1].lng, 4.0);
    }

    #[test]
    fn json_rejects_out_of_range_pairs() {
        let err = parse_points_json("[[0.0, 0.0], [0.0, 200.0]]").unwrap_err();
        assert!(err.to_string().contains("point 1"));
    }
}
