//! CLI tool to compute the length of a route.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use waypoint_cli::{load_points_file, parse_point};
use waypoint_core::{round_km, route_distance_km, Coordinate};

/// Compute the great-circle length of a route in kilometers
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Route point as lat,lng (repeat in traversal order)
    #[arg(long = "point", value_parser = parse_point, allow_hyphen_values = true)]
    points: Vec<Coordinate>,

    /// JSON file with an array of {"lat", "lng"} objects or [lat, lng] pairs
    #[arg(long, conflicts_with = "points")]
    file: Option<PathBuf>,

    /// Print the full-precision distance instead of 2 decimals
    #[arg(long)]
    precise: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let points = match &args.file {
        Some(path) => load_points_file(path)?,
        None => args.points,
    };
    if points.is_empty() {
        bail!("no points given; use --point lat,lng or --file <path>");
    }

    let distance = route_distance_km(&points);
    if args.precise {
        println!("{} km", distance);
    } else {
        println!("{:.2} km", round_km(distance));
    }
    if points.len() < 2 {
        eprintln!("note: a route needs at least two points to have length");
    }
    Ok(())
}
