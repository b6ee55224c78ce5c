use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use nalgebra::Vector2;

/// Planar robot pose recorded alongside an image sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2 {
    pub timestamp: f64,
    pub position: Vector2<f64>,
    pub theta: f64,
}

/// Load a pose file: one `timestamp, x, y, theta` record per line.
///
/// Empty lines and lines that do not hold four numbers are skipped.
pub fn load_poses<P: AsRef<Path>>(path: P) -> Result<Vec<Pose2>> {
    let path = path.as_ref();
    let rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open pose file {}", path.display()))?;
    read_poses(rdr)
}

fn read_poses<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<Vec<Pose2>> {
    let mut poses = Vec::new();
    let mut skipped = 0usize;

    for rec in rdr.byte_records() {
        let rec = rec?;
        match parse_record(&rec) {
            Some(pose) => poses.push(pose),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} malformed pose lines", skipped);
    }
    Ok(poses)
}

fn parse_record(rec: &csv::ByteRecord) -> Option<Pose2> {
    if rec.len() < 4 {
        return None;
    }
    let field = |i: usize| -> Option<f64> { std::str::from_utf8(&rec[i]).ok()?.parse().ok() };
    let ts = field(0)?;
    let x = field(1)?;
    let y = field(2)?;
    let theta = field(3)?;
    Some(Pose2 {
        timestamp: ts,
        position: Vector2::new(x, y),
        theta,
    })
}
