//! Coordinate normalization.
//!
//! Places carry coordinates either as a longitude-first number pair or as a
//! latitude-first `"lat,lng"` string. Everything downstream works with the
//! canonical [`LngLat`].

use crate::error::CoordError;
use crate::models::{LngLat, RawCoords};

/// Separator used by the string encoding.
pub const COORD_DELIMITER: char = ',';

/// Convert a dataset coordinate into the canonical longitude-first form.
pub fn normalize(raw: &RawCoords) -> Result<LngLat, CoordError> {
    match raw {
        RawCoords::Pair(pair) => Ok(LngLat::from(*pair)),
        RawCoords::Text(text) => parse_lat_lng(text),
    }
}

/// Parse `"<lat>,<lng>"` and reverse it into a [`LngLat`].
pub fn parse_lat_lng(text: &str) -> Result<LngLat, CoordError> {
    let parts: Vec<&str> = text.split(COORD_DELIMITER).collect();
    if parts.len() != 2 {
        return Err(CoordError::WrongArity(parts.len()));
    }
    let lat = parse_component(parts[0])?;
    let lng = parse_component(parts[1])?;
    Ok(LngLat::new(lng, lat))
}

fn parse_component(part: &str) -> Result<f64, CoordError> {
    let trimmed = part.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CoordError::NotANumber(trimmed.to_string())),
    }
}
