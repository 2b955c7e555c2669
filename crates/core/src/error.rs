//! Error types for the overlay engine.
//!
//! Each failure mode has its own enum so the propagation policy can differ
//! per kind: dataset errors fail fast before the engine exists, provider
//! errors collapse into the "not ready" map status, and marker errors are
//! isolated to the single place that caused them.

use crate::models::PairKey;

/// The input dataset does not match the expected shape.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataShapeError {
    /// Two categories share the same id.
    #[error("duplicate category id: {0}")]
    DuplicateCategory(String),

    /// A required string field is present but empty.
    #[error("category #{index}: field `{field}` must not be empty")]
    EmptyField { index: usize, field: &'static str },

    /// The document could not be deserialized at all.
    #[error("failed to parse dataset: {0}")]
    Parse(String),
}

impl From<serde_yml::Error> for DataShapeError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Parse(source.to_string())
    }
}

impl From<serde_json::Error> for DataShapeError {
    fn from(source: serde_json::Error) -> Self {
        Self::Parse(source.to_string())
    }
}

/// The map provider could not produce a usable surface.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MapInitError {
    /// The provider rejected initialization (bad token, missing library, ...).
    #[error("map provider failed to initialize: {0}")]
    Provider(String),

    /// The initial style never finished loading.
    #[error("map style failed to load: {0}")]
    StyleLoad(String),

    /// A surface already exists or is being created.
    #[error("map surface is already mounted")]
    AlreadyMounted,

    /// The owning scope was torn down; the manager cannot be reused.
    #[error("map lifecycle has been disposed")]
    Disposed,
}

/// A coordinate encoding could not be turned into a position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordError {
    /// The delimited form did not contain exactly two components.
    #[error("expected 2 comma-separated components, found {0}")]
    WrongArity(usize),

    /// A component is not a finite number.
    #[error("`{0}` is not a finite number")]
    NotANumber(String),
}

/// A single marker could not be rendered. Never aborts a reconciliation pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkerCreationError {
    #[error("place {key} has an invalid coordinate: {source}")]
    InvalidCoordinate {
        key: PairKey,
        #[source]
        source: CoordError,
    },

    #[error("map surface rejected marker for place {key}: {reason}")]
    Surface { key: PairKey, reason: String },
}

impl MarkerCreationError {
    pub fn key(&self) -> &PairKey {
        match self {
            Self::InvalidCoordinate { key, .. } | Self::Surface { key, .. } => key,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {source}")]
    Yaml { source: serde_yml::Error },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Error reported by a [`MapSurface`](crate::surface::MapSurface) implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct SurfaceError(pub String);
