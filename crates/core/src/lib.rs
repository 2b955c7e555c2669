//! Reactive engine that keeps map markers in sync with a category legend,
//! the viewer's theme and the lifetime of the map surface.

pub mod config;
pub mod coords;
pub mod error;
pub mod filter;
pub mod legend;
pub mod lifecycle;
pub mod markers;
pub mod models;
pub mod overlay;
pub mod popup;
pub mod reactive;
pub mod style;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;

pub use config::MapConfig;
pub use error::{ConfigError, CoordError, DataShapeError, MapInitError, MarkerCreationError};
pub use models::{Category, Dataset, LngLat, MarkerEmphasis, PairKey, Place, RawCoords};
pub use overlay::PlaceOverlay;
pub use reactive::Scheduler;
pub use style::ThemeSignal;
