//! Seam between the engine and a concrete map provider.
//!
//! The engine never touches provider objects directly. A provider creates a
//! [`MapSurface`]; the surface renders markers and popups and reports user
//! interaction back through the listeners handed to it.

use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::config::{FogConfig, PopupOptions, Projection};
use crate::error::{MapInitError, SurfaceError};
use crate::models::{LngLat, MarkerEmphasis};

/// Surface-assigned identity of a rendered marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

/// Surface-assigned identity of a map click listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClickListenerId(pub u64);

/// Interaction on a marker element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerEvent {
    PointerEnter,
    PointerLeave,
    Focus,
    Blur,
    Click,
}

/// Whether a marker event may bubble up to the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Called by the surface for every interaction on one marker.
pub type MarkerListener = Rc<dyn Fn(MarkerEvent) -> Propagation>;

/// Called by the surface for clicks that reach the map itself.
pub type ClickListener = Rc<dyn Fn()>;

/// Everything needed to draw one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub category_id: String,
    pub color: String,
    /// Accessible name of the marker and text of its popup.
    pub label: String,
    pub position: LngLat,
    pub emphasis: MarkerEmphasis,
}

/// Options a provider needs to build a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub access_token: String,
    pub style: String,
    pub center: LngLat,
    pub zoom: f64,
    pub projection: Projection,
    pub drag_rotate: bool,
    pub touch_pitch: bool,
    pub attribution_control: bool,
    /// Label script hint, installed by the provider before the first style
    /// load. `None` keeps the provider default.
    pub language: Option<&'static str>,
    pub popup: PopupOptions,
}

/// A live map instance.
///
/// Implementations use interior mutability; the engine holds them behind `Rc`
/// on a single thread.
pub trait MapSurface {
    /// Replace the base style. Expensive, callers deduplicate.
    fn set_style(&self, url: &str);

    /// Apply fog now and again after every subsequent style load.
    fn set_fog(&self, fog: &FogConfig);

    /// Draw a marker and route its interactions to `listener`.
    fn add_marker(&self, spec: &MarkerSpec, listener: MarkerListener)
        -> Result<MarkerId, SurfaceError>;

    /// Remove the marker, its popup and every listener attached to it.
    fn remove_marker(&self, id: MarkerId);

    fn show_popup(&self, id: MarkerId, at: LngLat, text: &str);

    fn hide_popup(&self, id: MarkerId);

    /// Register a listener for clicks that were not stopped by a marker.
    fn on_click(&self, listener: ClickListener) -> ClickListenerId;

    fn off_click(&self, id: ClickListenerId);

    /// Destroy the instance and release its container.
    fn remove(&self);
}

/// Creates map surfaces. `create` resolves once the provider reports the
/// surface ready, or fails with a [`MapInitError`].
pub trait MapProvider {
    /// Whatever the provider mounts into (a DOM element in the browser).
    type Target;

    fn create(
        &self,
        target: Self::Target,
        options: &MapOptions,
    ) -> LocalBoxFuture<'static, Result<Rc<dyn MapSurface>, MapInitError>>;
}
