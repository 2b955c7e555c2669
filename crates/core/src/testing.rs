//! In-memory map provider used by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::config::FogConfig;
use crate::error::{MapInitError, SurfaceError};
use crate::models::LngLat;
use crate::surface::{
    ClickListener, ClickListenerId, MapOptions, MapProvider, MapSurface, MarkerEvent, MarkerId,
    MarkerListener, MarkerSpec, Propagation,
};

pub struct FakeMarker {
    pub spec: MarkerSpec,
    listener: MarkerListener,
}

#[derive(Default)]
pub struct FakeSurface {
    next_id: Cell<u64>,
    styles: RefCell<Vec<String>>,
    fog: RefCell<Option<FogConfig>>,
    markers: RefCell<BTreeMap<MarkerId, FakeMarker>>,
    popups: RefCell<BTreeMap<MarkerId, (LngLat, String)>>,
    clicks: RefCell<Vec<(ClickListenerId, ClickListener)>>,
    removed: Cell<bool>,
    /// Labels whose markers the surface refuses to draw.
    pub reject_labels: RefCell<Vec<String>>,
}

impl FakeSurface {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn next(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    pub fn style_calls(&self) -> Vec<String> {
        self.styles.borrow().clone()
    }

    pub fn fog(&self) -> Option<FogConfig> {
        self.fog.borrow().clone()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.borrow().len()
    }

    pub fn positions(&self) -> Vec<LngLat> {
        self.markers
            .borrow()
            .values()
            .map(|m| m.spec.position)
            .collect()
    }

    pub fn specs(&self) -> Vec<MarkerSpec> {
        self.markers
            .borrow()
            .values()
            .map(|m| m.spec.clone())
            .collect()
    }

    pub fn marker_id(&self, label: &str) -> Option<MarkerId> {
        self.markers
            .borrow()
            .iter()
            .find(|(_, m)| m.spec.label == label)
            .map(|(id, _)| *id)
    }

    pub fn popup_shown(&self, id: MarkerId) -> bool {
        self.popups.borrow().contains_key(&id)
    }

    pub fn shown_popups(&self) -> usize {
        self.popups.borrow().len()
    }

    pub fn click_listener_count(&self) -> usize {
        self.clicks.borrow().len()
    }

    pub fn is_removed(&self) -> bool {
        self.removed.get()
    }

    /// Deliver an event straight to a marker's listener.
    pub fn fire(&self, id: MarkerId, event: MarkerEvent) -> Propagation {
        let listener = self.markers.borrow().get(&id).map(|m| m.listener.clone());
        match listener {
            Some(listener) => listener(event),
            None => Propagation::Continue,
        }
    }

    /// A full click on a marker: the marker sees it first and the map only
    /// if propagation was not stopped.
    pub fn click_marker(&self, id: MarkerId) {
        if self.fire(id, MarkerEvent::Click) == Propagation::Continue {
            self.click_map();
        }
    }

    /// A click on empty map area.
    pub fn click_map(&self) {
        let listeners: Vec<ClickListener> =
            self.clicks.borrow().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener();
        }
    }
}

impl MapSurface for FakeSurface {
    fn set_style(&self, url: &str) {
        self.styles.borrow_mut().push(url.to_string());
    }

    fn set_fog(&self, fog: &FogConfig) {
        *self.fog.borrow_mut() = Some(fog.clone());
    }

    fn add_marker(
        &self,
        spec: &MarkerSpec,
        listener: MarkerListener,
    ) -> Result<MarkerId, SurfaceError> {
        if self.reject_labels.borrow().contains(&spec.label) {
            return Err(SurfaceError(format!("refused {}", spec.label)));
        }
        let id = MarkerId(self.next());
        self.markers.borrow_mut().insert(
            id,
            FakeMarker {
                spec: spec.clone(),
                listener,
            },
        );
        Ok(id)
    }

    fn remove_marker(&self, id: MarkerId) {
        self.popups.borrow_mut().remove(&id);
        self.markers.borrow_mut().remove(&id);
    }

    fn show_popup(&self, id: MarkerId, at: LngLat, text: &str) {
        self.popups
            .borrow_mut()
            .insert(id, (at, text.to_string()));
    }

    fn hide_popup(&self, id: MarkerId) {
        self.popups.borrow_mut().remove(&id);
    }

    fn on_click(&self, listener: ClickListener) -> ClickListenerId {
        let id = ClickListenerId(self.next());
        self.clicks.borrow_mut().push((id, listener));
        id
    }

    fn off_click(&self, id: ClickListenerId) {
        self.clicks.borrow_mut().retain(|(lid, _)| *lid != id);
    }

    fn remove(&self) {
        self.removed.set(true);
        self.markers.borrow_mut().clear();
        self.popups.borrow_mut().clear();
        self.clicks.borrow_mut().clear();
    }
}

/// Provider handing out [`FakeSurface`]s. Creation can be made to fail or to
/// wait for [`FakeProvider::gate`] to be released.
#[derive(Default)]
pub struct FakeProvider {
    pub fail: Option<MapInitError>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
    pub created: RefCell<Vec<Rc<FakeSurface>>>,
    pub options: RefCell<Vec<MapOptions>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(err: MapInitError) -> Self {
        Self {
            fail: Some(err),
            ..Self::default()
        }
    }

    /// Hold the next creation until the returned sender fires.
    pub fn gate(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.borrow_mut() = Some(rx);
        tx
    }

    pub fn surface(&self) -> Option<Rc<FakeSurface>> {
        self.created.borrow().last().cloned()
    }
}

impl MapProvider for FakeProvider {
    type Target = &'static str;

    fn create(
        &self,
        _target: Self::Target,
        options: &MapOptions,
    ) -> LocalBoxFuture<'static, Result<Rc<dyn MapSurface>, MapInitError>> {
        self.options.borrow_mut().push(options.clone());
        if let Some(err) = self.fail.clone() {
            return async move { Err(err) }.boxed_local();
        }
        let surface = FakeSurface::new();
        self.created.borrow_mut().push(surface.clone());
        let gate = self.gate.borrow_mut().take();
        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(surface as Rc<dyn MapSurface>)
        }
        .boxed_local()
    }
}
