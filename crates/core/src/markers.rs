//! Marker reconciliation and popup wiring.
//!
//! The controller owns an arena of [`MarkerHandle`]s keyed by [`PairKey`].
//! After each settled pipeline output it diffs the arena against the visible
//! set, removes what disappeared and creates what appeared. Handles are only
//! ever released by explicitly removing them from the surface.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

use crate::coords;
use crate::error::MarkerCreationError;
use crate::filter::VisiblePlace;
use crate::models::{LngLat, MarkerEmphasis, PairKey};
use crate::popup::{PopupEvent, PopupState};
use crate::surface::{
    ClickListenerId, MapSurface, MarkerEvent, MarkerId, MarkerListener, MarkerSpec, Propagation,
};

/// One rendered marker and its popup.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerHandle {
    pub id: MarkerId,
    pub position: LngLat,
    pub label: String,
    pub emphasis: MarkerEmphasis,
    pub popup: PopupState,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub added: Vec<PairKey>,
    pub removed: Vec<PairKey>,
    pub failed: Vec<MarkerCreationError>,
}

#[derive(Default)]
struct ControllerState {
    surface: Option<Rc<dyn MapSurface>>,
    click_listener: Option<ClickListenerId>,
    handles: BTreeMap<PairKey, MarkerHandle>,
    passes: usize,
}

#[derive(Clone, Default)]
pub struct MarkerController {
    state: Rc<RefCell<ControllerState>>,
}

impl MarkerController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start rendering onto `surface` and listen for map clicks. Markers
    /// appear on the next reconciliation.
    pub fn attach(&self, surface: Rc<dyn MapSurface>) {
        self.detach();
        let weak = Rc::downgrade(&self.state);
        let listener_id = surface.on_click(Rc::new(move || {
            if let Some(state) = weak.upgrade() {
                MarkerController { state }.handle_map_click();
            }
        }));
        let mut state = self.state.borrow_mut();
        state.surface = Some(surface);
        state.click_listener = Some(listener_id);
    }

    /// Destroy every handle and stop listening to the surface.
    pub fn detach(&self) {
        let (surface, listener, handles) = {
            let mut state = self.state.borrow_mut();
            (
                state.surface.take(),
                state.click_listener.take(),
                std::mem::take(&mut state.handles),
            )
        };
        let Some(surface) = surface else {
            return;
        };
        for handle in handles.values() {
            destroy(surface.as_ref(), handle);
        }
        if let Some(listener) = listener {
            surface.off_click(listener);
        }
        tracing::debug!(destroyed = handles.len(), "Marker controller detached");
    }

    /// Bring the arena in line with `visible`. Without a surface nothing is
    /// rendered and an empty report is returned.
    pub fn reconcile(&self, visible: &[VisiblePlace]) -> ReconcileReport {
        let Some(surface) = self.state.borrow().surface.clone() else {
            return ReconcileReport::default();
        };
        let mut report = ReconcileReport::default();

        let target: BTreeSet<&PairKey> = visible.iter().map(|v| &v.key).collect();

        let stale: Vec<PairKey> = self
            .state
            .borrow()
            .handles
            .keys()
            .filter(|key| !target.contains(key))
            .cloned()
            .collect();
        for key in stale {
            let handle = self.state.borrow_mut().handles.remove(&key);
            if let Some(handle) = handle {
                destroy(surface.as_ref(), &handle);
                report.removed.push(key);
            }
        }

        for item in visible {
            if self.state.borrow().handles.contains_key(&item.key) {
                continue;
            }
            match self.construct(surface.as_ref(), item) {
                Ok(handle) => {
                    self.state
                        .borrow_mut()
                        .handles
                        .insert(item.key.clone(), handle);
                    report.added.push(item.key.clone());
                }
                Err(err) => {
                    tracing::warn!(%err, "Skipping marker");
                    report.failed.push(err);
                }
            }
        }

        let passes = {
            let mut state = self.state.borrow_mut();
            state.passes += 1;
            state.passes
        };
        tracing::debug!(
            pass = passes,
            added = report.added.len(),
            removed = report.removed.len(),
            failed = report.failed.len(),
            "Markers reconciled"
        );
        report
    }

    fn construct(
        &self,
        surface: &dyn MapSurface,
        item: &VisiblePlace,
    ) -> Result<MarkerHandle, MarkerCreationError> {
        let position = coords::normalize(&item.place.coords).map_err(|source| {
            MarkerCreationError::InvalidCoordinate {
                key: item.key.clone(),
                source,
            }
        })?;
        let spec = MarkerSpec {
            category_id: item.key.category.clone(),
            color: item.color.clone(),
            label: item.place.label.clone(),
            position,
            emphasis: MarkerEmphasis::for_place(&item.place),
        };
        let id = surface
            .add_marker(&spec, self.listener_for(item.key.clone()))
            .map_err(|err| MarkerCreationError::Surface {
                key: item.key.clone(),
                reason: err.to_string(),
            })?;
        Ok(MarkerHandle {
            id,
            position,
            label: spec.label,
            emphasis: spec.emphasis,
            popup: PopupState::Hidden,
        })
    }

    fn listener_for(&self, key: PairKey) -> MarkerListener {
        let weak: Weak<RefCell<ControllerState>> = Rc::downgrade(&self.state);
        Rc::new(move |event| match weak.upgrade() {
            Some(state) => MarkerController { state }.handle_marker_event(&key, event),
            None => Propagation::Continue,
        })
    }

    /// Feed an interaction on one marker into its popup state machine.
    /// A click stops propagation so the map-level handler does not undo it.
    pub fn handle_marker_event(&self, key: &PairKey, event: MarkerEvent) -> Propagation {
        let popup_event = match event {
            MarkerEvent::PointerEnter => PopupEvent::PointerEnter,
            MarkerEvent::PointerLeave => PopupEvent::PointerLeave,
            MarkerEvent::Focus => PopupEvent::Focus,
            MarkerEvent::Blur => PopupEvent::Blur,
            MarkerEvent::Click => PopupEvent::Click,
        };
        self.transition(key, popup_event);
        if event == MarkerEvent::Click {
            Propagation::Stop
        } else {
            Propagation::Continue
        }
    }

    /// Map-level click: hide whichever popups are shown.
    pub fn handle_map_click(&self) {
        let shown: Vec<PairKey> = self
            .state
            .borrow()
            .handles
            .iter()
            .filter(|(_, h)| h.popup.is_shown())
            .map(|(k, _)| k.clone())
            .collect();
        for key in shown {
            self.transition(&key, PopupEvent::MapClick);
        }
    }

    fn transition(&self, key: &PairKey, event: PopupEvent) {
        let change = {
            let mut state = self.state.borrow_mut();
            let surface = state.surface.clone();
            let Some(handle) = state.handles.get_mut(key) else {
                return;
            };
            let next = handle.popup.next(event);
            if next == handle.popup {
                return;
            }
            handle.popup = next;
            surface.map(|s| (s, handle.clone()))
        };
        let Some((surface, handle)) = change else {
            return;
        };
        match handle.popup {
            PopupState::Shown => surface.show_popup(handle.id, handle.position, &handle.label),
            PopupState::Hidden => surface.hide_popup(handle.id),
        }
    }

    pub fn handle(&self, key: &PairKey) -> Option<MarkerHandle> {
        self.state.borrow().handles.get(key).cloned()
    }

    pub fn popup_state(&self, key: &PairKey) -> Option<PopupState> {
        self.state.borrow().handles.get(key).map(|h| h.popup)
    }

    /// Keys of every live handle, in key order.
    pub fn keys(&self) -> Vec<PairKey> {
        self.state.borrow().handles.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_attached(&self) -> bool {
        self.state.borrow().surface.is_some()
    }

    /// Number of reconciliation passes run against a surface.
    pub fn reconcile_count(&self) -> usize {
        self.state.borrow().passes
    }
}

fn destroy(surface: &dyn MapSurface, handle: &MarkerHandle) {
    if handle.popup.is_shown() {
        surface.hide_popup(handle.id);
    }
    surface.remove_marker(handle.id);
}
