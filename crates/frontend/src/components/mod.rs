pub mod globe;
pub mod legend;

use std::ops::Deref;
use std::rc::Rc;

use placemap_core::PlaceOverlay;

use crate::provider::MapboxProvider;

pub type Overlay = PlaceOverlay<MapboxProvider>;

/// Shared handle to the page's overlay, usable as a component prop.
#[derive(Clone)]
pub struct OverlayHandle(pub Rc<Overlay>);

impl PartialEq for OverlayHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for OverlayHandle {
    type Target = Overlay;

    fn deref(&self) -> &Overlay {
        &self.0
    }
}
