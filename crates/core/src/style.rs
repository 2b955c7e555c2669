use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::StyleUrls;
use crate::reactive::{Observable, Subscription};
use crate::surface::MapSurface;

struct ThemeInner {
    dark: Cell<bool>,
    observers: Observable<bool>,
}

/// The one source of truth for the viewer's dark/light preference.
///
/// The platform adapter writes it; the engine only reads and observes.
#[derive(Clone)]
pub struct ThemeSignal {
    inner: Rc<ThemeInner>,
}

impl ThemeSignal {
    pub fn new(dark: bool) -> Self {
        Self {
            inner: Rc::new(ThemeInner {
                dark: Cell::new(dark),
                observers: Observable::new(),
            }),
        }
    }

    pub fn is_dark(&self) -> bool {
        self.inner.dark.get()
    }

    /// Update the preference; observers hear about actual changes only.
    pub fn set(&self, dark: bool) {
        if self.inner.dark.replace(dark) != dark {
            self.inner.observers.notify(&dark);
        }
    }

    pub fn subscribe(&self, observer: impl Fn(&bool) + 'static) -> Subscription {
        self.inner.observers.subscribe(observer)
    }
}

struct StyleState {
    dark: bool,
    surface: Option<Rc<dyn MapSurface>>,
    applied: Option<String>,
    applications: usize,
}

/// Keeps the surface style in line with the theme without redundant reloads.
#[derive(Clone)]
pub struct StyleSynchronizer {
    urls: Rc<StyleUrls>,
    state: Rc<RefCell<StyleState>>,
}

impl StyleSynchronizer {
    pub fn new(urls: StyleUrls, dark: bool) -> Self {
        Self {
            urls: Rc::new(urls),
            state: Rc::new(RefCell::new(StyleState {
                dark,
                surface: None,
                applied: None,
                applications: 0,
            })),
        }
    }

    /// Style URL for the current theme.
    pub fn derived(&self) -> String {
        self.urls.for_theme(self.state.borrow().dark).to_string()
    }

    pub fn set_dark(&self, dark: bool) {
        self.state.borrow_mut().dark = dark;
        self.apply();
    }

    /// Start driving `surface`. `created_with` is the style it was built
    /// with, which counts as already applied.
    pub fn attach(&self, surface: Rc<dyn MapSurface>, created_with: &str) {
        {
            let mut state = self.state.borrow_mut();
            state.surface = Some(surface);
            state.applied = Some(created_with.to_string());
        }
        self.apply();
    }

    pub fn detach(&self) {
        let mut state = self.state.borrow_mut();
        state.surface = None;
        state.applied = None;
    }

    /// Push the derived style to the surface if it differs from the last
    /// one applied. Returns whether a style change was issued.
    pub fn apply(&self) -> bool {
        let target = self.derived();
        let surface = {
            let mut state = self.state.borrow_mut();
            let Some(surface) = state.surface.clone() else {
                return false;
            };
            if state.applied.as_deref() == Some(target.as_str()) {
                return false;
            }
            state.applied = Some(target.clone());
            state.applications += 1;
            surface
        };
        tracing::info!(style = %target, "Applying map style");
        surface.set_style(&target);
        true
    }

    pub fn applied(&self) -> Option<String> {
        self.state.borrow().applied.clone()
    }

    /// Number of style changes issued to surfaces so far.
    pub fn applications(&self) -> usize {
        self.state.borrow().applications
    }
}
