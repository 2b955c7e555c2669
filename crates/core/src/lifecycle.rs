use std::cell::RefCell;
use std::rc::Rc;

use crate::config::MapConfig;
use crate::error::MapInitError;
use crate::reactive::{Observable, Subscription};
use crate::surface::{MapOptions, MapProvider, MapSurface};

/// Lowercase locale tag → provider label script.
const LABEL_LANGUAGES: &[(&str, &str)] = &[
    ("zh-cn", "zh-Hans"),
    ("zh-hk", "zh-Hant"),
    ("zh-tw", "zh-Hant"),
];

/// Label language hint for a locale. Unmapped locales keep the provider
/// default.
pub fn label_language(locale: &str) -> Option<&'static str> {
    let normalized = locale.trim().to_lowercase();
    LABEL_LANGUAGES
        .iter()
        .find(|(tag, _)| *tag == normalized)
        .map(|(_, language)| *language)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapStatus {
    Idle,
    Creating,
    Ready,
    /// Creation failed; a new `mount` may be attempted explicitly.
    Failed,
    /// Torn down for good.
    Disposed,
}

enum Slot {
    Idle,
    Creating,
    Ready {
        surface: Rc<dyn MapSurface>,
        style: String,
    },
    Failed(MapInitError),
    Disposed,
}

impl Slot {
    fn status(&self) -> MapStatus {
        match self {
            Slot::Idle => MapStatus::Idle,
            Slot::Creating => MapStatus::Creating,
            Slot::Ready { .. } => MapStatus::Ready,
            Slot::Failed(_) => MapStatus::Failed,
            Slot::Disposed => MapStatus::Disposed,
        }
    }
}

/// Owns the single map surface from creation to teardown.
pub struct MapLifecycleManager<P: MapProvider> {
    provider: P,
    config: MapConfig,
    slot: RefCell<Slot>,
    status: Observable<MapStatus>,
}

impl<P: MapProvider> MapLifecycleManager<P> {
    pub fn new(provider: P, config: MapConfig) -> Self {
        Self {
            provider,
            config,
            slot: RefCell::new(Slot::Idle),
            status: Observable::new(),
        }
    }

    pub fn options(&self, style: &str) -> MapOptions {
        MapOptions {
            access_token: self.config.access_token.clone(),
            style: style.to_string(),
            center: self.config.center(),
            zoom: self.config.zoom,
            projection: self.config.projection,
            drag_rotate: self.config.drag_rotate,
            touch_pitch: self.config.touch_pitch,
            attribution_control: self.config.attribution_control,
            language: self.config.locale.as_deref().and_then(label_language),
            popup: self.config.popup.clone(),
        }
    }

    /// Create the surface inside `target` with `style` as its initial style.
    ///
    /// Resolves once the provider reports readiness. If [`dispose`](Self::dispose)
    /// runs while creation is pending, the new surface is removed immediately
    /// and `Disposed` is returned.
    pub async fn mount(&self, target: P::Target, style: &str) -> Result<(), MapInitError> {
        {
            let mut slot = self.slot.borrow_mut();
            match &*slot {
                Slot::Idle | Slot::Failed(_) => *slot = Slot::Creating,
                Slot::Creating | Slot::Ready { .. } => return Err(MapInitError::AlreadyMounted),
                Slot::Disposed => return Err(MapInitError::Disposed),
            }
        }
        self.status.notify(&MapStatus::Creating);

        let options = self.options(style);
        tracing::info!(style, language = ?options.language, "Creating map surface");
        let result = self.provider.create(target, &options).await;

        if matches!(*self.slot.borrow(), Slot::Disposed) {
            if let Ok(surface) = result {
                surface.remove();
            }
            tracing::info!("Map surface finished creating after disposal; removed");
            return Err(MapInitError::Disposed);
        }

        match result {
            Ok(surface) => {
                surface.set_fog(&self.config.fog);
                *self.slot.borrow_mut() = Slot::Ready {
                    surface,
                    style: style.to_string(),
                };
                tracing::info!("Map surface ready");
                self.status.notify(&MapStatus::Ready);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "Map surface failed to initialize");
                *self.slot.borrow_mut() = Slot::Failed(err.clone());
                self.status.notify(&MapStatus::Failed);
                Err(err)
            }
        }
    }

    /// The live surface, or `None` while not ready.
    pub fn instance(&self) -> Option<Rc<dyn MapSurface>> {
        match &*self.slot.borrow() {
            Slot::Ready { surface, .. } => Some(surface.clone()),
            _ => None,
        }
    }

    /// Style the live surface was created with.
    pub fn created_style(&self) -> Option<String> {
        match &*self.slot.borrow() {
            Slot::Ready { style, .. } => Some(style.clone()),
            _ => None,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn status(&self) -> MapStatus {
        self.slot.borrow().status()
    }

    pub fn last_error(&self) -> Option<MapInitError> {
        match &*self.slot.borrow() {
            Slot::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    pub fn subscribe(&self, observer: impl Fn(&MapStatus) + 'static) -> Subscription {
        self.status.subscribe(observer)
    }

    /// Remove the surface, if any, and refuse any later mount.
    pub fn dispose(&self) {
        let previous = std::mem::replace(&mut *self.slot.borrow_mut(), Slot::Disposed);
        if let Slot::Ready { surface, .. } = previous {
            surface.remove();
            tracing::info!("Map surface removed");
        }
        self.status.notify(&MapStatus::Disposed);
        self.status.close();
    }
}
