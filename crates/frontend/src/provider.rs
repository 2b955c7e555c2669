//! [`MapProvider`] / [`MapSurface`] implementation backed by Mapbox GL JS.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use placemap_core::config::{FogConfig, PopupOptions};
use placemap_core::error::{MapInitError, SurfaceError};
use placemap_core::models::LngLat;
use placemap_core::surface::{
    ClickListener, ClickListenerId, MapOptions, MapProvider, MapSurface, MarkerEvent, MarkerId,
    MarkerListener, MarkerSpec, Propagation,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlElement;

use crate::mapbox;

/// DOM events routed to the marker listener.
const MARKER_EVENTS: [(&str, MarkerEvent); 5] = [
    ("mouseenter", MarkerEvent::PointerEnter),
    ("mouseleave", MarkerEvent::PointerLeave),
    ("focus", MarkerEvent::Focus),
    ("blur", MarkerEvent::Blur),
    ("click", MarkerEvent::Click),
];

type DomListener = Closure<dyn FnMut(web_sys::Event)>;

pub struct MapboxProvider;

impl MapProvider for MapboxProvider {
    type Target = HtmlElement;

    fn create(
        &self,
        target: HtmlElement,
        options: &MapOptions,
    ) -> LocalBoxFuture<'static, Result<Rc<dyn MapSurface>, MapInitError>> {
        let options = options.clone();
        async move {
            let surface = MapboxSurface::create(target, &options).await?;
            Ok(Rc::new(surface) as Rc<dyn MapSurface>)
        }
        .boxed_local()
    }
}

struct MarkerEntry {
    element: HtmlElement,
    marker: mapbox::Marker,
    popup: mapbox::Popup,
    listeners: Vec<(&'static str, DomListener)>,
}

impl MarkerEntry {
    fn detach(self) {
        for (name, listener) in &self.listeners {
            if let Err(err) = self
                .element
                .remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
            {
                tracing::debug!(event = *name, error = %mapbox::describe(&err), "Marker listener not removed");
            }
        }
        self.popup.remove();
        self.marker.remove();
    }
}

pub struct MapboxSurface {
    map: mapbox::Map,
    popup_options: PopupOptions,
    fog: Rc<RefCell<Option<JsValue>>>,
    style_load: RefCell<Option<Closure<dyn FnMut()>>>,
    next_id: Cell<u64>,
    markers: RefCell<HashMap<MarkerId, MarkerEntry>>,
    clicks: RefCell<HashMap<ClickListenerId, Closure<dyn FnMut(JsValue)>>>,
}

impl MapboxSurface {
    async fn create(target: HtmlElement, options: &MapOptions) -> Result<Self, MapInitError> {
        let namespace = mapbox::namespace()
            .ok_or_else(|| MapInitError::Provider("mapbox-gl is not loaded".to_string()))?;
        js_sys::Reflect::set(
            &namespace,
            &JsValue::from_str("accessToken"),
            &JsValue::from_str(&options.access_token),
        )
        .map_err(|e| MapInitError::Provider(mapbox::describe(&e)))?;

        let js_options = mapbox::to_js(&mapbox::map_options_json(options))
            .map_err(|e| MapInitError::Provider(mapbox::describe(&e)))?;
        js_sys::Reflect::set(&js_options, &JsValue::from_str("container"), &target)
            .map_err(|e| MapInitError::Provider(mapbox::describe(&e)))?;
        let map = mapbox::Map::new(&js_options)
            .map_err(|e| MapInitError::Provider(mapbox::describe(&e)))?;

        // The plugin rewrites labels on `style.load`, so it must be in place
        // before the first style finishes loading.
        install_language_control(&map, options.language);

        let mut on_error = None;
        let loaded = js_sys::Promise::new(&mut |resolve, reject| {
            map.once("load", &resolve);
            let closure = Closure::<dyn FnMut(JsValue)>::new(move |evt: JsValue| {
                let failure = mapbox::ErrorDetails::from_event(&evt);
                if !failure.is_startup_failure() {
                    tracing::debug!(message = %failure.message, "Ignoring resource error during startup");
                    return;
                }
                if let Err(err) = reject.call1(&JsValue::NULL, &JsValue::from_str(&failure.message)) {
                    tracing::debug!(error = %mapbox::describe(&err), "Startup failure not reported");
                }
            });
            map.on("error", closure.as_ref().unchecked_ref());
            on_error = Some(closure);
        });
        let result = JsFuture::from(loaded).await;
        if let Some(closure) = on_error.take() {
            map.off("error", closure.as_ref().unchecked_ref());
        }
        if let Err(err) = result {
            map.remove();
            return Err(MapInitError::StyleLoad(mapbox::describe(&err)));
        }

        let surface = Self {
            map,
            popup_options: options.popup.clone(),
            fog: Rc::new(RefCell::new(None)),
            style_load: RefCell::new(None),
            next_id: Cell::new(0),
            markers: RefCell::new(HashMap::new()),
            clicks: RefCell::new(HashMap::new()),
        };
        surface.watch_style_loads();
        Ok(surface)
    }

    /// Style changes wipe the fog; put it back after each one.
    fn watch_style_loads(&self) {
        let fog = self.fog.clone();
        let map = self.map.clone();
        let closure = Closure::<dyn FnMut()>::new(move || {
            if let Some(fog) = fog.borrow().as_ref() {
                map.set_fog(fog);
            }
        });
        self.map.on("style.load", closure.as_ref().unchecked_ref());
        *self.style_load.borrow_mut() = Some(closure);
    }

    fn next(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn marker_element(spec: &MarkerSpec) -> Result<HtmlElement, SurfaceError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| SurfaceError("no document".to_string()))?;
        let element: HtmlElement = document
            .create_element("div")
            .map_err(|e| SurfaceError(mapbox::describe(&e)))?
            .dyn_into()
            .map_err(|_| SurfaceError("marker element is not an HtmlElement".to_string()))?;
        element.set_class_name(&mapbox::marker_class(spec));
        element.set_tab_index(0);
        element
            .set_attribute("aria-label", &spec.label)
            .and_then(|_| {
                element.set_attribute("style", &format!("background-color: {}", spec.color))
            })
            .map_err(|e| SurfaceError(mapbox::describe(&e)))?;
        Ok(element)
    }
}

impl MapSurface for MapboxSurface {
    fn set_style(&self, url: &str) {
        self.map.set_style(url);
    }

    fn set_fog(&self, fog: &FogConfig) {
        let json = match mapbox::fog_json(fog) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(%err, "Fog settings not serializable; keeping current fog");
                return;
            }
        };
        match mapbox::to_js(&json) {
            Ok(value) => {
                self.map.set_fog(&value);
                *self.fog.borrow_mut() = Some(value);
            }
            Err(err) => tracing::warn!(error = %mapbox::describe(&err), "Invalid fog settings"),
        }
    }

    fn add_marker(
        &self,
        spec: &MarkerSpec,
        listener: MarkerListener,
    ) -> Result<MarkerId, SurfaceError> {
        let element = Self::marker_element(spec)?;

        let mut listeners = Vec::with_capacity(MARKER_EVENTS.len());
        for (name, event) in MARKER_EVENTS {
            let listener = listener.clone();
            let closure = DomListener::new(move |evt: web_sys::Event| {
                if listener(event) == Propagation::Stop {
                    evt.stop_propagation();
                }
            });
            element
                .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
                .map_err(|e| SurfaceError(mapbox::describe(&e)))?;
            listeners.push((name, closure));
        }

        let marker_options = js_sys::Object::new();
        js_sys::Reflect::set(&marker_options, &JsValue::from_str("element"), &element)
            .and_then(|_| {
                js_sys::Reflect::set(
                    &marker_options,
                    &JsValue::from_str("anchor"),
                    &JsValue::from_str("center"),
                )
            })
            .map_err(|e| SurfaceError(mapbox::describe(&e)))?;
        let marker = mapbox::Marker::new(&marker_options)
            .set_lng_lat(&mapbox::lng_lat(spec.position))
            .add_to(&self.map);

        let popup_options = mapbox::to_js(&mapbox::popup_options_json(&self.popup_options))
            .map_err(|e| SurfaceError(mapbox::describe(&e)))?;
        let popup = mapbox::Popup::new(&popup_options).set_text(&spec.label);

        let id = MarkerId(self.next());
        self.markers.borrow_mut().insert(
            id,
            MarkerEntry {
                element,
                marker,
                popup,
                listeners,
            },
        );
        Ok(id)
    }

    fn remove_marker(&self, id: MarkerId) {
        let entry = self.markers.borrow_mut().remove(&id);
        if let Some(entry) = entry {
            entry.detach();
        }
    }

    fn show_popup(&self, id: MarkerId, at: LngLat, _text: &str) {
        if let Some(entry) = self.markers.borrow().get(&id) {
            entry
                .popup
                .set_lng_lat(&mapbox::lng_lat(at))
                .add_to(&self.map);
        }
    }

    fn hide_popup(&self, id: MarkerId) {
        if let Some(entry) = self.markers.borrow().get(&id) {
            entry.popup.remove();
        }
    }

    fn on_click(&self, listener: ClickListener) -> ClickListenerId {
        let id = ClickListenerId(self.next());
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |_evt: JsValue| listener());
        self.map.on("click", closure.as_ref().unchecked_ref());
        self.clicks.borrow_mut().insert(id, closure);
        id
    }

    fn off_click(&self, id: ClickListenerId) {
        if let Some(closure) = self.clicks.borrow_mut().remove(&id) {
            self.map.off("click", closure.as_ref().unchecked_ref());
        }
    }

    fn remove(&self) {
        let entries: Vec<MarkerEntry> = self.markers.borrow_mut().drain().map(|(_, e)| e).collect();
        for entry in entries {
            entry.detach();
        }
        for (_, closure) in self.clicks.borrow_mut().drain() {
            self.map.off("click", closure.as_ref().unchecked_ref());
        }
        if let Some(closure) = self.style_load.borrow_mut().take() {
            self.map.off("style.load", closure.as_ref().unchecked_ref());
        }
        self.map.remove();
    }
}

fn install_language_control(map: &mapbox::Map, language: Option<&str>) {
    if !mapbox::has_language_plugin() {
        tracing::warn!("mapbox-gl-language is not loaded; keeping default labels");
        return;
    }
    match mapbox::to_js(&mapbox::language_options_json(language)) {
        Ok(options) => map.add_control(&mapbox::LanguageControl::new(&options)),
        Err(err) => tracing::warn!(error = %mapbox::describe(&err), "Language control skipped"),
    }
}
