//! Bindings to the Mapbox GL JS globals (`mapboxgl`, `MapboxLanguage`) and
//! builders for the option objects they take.

use placemap_core::config::{FogConfig, PopupOptions};
use placemap_core::models::{LngLat, MarkerEmphasis};
use placemap_core::surface::{MapOptions, MarkerSpec};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = mapboxgl)]
    #[derive(Clone)]
    pub type Map;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, catch)]
    pub fn new(options: &JsValue) -> Result<Map, JsValue>;

    #[wasm_bindgen(method, js_name = setStyle)]
    pub fn set_style(this: &Map, style: &str);

    #[wasm_bindgen(method, js_name = setFog)]
    pub fn set_fog(this: &Map, fog: &JsValue);

    #[wasm_bindgen(method, js_name = addControl)]
    pub fn add_control(this: &Map, control: &JsValue);

    #[wasm_bindgen(method)]
    pub fn on(this: &Map, event: &str, listener: &js_sys::Function);

    #[wasm_bindgen(method)]
    pub fn once(this: &Map, event: &str, listener: &js_sys::Function);

    #[wasm_bindgen(method)]
    pub fn off(this: &Map, event: &str, listener: &js_sys::Function);

    #[wasm_bindgen(method)]
    pub fn remove(this: &Map);

    #[wasm_bindgen(js_namespace = mapboxgl)]
    pub type Marker;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl)]
    pub fn new(options: &JsValue) -> Marker;

    #[wasm_bindgen(method, js_name = setLngLat)]
    pub fn set_lng_lat(this: &Marker, position: &JsValue) -> Marker;

    #[wasm_bindgen(method, js_name = addTo)]
    pub fn add_to(this: &Marker, map: &Map) -> Marker;

    #[wasm_bindgen(method)]
    pub fn remove(this: &Marker);

    #[wasm_bindgen(js_namespace = mapboxgl)]
    pub type Popup;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl)]
    pub fn new(options: &JsValue) -> Popup;

    #[wasm_bindgen(method, js_name = setText)]
    pub fn set_text(this: &Popup, text: &str) -> Popup;

    #[wasm_bindgen(method, js_name = setLngLat)]
    pub fn set_lng_lat(this: &Popup, position: &JsValue) -> Popup;

    #[wasm_bindgen(method, js_name = addTo)]
    pub fn add_to(this: &Popup, map: &Map) -> Popup;

    #[wasm_bindgen(method)]
    pub fn remove(this: &Popup);

    #[wasm_bindgen(js_name = MapboxLanguage)]
    pub type LanguageControl;

    #[wasm_bindgen(constructor, js_class = "MapboxLanguage")]
    pub fn new(options: &JsValue) -> LanguageControl;
}

/// The `mapboxgl` global, if the library has been loaded.
pub fn namespace() -> Option<JsValue> {
    global("mapboxgl")
}

/// Whether the `mapbox-gl-language` plugin has been loaded.
pub fn has_language_plugin() -> bool {
    global("MapboxLanguage").is_some()
}

fn global(name: &str) -> Option<JsValue> {
    js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str(name))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

/// Turn a JSON value into the equivalent JS object.
pub fn to_js(value: &serde_json::Value) -> Result<JsValue, JsValue> {
    js_sys::JSON::parse(&value.to_string())
}

pub fn lng_lat(position: LngLat) -> JsValue {
    let array = js_sys::Array::new();
    array.push(&JsValue::from_f64(position.lng));
    array.push(&JsValue::from_f64(position.lat));
    array.into()
}

/// Describe a thrown JS value for logs and error messages.
pub fn describe(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            js_sys::Reflect::get(err, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{err:?}"))
}

/// What an `error` event from the map says about its origin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorDetails {
    pub message: String,
    pub source_id: Option<String>,
    pub has_tile: bool,
    pub url: Option<String>,
}

impl ErrorDetails {
    pub fn from_event(evt: &JsValue) -> Self {
        let field = |target: &JsValue, name: &str| {
            js_sys::Reflect::get(target, &JsValue::from_str(name))
                .ok()
                .filter(|v| !v.is_undefined() && !v.is_null())
        };
        let error = field(evt, "error");
        Self {
            message: error
                .as_ref()
                .map(describe)
                .unwrap_or_else(|| describe(evt)),
            source_id: field(evt, "sourceId").and_then(|v| v.as_string()),
            has_tile: field(evt, "tile").is_some(),
            url: error
                .as_ref()
                .and_then(|e| field(e, "url"))
                .and_then(|v| v.as_string()),
        }
    }

    /// Whether the map cannot start. Tiles, sources, sprites and glyphs
    /// fail individually and the map still loads without them.
    pub fn is_startup_failure(&self) -> bool {
        if self.source_id.is_some() || self.has_tile {
            return false;
        }
        match &self.url {
            Some(url) => !is_resource_url(url),
            None => true,
        }
    }
}

fn is_resource_url(url: &str) -> bool {
    let path = url.split('?').next().unwrap_or(url);
    ["/sprite", "/fonts/", "/tiles/"]
        .iter()
        .any(|part| path.contains(part))
        || [".pbf", ".png", ".webp"].iter().any(|ext| path.ends_with(ext))
}

// Option builders (pure, testable without a browser)

/// Constructor options for `mapboxgl.Map`, minus the `container` element.
pub fn map_options_json(options: &MapOptions) -> serde_json::Value {
    serde_json::json!({
        "style": options.style,
        "center": options.center.to_array(),
        "zoom": options.zoom,
        "projection": options.projection.as_str(),
        "dragRotate": options.drag_rotate,
        "touchPitch": options.touch_pitch,
        "attributionControl": options.attribution_control,
    })
}

pub fn popup_options_json(popup: &PopupOptions) -> serde_json::Value {
    serde_json::json!({
        "offset": popup.offset,
        "closeButton": popup.close_button,
        "closeOnMove": popup.close_on_move,
        "focusAfterOpen": popup.focus_after_open,
    })
}

pub fn fog_json(fog: &FogConfig) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(fog)
}

pub fn language_options_json(language: Option<&str>) -> serde_json::Value {
    match language {
        Some(language) => serde_json::json!({ "defaultLanguage": language }),
        None => serde_json::json!({}),
    }
}

/// CSS classes of a marker element: the category hook plus the pulse
/// treatment for the current place.
pub fn marker_class(spec: &MarkerSpec) -> String {
    let mut class = format!("mapbox-marker mapbox-marker--{}", spec.category_id);
    if spec.emphasis == MarkerEmphasis::Pulse {
        class.push_str(" animate-pulse");
    }
    class
}
