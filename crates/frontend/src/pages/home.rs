use std::rc::Rc;

use dioxus::prelude::*;
use placemap_core::{Dataset, MapConfig, PlaceOverlay, Scheduler};

use crate::components::globe::Globe;
use crate::components::legend::Legend;
use crate::components::OverlayHandle;
use crate::provider::MapboxProvider;
use crate::theme;

const PLACES: &str = include_str!("../../assets/places.yaml");

/// Map settings for this page: token baked in at build time, labels in the
/// browser's language.
fn map_config() -> MapConfig {
    let mut config = MapConfig::default()
        .with_access_token(option_env!("MAPBOX_TOKEN").unwrap_or_default());
    if let Some(locale) = web_sys::window().and_then(|w| w.navigator().language()) {
        config = config.with_locale(locale);
    }
    if config.access_token.is_empty() {
        tracing::warn!("MAPBOX_TOKEN was not set at build time");
    }
    config
}

fn build_overlay() -> Result<OverlayHandle, String> {
    let dataset = Dataset::from_yaml(PLACES).map_err(|e| e.to_string())?;
    tracing::info!(categories = dataset.categories().len(), "Loaded places");

    let scheduler = Scheduler::new();
    let overlay = Rc::new(PlaceOverlay::new(
        dataset,
        map_config(),
        MapboxProvider,
        &theme::system_theme(),
        scheduler.clone(),
    ));

    // Settle on a microtask, after the current event handler returns
    let weak = Rc::downgrade(&overlay);
    scheduler.set_waker(move || {
        let weak = weak.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Some(overlay) = weak.upgrade() {
                overlay.settle();
            }
        });
    });

    Ok(OverlayHandle(overlay))
}

#[component]
pub fn Home() -> Element {
    let overlay = use_hook(build_overlay);

    match overlay {
        Ok(overlay) => rsx! {
            div { class: "app",
                div { class: "header",
                    h1 { "Places" }
                }
                div { class: "content",
                    Legend { overlay: overlay.clone() }
                    Globe { overlay }
                }
            }
        },
        Err(err) => rsx! {
            div { class: "app app-error",
                h1 { "Places" }
                p { "The place list could not be loaded: {err}" }
            }
        },
    }
}
