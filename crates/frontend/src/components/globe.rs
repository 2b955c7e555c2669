use dioxus::prelude::*;
use placemap_core::lifecycle::MapStatus;
use wasm_bindgen::JsCast;

use super::OverlayHandle;

pub const MAP_CONTAINER_ID: &str = "place-globe-container";

/// Look up the element the map renders into.
fn container() -> Option<web_sys::HtmlElement> {
    let document = web_sys::window()?.document()?;
    document
        .get_element_by_id(MAP_CONTAINER_ID)?
        .dyn_into::<web_sys::HtmlElement>()
        .ok()
}

/// Text shown over the container while the map is not usable.
pub fn status_message(status: MapStatus) -> Option<&'static str> {
    match status {
        MapStatus::Idle | MapStatus::Creating => Some("Loading map…"),
        MapStatus::Failed => Some("The map could not be loaded."),
        MapStatus::Ready | MapStatus::Disposed => None,
    }
}

#[component]
pub fn Globe(overlay: OverlayHandle) -> Element {
    let mut status = use_signal(|| overlay.status());

    // Mount once the container is in the DOM
    {
        let overlay = overlay.clone();
        use_effect(move || {
            let Some(target) = container() else {
                tracing::warn!(id = MAP_CONTAINER_ID, "Map container missing");
                status.set(MapStatus::Failed);
                return;
            };
            status.set(MapStatus::Creating);
            let overlay = overlay.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let mut status = status;
                overlay.mount(target).await;
                // The component may be gone by now
                if let Ok(mut current) = status.try_write() {
                    *current = overlay.status();
                };
            });
        });
    }

    {
        let overlay = overlay.clone();
        use_drop(move || overlay.dispose());
    }

    let message = status_message(*status.read());

    rsx! {
        div { class: "globe",
            div { id: MAP_CONTAINER_ID, class: "globe-canvas" }
            if let Some(message) = message {
                div { class: "globe-status", role: "status", "{message}" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        assert!(status_message(MapStatus::Creating).is_some());
        assert!(status_message(MapStatus::Failed).is_some());
        assert_eq!(status_message(MapStatus::Ready), None);
    }
}
