use std::collections::BTreeSet;

use dioxus::prelude::*;
use placemap_core::legend::LegendVisual;

use super::OverlayHandle;

/// Class applied to a legend entry for its visual state.
pub fn visual_class(visual: LegendVisual) -> &'static str {
    match visual {
        LegendVisual::Active => "legend-item",
        LegendVisual::Inactive => "legend-item opacity-30",
    }
}

/// Visual state of the entry for `id` given the current active set.
pub fn entry_visual(active: &BTreeSet<String>, id: &str) -> LegendVisual {
    if active.contains(id) {
        LegendVisual::Active
    } else {
        LegendVisual::Inactive
    }
}

#[component]
pub fn Legend(overlay: OverlayHandle) -> Element {
    // Mirrors the overlay's active set so entries re-render on toggle
    let mut active = use_signal(|| overlay.active_ids());

    let entries: Vec<(String, String, String, LegendVisual)> = {
        let active = active.read();
        overlay
            .dataset()
            .categories()
            .iter()
            .map(|c| {
                let visual = entry_visual(&active, &c.id);
                (c.id.clone(), c.label.clone(), c.color.clone(), visual)
            })
            .collect()
    };

    rsx! {
        ul { class: "legend", "aria-label": "Place categories",
            for (id, label, color, visual) in entries {
                li { key: "{id}",
                    LegendItem {
                        label: label,
                        color: color,
                        visual: visual,
                        on_toggle: {
                            let overlay = overlay.clone();
                            let id = id.clone();
                            move |_| {
                                let enable = !overlay.is_active(&id);
                                overlay.toggle(&id, enable);
                                active.set(overlay.active_ids());
                            }
                        },
                    }
                }
            }
        }
    }
}

#[component]
fn LegendItem(
    label: String,
    color: String,
    visual: LegendVisual,
    on_toggle: EventHandler<()>,
) -> Element {
    rsx! {
        button {
            class: visual_class(visual),
            "aria-pressed": visual == LegendVisual::Active,
            onclick: move |_| on_toggle.call(()),
            span { class: "legend-swatch", style: "background-color: {color};" }
            span { class: "legend-label", "{label}" }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_entries_are_dimmed() {
        assert_eq!(visual_class(LegendVisual::Active), "legend-item");
        assert!(visual_class(LegendVisual::Inactive).ends_with("opacity-30"));
    }

    #[test]
    fn test_entry_visual_follows_active_set() {
        let active: BTreeSet<String> = ["lived".to_string()].into_iter().collect();
        assert_eq!(entry_visual(&active, "lived"), LegendVisual::Active);
        assert_eq!(entry_visual(&active, "visited"), LegendVisual::Inactive);
        assert_eq!(entry_visual(&BTreeSet::new(), "lived"), LegendVisual::Inactive);
    }
}
