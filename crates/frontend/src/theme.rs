use std::cell::RefCell;

use placemap_core::ThemeSignal;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MediaQueryList, MediaQueryListEvent};

const DARK_QUERY: &str = "(prefers-color-scheme: dark)";

/// Media query plus the listener that forwards its changes.
struct SystemTheme {
    signal: ThemeSignal,
    _query: Option<MediaQueryList>,
    _listener: Option<Closure<dyn FnMut(MediaQueryListEvent)>>,
}

thread_local! {
    static SYSTEM_THEME: RefCell<Option<SystemTheme>> = const { RefCell::new(None) };
}

/// Theme signal that follows the OS color scheme preference.
///
/// Installed once per page; later calls share the same signal. Without
/// `matchMedia` the signal stays on light.
pub fn system_theme() -> ThemeSignal {
    SYSTEM_THEME.with(|cell| {
        let mut slot = cell.borrow_mut();
        if let Some(theme) = slot.as_ref() {
            return theme.signal.clone();
        }
        let theme = install();
        let signal = theme.signal.clone();
        *slot = Some(theme);
        signal
    })
}

fn install() -> SystemTheme {
    let query = web_sys::window().and_then(|w| w.match_media(DARK_QUERY).ok().flatten());
    let Some(query) = query else {
        tracing::warn!("matchMedia unavailable; using the light theme");
        return SystemTheme {
            signal: ThemeSignal::new(false),
            _query: None,
            _listener: None,
        };
    };

    let signal = ThemeSignal::new(query.matches());
    let forward = signal.clone();
    let listener = Closure::<dyn FnMut(MediaQueryListEvent)>::new(move |evt: MediaQueryListEvent| {
        tracing::debug!(dark = evt.matches(), "Color scheme changed");
        forward.set(evt.matches());
    });
    if let Err(err) =
        query.add_event_listener_with_callback("change", listener.as_ref().unchecked_ref())
    {
        tracing::warn!(?err, "Could not watch the color scheme");
    }

    SystemTheme {
        signal,
        _query: Some(query),
        _listener: Some(listener),
    }
}
