/// Visibility of one marker's popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopupState {
    #[default]
    Hidden,
    Shown,
}

/// Inputs of the popup state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupEvent {
    PointerEnter,
    PointerLeave,
    Focus,
    Blur,
    /// Click on the marker itself.
    Click,
    /// Click that reached the map surface.
    MapClick,
}

impl PopupState {
    pub fn next(self, event: PopupEvent) -> PopupState {
        match (self, event) {
            (_, PopupEvent::Click) => PopupState::Shown,
            (PopupState::Hidden, PopupEvent::PointerEnter | PopupEvent::Focus) => PopupState::Shown,
            (
                PopupState::Shown,
                PopupEvent::PointerLeave | PopupEvent::Blur | PopupEvent::MapClick,
            ) => PopupState::Hidden,
            (state, _) => state,
        }
    }

    pub fn is_shown(self) -> bool {
        self == PopupState::Shown
    }
}

/// Replay a sequence of events from `Hidden`.
pub fn run(events: &[PopupEvent]) -> PopupState {
    events
        .iter()
        .fold(PopupState::default(), |state, &event| state.next(event))
}

#[cfg(test)]
mod tests {
    use super::PopupEvent::*;
    use super::*;

    #[test]
    fn test_starts_hidden() {
        assert_eq!(run(&[]), PopupState::Hidden);
    }

    #[test]
    fn test_hover_and_focus_show_then_hide() {
        assert_eq!(run(&[PointerEnter]), PopupState::Shown);
        assert_eq!(run(&[PointerEnter, PointerLeave]), PopupState::Hidden);
        assert_eq!(run(&[Focus]), PopupState::Shown);
        assert_eq!(run(&[Focus, Blur]), PopupState::Hidden);
    }

    #[test]
    fn test_enter_leave_click_mapclick_ends_hidden() {
        assert_eq!(
            run(&[PointerEnter, PointerLeave, Click, MapClick]),
            PopupState::Hidden
        );
    }

    #[test]
    fn test_click_shows_from_any_state() {
        assert_eq!(PopupState::Hidden.next(Click), PopupState::Shown);
        assert_eq!(PopupState::Shown.next(Click), PopupState::Shown);
    }

    #[test]
    fn test_irrelevant_events_keep_state() {
        assert_eq!(PopupState::Hidden.next(PointerLeave), PopupState::Hidden);
        assert_eq!(PopupState::Hidden.next(MapClick), PopupState::Hidden);
        assert_eq!(PopupState::Shown.next(PointerEnter), PopupState::Shown);
        assert_eq!(PopupState::Shown.next(Focus), PopupState::Shown);
    }
}
