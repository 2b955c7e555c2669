use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::reactive::{Observable, Subscription};

/// How a legend entry should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendVisual {
    Active,
    /// Drawn dimmed; its places are hidden from the map.
    Inactive,
}

struct LegendInner {
    active: RefCell<BTreeSet<String>>,
    observers: Observable<BTreeSet<String>>,
}

/// Set of currently enabled category ids.
#[derive(Clone)]
pub struct LegendStateStore {
    inner: Rc<LegendInner>,
}

impl LegendStateStore {
    /// Every id passed in starts out active.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Rc::new(LegendInner {
                active: RefCell::new(ids.into_iter().map(Into::into).collect()),
                observers: Observable::new(),
            }),
        }
    }

    /// Set membership of `id`. Observers are told synchronously when the
    /// membership actually changes. Returns whether it changed.
    pub fn toggle(&self, id: &str, active: bool) -> bool {
        let changed = {
            let mut set = self.inner.active.borrow_mut();
            if active {
                set.insert(id.to_string())
            } else {
                set.remove(id)
            }
        };
        if changed {
            tracing::debug!(category = id, active, "Legend toggled");
            let snapshot = self.inner.active.borrow().clone();
            self.inner.observers.notify(&snapshot);
        }
        changed
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.inner.active.borrow().contains(id)
    }

    pub fn visual(&self, id: &str) -> LegendVisual {
        if self.is_active(id) {
            LegendVisual::Active
        } else {
            LegendVisual::Inactive
        }
    }

    pub fn active_ids(&self) -> BTreeSet<String> {
        self.inner.active.borrow().clone()
    }

    pub fn subscribe(&self, observer: impl Fn(&BTreeSet<String>) + 'static) -> Subscription {
        self.inner.observers.subscribe(observer)
    }

    /// Stop delivering notifications to anyone, now and later.
    pub fn close(&self) {
        self.inner.observers.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_all_ids_start_active() {
        let legend = LegendStateStore::new(["a", "b"]);
        assert!(legend.is_active("a"));
        assert!(legend.is_active("b"));
        assert!(!legend.is_active("c"));
        assert_eq!(legend.visual("a"), LegendVisual::Active);
    }

    #[test]
    fn test_toggle_notifies_with_new_membership() {
        let legend = LegendStateStore::new(["a", "b"]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let _sub = legend.subscribe(move |set| s.borrow_mut().push(set.clone()));

        assert!(legend.toggle("a", false));
        assert_eq!(legend.visual("a"), LegendVisual::Inactive);
        let expected: BTreeSet<String> = ["b".to_string()].into();
        assert_eq!(*seen.borrow(), vec![expected]);
    }

    #[test]
    fn test_redundant_toggle_is_silent() {
        let legend = LegendStateStore::new(["a"]);
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let _sub = legend.subscribe(move |_| c.set(c.get() + 1));
        assert!(!legend.toggle("a", true));
        assert!(!legend.toggle("zzz", false));
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_unknown_id_insert_is_harmless() {
        let legend = LegendStateStore::new(["a"]);
        assert!(legend.toggle("ghost", true));
        assert!(legend.is_active("ghost"));
        assert!(legend.toggle("ghost", false));
        assert_eq!(legend.active_ids().len(), 1);
    }

    #[test]
    fn test_close_silences_observers() {
        let legend = LegendStateStore::new(["a"]);
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let _sub = legend.subscribe(move |_| c.set(c.get() + 1));
        legend.close();
        legend.toggle("a", false);
        assert_eq!(count.get(), 0);
        assert!(!legend.is_active("a"));
    }
}
