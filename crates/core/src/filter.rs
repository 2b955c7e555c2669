use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::legend::LegendStateStore;
use crate::models::{Dataset, PairKey, Place};
use crate::reactive::{Observable, Scheduler, Subscription};

/// One (category, place) pair eligible for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct VisiblePlace {
    pub key: PairKey,
    pub color: String,
    pub place: Place,
}

/// Settled output of the pipeline, shared with every observer.
pub type VisibleSet = Rc<[VisiblePlace]>;

struct PipelineInner {
    dataset: Rc<Dataset>,
    legend: LegendStateStore,
    scheduler: Scheduler,
    dirty: Cell<bool>,
    output: RefCell<VisibleSet>,
    observers: Observable<VisibleSet>,
    recomputes: Cell<usize>,
}

/// Derives the visible places from the dataset and the legend.
///
/// Invalidation only sets a dirty flag and schedules one recomputation;
/// any number of invalidations before the next flush collapse into it.
#[derive(Clone)]
pub struct FilterPipeline {
    inner: Rc<PipelineInner>,
}

impl FilterPipeline {
    pub fn new(dataset: Rc<Dataset>, legend: LegendStateStore, scheduler: Scheduler) -> Self {
        let output = compute_visible(&dataset, &legend);
        Self {
            inner: Rc::new(PipelineInner {
                dataset,
                legend,
                scheduler,
                dirty: Cell::new(false),
                output: RefCell::new(output),
                observers: Observable::new(),
                recomputes: Cell::new(0),
            }),
        }
    }

    /// Mark the output stale and schedule a recomputation if none is pending.
    pub fn invalidate(&self) {
        if self.inner.dirty.replace(true) {
            return;
        }
        let weak: Weak<PipelineInner> = Rc::downgrade(&self.inner);
        self.inner.scheduler.schedule(move || {
            if let Some(inner) = weak.upgrade() {
                FilterPipeline { inner }.recompute();
            }
        });
    }

    fn recompute(&self) {
        if !self.inner.dirty.replace(false) {
            return;
        }
        let output = compute_visible(&self.inner.dataset, &self.inner.legend);
        let count = self.inner.recomputes.get() + 1;
        self.inner.recomputes.set(count);
        tracing::debug!(recompute = count, visible = output.len(), "Visible places recomputed");
        *self.inner.output.borrow_mut() = output.clone();
        self.inner.observers.notify(&output);
    }

    /// Latest settled output.
    pub fn visible(&self) -> VisibleSet {
        self.inner.output.borrow().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    pub fn recompute_count(&self) -> usize {
        self.inner.recomputes.get()
    }

    /// Observers only ever see settled output.
    pub fn subscribe(&self, observer: impl Fn(&VisibleSet) + 'static) -> Subscription {
        self.inner.observers.subscribe(observer)
    }

    pub fn close(&self) {
        self.inner.observers.close();
        self.inner.dirty.set(false);
    }
}

/// Ordered concatenation of every active category's places.
pub fn compute_visible(dataset: &Dataset, legend: &LegendStateStore) -> VisibleSet {
    dataset
        .categories()
        .iter()
        .filter(|category| legend.is_active(&category.id))
        .flat_map(|category| {
            category
                .places
                .iter()
                .enumerate()
                .map(move |(index, place)| VisiblePlace {
                    key: PairKey::new(category.id.clone(), index),
                    color: category.color.clone(),
                    place: place.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, RawCoords};

    fn dataset() -> Rc<Dataset> {
        let cat = |id: &str, n: usize| Category {
            id: id.to_string(),
            label: id.to_uppercase(),
            color: "#abc".to_string(),
            places: (0..n)
                .map(|i| Place {
                    label: format!("{id}{i}"),
                    coords: RawCoords::Pair([i as f64, 0.0]),
                    current: false,
                })
                .collect(),
        };
        Rc::new(Dataset::new(vec![cat("a", 2), cat("b", 1), cat("c", 3)]).unwrap())
    }

    fn labels(set: &VisibleSet) -> Vec<String> {
        set.iter().map(|v| v.place.label.clone()).collect()
    }

    fn wired() -> (FilterPipeline, LegendStateStore, Scheduler, Subscription) {
        let data = dataset();
        let legend = LegendStateStore::new(data.ids().map(str::to_string).collect::<Vec<_>>());
        let scheduler = Scheduler::new();
        let pipeline = FilterPipeline::new(data, legend.clone(), scheduler.clone());
        let p = pipeline.clone();
        let sub = legend.subscribe(move |_| p.invalidate());
        (pipeline, legend, scheduler, sub)
    }

    #[test]
    fn test_initial_output_is_everything_in_order() {
        let (pipeline, _, _, _sub) = wired();
        assert_eq!(
            labels(&pipeline.visible()),
            vec!["a0", "a1", "b0", "c0", "c1", "c2"]
        );
    }

    #[test]
    fn test_toggle_is_deferred_until_flush() {
        let (pipeline, legend, scheduler, _sub) = wired();
        legend.toggle("a", false);
        assert!(pipeline.is_dirty());
        assert_eq!(pipeline.visible().len(), 6);
        scheduler.flush();
        assert_eq!(labels(&pipeline.visible()), vec!["b0", "c0", "c1", "c2"]);
    }

    #[test]
    fn test_toggles_in_one_tick_coalesce() {
        let (pipeline, legend, scheduler, _sub) = wired();
        let outputs = Rc::new(RefCell::new(Vec::new()));
        let o = outputs.clone();
        let _out = pipeline.subscribe(move |set| o.borrow_mut().push(labels(set)));

        legend.toggle("a", false);
        legend.toggle("b", false);
        legend.toggle("a", true);
        legend.toggle("c", false);
        assert_eq!(scheduler.flush(), 1);

        assert_eq!(pipeline.recompute_count(), 1);
        assert_eq!(*outputs.borrow(), vec![vec!["a0", "a1"]]);
    }

    #[test]
    fn test_order_follows_dataset_not_toggle_order() {
        let (pipeline, legend, scheduler, _sub) = wired();
        legend.toggle("a", false);
        legend.toggle("c", false);
        scheduler.flush();
        legend.toggle("c", true);
        legend.toggle("a", true);
        scheduler.flush();
        assert_eq!(
            labels(&pipeline.visible()),
            vec!["a0", "a1", "b0", "c0", "c1", "c2"]
        );
        assert_eq!(pipeline.recompute_count(), 2);
    }

    #[test]
    fn test_keys_carry_place_index() {
        let (pipeline, _, _, _sub) = wired();
        let keys: Vec<PairKey> = pipeline.visible().iter().map(|v| v.key.clone()).collect();
        assert_eq!(keys[1], PairKey::new("a", 1));
        assert_eq!(keys[2], PairKey::new("b", 0));
    }

    #[test]
    fn test_closed_pipeline_stays_silent() {
        let (pipeline, legend, scheduler, _sub) = wired();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let _out = pipeline.subscribe(move |_| c.set(c.get() + 1));
        pipeline.close();
        legend.toggle("a", false);
        scheduler.flush();
        assert_eq!(count.get(), 0);
    }
}
