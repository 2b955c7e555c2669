//! The owning scope that wires every component together.
//!
//! ```text
//! toggle ─► LegendStateStore ─► FilterPipeline (deferred) ─► MarkerController
//!                                                                  ▲
//! ThemeSignal ─► StyleSynchronizer ─► surface ◄─ MapLifecycleManager ┘
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::config::MapConfig;
use crate::filter::{FilterPipeline, VisibleSet};
use crate::legend::{LegendStateStore, LegendVisual};
use crate::lifecycle::{MapLifecycleManager, MapStatus};
use crate::markers::MarkerController;
use crate::models::{Dataset, PairKey};
use crate::reactive::{Scheduler, Subscription};
use crate::style::{StyleSynchronizer, ThemeSignal};
use crate::surface::{MapProvider, MapSurface};

pub struct PlaceOverlay<P: MapProvider> {
    dataset: Rc<Dataset>,
    scheduler: Scheduler,
    legend: LegendStateStore,
    pipeline: FilterPipeline,
    style: StyleSynchronizer,
    lifecycle: Rc<MapLifecycleManager<P>>,
    markers: MarkerController,
    subscriptions: RefCell<Vec<Subscription>>,
    disposed: Cell<bool>,
}

impl<P: MapProvider + 'static> PlaceOverlay<P> {
    /// Build and wire the engine. Nothing is rendered until [`mount`](Self::mount)
    /// succeeds and the scheduler is flushed.
    pub fn new(
        dataset: Dataset,
        config: MapConfig,
        provider: P,
        theme: &ThemeSignal,
        scheduler: Scheduler,
    ) -> Self {
        let dataset = Rc::new(dataset);
        let legend = LegendStateStore::new(dataset.ids().map(str::to_string).collect::<Vec<_>>());
        let pipeline = FilterPipeline::new(dataset.clone(), legend.clone(), scheduler.clone());
        let style = StyleSynchronizer::new(config.styles.clone(), theme.is_dark());
        let lifecycle = Rc::new(MapLifecycleManager::new(provider, config));
        let markers = MarkerController::new();

        let mut subscriptions = Vec::new();

        let p = pipeline.clone();
        subscriptions.push(legend.subscribe(move |_| p.invalidate()));

        let m = markers.clone();
        subscriptions.push(pipeline.subscribe(move |visible: &VisibleSet| {
            m.reconcile(visible);
        }));

        let s = style.clone();
        subscriptions.push(theme.subscribe(move |dark| s.set_dark(*dark)));

        let (weak_lifecycle, s, m, p) = (
            Rc::downgrade(&lifecycle),
            style.clone(),
            markers.clone(),
            pipeline.clone(),
        );
        subscriptions.push(lifecycle.subscribe(move |status| {
            if *status != MapStatus::Ready {
                return;
            }
            let Some(lifecycle) = weak_lifecycle.upgrade() else {
                return;
            };
            if let (Some(surface), Some(created_with)) =
                (lifecycle.instance(), lifecycle.created_style())
            {
                on_surface_ready(&s, &m, &p, surface, &created_with);
            }
        }));

        Self {
            dataset,
            scheduler,
            legend,
            pipeline,
            style,
            lifecycle,
            markers,
            subscriptions: RefCell::new(subscriptions),
            disposed: Cell::new(false),
        }
    }

    /// Create the map surface. Provider failures are logged and leave the
    /// overlay in the not-ready state; they never propagate.
    pub async fn mount(&self, target: P::Target) {
        if self.disposed.get() {
            return;
        }
        let initial_style = self.style.derived();
        if let Err(err) = self.lifecycle.mount(target, &initial_style).await {
            tracing::warn!(%err, "Map not ready");
        }
    }

    pub fn toggle(&self, category_id: &str, active: bool) {
        if self.disposed.get() {
            return;
        }
        self.legend.toggle(category_id, active);
    }

    pub fn is_active(&self, category_id: &str) -> bool {
        self.legend.is_active(category_id)
    }

    pub fn legend_visual(&self, category_id: &str) -> LegendVisual {
        self.legend.visual(category_id)
    }

    pub fn active_ids(&self) -> BTreeSet<String> {
        self.legend.active_ids()
    }

    /// Run pending recomputations until the next settle point.
    pub fn settle(&self) -> usize {
        self.scheduler.flush()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn visible(&self) -> VisibleSet {
        self.pipeline.visible()
    }

    pub fn status(&self) -> MapStatus {
        self.lifecycle.status()
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle.instance().is_some()
    }

    /// Keys of the rendered markers.
    pub fn rendered(&self) -> Vec<PairKey> {
        self.markers.keys()
    }

    pub fn markers(&self) -> &MarkerController {
        &self.markers
    }

    pub fn style(&self) -> &StyleSynchronizer {
        &self.style
    }

    pub fn pipeline(&self) -> &FilterPipeline {
        &self.pipeline
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Tear down in order: stop observing, destroy markers, remove the map.
    /// Safe to call more than once.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        for subscription in self.subscriptions.borrow_mut().drain(..) {
            subscription.unsubscribe();
        }
        self.legend.close();
        self.pipeline.close();
        self.scheduler.close();

        self.markers.detach();
        self.style.detach();

        self.lifecycle.dispose();
        tracing::info!("Place overlay disposed");
    }
}

fn on_surface_ready(
    style: &StyleSynchronizer,
    markers: &MarkerController,
    pipeline: &FilterPipeline,
    surface: Rc<dyn MapSurface>,
    created_with: &str,
) {
    style.attach(surface.clone(), created_with);
    markers.attach(surface);
    pipeline.invalidate();
}
