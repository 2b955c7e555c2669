//! Single-threaded reactive plumbing: a deferred job queue and explicit
//! observer registration.
//!
//! Nothing here runs implicitly. Mutations call [`Scheduler::schedule`]
//! and whoever drives the scheduler (a microtask in the browser, the test
//! body natively) calls [`Scheduler::flush`] to reach the next settle point.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

type Job = Box<dyn FnOnce()>;

struct SchedulerInner {
    queue: RefCell<VecDeque<Job>>,
    waker: RefCell<Option<Rc<dyn Fn()>>>,
    flushing: Cell<bool>,
    closed: Cell<bool>,
}

/// Deferred job queue shared by every component of one overlay.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                queue: RefCell::new(VecDeque::new()),
                waker: RefCell::new(None),
                flushing: Cell::new(false),
                closed: Cell::new(false),
            }),
        }
    }

    /// Install the hook called whenever the queue goes from idle to pending.
    /// The hook must arrange for [`flush`](Self::flush) to run later, never inline.
    pub fn set_waker(&self, waker: impl Fn() + 'static) {
        *self.inner.waker.borrow_mut() = Some(Rc::new(waker));
    }

    pub fn schedule(&self, job: impl FnOnce() + 'static) {
        if self.inner.closed.get() {
            return;
        }
        let was_idle = {
            let mut queue = self.inner.queue.borrow_mut();
            let was_idle = queue.is_empty();
            queue.push_back(Box::new(job));
            was_idle
        };
        if was_idle && !self.inner.flushing.get() {
            let waker = self.inner.waker.borrow().clone();
            if let Some(waker) = waker {
                waker();
            }
        }
    }

    /// Run queued jobs until none remain. Jobs scheduled by other jobs run
    /// in the same flush. Returns how many jobs ran.
    pub fn flush(&self) -> usize {
        if self.inner.flushing.replace(true) {
            return 0;
        }
        let mut ran = 0;
        loop {
            let job = self.inner.queue.borrow_mut().pop_front();
            match job {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => break,
            }
        }
        self.inner.flushing.set(false);
        ran
    }

    pub fn is_idle(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    /// Drop pending jobs and refuse new ones.
    pub fn close(&self) {
        self.inner.closed.set(true);
        self.inner.queue.borrow_mut().clear();
        self.inner.waker.borrow_mut().take();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }
}

trait ObserverRegistry {
    fn remove(&self, id: u64);
}

struct ObservableInner<T> {
    next_id: Cell<u64>,
    observers: RefCell<Vec<(u64, Rc<dyn Fn(&T)>)>>,
    closed: Cell<bool>,
}

impl<T> ObserverRegistry for ObservableInner<T> {
    fn remove(&self, id: u64) {
        self.observers.borrow_mut().retain(|(oid, _)| *oid != id);
    }
}

/// A list of observers notified synchronously with a borrowed value.
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Observable<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                next_id: Cell::new(0),
                observers: RefCell::new(Vec::new()),
                closed: Cell::new(false),
            }),
        }
    }

    /// Register an observer. It stays registered until the returned
    /// [`Subscription`] is unsubscribed or the observable is closed.
    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        if !self.inner.closed.get() {
            self.inner
                .observers
                .borrow_mut()
                .push((id, Rc::new(observer)));
        }
        let registry: Rc<dyn ObserverRegistry> = self.inner.clone();
        Subscription {
            id,
            registry: Rc::downgrade(&registry),
        }
    }

    pub fn notify(&self, value: &T) {
        if self.inner.closed.get() {
            return;
        }
        // Snapshot so observers may subscribe or unsubscribe while being notified.
        let observers: Vec<Rc<dyn Fn(&T)>> = self
            .inner
            .observers
            .borrow()
            .iter()
            .map(|(_, f)| f.clone())
            .collect();
        for observer in observers {
            observer(value);
        }
    }

    /// Drop every observer and ignore all future notifications.
    pub fn close(&self) {
        self.inner.closed.set(true);
        self.inner.observers.borrow_mut().clear();
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }
}

/// Handle for one registered observer.
#[must_use = "dropping a Subscription leaves the observer registered; call unsubscribe"]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn ObserverRegistry>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
