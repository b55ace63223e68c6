//! The seam between the harness and pipelines under test.
//!
//! The harness does not ship operators. A pipeline under test implements
//! [`Observable`]: given the run's [`Scheduler`] and an [`Observer`], it
//! starts producing notifications (immediately or via scheduled virtual
//! actions) and returns a [`Subscription`] that stops it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::notification::Notification;
use crate::scheduler::Scheduler;

/// A source of notifications that can be subscribed on a virtual scheduler.
pub trait Observable<T, E> {
    /// Start delivering notifications to `observer`.
    ///
    /// Time-dependent work must be scheduled on `scheduler` rather than
    /// performed with real timers.
    fn subscribe(&self, scheduler: &Scheduler, observer: Observer<T, E>) -> Subscription;
}

impl<T, E, O> Observable<T, E> for Rc<O>
where
    O: Observable<T, E> + ?Sized,
{
    fn subscribe(&self, scheduler: &Scheduler, observer: Observer<T, E>) -> Subscription {
        (**self).subscribe(scheduler, observer)
    }
}

impl<T, E, O> Observable<T, E> for Box<O>
where
    O: Observable<T, E> + ?Sized,
{
    fn subscribe(&self, scheduler: &Scheduler, observer: Observer<T, E>) -> Subscription {
        (**self).subscribe(scheduler, observer)
    }
}

/// Shared, type-erased observable.
pub type SharedObservable<T, E> = Rc<dyn Observable<T, E>>;

/// Observable backed by a closure, for writing pipelines inline.
///
/// # Example
///
/// ```
/// use marble_core::observable::{from_fn, Observable, Observer, Subscription};
/// use marble_core::scheduler::Scheduler;
///
/// let three = from_fn(|scheduler: &Scheduler, observer: Observer<i32, String>| {
///     let subscription = Subscription::new();
///     scheduler.schedule(3, move |_| {
///         observer.next(3);
///         observer.complete();
///     });
///     subscription
/// });
///
/// let scheduler = Scheduler::new();
/// let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
/// let sink = std::rc::Rc::clone(&seen);
/// three.subscribe(&scheduler, Observer::new(move |n| sink.borrow_mut().push(n)));
/// scheduler.flush(None);
/// assert_eq!(seen.borrow().len(), 2);
/// ```
#[derive(Clone)]
pub struct FnObservable<F> {
    subscribe: F,
}

impl<F> fmt::Debug for FnObservable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnObservable").finish_non_exhaustive()
    }
}

/// Wrap a subscribe closure as an [`Observable`].
pub fn from_fn<T, E, F>(subscribe: F) -> FnObservable<F>
where
    F: Fn(&Scheduler, Observer<T, E>) -> Subscription,
{
    FnObservable { subscribe }
}

impl<T, E, F> Observable<T, E> for FnObservable<F>
where
    F: Fn(&Scheduler, Observer<T, E>) -> Subscription,
{
    fn subscribe(&self, scheduler: &Scheduler, observer: Observer<T, E>) -> Subscription {
        (self.subscribe)(scheduler, observer)
    }
}

type Sink<T, E> = RefCell<Box<dyn FnMut(Notification<T, E>)>>;

struct ObserverInner<T, E> {
    sink: Sink<T, E>,
    closed: Cell<bool>,
}

/// Receiving end of a subscription.
///
/// Clones share state. Once a terminal notification has been delivered, or
/// [`Observer::close`] has been called, further notifications are ignored,
/// so a stream can never emit after it ended.
pub struct Observer<T, E> {
    inner: Rc<ObserverInner<T, E>>,
}

impl<T, E> Clone for Observer<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Observer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("closed", &self.inner.closed.get())
            .finish_non_exhaustive()
    }
}

impl<T, E> Observer<T, E> {
    /// Create an observer that forwards every notification to `sink`.
    pub fn new<F>(sink: F) -> Self
    where
        F: FnMut(Notification<T, E>) + 'static,
    {
        Self {
            inner: Rc::new(ObserverInner {
                sink: RefCell::new(Box::new(sink)),
                closed: Cell::new(false),
            }),
        }
    }

    /// Deliver a notification unless the observer is closed.
    pub fn notify(&self, notification: Notification<T, E>) {
        if self.inner.closed.get() {
            return;
        }
        if notification.is_terminal() {
            self.inner.closed.set(true);
        }
        (self.inner.sink.borrow_mut())(notification);
    }

    /// Deliver a value.
    pub fn next(&self, value: T) {
        self.notify(Notification::Next(value));
    }

    /// Deliver an error and close.
    pub fn error(&self, error: E) {
        self.notify(Notification::Error(error));
    }

    /// Deliver completion and close.
    pub fn complete(&self) {
        self.notify(Notification::Complete);
    }

    /// Stop delivering without a terminal notification.
    pub fn close(&self) {
        self.inner.closed.set(true);
    }

    /// Whether the observer stopped accepting notifications.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }
}

#[derive(Default)]
struct SubscriptionInner {
    closed: Cell<bool>,
    teardowns: RefCell<Vec<Box<dyn FnOnce()>>>,
}

/// Handle that cancels a running subscription.
///
/// Clones share state; unsubscribing any clone runs every registered
/// teardown exactly once.
#[derive(Clone, Default)]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.inner.closed.get())
            .field("teardowns", &self.inner.teardowns.borrow().len())
            .finish()
    }
}

impl Subscription {
    /// Create an open subscription with no teardown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register work to run on unsubscribe. Runs immediately if already
    /// closed.
    pub fn add<F>(&self, teardown: F)
    where
        F: FnOnce() + 'static,
    {
        if self.inner.closed.get() {
            teardown();
        } else {
            self.inner.teardowns.borrow_mut().push(Box::new(teardown));
        }
    }

    /// Unsubscribe `child` when this subscription ends.
    pub fn add_child(&self, child: Subscription) {
        self.add(move || child.unsubscribe());
    }

    /// Cancel the subscription and run its teardowns.
    pub fn unsubscribe(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        let teardowns = std::mem::take(&mut *self.inner.teardowns.borrow_mut());
        for teardown in teardowns {
            teardown();
        }
    }

    /// Whether [`Subscription::unsubscribe`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }
}
