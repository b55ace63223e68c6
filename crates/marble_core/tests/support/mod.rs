//! Pipelines under test.
//!
//! The harness ships no operators, so the integration tests build the few
//! they need here on top of the [`Observable`] seam. Every time-dependent
//! operator schedules on the virtual scheduler it was subscribed with.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use marble_core::prelude::*;
use marble_core::scheduler::{ActionId, GroupId};

/// Shared stream with a `String` error by default.
pub type Stream<T, E = String> = SharedObservable<T, E>;

/// Type-erase an observable, e.g. a test-double source.
pub fn shared<T, E, O>(observable: O) -> Stream<T, E>
where
    O: Observable<T, E> + 'static,
{
    Rc::new(observable)
}

// =============================================================================
// Creation
// =============================================================================

/// Emit every value synchronously on subscribe, then complete.
pub fn of<T: Clone + 'static, E: 'static>(values: Vec<T>) -> Stream<T, E> {
    Rc::new(from_fn(move |_: &Scheduler, observer: Observer<T, E>| {
        for value in &values {
            observer.next(value.clone());
        }
        observer.complete();
        Subscription::new()
    }))
}

/// Complete immediately.
pub fn empty<T: 'static, E: 'static>() -> Stream<T, E> {
    Rc::new(from_fn(|_: &Scheduler, observer: Observer<T, E>| {
        observer.complete();
        Subscription::new()
    }))
}

/// Fail immediately with `error`.
pub fn throw_error<T: 'static, E: Clone + 'static>(error: E) -> Stream<T, E> {
    Rc::new(from_fn(move |_: &Scheduler, observer: Observer<T, E>| {
        observer.error(error.clone());
        Subscription::new()
    }))
}

/// Emit 0, 1, 2, ... every `period` frames, forever.
pub fn interval<E: 'static>(period: Frame) -> Stream<u64, E> {
    fn tick<E: 'static>(
        scheduler: &Scheduler,
        group: GroupId,
        period: Frame,
        count: u64,
        observer: Observer<u64, E>,
    ) {
        scheduler.schedule_in_group(group, period, move |s| {
            observer.next(count);
            if !observer.is_closed() {
                tick(s, group, period, count + 1, observer);
            }
        });
    }

    Rc::new(from_fn(move |scheduler: &Scheduler, observer: Observer<u64, E>| {
        let group = scheduler.new_group();
        let subscription = Subscription::new();
        let clock = scheduler.clone();
        subscription.add(move || {
            clock.cancel_group(group);
        });
        tick(scheduler, group, period, 0, observer);
        subscription
    }))
}

// =============================================================================
// Transformation
// =============================================================================

/// Apply `f` to every value.
pub fn map<T, U, E, F>(source: Stream<T, E>, f: F) -> Stream<U, E>
where
    T: 'static,
    U: 'static,
    E: 'static,
    F: Fn(T) -> U + 'static,
{
    let f = Rc::new(f);
    Rc::new(from_fn(move |scheduler: &Scheduler, observer: Observer<U, E>| {
        let f = Rc::clone(&f);
        source.subscribe(
            scheduler,
            Observer::new(move |notification: Notification<T, E>| {
                observer.notify(notification.map(|value| f(value)));
            }),
        )
    }))
}

/// Apply a fallible `f`; the first failure becomes the stream's error.
pub fn try_map<T, U, E, F>(source: Stream<T, E>, f: F) -> Stream<U, E>
where
    T: 'static,
    U: 'static,
    E: 'static,
    F: Fn(T) -> std::result::Result<U, E> + 'static,
{
    let f = Rc::new(f);
    Rc::new(from_fn(move |scheduler: &Scheduler, observer: Observer<U, E>| {
        let f = Rc::clone(&f);
        source.subscribe(
            scheduler,
            Observer::new(move |notification: Notification<T, E>| match notification {
                Notification::Next(value) => match f(value) {
                    Ok(mapped) => observer.next(mapped),
                    Err(error) => observer.error(error),
                },
                Notification::Error(error) => observer.error(error),
                Notification::Complete => observer.complete(),
            }),
        )
    }))
}

/// Drop values equal to the previous one.
pub fn distinct_until_changed<T, E>(source: Stream<T, E>) -> Stream<T, E>
where
    T: Clone + PartialEq + 'static,
    E: 'static,
{
    Rc::new(from_fn(move |scheduler: &Scheduler, observer: Observer<T, E>| {
        let mut last: Option<T> = None;
        source.subscribe(
            scheduler,
            Observer::new(move |notification: Notification<T, E>| match notification {
                Notification::Next(value) => {
                    if last.as_ref() != Some(&value) {
                        last = Some(value.clone());
                        observer.next(value);
                    }
                }
                other => observer.notify(other),
            }),
        )
    }))
}

/// Collect all values and emit them as one list on completion.
pub fn to_array<T: 'static, E: 'static>(source: Stream<T, E>) -> Stream<Vec<T>, E> {
    Rc::new(from_fn(move |scheduler: &Scheduler, observer: Observer<Vec<T>, E>| {
        let mut collected = Vec::new();
        source.subscribe(
            scheduler,
            Observer::new(move |notification: Notification<T, E>| match notification {
                Notification::Next(value) => collected.push(value),
                Notification::Error(error) => observer.error(error),
                Notification::Complete => {
                    observer.next(std::mem::take(&mut collected));
                    observer.complete();
                }
            }),
        )
    }))
}

// =============================================================================
// Time
// =============================================================================

/// Shift values and completion `frames` later. Errors pass through at once.
pub fn delay<T: 'static, E: 'static>(source: Stream<T, E>, frames: Frame) -> Stream<T, E> {
    Rc::new(from_fn(move |scheduler: &Scheduler, observer: Observer<T, E>| {
        let group = scheduler.new_group();
        let subscription = Subscription::new();
        {
            let scheduler = scheduler.clone();
            subscription.add(move || {
                scheduler.cancel_group(group);
            });
        }

        let clock = scheduler.clone();
        let upstream = source.subscribe(
            scheduler,
            Observer::new(move |notification: Notification<T, E>| match notification {
                Notification::Error(error) => observer.error(error),
                notification => {
                    let downstream = observer.clone();
                    clock.schedule_in_group(group, frames, move |_| downstream.notify(notification));
                }
            }),
        );
        subscription.add_child(upstream);
        subscription
    }))
}

/// Emit a value only after `frames` of silence. Completion flushes the
/// pending value first.
pub fn debounce_time<T: 'static, E: 'static>(source: Stream<T, E>, frames: Frame) -> Stream<T, E> {
    Rc::new(from_fn(move |scheduler: &Scheduler, observer: Observer<T, E>| {
        let pending: Rc<RefCell<Option<(ActionId, T)>>> = Rc::new(RefCell::new(None));
        let subscription = Subscription::new();
        {
            let pending = Rc::clone(&pending);
            let scheduler = scheduler.clone();
            subscription.add(move || {
                let previous = pending.borrow_mut().take();
                if let Some((id, _)) = previous {
                    scheduler.cancel(id);
                }
            });
        }

        let clock = scheduler.clone();
        let upstream = source.subscribe(
            scheduler,
            Observer::new(move |notification: Notification<T, E>| {
                let previous = pending.borrow_mut().take();
                match notification {
                    Notification::Next(value) => {
                        if let Some((id, _)) = previous {
                            clock.cancel(id);
                        }
                        let slot = Rc::clone(&pending);
                        let downstream = observer.clone();
                        let id = clock.schedule(frames, move |_| {
                            let due = slot.borrow_mut().take();
                            if let Some((_, value)) = due {
                                downstream.next(value);
                            }
                        });
                        *pending.borrow_mut() = Some((id, value));
                    }
                    Notification::Complete => {
                        if let Some((id, value)) = previous {
                            clock.cancel(id);
                            observer.next(value);
                        }
                        observer.complete();
                    }
                    Notification::Error(error) => {
                        if let Some((id, _)) = previous {
                            clock.cancel(id);
                        }
                        observer.error(error);
                    }
                }
            }),
        );
        subscription.add_child(upstream);
        subscription
    }))
}

// =============================================================================
// Combination
// =============================================================================

/// Emit everything from `first`, then subscribe to `second`.
pub fn concat<T: 'static, E: 'static>(first: Stream<T, E>, second: Stream<T, E>) -> Stream<T, E> {
    Rc::new(from_fn(move |scheduler: &Scheduler, observer: Observer<T, E>| {
        let subscription = Subscription::new();
        let chained = subscription.clone();
        let second = Rc::clone(&second);
        let clock = scheduler.clone();
        let head = first.subscribe(
            scheduler,
            Observer::new(move |notification: Notification<T, E>| match notification {
                Notification::Complete => {
                    let tail = second.subscribe(&clock, observer.clone());
                    chained.add_child(tail);
                }
                other => observer.notify(other),
            }),
        );
        subscription.add_child(head);
        subscription
    }))
}

struct ConcatMap<T, U, E> {
    project: Rc<dyn Fn(T) -> Stream<U, E>>,
    downstream: Observer<U, E>,
    subscription: Subscription,
    queue: RefCell<VecDeque<T>>,
    active: Cell<bool>,
    outer_done: Cell<bool>,
}

impl<T: 'static, U: 'static, E: 'static> ConcatMap<T, U, E> {
    fn drain(self: &Rc<Self>, scheduler: &Scheduler) {
        if self.active.get() {
            return;
        }
        let next = self.queue.borrow_mut().pop_front();
        match next {
            Some(value) => {
                self.active.set(true);
                let state = Rc::clone(self);
                let clock = scheduler.clone();
                let inner = (self.project)(value).subscribe(
                    scheduler,
                    Observer::new(move |notification: Notification<U, E>| match notification {
                        Notification::Complete => {
                            state.active.set(false);
                            state.drain(&clock);
                        }
                        other => state.downstream.notify(other),
                    }),
                );
                self.subscription.add_child(inner);
            }
            None if self.outer_done.get() => self.downstream.complete(),
            None => {}
        }
    }
}

/// Map every value to an inner stream and run the inner streams one after
/// another.
pub fn concat_map<T, U, E, F>(source: Stream<T, E>, project: F) -> Stream<U, E>
where
    T: 'static,
    U: 'static,
    E: 'static,
    F: Fn(T) -> Stream<U, E> + 'static,
{
    let project: Rc<dyn Fn(T) -> Stream<U, E>> = Rc::new(project);
    Rc::new(from_fn(move |scheduler: &Scheduler, observer: Observer<U, E>| {
        let subscription = Subscription::new();
        let state = Rc::new(ConcatMap {
            project: Rc::clone(&project),
            downstream: observer,
            subscription: subscription.clone(),
            queue: RefCell::new(VecDeque::new()),
            active: Cell::new(false),
            outer_done: Cell::new(false),
        });

        let clock = scheduler.clone();
        let outer = source.subscribe(
            scheduler,
            Observer::new(move |notification: Notification<T, E>| match notification {
                Notification::Next(value) => {
                    state.queue.borrow_mut().push_back(value);
                    state.drain(&clock);
                }
                Notification::Error(error) => state.downstream.error(error),
                Notification::Complete => {
                    state.outer_done.set(true);
                    state.drain(&clock);
                }
            }),
        );
        subscription.add_child(outer);
        subscription
    }))
}

struct SwitchState {
    current: Cell<u64>,
    inner: RefCell<Option<Subscription>>,
    inner_active: Cell<bool>,
    outer_done: Cell<bool>,
}

/// Map every value to an inner stream, dropping the previous inner stream.
pub fn switch_map<T, U, E, F>(source: Stream<T, E>, project: F) -> Stream<U, E>
where
    T: 'static,
    U: 'static,
    E: 'static,
    F: Fn(T) -> Stream<U, E> + 'static,
{
    let project = Rc::new(project);
    Rc::new(from_fn(move |scheduler: &Scheduler, observer: Observer<U, E>| {
        let project = Rc::clone(&project);
        let state = Rc::new(SwitchState {
            current: Cell::new(0),
            inner: RefCell::new(None),
            inner_active: Cell::new(false),
            outer_done: Cell::new(false),
        });
        let subscription = Subscription::new();
        {
            let state = Rc::clone(&state);
            subscription.add(move || {
                let inner = state.inner.borrow_mut().take();
                if let Some(inner) = inner {
                    inner.unsubscribe();
                }
            });
        }

        let clock = scheduler.clone();
        let outer = source.subscribe(
            scheduler,
            Observer::new(move |notification: Notification<T, E>| match notification {
                Notification::Next(value) => {
                    let id = state.current.get() + 1;
                    state.current.set(id);
                    let previous = state.inner.borrow_mut().take();
                    if let Some(previous) = previous {
                        previous.unsubscribe();
                    }
                    state.inner_active.set(true);

                    let inner_state = Rc::clone(&state);
                    let downstream = observer.clone();
                    let inner = project(value).subscribe(
                        &clock,
                        Observer::new(move |notification: Notification<U, E>| {
                            if inner_state.current.get() != id {
                                return;
                            }
                            match notification {
                                Notification::Complete => {
                                    inner_state.inner_active.set(false);
                                    if inner_state.outer_done.get() {
                                        downstream.complete();
                                    }
                                }
                                other => downstream.notify(other),
                            }
                        }),
                    );
                    *state.inner.borrow_mut() = Some(inner);
                }
                Notification::Error(error) => observer.error(error),
                Notification::Complete => {
                    state.outer_done.set(true);
                    if !state.inner_active.get() {
                        observer.complete();
                    }
                }
            }),
        );
        subscription.add_child(outer);
        subscription
    }))
}

// =============================================================================
// Errors
// =============================================================================

/// Replace an error with the stream returned by `handler`.
pub fn catch_error<T, E, F>(source: Stream<T, E>, handler: F) -> Stream<T, E>
where
    T: 'static,
    E: 'static,
    F: Fn(E) -> Stream<T, E> + 'static,
{
    let handler = Rc::new(handler);
    Rc::new(from_fn(move |scheduler: &Scheduler, observer: Observer<T, E>| {
        let handler = Rc::clone(&handler);
        let subscription = Subscription::new();
        let fallback = subscription.clone();
        let clock = scheduler.clone();
        let upstream = source.subscribe(
            scheduler,
            Observer::new(move |notification: Notification<T, E>| match notification {
                Notification::Error(error) => {
                    let replacement = handler(error).subscribe(&clock, observer.clone());
                    fallback.add_child(replacement);
                }
                other => observer.notify(other),
            }),
        );
        subscription.add_child(upstream);
        subscription
    }))
}
