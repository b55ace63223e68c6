//! Test-double sources built from marble diagrams.
//!
//! - [`ColdSource`] replays its diagram for every subscriber, starting at the
//!   frame the subscriber attached.
//! - [`HotSource`] emits on the run's timeline regardless of subscribers; a
//!   late subscriber misses earlier notifications.
//!
//! Both record a [`SubscriptionLog`] per subscription so tests can assert
//! when a pipeline attached to and detached from them.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::diagram::SubscriptionLog;
use crate::notification::{Notification, TimedNotification};
use crate::observable::{Observable, Observer, Subscription};
use crate::scheduler::Scheduler;
use crate::time::Frame;

/// Shared record of the subscriptions made to a source.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRecorder {
    logs: Rc<RefCell<Vec<SubscriptionLog>>>,
}

impl SubscriptionRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription opened at `frame`; returns its index.
    pub fn open(&self, frame: Frame) -> usize {
        let mut logs = self.logs.borrow_mut();
        logs.push(SubscriptionLog::new(frame, None));
        logs.len() - 1
    }

    /// Record that subscription `index` ended at `frame`. Only the first
    /// close is kept.
    pub fn close(&self, index: usize, frame: Frame) {
        if let Some(log) = self.logs.borrow_mut().get_mut(index) {
            log.unsubscribed.get_or_insert(frame);
        }
    }

    /// Copy of all windows recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SubscriptionLog> {
        self.logs.borrow().clone()
    }
}

/// A source created from a marble diagram.
pub trait TestSource {
    /// The diagram this source was built from.
    fn diagram(&self) -> &str;

    /// Subscriptions made to this source.
    fn recorder(&self) -> &SubscriptionRecorder;

    /// Copy of the recorded subscription windows.
    fn subscriptions(&self) -> Vec<SubscriptionLog> {
        self.recorder().snapshot()
    }
}

/// Source that replays its notifications relative to each subscription.
pub struct ColdSource<T, E> {
    diagram: Rc<str>,
    messages: Rc<[TimedNotification<T, E>]>,
    recorder: SubscriptionRecorder,
}

impl<T, E> Clone for ColdSource<T, E> {
    fn clone(&self) -> Self {
        Self {
            diagram: Rc::clone(&self.diagram),
            messages: Rc::clone(&self.messages),
            recorder: self.recorder.clone(),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for ColdSource<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColdSource")
            .field("diagram", &self.diagram)
            .field("messages", &self.messages)
            .field("subscriptions", &self.recorder.snapshot())
            .finish()
    }
}

impl<T, E> ColdSource<T, E> {
    /// Build a cold source from already resolved notifications.
    #[must_use]
    pub fn new(diagram: &str, messages: Vec<TimedNotification<T, E>>) -> Self {
        Self {
            diagram: Rc::from(diagram),
            messages: Rc::from(messages),
            recorder: SubscriptionRecorder::new(),
        }
    }

    /// Notifications with frames relative to subscription.
    #[must_use]
    pub fn messages(&self) -> &[TimedNotification<T, E>] {
        &self.messages
    }
}

impl<T, E> TestSource for ColdSource<T, E> {
    fn diagram(&self) -> &str {
        &self.diagram
    }

    fn recorder(&self) -> &SubscriptionRecorder {
        &self.recorder
    }
}

impl<T, E> Observable<T, E> for ColdSource<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn subscribe(&self, scheduler: &Scheduler, observer: Observer<T, E>) -> Subscription {
        let index = self.recorder.open(scheduler.now());
        let group = scheduler.new_group();
        let subscription = Subscription::new();
        tracing::debug!(
            frame = scheduler.now(),
            diagram = %self.diagram,
            "Cold source subscribed"
        );

        {
            let scheduler = scheduler.clone();
            let recorder = self.recorder.clone();
            let observer = observer.clone();
            subscription.add(move || {
                scheduler.cancel_group(group);
                observer.close();
                recorder.close(index, scheduler.now());
            });
        }

        for message in self.messages.iter() {
            let observer = observer.clone();
            let subscription = subscription.clone();
            let notification = message.notification.clone();
            scheduler.schedule_in_group(group, message.frame, move |_| {
                let terminal = notification.is_terminal();
                observer.notify(notification);
                if terminal {
                    subscription.unsubscribe();
                }
            });
        }

        subscription
    }
}

type SubscriberList<T, E> = RefCell<Vec<(u64, Observer<T, E>, Subscription)>>;

struct HotState<T, E> {
    subscribers: SubscriberList<T, E>,
    next_id: Cell<u64>,
    terminal: RefCell<Option<Notification<T, E>>>,
    connected: Cell<bool>,
}

/// Source whose notifications happen at absolute frames.
///
/// The timeline starts when the source is connected; events before the
/// diagram's `^` are never delivered.
pub struct HotSource<T, E> {
    diagram: Rc<str>,
    messages: Rc<[TimedNotification<T, E>]>,
    state: Rc<HotState<T, E>>,
    recorder: SubscriptionRecorder,
}

impl<T, E> Clone for HotSource<T, E> {
    fn clone(&self) -> Self {
        Self {
            diagram: Rc::clone(&self.diagram),
            messages: Rc::clone(&self.messages),
            state: Rc::clone(&self.state),
            recorder: self.recorder.clone(),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for HotSource<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotSource")
            .field("diagram", &self.diagram)
            .field("messages", &self.messages)
            .field("subscribers", &self.state.subscribers.borrow().len())
            .field("subscriptions", &self.recorder.snapshot())
            .finish()
    }
}

impl<T, E> HotSource<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Build a hot source. Nothing is emitted until [`HotSource::connect`].
    #[must_use]
    pub fn new(diagram: &str, messages: Vec<TimedNotification<T, E>>) -> Self {
        Self {
            diagram: Rc::from(diagram),
            messages: Rc::from(messages),
            state: Rc::new(HotState {
                subscribers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                terminal: RefCell::new(None),
                connected: Cell::new(false),
            }),
            recorder: SubscriptionRecorder::new(),
        }
    }

    /// Schedule the source's notifications on `scheduler`, with message
    /// frames as offsets from the current frame.
    ///
    /// Emissions are queued behind everything already scheduled, so work
    /// registered for the same frame before connecting (such as an
    /// unsubscription) runs first. Returns `false` if already connected.
    pub fn connect(&self, scheduler: &Scheduler) -> bool {
        if self.state.connected.replace(true) {
            return false;
        }
        for message in self.messages.iter() {
            let state = Rc::clone(&self.state);
            let notification = message.notification.clone();
            scheduler.schedule(message.frame, move |_| {
                Self::emit(&state, notification);
            });
        }
        tracing::debug!(
            frame = scheduler.now(),
            diagram = %self.diagram,
            notifications = self.messages.len(),
            "Hot source connected"
        );
        true
    }

    fn emit(state: &HotState<T, E>, notification: Notification<T, E>) {
        if state.terminal.borrow().is_some() {
            return;
        }
        // Snapshot: subscribers may unsubscribe while being notified.
        let subscribers = state.subscribers.borrow().clone();
        let terminal = notification.is_terminal();
        if terminal {
            *state.terminal.borrow_mut() = Some(notification.clone());
        }
        for (_, observer, subscription) in subscribers {
            observer.notify(notification.clone());
            if terminal {
                subscription.unsubscribe();
            }
        }
    }

    /// Notifications with frames relative to the source's creation.
    #[must_use]
    pub fn messages(&self) -> &[TimedNotification<T, E>] {
        &self.messages
    }
}

impl<T, E> TestSource for HotSource<T, E> {
    fn diagram(&self) -> &str {
        &self.diagram
    }

    fn recorder(&self) -> &SubscriptionRecorder {
        &self.recorder
    }
}

impl<T, E> Observable<T, E> for HotSource<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn subscribe(&self, scheduler: &Scheduler, observer: Observer<T, E>) -> Subscription {
        let index = self.recorder.open(scheduler.now());
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);
        let subscription = Subscription::new();
        tracing::debug!(
            frame = scheduler.now(),
            diagram = %self.diagram,
            "Hot source subscribed"
        );

        {
            let scheduler = scheduler.clone();
            let recorder = self.recorder.clone();
            let state: Weak<HotState<T, E>> = Rc::downgrade(&self.state);
            let observer = observer.clone();
            subscription.add(move || {
                if let Some(state) = state.upgrade() {
                    state.subscribers.borrow_mut().retain(|(sid, _, _)| *sid != id);
                }
                observer.close();
                recorder.close(index, scheduler.now());
            });
        }

        // A source that already ended replays its terminal notification.
        let ended = self.state.terminal.borrow().clone();
        if let Some(terminal) = ended {
            observer.notify(terminal);
            subscription.unsubscribe();
        } else {
            self.state
                .subscribers
                .borrow_mut()
                .push((id, observer, subscription.clone()));
        }

        subscription
    }
}
