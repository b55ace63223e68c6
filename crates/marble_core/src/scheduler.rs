//! Virtual-time scheduler.
//!
//! The scheduler owns the virtual clock and a priority queue of pending
//! actions. [`Scheduler::flush`] repeatedly pops the earliest action, moves
//! the clock to its frame and runs it. Actions may schedule further actions,
//! so logically asynchronous chains run to completion without any wall-clock
//! wait.
//!
//! # Determinism
//!
//! - The clock only moves inside [`Scheduler::flush`], and never backwards.
//! - Actions for the same frame run in the order they were scheduled.
//! - Nothing here touches the wall clock, threads or randomness.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use marble_core::scheduler::Scheduler;
//!
//! let scheduler = Scheduler::new();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let l = Rc::clone(&log);
//! scheduler.schedule(5, move |s| l.borrow_mut().push(("late", s.now())));
//! let l = Rc::clone(&log);
//! scheduler.schedule(2, move |s| l.borrow_mut().push(("early", s.now())));
//!
//! scheduler.flush(None);
//! assert_eq!(*log.borrow(), vec![("early", 2), ("late", 5)]);
//! ```

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::time::Frame;

/// Work to run at a virtual frame.
pub type Action = Box<dyn FnOnce(&Scheduler)>;

/// Identifier of a scheduled action, usable with [`Scheduler::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u64);

/// Cancellation group; all actions in a group can be dropped at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

struct ScheduledAction {
    frame: Frame,
    seq: u64,
    group: Option<GroupId>,
    action: Action,
}

impl PartialEq for ScheduledAction {
    fn eq(&self, other: &Self) -> bool {
        self.frame == other.frame && self.seq == other.seq
    }
}

impl Eq for ScheduledAction {}

impl PartialOrd for ScheduledAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledAction {
    // Reversed so the max-heap pops the earliest (frame, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .frame
            .cmp(&self.frame)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct SchedulerState {
    now: Frame,
    next_seq: u64,
    next_group: u64,
    executed: u64,
    queue: BinaryHeap<ScheduledAction>,
}

/// Summary of one [`Scheduler::flush`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlushStats {
    /// Actions executed during this flush.
    pub executed: u64,
    /// Clock value when the flush stopped.
    pub final_frame: Frame,
    /// Actions still queued (beyond the frame limit).
    pub remaining: usize,
}

/// Deterministic virtual-time scheduler.
///
/// Cloning is cheap and yields a handle to the same clock and queue, which
/// is how scheduled actions and sources reach the scheduler. A scheduler is
/// single-threaded (`!Send`); every test builds its own.
#[derive(Clone, Default)]
pub struct Scheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Scheduler")
            .field("now", &state.now)
            .field("pending", &state.queue.len())
            .field("executed", &state.executed)
            .finish()
    }
}

impl Scheduler {
    /// Create a scheduler at frame 0 with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual frame.
    #[must_use]
    pub fn now(&self) -> Frame {
        self.state.borrow().now
    }

    /// Run `action` `delay` frames from now.
    pub fn schedule<F>(&self, delay: Frame, action: F) -> ActionId
    where
        F: FnOnce(&Scheduler) + 'static,
    {
        self.enqueue(None, delay, Box::new(action))
    }

    /// Run `action` at an absolute frame. Frames in the past run at the
    /// current frame.
    pub fn schedule_at<F>(&self, frame: Frame, action: F) -> ActionId
    where
        F: FnOnce(&Scheduler) + 'static,
    {
        let delay = frame.saturating_sub(self.now());
        self.enqueue(None, delay, Box::new(action))
    }

    /// Run `action` `delay` frames from now as part of `group`.
    pub fn schedule_in_group<F>(&self, group: GroupId, delay: Frame, action: F) -> ActionId
    where
        F: FnOnce(&Scheduler) + 'static,
    {
        self.enqueue(Some(group), delay, Box::new(action))
    }

    /// Allocate a new cancellation group.
    pub fn new_group(&self) -> GroupId {
        let mut state = self.state.borrow_mut();
        let group = GroupId(state.next_group);
        state.next_group += 1;
        group
    }

    /// Drop a pending action. Returns `false` if it already ran or was
    /// cancelled.
    pub fn cancel(&self, id: ActionId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.queue.len();
        state.queue.retain(|scheduled| scheduled.seq != id.0);
        state.queue.len() != before
    }

    /// Drop every pending action in `group`. Returns how many were dropped.
    pub fn cancel_group(&self, group: GroupId) -> usize {
        let mut state = self.state.borrow_mut();
        let before = state.queue.len();
        state.queue.retain(|scheduled| scheduled.group != Some(group));
        let dropped = before - state.queue.len();
        if dropped > 0 {
            tracing::debug!(frame = state.now, ?group, dropped, "Cancelled virtual actions");
        }
        dropped
    }

    /// Number of queued actions.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Frame of the earliest queued action.
    #[must_use]
    pub fn next_frame(&self) -> Option<Frame> {
        self.state.borrow().queue.peek().map(|scheduled| scheduled.frame)
    }

    /// Total actions executed since creation.
    #[must_use]
    pub fn executed(&self) -> u64 {
        self.state.borrow().executed
    }

    /// Run queued actions in `(frame, enqueue order)` until the queue is
    /// empty or the next action lies beyond `max_frames`.
    pub fn flush(&self, max_frames: Option<Frame>) -> FlushStats {
        let mut executed = 0;
        while let Some(scheduled) = self.pop_due(max_frames) {
            tracing::trace!(frame = scheduled.frame, seq = scheduled.seq, "Running virtual action");
            (scheduled.action)(self);
            executed += 1;
        }

        let state = self.state.borrow();
        FlushStats {
            executed,
            final_frame: state.now,
            remaining: state.queue.len(),
        }
    }

    /// Drop everything still queued.
    pub fn clear(&self) {
        // Take the queue out first: dropping actions may drop handles that
        // touch the scheduler again.
        let queue = std::mem::take(&mut self.state.borrow_mut().queue);
        drop(queue);
    }

    fn enqueue(&self, group: Option<GroupId>, delay: Frame, action: Action) -> ActionId {
        let mut state = self.state.borrow_mut();
        let seq = state.next_seq;
        state.next_seq += 1;
        let frame = state.now.saturating_add(delay);
        state.queue.push(ScheduledAction {
            frame,
            seq,
            group,
            action,
        });
        ActionId(seq)
    }

    fn pop_due(&self, max_frames: Option<Frame>) -> Option<ScheduledAction> {
        let mut state = self.state.borrow_mut();
        let due = state
            .queue
            .peek()
            .is_some_and(|next| max_frames.map_or(true, |limit| next.frame <= limit));
        if !due {
            return None;
        }
        let scheduled = state.queue.pop()?;
        state.now = scheduled.frame;
        state.executed += 1;
        Some(scheduled)
    }
}
