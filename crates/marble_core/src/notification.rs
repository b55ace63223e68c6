//! Notifications delivered by observables.
//!
//! Every observable emits zero or more [`Notification::Next`] values followed
//! by at most one terminal notification ([`Notification::Error`] or
//! [`Notification::Complete`]). The harness records notifications together
//! with the frame they were delivered at, producing [`TimedNotification`]s
//! that can be compared structurally.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::Frame;

/// One event emitted by an observable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Notification<T, E> {
    /// A value.
    Next(T),
    /// Terminal failure with an error payload.
    Error(E),
    /// Terminal success.
    Complete,
}

/// Notification tag without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// [`Notification::Next`].
    Next,
    /// [`Notification::Error`].
    Error,
    /// [`Notification::Complete`].
    Complete,
}

impl<T, E> Notification<T, E> {
    /// The tag of this notification.
    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        match self {
            Self::Next(_) => NotificationKind::Next,
            Self::Error(_) => NotificationKind::Error,
            Self::Complete => NotificationKind::Complete,
        }
    }

    /// Whether this notification ends the stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }

    /// The value of a `Next` notification.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Next(value) => Some(value),
            _ => None,
        }
    }

    /// Transform the value of a `Next` notification.
    pub fn map<U, F>(self, f: F) -> Notification<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Next(value) => Notification::Next(f(value)),
            Self::Error(error) => Notification::Error(error),
            Self::Complete => Notification::Complete,
        }
    }

    /// Transform the payload of an `Error` notification.
    pub fn map_error<F2, F>(self, f: F) -> Notification<T, F2>
    where
        F: FnOnce(E) -> F2,
    {
        match self {
            Self::Next(value) => Notification::Next(value),
            Self::Error(error) => Notification::Error(f(error)),
            Self::Complete => Notification::Complete,
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Display for Notification<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next(value) => write!(f, "Next({value:?})"),
            Self::Error(error) => write!(f, "Error({error:?})"),
            Self::Complete => f.write_str("Complete"),
        }
    }
}

/// A notification stamped with the frame it was delivered at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimedNotification<T, E> {
    /// Virtual time of delivery.
    pub frame: Frame,
    /// The delivered notification.
    pub notification: Notification<T, E>,
}

impl<T, E> TimedNotification<T, E> {
    /// Create a timed notification.
    #[must_use]
    pub const fn new(frame: Frame, notification: Notification<T, E>) -> Self {
        Self {
            frame,
            notification,
        }
    }

    /// A `Next` at `frame`.
    #[must_use]
    pub const fn next(frame: Frame, value: T) -> Self {
        Self::new(frame, Notification::Next(value))
    }

    /// An `Error` at `frame`.
    #[must_use]
    pub const fn error(frame: Frame, error: E) -> Self {
        Self::new(frame, Notification::Error(error))
    }

    /// A `Complete` at `frame`.
    #[must_use]
    pub const fn complete(frame: Frame) -> Self {
        Self::new(frame, Notification::Complete)
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Display for TimedNotification<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.notification, self.frame)
    }
}

/// Check the sequence invariants: non-decreasing frames and nothing after a
/// terminal notification.
#[must_use]
pub fn is_well_formed<T, E>(sequence: &[TimedNotification<T, E>]) -> bool {
    let ordered = sequence.windows(2).all(|w| w[0].frame <= w[1].frame);
    let terminal_last = sequence
        .iter()
        .position(|n| n.notification.is_terminal())
        .map_or(true, |pos| pos + 1 == sequence.len());
    ordered && terminal_last
}
