//! Marble diagram parsing and rendering.
//!
//! A marble diagram describes a timed sequence of notifications, one
//! character per frame:
//!
//! ```text
//! ---a---b---|        a at 3, b at 7, complete at 11
//! (abc|)              a, b, c and complete, all at frame 0
//! ---a--^-b-|         hot: frames relative to '^', so b at 2, complete at 4
//! 1s a 999ms (b|)     a at 1000, b and complete at 2000
//! ```
//!
//! | Marker        | Meaning                                              |
//! |---------------|------------------------------------------------------|
//! | `-`           | one frame of silence                                 |
//! | whitespace    | ignored (separates time progression)                 |
//! | `\|`          | completion                                           |
//! | `#`           | error                                                |
//! | `(` `)`       | group: all markers inside share the frame of `(`     |
//! | `^`           | subscription point                                   |
//! | `!`           | unsubscription point (subscription windows only)     |
//! | `10ms` `1s`   | time progression                                     |
//! | anything else | a value, looked up in [`MarbleValues`]               |
//!
//! Parsing happens in two steps. [`parse_marbles`] turns the text into a
//! label-level [`Marbles`] timeline with absolute frames, and
//! [`Marbles::resolve`] substitutes values and rebases the timeline onto the
//! subscription point. [`render`] goes the other way and produces a canonical
//! diagram for a timeline.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::error::{MarbleError, ParseErrorKind, Result};
use crate::notification::{Notification, TimedNotification};
use crate::time::{self, Frame};
use crate::values::MarbleValues;

/// Gaps longer than this are rendered with time progression instead of `-`.
const MAX_DASH_GAP: Frame = 10;

/// Label-level marker kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum MarbleKind {
    /// Value emission with its label.
    Next(char),
    /// `#`.
    Error,
    /// `|`.
    Complete,
}

impl MarbleKind {
    /// Whether this marker ends the stream.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Next(_))
    }

    /// The diagram character for this marker.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Next(label) => label,
            Self::Error => '#',
            Self::Complete => '|',
        }
    }
}

/// A marker placed on the diagram's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarbleEvent {
    /// Frame counted from the start of the diagram.
    pub frame: Frame,
    /// What happens at that frame.
    pub kind: MarbleKind,
}

impl MarbleEvent {
    /// Create an event.
    #[must_use]
    pub const fn new(frame: Frame, kind: MarbleKind) -> Self {
        Self { frame, kind }
    }
}

/// A parsed marble diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marbles {
    events: Vec<MarbleEvent>,
    subscription_point: Option<Frame>,
}

impl Marbles {
    /// Build a timeline directly from events.
    #[must_use]
    pub fn new(events: Vec<MarbleEvent>, subscription_point: Option<Frame>) -> Self {
        Self {
            events,
            subscription_point,
        }
    }

    /// All events in diagram order, with frames from the diagram origin.
    #[must_use]
    pub fn events(&self) -> &[MarbleEvent] {
        &self.events
    }

    /// Frame of the `^` marker, if any.
    #[must_use]
    pub const fn subscription_point(&self) -> Option<Frame> {
        self.subscription_point
    }

    /// The origin that resolved frames are measured from.
    #[must_use]
    pub fn origin(&self) -> Frame {
        self.subscription_point.unwrap_or(0)
    }

    /// Events at or after the subscription point, rebased onto it.
    pub fn visible_events(&self) -> impl Iterator<Item = MarbleEvent> + '_ {
        let origin = self.origin();
        self.events
            .iter()
            .filter(move |event| event.frame >= origin)
            .map(move |event| MarbleEvent::new(event.frame - origin, event.kind))
    }

    /// The terminal event, if the diagram ends the stream.
    #[must_use]
    pub fn terminal(&self) -> Option<&MarbleEvent> {
        self.events.last().filter(|event| event.kind.is_terminal())
    }

    /// Substitute values and rebase onto the subscription point.
    ///
    /// Events before the subscription point are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`MarbleError::Configuration`] if a visible label has no value
    /// or the diagram contains `#` and no error payload was provided.
    pub fn resolve<T: Clone, E: Clone>(
        &self,
        values: &MarbleValues<T, E>,
    ) -> Result<Vec<TimedNotification<T, E>>> {
        self.visible_events()
            .map(|event| {
                let notification = match event.kind {
                    MarbleKind::Next(label) => Notification::Next(values.value(label)?),
                    MarbleKind::Error => Notification::Error(values.error_value()?),
                    MarbleKind::Complete => Notification::Complete,
                };
                Ok(TimedNotification::new(event.frame, notification))
            })
            .collect()
    }
}

impl fmt::Display for Marbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

/// Parse a value diagram into a label-level timeline.
///
/// `^` is accepted at most once; `!` is rejected.
///
/// # Errors
///
/// Returns [`MarbleError::Parse`] for malformed diagrams.
///
/// # Example
///
/// ```
/// use marble_core::diagram::{parse_marbles, MarbleEvent, MarbleKind};
///
/// let marbles = parse_marbles("---a---b---|").unwrap();
/// assert_eq!(
///     marbles.events(),
///     &[
///         MarbleEvent::new(3, MarbleKind::Next('a')),
///         MarbleEvent::new(7, MarbleKind::Next('b')),
///         MarbleEvent::new(11, MarbleKind::Complete),
///     ]
/// );
/// ```
pub fn parse_marbles(diagram: &str) -> Result<Marbles> {
    parse_value_diagram(diagram, true)
}

/// Parse a diagram for a cold source, which may not contain `^`.
///
/// # Errors
///
/// Returns [`MarbleError::Parse`] for malformed diagrams or a `^` marker.
pub fn parse_cold_marbles(diagram: &str) -> Result<Marbles> {
    parse_value_diagram(diagram, false)
}

/// Parse a value diagram straight into resolved notifications.
///
/// # Errors
///
/// Returns [`MarbleError::Parse`] for malformed diagrams and
/// [`MarbleError::Configuration`] for labels missing from `values`.
pub fn parse_diagram<T: Clone, E: Clone>(
    diagram: &str,
    values: &MarbleValues<T, E>,
) -> Result<Vec<TimedNotification<T, E>>> {
    parse_marbles(diagram)?.resolve(values)
}

fn parse_value_diagram(diagram: &str, allow_subscription_point: bool) -> Result<Marbles> {
    let chars: Vec<char> = diagram.chars().collect();
    let fail = |position: usize, kind: ParseErrorKind| MarbleError::parse(diagram, position, kind);

    let mut events = Vec::new();
    let mut frame: Frame = 0;
    let mut group_start: Option<Frame> = None;
    let mut subscription_point = None;
    let mut terminated = false;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let stamp = group_start.unwrap_or(frame);
        match c {
            c if c.is_whitespace() => {}
            '-' => frame = frame.saturating_add(1),
            '(' => {
                if group_start.is_some() {
                    return Err(fail(i, ParseErrorKind::NestedGroup));
                }
                group_start = Some(frame);
                frame = frame.saturating_add(1);
            }
            ')' => {
                if group_start.take().is_none() {
                    return Err(fail(i, ParseErrorKind::UnmatchedGroupClose));
                }
                frame = frame.saturating_add(1);
            }
            '^' => {
                if !allow_subscription_point {
                    return Err(fail(i, ParseErrorKind::SubscriptionPointNotAllowed));
                }
                if subscription_point.is_some() {
                    return Err(fail(i, ParseErrorKind::DuplicateSubscriptionPoint));
                }
                subscription_point = Some(stamp);
                frame = frame.saturating_add(1);
            }
            '!' => return Err(fail(i, ParseErrorKind::UnsubscriptionPointNotAllowed)),
            c if c.is_control() => {
                return Err(fail(i, ParseErrorKind::UnrecognizedCharacter(c)));
            }
            c => {
                if let Some(progression) = time::progression_at(&chars, i) {
                    let progression = progression.map_err(|kind| fail(i, kind))?;
                    frame = frame.saturating_add(progression.frames);
                    i += progression.len;
                    continue;
                }
                if terminated {
                    return Err(fail(i, ParseErrorKind::AfterTerminal(c)));
                }
                let kind = match c {
                    '|' => MarbleKind::Complete,
                    '#' => MarbleKind::Error,
                    label => MarbleKind::Next(label),
                };
                terminated = kind.is_terminal();
                events.push(MarbleEvent::new(stamp, kind));
                frame = frame.saturating_add(1);
            }
        }
        i += 1;
    }

    if group_start.is_some() {
        return Err(fail(chars.len(), ParseErrorKind::UnclosedGroup));
    }

    Ok(Marbles::new(events, subscription_point))
}

/// A subscription window: when a subscriber attached and detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionLog {
    /// Frame the subscription was made.
    pub subscribed: Frame,
    /// Frame the subscription ended, `None` if it never did.
    pub unsubscribed: Option<Frame>,
}

impl SubscriptionLog {
    /// Create a window.
    #[must_use]
    pub const fn new(subscribed: Frame, unsubscribed: Option<Frame>) -> Self {
        Self {
            subscribed,
            unsubscribed,
        }
    }

    /// Whether `frame` lies inside the window (the unsubscription frame is
    /// outside).
    #[must_use]
    pub fn contains(&self, frame: Frame) -> bool {
        frame >= self.subscribed && self.unsubscribed.map_or(true, |end| frame < end)
    }

    /// Canonical window diagram.
    #[must_use]
    pub fn to_diagram(&self) -> String {
        let mut out = String::new();
        push_gap(&mut out, self.subscribed);
        match self.unsubscribed {
            Some(end) if end <= self.subscribed => out.push_str("(^!)"),
            Some(end) => {
                out.push('^');
                push_gap(&mut out, end - self.subscribed - 1);
                out.push('!');
            }
            None => out.push('^'),
        }
        out
    }
}

impl fmt::Display for SubscriptionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unsubscribed {
            Some(end) => write!(f, "{}..{}", self.subscribed, end),
            None => write!(f, "{}..", self.subscribed),
        }
    }
}

/// Parse a subscription window diagram such as `"^------!"`.
///
/// Without `^` the window starts at frame 0.
///
/// # Errors
///
/// Returns [`MarbleError::Parse`] for any marker other than `-`, `^`, `!`,
/// groups, whitespace and time progression, and for repeated markers.
///
/// # Example
///
/// ```
/// use marble_core::diagram::{parse_subscription_window, SubscriptionLog};
///
/// let window = parse_subscription_window("-------^------!").unwrap();
/// assert_eq!(window, SubscriptionLog::new(7, Some(14)));
/// ```
pub fn parse_subscription_window(diagram: &str) -> Result<SubscriptionLog> {
    let chars: Vec<char> = diagram.chars().collect();
    let fail = |position: usize, kind: ParseErrorKind| MarbleError::parse(diagram, position, kind);

    let mut frame: Frame = 0;
    let mut group_start: Option<Frame> = None;
    let mut subscribed: Option<Frame> = None;
    let mut unsubscribed: Option<Frame> = None;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let stamp = group_start.unwrap_or(frame);
        match c {
            c if c.is_whitespace() => {}
            '-' => frame = frame.saturating_add(1),
            '(' => {
                if group_start.is_some() {
                    return Err(fail(i, ParseErrorKind::NestedGroup));
                }
                group_start = Some(frame);
                frame = frame.saturating_add(1);
            }
            ')' => {
                if group_start.take().is_none() {
                    return Err(fail(i, ParseErrorKind::UnmatchedGroupClose));
                }
                frame = frame.saturating_add(1);
            }
            '^' => {
                if subscribed.is_some() {
                    return Err(fail(i, ParseErrorKind::DuplicateSubscriptionPoint));
                }
                if unsubscribed.is_some() {
                    return Err(fail(i, ParseErrorKind::UnsubscribeBeforeSubscribe));
                }
                subscribed = Some(stamp);
                frame = frame.saturating_add(1);
            }
            '!' => {
                if unsubscribed.is_some() {
                    return Err(fail(i, ParseErrorKind::DuplicateUnsubscriptionPoint));
                }
                unsubscribed = Some(stamp);
            }
            c => match time::progression_at(&chars, i) {
                Some(progression) => {
                    let progression = progression.map_err(|kind| fail(i, kind))?;
                    frame = frame.saturating_add(progression.frames);
                    i += progression.len;
                    continue;
                }
                None if c.is_control() => {
                    return Err(fail(i, ParseErrorKind::UnrecognizedCharacter(c)));
                }
                None => return Err(fail(i, ParseErrorKind::InvalidWindowMarker(c))),
            },
        }
        i += 1;
    }

    if group_start.is_some() {
        return Err(fail(chars.len(), ParseErrorKind::UnclosedGroup));
    }

    Ok(SubscriptionLog::new(subscribed.unwrap_or(0), unsubscribed))
}

/// Render a timeline as a canonical diagram.
///
/// Parsing the output yields the same [`Marbles`]. Single markers take one
/// frame, simultaneous markers are grouped, short gaps are drawn with `-` and
/// long gaps with time progression.
///
/// # Example
///
/// ```
/// use marble_core::diagram::{parse_marbles, render};
///
/// let marbles = parse_marbles("1s a 999ms (b|)").unwrap();
/// assert_eq!(render(&marbles), "1000ms a 999ms (b|)");
/// ```
#[must_use]
pub fn render(marbles: &Marbles) -> String {
    // (frame, symbols) slots in frame order; the caret joins whatever slot
    // shares its frame.
    let mut slots: Vec<(Frame, Vec<char>)> = Vec::new();
    let mut caret = marbles.subscription_point();
    for event in marbles.events() {
        if let Some(point) = caret.filter(|point| *point < event.frame) {
            slots.push((point, vec!['^']));
            caret = None;
        }
        match slots.last_mut() {
            Some((frame, symbols)) if *frame == event.frame => symbols.push(event.kind.symbol()),
            _ => slots.push((event.frame, vec![event.kind.symbol()])),
        }
        if caret == Some(event.frame) {
            if let Some((_, symbols)) = slots.last_mut() {
                symbols.push('^');
            }
            caret = None;
        }
    }
    if let Some(point) = caret {
        slots.push((point, vec!['^']));
    }

    let mut out = String::new();
    let mut cursor: Frame = 0;
    for (frame, symbols) in slots {
        let mut gap = frame.saturating_sub(cursor);
        if gap > MAX_DASH_GAP {
            if reads_as_progression(&out) {
                out.push('-');
                gap -= 1;
            }
            // A digit right after whitespace would read as time progression.
            if symbols[0].is_ascii_digit() {
                push_gap(&mut out, gap - 1);
                out.push('-');
            } else {
                push_gap(&mut out, gap);
            }
        } else {
            push_gap(&mut out, gap);
        }

        if symbols.len() == 1 {
            out.push(symbols[0]);
            cursor = frame + 1;
        } else {
            out.push('(');
            out.extend(symbols.iter());
            out.push(')');
            cursor = frame + symbols.len() as Frame + 2;
        }
    }
    if reads_as_progression(&out) {
        out.push('-');
    }
    out
}

/// Append `frames` of silence: dashes for short gaps, time progression for
/// long ones.
fn push_gap(out: &mut String, frames: Frame) {
    if frames > MAX_DASH_GAP {
        if !out.is_empty() && !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        let _ = write!(out, "{}ms ", time::frames_to_ms(frames));
    } else {
        for _ in 0..frames {
            out.push('-');
        }
    }
}

/// Whether the trailing token of `out` would parse as time progression if
/// whitespace or the end of the diagram followed it, e.g. labels `1` `s`.
fn reads_as_progression(out: &str) -> bool {
    let token: Vec<char> = out
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .chars()
        .collect();
    time::progression_at(&token, 0).is_some()
}
