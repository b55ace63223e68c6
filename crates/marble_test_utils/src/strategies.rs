//! Proptest strategies for marble diagrams.
//!
//! These strategies generate random but always valid diagrams, so property
//! tests can check parser and renderer invariants over inputs nobody wrote
//! by hand.

use proptest::prelude::*;

/// Piece of a generated value diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A run of `-`.
    Silence(usize),
    /// A single value label.
    Value(char),
    /// A group of simultaneous labels.
    Group(Vec<char>),
    /// Time progression in milliseconds, surrounded by spaces.
    Progression(u32),
}

impl Segment {
    fn write(&self, out: &mut String) {
        match self {
            Self::Silence(n) => out.push_str(&"-".repeat(*n)),
            Self::Value(label) => out.push(*label),
            Self::Group(labels) => {
                out.push('(');
                out.extend(labels);
                out.push(')');
            }
            Self::Progression(ms) => {
                out.push(' ');
                out.push_str(&ms.to_string());
                out.push_str("ms ");
            }
        }
    }
}

/// How a generated diagram ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// Never terminates.
    Open,
    /// `|`.
    Complete,
    /// `#`.
    Error,
    /// A final value grouped with `|`.
    GroupedComplete(char),
}

/// Generate a value label, a letter or a digit. Runs of digits followed by
/// `m` or `s` labels exercise the time progression lookalikes.
pub fn arb_label() -> impl Strategy<Value = char> {
    prop_oneof![
        3 => prop::sample::select(('a'..='z').collect::<Vec<_>>()),
        1 => prop::sample::select(('0'..='9').collect::<Vec<_>>()),
    ]
}

/// Generate one diagram segment.
pub fn arb_segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        (0usize..5).prop_map(Segment::Silence),
        arb_label().prop_map(Segment::Value),
        prop::collection::vec(arb_label(), 1..4).prop_map(Segment::Group),
        (1u32..200).prop_map(Segment::Progression),
    ]
}

/// Generate a diagram ending.
pub fn arb_ending() -> impl Strategy<Value = Ending> {
    prop_oneof![
        Just(Ending::Open),
        Just(Ending::Complete),
        Just(Ending::Error),
        arb_label().prop_map(Ending::GroupedComplete),
    ]
}

/// Assemble a diagram from segments, an optional `^` before segment
/// `caret` and an ending.
#[must_use]
pub fn build_diagram(segments: &[Segment], caret: Option<usize>, ending: Ending) -> String {
    let mut out = String::new();
    for (index, segment) in segments.iter().enumerate() {
        if caret == Some(index) {
            out.push('^');
        }
        segment.write(&mut out);
    }
    if caret.is_some_and(|index| index >= segments.len()) {
        out.push('^');
    }
    match ending {
        Ending::Open => {}
        Ending::Complete => out.push('|'),
        Ending::Error => out.push('#'),
        Ending::GroupedComplete(label) => {
            out.push('(');
            out.push(label);
            out.push_str("|)");
        }
    }
    out
}

/// Generate a valid value diagram without `^`, as accepted by cold sources.
pub fn arb_cold_diagram() -> impl Strategy<Value = String> {
    (prop::collection::vec(arb_segment(), 0..12), arb_ending())
        .prop_map(|(segments, ending)| build_diagram(&segments, None, ending))
}

/// Generate a valid value diagram, possibly with a `^` subscription point.
pub fn arb_diagram() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(arb_segment(), 0..12),
        proptest::option::of(0usize..13),
        arb_ending(),
    )
        .prop_map(|(segments, caret, ending)| build_diagram(&segments, caret, ending))
}

/// Piece of silence in a generated subscription window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowGap {
    /// A run of `-`.
    Silence(usize),
    /// Time progression in milliseconds, surrounded by spaces.
    Progression(u32),
    /// A group holding only `-`, e.g. `(--)`.
    Group(usize),
}

impl WindowGap {
    fn write(&self, out: &mut String) {
        match self {
            Self::Silence(n) => out.push_str(&"-".repeat(*n)),
            Self::Progression(ms) => {
                out.push(' ');
                out.push_str(&ms.to_string());
                out.push_str("ms ");
            }
            Self::Group(n) => {
                out.push('(');
                out.push_str(&"-".repeat(*n));
                out.push(')');
            }
        }
    }
}

/// Generate one gap of a subscription window.
pub fn arb_window_gap() -> impl Strategy<Value = WindowGap> {
    prop_oneof![
        (0usize..6).prop_map(WindowGap::Silence),
        (1u32..500).prop_map(WindowGap::Progression),
        (0usize..3).prop_map(WindowGap::Group),
    ]
}

/// Assemble a window: `before` gaps, then `^`, then optionally `during` gaps
/// and `!`. With `grouped`, the markers share a frame as `(^!)` instead.
#[must_use]
pub fn build_window(before: &[WindowGap], during: Option<&[WindowGap]>, grouped: bool) -> String {
    let mut out = String::new();
    for gap in before {
        gap.write(&mut out);
    }
    if grouped {
        out.push_str("(^!)");
        return out;
    }
    out.push('^');
    if let Some(during) = during {
        for gap in during {
            gap.write(&mut out);
        }
        out.push('!');
    }
    out
}

/// Generate a subscription window diagram: leading silence, `^`, then
/// optionally silence and `!`. Silence mixes dashes, time progression and
/// groups.
pub fn arb_window() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(arb_window_gap(), 0..4),
        proptest::option::of(prop::collection::vec(arb_window_gap(), 0..4)),
        prop::bool::weighted(0.1),
    )
        .prop_map(|(before, during, grouped)| {
            build_window(&before, during.as_deref(), grouped)
        })
}
