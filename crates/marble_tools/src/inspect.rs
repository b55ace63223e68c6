//! Diagram inspection.

use std::fmt::Write as _;

use marble_core::diagram::{self, MarbleEvent, MarbleKind, SubscriptionLog};
use marble_core::error::MarbleError;
use marble_core::time::Frame;
use serde::Serialize;
use thiserror::Error;

/// Errors from the inspection tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The diagram is invalid.
    #[error(transparent)]
    Diagram(#[from] MarbleError),
    /// JSON output failed.
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parsed timeline of a value diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineReport {
    /// The diagram as given.
    pub diagram: String,
    /// Canonical rendering of the diagram.
    pub canonical: String,
    /// Frame of `^`, if present.
    pub subscription_point: Option<Frame>,
    /// Events as seen from the subscription point.
    pub events: Vec<MarbleEvent>,
    /// Frame of the terminal event, if the stream ends.
    pub ends_at: Option<Frame>,
}

impl TimelineReport {
    /// One line per event, e.g. `   3  next a`.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "diagram:   {}", self.diagram);
        let _ = writeln!(out, "canonical: {}", self.canonical);
        if let Some(frame) = self.subscription_point {
            let _ = writeln!(out, "subscribed at frame {frame}");
        }
        for event in &self.events {
            let marker = match event.kind {
                MarbleKind::Next(label) => format!("next {label}"),
                MarbleKind::Error => "error".to_string(),
                MarbleKind::Complete => "complete".to_string(),
            };
            let _ = writeln!(out, "{:>6}  {marker}", event.frame);
        }
        if self.ends_at.is_none() {
            out.push_str("(never ends)\n");
        }
        out
    }
}

/// Parse a value diagram into a [`TimelineReport`].
///
/// # Errors
///
/// Returns [`ToolError::Diagram`] for a malformed diagram.
pub fn timeline(input: &str) -> Result<TimelineReport, ToolError> {
    let marbles = diagram::parse_marbles(input)?;
    let events: Vec<MarbleEvent> = marbles.visible_events().collect();
    let ends_at = events
        .last()
        .filter(|event| event.kind.is_terminal())
        .map(|event| event.frame);
    tracing::debug!(events = events.len(), "Parsed diagram");

    Ok(TimelineReport {
        diagram: input.to_string(),
        canonical: diagram::render(&marbles),
        subscription_point: marbles.subscription_point(),
        events,
        ends_at,
    })
}

/// Timeline as pretty JSON.
///
/// # Errors
///
/// Returns [`ToolError`] if the diagram is malformed.
pub fn timeline_json(input: &str) -> Result<String, ToolError> {
    Ok(serde_json::to_string_pretty(&timeline(input)?)?)
}

/// Canonical rendering of a value diagram.
///
/// # Errors
///
/// Returns [`ToolError::Diagram`] for a malformed diagram.
pub fn normalize(input: &str) -> Result<String, ToolError> {
    Ok(diagram::render(&diagram::parse_marbles(input)?))
}

/// Describe a subscription window diagram.
///
/// # Errors
///
/// Returns [`ToolError::Diagram`] for a malformed window.
pub fn window(input: &str) -> Result<String, ToolError> {
    let log: SubscriptionLog = diagram::parse_subscription_window(input)?;
    let end = log
        .unsubscribed
        .map_or_else(|| "never".to_string(), |frame| frame.to_string());
    Ok(format!(
        "subscribed: {}\nunsubscribed: {end}\ncanonical: {}",
        log.subscribed,
        log.to_diagram()
    ))
}
