//! Error types for the marble harness.

use thiserror::Error;

use crate::diagram::SubscriptionLog;
use crate::time::Frame;

/// Result type alias using [`MarbleError`].
pub type Result<T> = std::result::Result<T, MarbleError>;

/// Top-level error type for all harness errors.
#[derive(Debug, Error)]
pub enum MarbleError {
    /// A marble diagram could not be parsed.
    #[error("Invalid marble diagram {diagram:?} at position {position}: {kind}")]
    Parse {
        /// The diagram that failed to parse.
        diagram: String,
        /// Character index of the offending marker.
        position: usize,
        /// What went wrong.
        kind: ParseErrorKind,
    },

    /// A diagram referenced something the value map cannot provide, or the
    /// harness was configured with invalid settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Actual notifications differ from the expected diagram.
    #[error("{0}")]
    SequenceMismatch(Box<SequenceMismatch>),

    /// Actual subscription windows differ from the expected windows.
    #[error("{0}")]
    SubscriptionMismatch(Box<SubscriptionMismatch>),

    /// Failed to parse a RON configuration file.
    #[error("Failed to parse harness config: {0}")]
    ConfigLoad(String),

    /// Failed to read a configuration file.
    #[error("Failed to read harness config: {0}")]
    Io(#[from] std::io::Error),
}

impl MarbleError {
    /// Build a parse error for `diagram` at `position`.
    pub(crate) fn parse(diagram: &str, position: usize, kind: ParseErrorKind) -> Self {
        Self::Parse {
            diagram: diagram.to_string(),
            position,
            kind,
        }
    }

    /// Whether this error is an assertion failure rather than a usage error.
    #[must_use]
    pub const fn is_mismatch(&self) -> bool {
        matches!(
            self,
            Self::SequenceMismatch(_) | Self::SubscriptionMismatch(_)
        )
    }
}

/// Reasons a marble diagram is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Character that is not part of the notation (control characters).
    #[error("unrecognized character {0:?}")]
    UnrecognizedCharacter(char),
    /// `(` inside an open group.
    #[error("nested group")]
    NestedGroup,
    /// `)` without a matching `(`.
    #[error("unmatched ')'")]
    UnmatchedGroupClose,
    /// Diagram ended inside a group.
    #[error("unclosed group")]
    UnclosedGroup,
    /// More than one `^` marker.
    #[error("second subscription point '^'")]
    DuplicateSubscriptionPoint,
    /// More than one `!` marker.
    #[error("second unsubscription point '!'")]
    DuplicateUnsubscriptionPoint,
    /// `^` where no subscription point is allowed (cold sources).
    #[error("subscription point '^' is not allowed here")]
    SubscriptionPointNotAllowed,
    /// `!` in a value diagram.
    #[error("unsubscription point '!' is only allowed in subscription windows")]
    UnsubscriptionPointNotAllowed,
    /// Marker after `|` or `#`.
    #[error("marker {0:?} after terminal notification")]
    AfterTerminal(char),
    /// Non-window character in a subscription window diagram.
    #[error("only '-', '^', '!', groups and time progression are allowed in a subscription window, found {0:?}")]
    InvalidWindowMarker(char),
    /// `!` placed before `^` in a subscription window.
    #[error("unsubscription point '!' precedes subscription point '^'")]
    UnsubscribeBeforeSubscribe,
    /// Time progression that does not convert to a whole number of frames.
    #[error("duration {0:?} is not a whole number of frames")]
    FractionalDuration(String),
    /// Time progression that overflows the frame counter.
    #[error("duration {0:?} is too large")]
    DurationOverflow(String),
}

/// First divergence between an actual and an expected notification sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceMismatch {
    /// Index of the first differing entry.
    pub index: usize,
    /// Expected entry at `index`, if the expected sequence is that long.
    pub expected_entry: Option<String>,
    /// Actual entry at `index`, if the actual sequence is that long.
    pub actual_entry: Option<String>,
    /// Full expected sequence, one entry per notification.
    pub expected: Vec<String>,
    /// Full actual sequence, one entry per notification.
    pub actual: Vec<String>,
}

impl std::fmt::Display for SequenceMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Notification sequences differ at index {}: expected {}, got {}",
            self.index,
            self.expected_entry.as_deref().unwrap_or("end of sequence"),
            self.actual_entry.as_deref().unwrap_or("end of sequence"),
        )?;
        writeln!(f, "  expected: [{}]", self.expected.join(", "))?;
        write!(f, "  actual:   [{}]", self.actual.join(", "))
    }
}

/// First divergence between actual and expected subscription windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionMismatch {
    /// Index of the first differing window.
    pub index: usize,
    /// Frame where the windows start to differ, if both exist.
    pub frame: Option<Frame>,
    /// Expected windows.
    pub expected: Vec<SubscriptionLog>,
    /// Recorded windows.
    pub actual: Vec<SubscriptionLog>,
}

impl std::fmt::Display for SubscriptionMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let render = |logs: &[SubscriptionLog]| {
            logs.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "Subscription windows differ at index {}", self.index)?;
        if let Some(frame) = self.frame {
            write!(f, " (frame {frame})")?;
        }
        writeln!(f)?;
        writeln!(f, "  expected: [{}]", render(&self.expected))?;
        write!(f, "  actual:   [{}]", render(&self.actual))
    }
}
