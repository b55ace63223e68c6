//! Label substitution for marble diagrams.
//!
//! A diagram only carries single-character labels. [`MarbleValues`] maps
//! those labels to the payloads a pipeline actually emits, and supplies the
//! payload used for the `#` error marker.

use std::collections::BTreeMap;

use crate::error::{MarbleError, Result};

/// Label-to-value table plus the error payload for `#`.
///
/// # Example
///
/// ```
/// use marble_core::values::MarbleValues;
///
/// let values = MarbleValues::new()
///     .with('a', 1)
///     .with('b', 2)
///     .with_error("boom".to_string());
/// assert_eq!(values.value('a').unwrap(), 1);
/// assert!(values.value('z').is_err());
/// ```
#[derive(Debug, Clone)]
pub struct MarbleValues<T, E> {
    values: BTreeMap<char, T>,
    fallback: Option<fn(char) -> T>,
    error: Option<E>,
}

impl<T, E> Default for MarbleValues<T, E> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
            fallback: None,
            error: None,
        }
    }
}

impl<T, E> MarbleValues<T, E> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `label` to `value`.
    #[must_use]
    pub fn with(mut self, label: char, value: T) -> Self {
        self.values.insert(label, value);
        self
    }

    /// Set the payload used for `#`.
    #[must_use]
    pub fn with_error(mut self, error: E) -> Self {
        self.error = Some(error);
        self
    }

    /// Derive values for labels that have no explicit entry.
    #[must_use]
    pub fn with_fallback(mut self, fallback: fn(char) -> T) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Explicit entry for `label`, ignoring the fallback.
    #[must_use]
    pub fn get(&self, label: char) -> Option<&T> {
        self.values.get(&label)
    }

    /// Number of explicit entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no explicit entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: Clone, E: Clone> MarbleValues<T, E> {
    /// Resolve `label` to its value.
    ///
    /// # Errors
    ///
    /// Returns [`MarbleError::Configuration`] if the label has no entry and
    /// no fallback is set.
    pub fn value(&self, label: char) -> Result<T> {
        if let Some(value) = self.values.get(&label) {
            return Ok(value.clone());
        }
        self.fallback.map(|f| f(label)).ok_or_else(|| {
            MarbleError::Configuration(format!("no value mapped for marble label {label:?}"))
        })
    }

    /// The payload for `#`.
    ///
    /// # Errors
    ///
    /// Returns [`MarbleError::Configuration`] if no error payload was set.
    pub fn error_value(&self) -> Result<E> {
        self.error.clone().ok_or_else(|| {
            MarbleError::Configuration(
                "diagram contains '#' but no error value was provided".to_string(),
            )
        })
    }
}

impl MarbleValues<String, String> {
    /// Identity table: every label emits itself as a string, `#` emits
    /// `"error"`.
    #[must_use]
    pub fn labels() -> Self {
        Self::new()
            .with_fallback(|label| label.to_string())
            .with_error("error".to_string())
    }
}

impl MarbleValues<char, String> {
    /// Every label emits itself as a `char`, `#` emits `"error"`.
    #[must_use]
    pub fn chars() -> Self {
        Self::new()
            .with_fallback(|label| label)
            .with_error("error".to_string())
    }
}

impl<T, E> FromIterator<(char, T)> for MarbleValues<T, E> {
    fn from_iter<I: IntoIterator<Item = (char, T)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
            fallback: None,
            error: None,
        }
    }
}
