//! # Marble Development Tools
//!
//! Command-line helpers for working with marble diagrams:
//! - Inspect the timeline a diagram parses to
//! - Normalise a diagram to its canonical form
//! - Inspect subscription windows

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod inspect;
