//! # Marble Core
//!
//! Virtual-time test harness for reactive-stream pipelines.
//!
//! Timed notification sequences are written as marble diagrams such as
//! `"--a--b--|"`. The harness turns them into test-double sources and
//! expectations, drives a virtual clock so that logically asynchronous
//! pipelines run synchronously, and compares what a pipeline produced with
//! what the diagram says it should produce.
//!
//! This crate contains **only** deterministic logic:
//! - No wall clock
//! - No threads
//! - No randomness
//!
//! so the same test body always produces the same notifications.
//!
//! ## Crate Structure
//!
//! - [`diagram`] - Marble parser, subscription windows and rendering
//! - [`notification`] - Notification values and their frames
//! - [`scheduler`] - Virtual clock and action queue
//! - [`observable`] - The seam pipelines under test implement
//! - [`source`] - Cold and hot test-double sources
//! - [`harness`] - Running a test body and checking expectations
//! - [`values`] - Label to value substitution
//! - [`config`] - Harness settings

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod diagram;
pub mod error;
pub mod harness;
pub mod notification;
pub mod observable;
pub mod scheduler;
pub mod source;
pub mod time;
pub mod values;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::HarnessConfig;
    pub use crate::diagram::{
        parse_cold_marbles, parse_diagram, parse_marbles, parse_subscription_window, render,
        MarbleEvent, MarbleKind, Marbles, SubscriptionLog,
    };
    pub use crate::error::{MarbleError, ParseErrorKind, Result};
    pub use crate::harness::{MarbleHarness, RunContext, RunReport};
    pub use crate::notification::{Notification, TimedNotification};
    pub use crate::observable::{from_fn, Observable, Observer, SharedObservable, Subscription};
    pub use crate::scheduler::Scheduler;
    pub use crate::source::{ColdSource, HotSource, TestSource};
    pub use crate::time::Frame;
    pub use crate::values::MarbleValues;
}
