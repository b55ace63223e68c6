//! The marble test harness.
//!
//! A test builds a [`MarbleHarness`] and calls [`MarbleHarness::run`] with a
//! body. The body creates sources and registers expectations through the
//! [`RunContext`]; nothing is compared while the body runs. When the body
//! returns, the harness connects hot sources, drains the virtual-time queue
//! and then checks every expectation in registration order.
//!
//! # Example
//!
//! ```
//! use marble_core::prelude::*;
//!
//! let values = MarbleValues::labels();
//! let report = MarbleHarness::new()
//!     .run(|ctx| {
//!         let source = ctx.cold("--a--b--|", &values)?;
//!         ctx.expect_observable(source.clone()).to_be("--a--b--|", &values)?;
//!         ctx.expect_subscriptions(&source).to_be("^-------!")?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(report.final_frame, 8);
//! assert_eq!(report.assertions, 2);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::HarnessConfig;
use crate::diagram::{self, SubscriptionLog};
use crate::error::{MarbleError, Result, SequenceMismatch, SubscriptionMismatch};
use crate::notification::TimedNotification;
use crate::observable::{Observable, Observer, Subscription};
use crate::scheduler::{FlushStats, Scheduler};
use crate::source::{ColdSource, HotSource, SubscriptionRecorder, TestSource};
use crate::time::Frame;
use crate::values::MarbleValues;

type Check = Box<dyn FnOnce() -> Result<()>>;
type Checks = Rc<RefCell<Vec<Check>>>;
type HotSetup = Box<dyn FnOnce(&Scheduler)>;

/// Outcome of a successful [`MarbleHarness::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunReport {
    /// Virtual actions executed.
    pub executed_actions: u64,
    /// Clock value after the last flush.
    pub final_frame: Frame,
    /// Actions left queued because of the frame limit.
    pub pending_actions: usize,
    /// Deferred assertions that were checked.
    pub assertions: usize,
}

/// Virtual-time harness. One per test case.
#[derive(Debug, Default)]
pub struct MarbleHarness {
    config: HarnessConfig,
    scheduler: Scheduler,
}

impl MarbleHarness {
    /// Harness with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Harness with a custom configuration.
    #[must_use]
    pub fn with_config(config: HarnessConfig) -> Self {
        Self {
            config,
            scheduler: Scheduler::new(),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Execute `body`, drain the virtual-time queue, then check every
    /// registered expectation.
    ///
    /// The harness is consumed so its clock cannot leak into another test.
    ///
    /// # Errors
    ///
    /// Returns the body's own error, or the first failing expectation
    /// ([`MarbleError::SequenceMismatch`] or
    /// [`MarbleError::SubscriptionMismatch`]).
    pub fn run<F>(self, body: F) -> Result<RunReport>
    where
        F: FnOnce(&RunContext) -> Result<()>,
    {
        let context = RunContext::new(self.scheduler.clone(), self.config.clone());
        let outcome = body(&context).and_then(|()| {
            let stats = context.flush();
            let assertions = context.verify()?;
            Ok(RunReport {
                executed_actions: self.scheduler.executed(),
                final_frame: stats.final_frame,
                pending_actions: stats.remaining,
                assertions,
            })
        });

        // Queued actions can hold handles to the scheduler itself.
        self.scheduler.clear();
        context.checks.borrow_mut().clear();

        match &outcome {
            Ok(report) => tracing::info!(
                executed = report.executed_actions,
                final_frame = report.final_frame,
                pending = report.pending_actions,
                assertions = report.assertions,
                "Marble run passed"
            ),
            Err(e) => tracing::debug!(frame = self.scheduler.now(), error = %e, "Marble run failed"),
        }
        outcome
    }
}

/// Helpers available to a test body.
pub struct RunContext {
    scheduler: Scheduler,
    config: HarnessConfig,
    hot_setups: RefCell<Vec<HotSetup>>,
    checks: Checks,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("scheduler", &self.scheduler)
            .field("pending_hot_sources", &self.hot_setups.borrow().len())
            .field("expectations", &self.checks.borrow().len())
            .finish()
    }
}

impl RunContext {
    fn new(scheduler: Scheduler, config: HarnessConfig) -> Self {
        Self {
            scheduler,
            config,
            hot_setups: RefCell::new(Vec::new()),
            checks: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// The run's scheduler, for pipelines that need to schedule work.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Current virtual frame.
    #[must_use]
    pub fn now(&self) -> Frame {
        self.scheduler.now()
    }

    /// Create a cold source from `diagram`.
    ///
    /// # Errors
    ///
    /// Returns [`MarbleError::Parse`] if the diagram is malformed or contains
    /// `^` or `!`, and [`MarbleError::Configuration`] for unmapped labels.
    pub fn cold<T, E>(&self, diagram: &str, values: &MarbleValues<T, E>) -> Result<ColdSource<T, E>>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        let messages = diagram::parse_cold_marbles(diagram)?.resolve(values)?;
        tracing::debug!(diagram, notifications = messages.len(), "Created cold source");
        Ok(ColdSource::new(diagram, messages))
    }

    /// Create a hot source from `diagram`.
    ///
    /// Frames count from the diagram's `^` (or its start) as run frame 0.
    /// The source starts emitting when the body returns or
    /// [`RunContext::flush`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`MarbleError::Parse`] if the diagram is malformed or contains
    /// `!`, and [`MarbleError::Configuration`] for unmapped labels.
    pub fn hot<T, E>(&self, diagram: &str, values: &MarbleValues<T, E>) -> Result<HotSource<T, E>>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        let messages = diagram::parse_marbles(diagram)?.resolve(values)?;
        let source = HotSource::new(diagram, messages);
        let pending = source.clone();
        self.hot_setups
            .borrow_mut()
            .push(Box::new(move |scheduler: &Scheduler| {
                pending.connect(scheduler);
            }));
        Ok(source)
    }

    /// Frame of the `|` marker in `diagram`, for configuring pipelines in
    /// frames (e.g. a debounce duration of `"---|"`).
    ///
    /// # Errors
    ///
    /// Returns [`MarbleError::Parse`] for malformed diagrams and
    /// [`MarbleError::Configuration`] if there is no `|`.
    pub fn time(&self, diagram: &str) -> Result<Frame> {
        diagram::parse_cold_marbles(diagram)?
            .terminal()
            .filter(|event| event.kind == diagram::MarbleKind::Complete)
            .map(|event| event.frame)
            .ok_or_else(|| {
                MarbleError::Configuration(format!("time diagram {diagram:?} has no '|' marker"))
            })
    }

    /// Connect pending hot sources and drain the queue now, respecting the
    /// configured frame limit.
    ///
    /// The harness flushes again after the body returns, so this is only
    /// needed to inspect state mid-body.
    pub fn flush(&self) -> FlushStats {
        let setups = std::mem::take(&mut *self.hot_setups.borrow_mut());
        for setup in setups {
            setup(&self.scheduler);
        }

        let stats = self.scheduler.flush(self.config.max_frames);
        if stats.remaining > 0 && self.config.warn_unfinished {
            tracing::warn!(
                frame = stats.final_frame,
                remaining = stats.remaining,
                next_frame = ?self.scheduler.next_frame(),
                "Flush stopped at the frame limit with actions still queued"
            );
        }
        stats
    }

    /// Subscribe to `observable` at frame 0 and record what it emits.
    pub fn expect_observable<T, E, O>(&self, observable: O) -> ObservableExpectation<T, E>
    where
        T: 'static,
        E: 'static,
        O: Observable<T, E> + 'static,
    {
        self.observe(observable, SubscriptionLog::new(0, None))
    }

    /// Like [`RunContext::expect_observable`], but subscribe and unsubscribe
    /// per a subscription window diagram such as `"---^---!"`.
    ///
    /// Notifications at the unsubscription frame are not recorded.
    ///
    /// # Errors
    ///
    /// Returns [`MarbleError::Parse`] for a malformed window.
    pub fn expect_observable_with<T, E, O>(
        &self,
        observable: O,
        window: &str,
    ) -> Result<ObservableExpectation<T, E>>
    where
        T: 'static,
        E: 'static,
        O: Observable<T, E> + 'static,
    {
        let window = diagram::parse_subscription_window(window)?;
        Ok(self.observe(observable, window))
    }

    /// Assert on the subscription windows of a source.
    pub fn expect_subscriptions<S>(&self, source: &S) -> SubscriptionExpectation
    where
        S: TestSource + ?Sized,
    {
        SubscriptionExpectation {
            recorder: source.recorder().clone(),
            checks: Rc::clone(&self.checks),
            registered: false,
        }
    }

    fn observe<T, E, O>(&self, observable: O, window: SubscriptionLog) -> ObservableExpectation<T, E>
    where
        T: 'static,
        E: 'static,
        O: Observable<T, E> + 'static,
    {
        let actual = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&actual);
        let clock = self.scheduler.clone();
        let observer = Observer::new(move |notification| {
            sink.borrow_mut()
                .push(TimedNotification::new(clock.now(), notification));
        });

        let subscription = Subscription::new();
        {
            let observer = observer.clone();
            subscription.add(move || observer.close());
        }

        let handle = subscription.clone();
        self.scheduler.schedule_at(window.subscribed, move |scheduler| {
            let inner = observable.subscribe(scheduler, observer);
            handle.add_child(inner);
        });
        if let Some(end) = window.unsubscribed {
            self.scheduler
                .schedule_at(end, move |_| subscription.unsubscribe());
        }

        ObservableExpectation {
            actual,
            checks: Rc::clone(&self.checks),
            registered: false,
        }
    }

    fn verify(&self) -> Result<usize> {
        let checks = std::mem::take(&mut *self.checks.borrow_mut());
        let count = checks.len();
        for (index, check) in checks.into_iter().enumerate() {
            if let Err(e) = check() {
                tracing::debug!(expectation = index, "Expectation failed");
                return Err(e);
            }
        }
        Ok(count)
    }
}

/// Pending assertion on the notifications of an observable.
///
/// Finish it with [`ObservableExpectation::to_be`] or
/// [`ObservableExpectation::to_equal`]; dropping it unfinished logs a
/// warning.
#[must_use = "call to_be or to_equal to register the expectation"]
pub struct ObservableExpectation<T, E> {
    actual: Rc<RefCell<Vec<TimedNotification<T, E>>>>,
    checks: Checks,
    registered: bool,
}

impl<T, E> fmt::Debug for ObservableExpectation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableExpectation")
            .field("recorded", &self.actual.borrow().len())
            .field("registered", &self.registered)
            .finish()
    }
}

impl<T, E> ObservableExpectation<T, E>
where
    T: Clone + PartialEq + fmt::Debug + 'static,
    E: Clone + PartialEq + fmt::Debug + 'static,
{
    /// Expect the notifications described by `diagram`.
    ///
    /// # Errors
    ///
    /// Returns [`MarbleError::Parse`] or [`MarbleError::Configuration`]
    /// immediately if the expected diagram is invalid. A mismatch is reported
    /// by [`MarbleHarness::run`].
    pub fn to_be(mut self, diagram: &str, values: &MarbleValues<T, E>) -> Result<()> {
        // A malformed diagram is reported through the error, not the drop warning.
        self.registered = true;
        let expected = diagram::parse_diagram(diagram, values)?;
        self.to_equal(expected);
        Ok(())
    }

    /// Expect exactly `expected`.
    pub fn to_equal(mut self, expected: Vec<TimedNotification<T, E>>) {
        self.registered = true;
        let actual = Rc::clone(&self.actual);
        self.checks
            .borrow_mut()
            .push(Box::new(move || compare_sequences(&actual.borrow(), &expected)));
    }
}

impl<T, E> Drop for ObservableExpectation<T, E> {
    fn drop(&mut self) {
        if !self.registered {
            tracing::warn!("Observable expectation dropped without to_be or to_equal");
        }
    }
}

/// Pending assertion on the subscription windows of a source.
#[must_use = "call to_be or to_be_all to register the expectation"]
pub struct SubscriptionExpectation {
    recorder: SubscriptionRecorder,
    checks: Checks,
    registered: bool,
}

impl fmt::Debug for SubscriptionExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionExpectation")
            .field("recorded", &self.recorder.snapshot())
            .field("registered", &self.registered)
            .finish()
    }
}

impl SubscriptionExpectation {
    /// Expect exactly one subscription, described by `window`.
    ///
    /// # Errors
    ///
    /// Returns [`MarbleError::Parse`] immediately for a malformed window.
    pub fn to_be(self, window: &str) -> Result<()> {
        self.to_be_all(&[window])
    }

    /// Expect one subscription per window, in subscription order.
    ///
    /// # Errors
    ///
    /// Returns [`MarbleError::Parse`] immediately for a malformed window.
    pub fn to_be_all(mut self, windows: &[&str]) -> Result<()> {
        self.registered = true;
        let expected = windows
            .iter()
            .map(|window| diagram::parse_subscription_window(window))
            .collect::<Result<Vec<_>>>()?;
        let recorder = self.recorder.clone();
        self.checks.borrow_mut().push(Box::new(move || {
            compare_subscriptions(&recorder.snapshot(), &expected)
        }));
        Ok(())
    }
}

impl Drop for SubscriptionExpectation {
    fn drop(&mut self) {
        if !self.registered {
            tracing::warn!("Subscription expectation dropped without to_be or to_be_all");
        }
    }
}

/// Compare two notification sequences entry by entry.
///
/// # Errors
///
/// Returns [`MarbleError::SequenceMismatch`] describing the first entry that
/// differs in frame or notification, or the first missing entry.
pub fn compare_sequences<T, E>(
    actual: &[TimedNotification<T, E>],
    expected: &[TimedNotification<T, E>],
) -> Result<()>
where
    T: PartialEq + fmt::Debug,
    E: PartialEq + fmt::Debug,
{
    let Some(index) = first_difference(actual, expected) else {
        return Ok(());
    };
    let entries = |sequence: &[TimedNotification<T, E>]| {
        sequence.iter().map(ToString::to_string).collect::<Vec<_>>()
    };
    Err(MarbleError::SequenceMismatch(Box::new(SequenceMismatch {
        index,
        expected_entry: expected.get(index).map(ToString::to_string),
        actual_entry: actual.get(index).map(ToString::to_string),
        expected: entries(expected),
        actual: entries(actual),
    })))
}

fn compare_subscriptions(actual: &[SubscriptionLog], expected: &[SubscriptionLog]) -> Result<()> {
    let Some(index) = first_difference(actual, expected) else {
        return Ok(());
    };
    let frame = match (expected.get(index), actual.get(index)) {
        (Some(e), Some(a)) if e.subscribed != a.subscribed => Some(e.subscribed.min(a.subscribed)),
        (Some(e), Some(a)) => match (e.unsubscribed, a.unsubscribed) {
            (Some(x), Some(y)) => Some(x.min(y)),
            (x, y) => x.or(y),
        },
        (Some(only), None) | (None, Some(only)) => Some(only.subscribed),
        (None, None) => None,
    };
    Err(MarbleError::SubscriptionMismatch(Box::new(SubscriptionMismatch {
        index,
        frame,
        expected: expected.to_vec(),
        actual: actual.to_vec(),
    })))
}

fn first_difference<A: PartialEq>(actual: &[A], expected: &[A]) -> Option<usize> {
    actual
        .iter()
        .zip(expected)
        .position(|(a, e)| a != e)
        .or_else(|| (actual.len() != expected.len()).then_some(actual.len().min(expected.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::from_fn;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn labels() -> MarbleValues<String, String> {
        MarbleValues::labels()
    }

    // ========================================================================
    // Sequence comparison
    // ========================================================================

    #[test]
    fn test_compare_equal_sequences() {
        let seq = vec![
            TimedNotification::<char, String>::next(1, 'a'),
            TimedNotification::complete(2),
        ];
        assert!(compare_sequences(&seq, &seq.clone()).is_ok());
    }

    #[test]
    fn test_compare_reports_first_difference() {
        let actual = vec![
            TimedNotification::<char, String>::next(1, 'a'),
            TimedNotification::next(3, 'b'),
        ];
        let expected = vec![
            TimedNotification::<char, String>::next(1, 'a'),
            TimedNotification::next(4, 'b'),
        ];
        let err = compare_sequences(&actual, &expected).unwrap_err();
        let MarbleError::SequenceMismatch(mismatch) = err else {
            panic!("expected sequence mismatch, got {err:?}");
        };
        assert_eq!(mismatch.index, 1);
        assert_eq!(mismatch.expected_entry.as_deref(), Some("Next('b')@4"));
        assert_eq!(mismatch.actual_entry.as_deref(), Some("Next('b')@3"));
    }

    #[test]
    fn test_compare_reports_missing_tail() {
        let actual = vec![TimedNotification::<char, String>::next(1, 'a')];
        let expected = vec![
            TimedNotification::<char, String>::next(1, 'a'),
            TimedNotification::complete(2),
        ];
        let err = compare_sequences(&actual, &expected).unwrap_err();
        let MarbleError::SequenceMismatch(mismatch) = err else {
            panic!("expected sequence mismatch, got {err:?}");
        };
        assert_eq!(mismatch.index, 1);
        assert_eq!(mismatch.actual_entry, None);
        assert!(mismatch.to_string().contains("end of sequence"));
    }

    // ========================================================================
    // Runs
    // ========================================================================

    #[test]
    fn test_cold_passthrough() {
        let values = labels();
        let report = MarbleHarness::new()
            .run(|ctx| {
                let source = ctx.cold("-a-b-|", &values)?;
                ctx.expect_observable(source).to_be("-a-b-|", &values)
            })
            .unwrap();
        assert_eq!(report.final_frame, 5);
        assert_eq!(report.assertions, 1);
        assert_eq!(report.pending_actions, 0);
    }

    #[test]
    fn test_mismatch_fails_run() {
        let values = labels();
        let err = MarbleHarness::new()
            .run(|ctx| {
                let source = ctx.cold("-a-b-|", &values)?;
                ctx.expect_observable(source).to_be("-a--b|", &values)
            })
            .unwrap_err();
        assert!(err.is_mismatch());
    }

    #[test]
    fn test_parse_error_is_immediate() {
        let values = labels();
        let mut reached = false;
        let err = MarbleHarness::new()
            .run(|ctx| {
                ctx.cold("-a-^-|", &values)?;
                reached = true;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, MarbleError::Parse { .. }));
        assert!(!reached);
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured_warnings(body: impl FnOnce()) -> String {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, body);
        let bytes = log.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_malformed_expected_diagram_is_not_reported_as_dropped() {
        let values = labels();
        let mut outcome = None;
        let logged = captured_warnings(|| {
            outcome = Some(MarbleHarness::new().run(|ctx| {
                let source = ctx.cold("-a|", &values)?;
                ctx.expect_observable(source).to_be("(a|", &values)
            }));
        });

        let err = outcome.unwrap().unwrap_err();
        assert!(matches!(err, MarbleError::Parse { .. }));
        assert!(!logged.contains("dropped without"), "{logged}");
    }

    #[test]
    fn test_malformed_window_is_not_reported_as_dropped() {
        let values = labels();
        let mut outcome = None;
        let logged = captured_warnings(|| {
            outcome = Some(MarbleHarness::new().run(|ctx| {
                let source = ctx.cold("-a|", &values)?;
                ctx.expect_subscriptions(&source).to_be("^-^")
            }));
        });

        let err = outcome.unwrap().unwrap_err();
        assert!(matches!(err, MarbleError::Parse { .. }));
        assert!(!logged.contains("dropped without"), "{logged}");
    }

    #[test]
    fn test_unfinished_expectation_is_reported_as_dropped() {
        let values = labels();
        let logged = captured_warnings(|| {
            MarbleHarness::new()
                .run(|ctx| {
                    let source = ctx.cold("-a|", &values)?;
                    let _ = ctx.expect_observable(source);
                    Ok(())
                })
                .unwrap();
        });

        assert!(logged.contains("dropped without to_be or to_equal"), "{logged}");
    }

    #[test]
    fn test_hot_source_from_caret() {
        let values = labels();
        MarbleHarness::new()
            .run(|ctx| {
                let source = ctx.hot("---a--^-b-|", &values)?;
                ctx.expect_observable(source).to_be("--b-|", &values)
            })
            .unwrap();
    }

    #[test]
    fn test_window_excludes_unsubscription_frame() {
        let values = labels();
        MarbleHarness::new()
            .run(|ctx| {
                let source = ctx.hot("abcdefghij", &values)?;
                ctx.expect_observable_with(source, "^------!")?
                    .to_be("abcdefg", &values)
            })
            .unwrap();
    }

    #[test]
    fn test_window_on_cold_source_shifts_subscription() {
        let values = labels();
        MarbleHarness::new()
            .run(|ctx| {
                let source = ctx.cold("a-b-c|", &values)?;
                ctx.expect_observable_with(source.clone(), "--^---!")?
                    .to_be("--a-b-", &values)?;
                ctx.expect_subscriptions(&source).to_be("--^---!")
            })
            .unwrap();
    }

    #[test]
    fn test_subscription_mismatch() {
        let values = labels();
        let err = MarbleHarness::new()
            .run(|ctx| {
                let source = ctx.cold("--|", &values)?;
                ctx.expect_observable(source.clone()).to_be("--|", &values)?;
                ctx.expect_subscriptions(&source).to_be("^!")
            })
            .unwrap_err();
        let MarbleError::SubscriptionMismatch(mismatch) = err else {
            panic!("expected subscription mismatch, got {err:?}");
        };
        assert_eq!(mismatch.actual, vec![SubscriptionLog::new(0, Some(2))]);
        assert_eq!(mismatch.expected, vec![SubscriptionLog::new(0, Some(1))]);
        assert_eq!(mismatch.frame, Some(1));
    }

    #[test]
    fn test_never_subscribed_source() {
        let values = labels();
        MarbleHarness::new()
            .run(|ctx| {
                let source = ctx.cold::<String, String>("--a--|", &values)?;
                ctx.expect_subscriptions(&source).to_be_all(&[])
            })
            .unwrap();
    }

    #[test]
    fn test_max_frames_stops_endless_pipeline() {
        fn tick(scheduler: &Scheduler, observer: Observer<u64, String>) {
            observer.next(scheduler.now());
            if !observer.is_closed() {
                scheduler.schedule(10, move |s| tick(s, observer));
            }
        }

        let values = MarbleValues::<u64, String>::new()
            .with('a', 0)
            .with('b', 10)
            .with('c', 20);
        let report = MarbleHarness::with_config(HarnessConfig::bounded(25))
            .run(|ctx| {
                let ticks = from_fn(|scheduler: &Scheduler, observer: Observer<u64, String>| {
                    tick(scheduler, observer);
                    Subscription::new()
                });
                ctx.expect_observable(ticks)
                    .to_be("a 9ms b 9ms c", &values)
            })
            .unwrap();
        assert_eq!(report.final_frame, 20);
        assert_eq!(report.pending_actions, 1);
    }

    #[test]
    fn test_time_helper() {
        MarbleHarness::new()
            .run(|ctx| {
                assert_eq!(ctx.time("---|")?, 3);
                assert_eq!(ctx.time("1s |")?, 1000);
                assert!(matches!(ctx.time("---"), Err(MarbleError::Configuration(_))));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_flush_inside_body() {
        let values = labels();
        MarbleHarness::new()
            .run(|ctx| {
                let source = ctx.cold("--a|", &values)?;
                ctx.expect_observable(source).to_be("--a|", &values)?;
                ctx.flush();
                assert_eq!(ctx.now(), 3);
                Ok(())
            })
            .unwrap();
    }
}
