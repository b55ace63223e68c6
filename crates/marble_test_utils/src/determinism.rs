//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a marble test body produces
//! identical results every time it runs.
//!
//! # Testing Strategy
//!
//! A marble test is only useful if it is reproducible. Sources of
//! non-determinism include:
//!
//! - **Wall-clock time**: pipelines must schedule on the virtual
//!   [`Scheduler`] instead of sleeping or reading the system clock.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Pipelines that fan out over a map must iterate in a stable order.
//!
//! - **Shared state between tests**: every run gets a fresh harness, so a
//!   clock or queue can never leak from one test into the next.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual pipelines against cold and hot sources
//! 2. **Property tests**: generated diagrams still parse and run the same way
//! 3. **Parallel tests**: running N harnesses on N threads all match

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::thread;

use marble_core::harness::{MarbleHarness, RunContext, RunReport};
use marble_core::notification::TimedNotification;
use marble_core::observable::{Observable, Observer};
use marble_core::prelude::{HarnessConfig, Result};
use marble_core::scheduler::Scheduler;
use marble_core::time::Frame;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Final frame of each run.
    pub final_frames: Vec<Frame>,
}

impl DeterminismResult {
    fn from_runs(runs: Vec<(u64, Frame)>) -> Self {
        let (hashes, final_frames): (Vec<u64>, Vec<Frame>) = runs.into_iter().unzip();
        let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1])
            && final_frames.windows(2).all(|w| w[0] == w[1]);
        Self {
            is_deterministic,
            hashes,
            final_frames,
        }
    }

    /// Get all unique hashes (should be 1 for a deterministic test).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes or final frames.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Marble test is non-deterministic!\n\
                 Runs: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}\n\
                 Final frames: {:?}",
                self.hashes.len(),
                unique.len(),
                self.hashes,
                self.final_frames
            );
        }
    }
}

/// Run a test body through `runs` fresh harnesses and compare the outcomes.
///
/// A run's outcome is its [`RunReport`], or the rendered error if the run
/// failed, so a body that fails identically every time is still
/// deterministic.
///
/// # Example
///
/// ```
/// use marble_core::prelude::*;
/// use marble_test_utils::determinism::verify_determinism;
///
/// let values = MarbleValues::labels();
/// let result = verify_determinism(3, |ctx| {
///     let source = ctx.cold("--a--b--|", &values)?;
///     ctx.expect_observable(source).to_be("--a--b--|", &values)
/// });
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<F>(runs: usize, body: F) -> DeterminismResult
where
    F: Fn(&RunContext) -> Result<()>,
{
    verify_determinism_with(&HarnessConfig::default(), runs, body)
}

/// Like [`verify_determinism`], with an explicit harness configuration.
pub fn verify_determinism_with<F>(
    config: &HarnessConfig,
    runs: usize,
    body: F,
) -> DeterminismResult
where
    F: Fn(&RunContext) -> Result<()>,
{
    let outcomes = (0..runs)
        .map(|_| {
            let outcome = MarbleHarness::with_config(config.clone()).run(&body);
            let frame = outcome.as_ref().map_or(0, |report| report.final_frame);
            (outcome_hash(&outcome), frame)
        })
        .collect();
    let result = DeterminismResult::from_runs(outcomes);
    if !result.is_deterministic {
        tracing::warn!(
            runs,
            unique = result.unique_hashes().len(),
            "Marble runs diverged"
        );
    }
    result
}

/// Subscribe to a pipeline on a fresh scheduler and record everything it
/// emits until the queue drains or `max_frames` is passed.
pub fn record_notifications<T, E, O, F>(
    max_frames: Option<Frame>,
    build: F,
) -> Vec<TimedNotification<T, E>>
where
    T: 'static,
    E: 'static,
    O: Observable<T, E>,
    F: FnOnce(&Scheduler) -> O,
{
    let scheduler = Scheduler::new();
    let recorded = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&recorded);
    let clock = scheduler.clone();

    let pipeline = build(&scheduler);
    let subscription = pipeline.subscribe(
        &scheduler,
        Observer::new(move |notification| {
            sink.borrow_mut()
                .push(TimedNotification::new(clock.now(), notification));
        }),
    );
    scheduler.flush(max_frames);
    subscription.unsubscribe();
    scheduler.clear();

    recorded.take()
}

/// Record a pipeline `runs` times on fresh schedulers and compare hashes of
/// the recorded notifications.
pub fn verify_pipeline_determinism<T, E, O, F>(
    runs: usize,
    max_frames: Option<Frame>,
    build: F,
) -> DeterminismResult
where
    T: Hash + 'static,
    E: Hash + 'static,
    O: Observable<T, E>,
    F: Fn(&Scheduler) -> O,
{
    let outcomes = (0..runs)
        .map(|_| {
            let recorded = record_notifications(max_frames, &build);
            let frame = recorded.last().map_or(0, |n| n.frame);
            (compute_hash(&recorded), frame)
        })
        .collect();
    DeterminismResult::from_runs(outcomes)
}

/// Result of parallel harness runs.
#[derive(Debug, Clone)]
pub struct ParallelRunResult {
    /// Outcome hash from each harness.
    pub hashes: Vec<u64>,
    /// Number of harnesses run.
    pub num_runs: usize,
}

impl ParallelRunResult {
    /// Check if all harnesses produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all harnesses matched.
    ///
    /// # Panics
    ///
    /// Panics if harnesses produced different outcomes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel harnesses diverged!\n\
                 Harnesses: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_runs,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run the same body on `num_runs` threads, each with its own harness.
///
/// Harnesses are single-threaded and never shared; this checks that
/// concurrently running tests cannot influence each other.
pub fn run_parallel_harnesses<F>(num_runs: usize, body: F) -> ParallelRunResult
where
    F: Fn(&RunContext) -> Result<()> + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| s.spawn(|| outcome_hash(&MarbleHarness::new().run(&body))))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });

    ParallelRunResult { hashes, num_runs }
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn outcome_hash(outcome: &Result<RunReport>) -> u64 {
    match outcome {
        Ok(report) => compute_hash(&(0u8, report)),
        Err(e) => compute_hash(&(1u8, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marble_core::prelude::*;

    // =========================================================================
    // Harness determinism
    // =========================================================================

    #[test]
    fn test_passing_body_is_deterministic() {
        let values = MarbleValues::labels();
        let result = verify_determinism(4, |ctx| {
            let source = ctx.hot("-a-^-b-c-|", &values)?;
            ctx.expect_observable(source.clone()).to_be("--b-c-|", &values)?;
            ctx.expect_subscriptions(&source).to_be("^-----!")
        });

        result.assert_deterministic();
        assert_eq!(result.hashes.len(), 4);
        assert_eq!(result.final_frames, vec![6; 4]);
    }

    #[test]
    fn test_failing_body_fails_the_same_way() {
        let values = MarbleValues::labels();
        let result = verify_determinism(3, |ctx| {
            let source = ctx.cold("-a-|", &values)?;
            ctx.expect_observable(source).to_be("--a|", &values)
        });
        result.assert_deterministic();
    }

    #[test]
    #[should_panic(expected = "non-deterministic")]
    fn test_detects_divergence() {
        let result = DeterminismResult::from_runs(vec![(1, 0), (2, 0)]);
        result.assert_deterministic();
    }

    #[test]
    fn test_bounded_config() {
        let values = MarbleValues::labels();
        let result = verify_determinism_with(&HarnessConfig::bounded(3), 2, |ctx| {
            let source = ctx.cold("a-----b|", &values)?;
            ctx.expect_observable(source).to_be("a", &values)
        });
        result.assert_deterministic();
        assert_eq!(result.final_frames, vec![0, 0]);
    }

    // =========================================================================
    // Pipeline recording
    // =========================================================================

    #[test]
    fn test_record_cold_source() {
        let recorded = record_notifications(None, |_| {
            ColdSource::new(
                "-a|",
                vec![
                    TimedNotification::<char, String>::next(1, 'a'),
                    TimedNotification::complete(2),
                ],
            )
        });
        assert_eq!(
            recorded,
            vec![TimedNotification::next(1, 'a'), TimedNotification::complete(2)]
        );
    }

    #[test]
    fn test_pipeline_determinism() {
        let result = verify_pipeline_determinism(3, None, |_| {
            ColdSource::new(
                "ab|",
                vec![
                    TimedNotification::<char, String>::next(0, 'a'),
                    TimedNotification::next(1, 'b'),
                    TimedNotification::complete(2),
                ],
            )
        });
        result.assert_deterministic();
        assert_eq!(result.final_frames, vec![2, 2, 2]);
    }

    // =========================================================================
    // Parallel harnesses
    // =========================================================================

    #[test]
    fn test_parallel_harnesses_match() {
        let values = MarbleValues::labels();
        let result = run_parallel_harnesses(4, |ctx| {
            let source = ctx.cold("--a--b--|", &values)?;
            ctx.expect_observable(source).to_be("--a--b--|", &values)
        });
        result.assert_deterministic();
        assert_eq!(result.num_runs, 4);
    }
}
