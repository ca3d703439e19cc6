//! The middleware pipeline.
//!
//! A [`MiddlewarePipeline`] runs an ordered list of guards over one context.
//! Guards are popped from the queue as they are dispatched, so an instance
//! supports a single traversal. The pipeline keeps an untouched copy of the
//! original list, and [`MiddlewarePipeline::rebuild`] uses it to make a fresh
//! instance.
//!
//! The pipeline never spawns and never yields on its own. Suspension happens
//! only inside a guard that awaits something.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::error::{PipelineError, Result};
use crate::guard::{Guard, GuardOutcome};

pub struct MiddlewarePipeline<C> {
    original: Vec<Arc<dyn Guard<C>>>,
    queue: VecDeque<Arc<dyn Guard<C>>>,
    traversed: bool,
}

impl<C: Send + 'static> MiddlewarePipeline<C> {
    /// Build a pipeline over `guards`, run in the given order.
    pub fn new(guards: Vec<Arc<dyn Guard<C>>>) -> Self {
        Self {
            queue: guards.iter().cloned().collect(),
            original: guards,
            traversed: false,
        }
    }

    /// A fresh, untraversed pipeline over the original guard list.
    pub fn rebuild(&self) -> Self {
        Self::new(self.original.clone())
    }

    /// Guards not yet dispatched.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Length of the original guard list.
    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// True once [`pipe`](Self::pipe) has been called.
    pub fn is_traversed(&self) -> bool {
        self.traversed
    }

    /// Run the chain.
    ///
    /// Each guard receives the context returned by the previous one. The
    /// first guard that does not continue ends the traversal and its outcome
    /// is returned; guards after it are never dispatched. When every guard
    /// continues, the final context comes back as `Continue`. An empty
    /// pipeline continues immediately.
    ///
    /// Fails with [`PipelineError::Exhausted`] when called a second time.
    pub async fn pipe(&mut self, ctx: C) -> Result<GuardOutcome<C>> {
        if self.traversed {
            return Err(PipelineError::Exhausted);
        }
        self.traversed = true;

        let total = self.original.len();
        let mut ctx = ctx;
        while let Some(guard) = self.queue.pop_front() {
            let step = total - self.queue.len();
            tracing::debug!(step, total, "dispatching guard");

            match guard.handle(ctx).await {
                GuardOutcome::Continue(next) => ctx = next,
                diverted => {
                    tracing::debug!(
                        step,
                        skipped = self.queue.len(),
                        redirect = ?diverted.redirect_target(),
                        "guard diverted the chain"
                    );
                    return Ok(diverted);
                }
            }
        }

        Ok(GuardOutcome::Continue(ctx))
    }
}

impl<C> fmt::Debug for MiddlewarePipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewarePipeline")
            .field("guards", &self.original.len())
            .field("remaining", &self.queue.len())
            .field("traversed", &self.traversed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::guard_fn;
    use portcullis_core::Location;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<usize>>>;

    type Step = fn(Vec<usize>) -> GuardOutcome<Vec<usize>>;

    fn recording(log: &Log, id: usize, outcome: Step) -> Arc<dyn Guard<Vec<usize>>> {
        let log = Arc::clone(log);
        guard_fn(move |mut trail: Vec<usize>| {
            log.lock().unwrap().push(id);
            trail.push(id);
            outcome(trail)
        })
    }

    fn pass(trail: Vec<usize>) -> GuardOutcome<Vec<usize>> {
        GuardOutcome::Continue(trail)
    }

    fn block(_: Vec<usize>) -> GuardOutcome<Vec<usize>> {
        GuardOutcome::Block
    }

    fn deny(_: Vec<usize>) -> GuardOutcome<Vec<usize>> {
        GuardOutcome::Redirect(Location::new("/403"))
    }

    #[tokio::test]
    async fn test_empty_pipeline_continues() {
        let mut pipeline = MiddlewarePipeline::<u8>::new(vec![]);
        assert_eq!(pipeline.pipe(9).await, Ok(GuardOutcome::Continue(9)));
    }

    #[tokio::test]
    async fn test_guards_run_in_order_and_thread_context() {
        let log = Log::default();
        let guards = (0..4).map(|i| recording(&log, i, pass)).collect();
        let mut pipeline = MiddlewarePipeline::new(guards);

        let outcome = pipeline.pipe(Vec::new()).await.unwrap();
        assert_eq!(outcome, GuardOutcome::Continue(vec![0, 1, 2, 3]));
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(pipeline.remaining(), 0);
    }

    #[tokio::test]
    async fn test_block_stops_later_guards() {
        let log = Log::default();
        let guards = vec![
            recording(&log, 0, pass),
            recording(&log, 1, block),
            recording(&log, 2, pass),
        ];
        let mut pipeline = MiddlewarePipeline::new(guards);

        assert_eq!(pipeline.pipe(Vec::new()).await, Ok(GuardOutcome::Block));
        assert_eq!(*log.lock().unwrap(), vec![0, 1]);
        assert_eq!(pipeline.remaining(), 1);
    }

    #[tokio::test]
    async fn test_redirect_is_returned() {
        let log = Log::default();
        let mut pipeline =
            MiddlewarePipeline::new(vec![recording(&log, 0, deny), recording(&log, 1, pass)]);

        let outcome = pipeline.pipe(Vec::new()).await.unwrap();
        assert_eq!(outcome.redirect_target(), Some(&Location::new("/403")));
        assert_eq!(*log.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_second_traversal_fails_and_rebuild_restores() {
        let log = Log::default();
        let mut pipeline =
            MiddlewarePipeline::new(vec![recording(&log, 0, pass), recording(&log, 1, pass)]);

        pipeline.pipe(Vec::new()).await.unwrap();
        assert!(pipeline.is_traversed());
        assert_eq!(pipeline.pipe(Vec::new()).await, Err(PipelineError::Exhausted));
        assert_eq!(log.lock().unwrap().len(), 2);

        let mut fresh = pipeline.rebuild();
        assert_eq!(fresh.remaining(), 2);
        assert_eq!(fresh.pipe(Vec::new()).await, Ok(GuardOutcome::Continue(vec![0, 1])));
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 0, 1]);
    }

    #[tokio::test]
    async fn test_blocked_pipeline_cannot_resume() {
        let log = Log::default();
        let mut pipeline =
            MiddlewarePipeline::new(vec![recording(&log, 0, block), recording(&log, 1, pass)]);

        pipeline.pipe(Vec::new()).await.unwrap();
        assert_eq!(pipeline.pipe(Vec::new()).await, Err(PipelineError::Exhausted));
        assert_eq!(*log.lock().unwrap(), vec![0]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn run<T>(fut: impl std::future::Future<Output = T>) -> T {
            tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap()
                .block_on(fut)
        }

        proptest! {
            #[test]
            fn all_continue_reaches_end_once_in_order(n in 0usize..24) {
                let log = Log::default();
                let guards = (0..n).map(|i| recording(&log, i, pass)).collect();
                let mut pipeline = MiddlewarePipeline::new(guards);

                let outcome = run(pipeline.pipe(Vec::new())).unwrap();
                let expected: Vec<usize> = (0..n).collect();
                prop_assert_eq!(outcome, GuardOutcome::Continue(expected.clone()));
                prop_assert_eq!(log.lock().unwrap().clone(), expected);
            }

            #[test]
            fn nothing_runs_past_a_blocking_guard(n in 1usize..24, seed in any::<usize>()) {
                let blocker = seed % n;
                let log = Log::default();
                let guards = (0..n)
                    .map(|i| recording(&log, i, if i == blocker { block } else { pass }))
                    .collect();
                let mut pipeline = MiddlewarePipeline::new(guards);

                let outcome = run(pipeline.pipe(Vec::new())).unwrap();
                prop_assert!(outcome.is_block());
                prop_assert_eq!(log.lock().unwrap().clone(), (0..=blocker).collect::<Vec<_>>());
            }
        }
    }
}
