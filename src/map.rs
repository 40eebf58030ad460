//! Bounded, order-preserving async map.

use std::panic;

use futures::{Future, StreamExt};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, trace};

use crate::common::{Concurrency, InitiationPolicy};
use crate::error::Result;
use crate::inflight::InFlight;

/// Applies `transform` to every item with at most `max_concurrent`
/// transforms running at once, and returns the outputs in input order.
///
/// This is a shorthand for `Mapper::new(max_concurrent).run(items, transform)`.
///
/// Panics if `max_concurrent` is 0. Must be awaited inside a tokio runtime.
/// ```rust
/// use std::convert::Infallible;
///
/// tokio_test::block_on(async {
///     let doubled = futures_boundedmap::map(3, vec![1, 2, 3, 4, 5], |x| async move {
///         Ok::<_, Infallible>(x * 2)
///     })
///     .await;
///     assert_eq!(doubled, Ok(vec![2, 4, 6, 8, 10]));
/// });
/// ```
pub async fn map<I, T, F, Fut, R, E>(
    max_concurrent: usize,
    items: I,
    transform: F,
) -> std::result::Result<Vec<R>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    Mapper::new(max_concurrent).run(items, transform).await
}

/// Reusable configuration for bounded maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapper {
    concurrency: Concurrency,
    policy: InitiationPolicy,
}

impl Mapper {
    /// Panics if `max_concurrent` is 0; use [`Mapper::try_new`] to get an
    /// error instead.
    pub fn new(max_concurrent: usize) -> Self {
        match Self::try_new(max_concurrent) {
            Ok(mapper) => mapper,
            Err(err) => panic!("{err}"),
        }
    }

    /// Like [`Mapper::new`], but returns an error instead of panicking on 0.
    pub fn try_new(max_concurrent: usize) -> Result<Self> {
        Concurrency::new(max_concurrent).map(Self::with_concurrency)
    }

    /// Builds a mapper from an already validated limit.
    pub fn with_concurrency(concurrency: Concurrency) -> Self {
        Self {
            concurrency,
            policy: InitiationPolicy::default(),
        }
    }

    /// Sets what happens to not-yet-started items once a failure is seen.
    pub fn initiation_policy(mut self, policy: InitiationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The most transforms this mapper lets run at once.
    pub fn max_concurrent(&self) -> usize {
        self.concurrency.get()
    }

    /// The configured [`InitiationPolicy`].
    pub fn policy(&self) -> InitiationPolicy {
        self.policy
    }

    /// Runs `transform` over `items`.
    ///
    /// `transform` is called in input order, exactly once for every item that
    /// gets started, and each returned future is spawned as its own tokio
    /// task. When there are more items than `max_concurrent`, the loop stops
    /// starting new items while `max_concurrent` tasks are outstanding and
    /// resumes as soon as any one of them settles.
    ///
    /// The first failure observed is returned as is. Tasks still running at
    /// that point are detached, not aborted: they run to completion and
    /// their outcome is dropped. A panic inside a task is resumed on the
    /// caller.
    pub async fn run<I, T, F, Fut, R, E>(
        &self,
        items: I,
        mut transform: F,
    ) -> std::result::Result<Vec<R>, E>
    where
        I: IntoIterator<Item = T>,
            F: FnMut(T) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        let items: Vec<T> = items.into_iter().collect();
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let limited = self.concurrency.limits(total);
        debug!(
            total,
            max_concurrent = self.max_concurrent(),
            limited,
            "Starting bounded map"
        );

        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut in_flight: InFlight<JoinHandle<std::result::Result<R, E>>> =
            InFlight::new(if limited { self.max_concurrent() } else { total });
        let mut first_error = None;

        for (index, item) in items.into_iter().enumerate() {
            in_flight.push(index, tokio::spawn(transform(item)));
            if !limited || !in_flight.is_full() {
                continue;
            }

            trace!(
                index,
                capacity = in_flight.capacity(),
                "In-flight set is full, waiting for a slot"
            );
            let Some((settled, outcome)) = in_flight.next().await else {
                continue;
            };
            match settle(outcome) {
                Ok(value) => fill(&mut slots, settled, value),
                Err(err) => match self.policy {
                    InitiationPolicy::StopOnFailure => {
                        debug!(
                            failed = settled,
                            started = index + 1,
                            total,
                            "Transform failed, not starting remaining items"
                        );
                        return Err(err);
                    }
                    InitiationPolicy::InitiateAll => {
                        if first_error.is_none() {
                            debug!(
                                failed = settled,
                                "Transform failed, still starting remaining items"
                            );
                            first_error = Some(err);
                        }
                    }
                },
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        while let Some((settled, outcome)) = in_flight.next().await {
            fill(&mut slots, settled, settle(outcome)?);
        }

        match slots.into_iter().collect::<Option<Vec<R>>>() {
            Some(results) => Ok(results),
            None => panic!("every item settled successfully but a result slot is empty"),
        }
    }
}

/// Stores `value` at `index`. Indices come from enumerating the collected
/// items, so they always fall inside `slots`.
fn fill<R>(slots: &mut [Option<R>], index: usize, value: R) {
    match slots.get_mut(index) {
        Some(slot) => *slot = Some(value),
        None => panic!("result index {index} out of range for {} items", slots.len()),
    }
}

/// Unwraps a joined task, resuming its panic on the current thread.
fn settle<R, E>(
    outcome: std::result::Result<std::result::Result<R, E>, JoinError>,
) -> std::result::Result<R, E> {
    match outcome {
        Ok(result) => result,
        Err(err) => match err.try_into_panic() {
            Ok(payload) => panic::resume_unwind(payload),
            // Only reachable when the runtime shuts down underneath us.
            Err(err) => panic!("transform task did not settle: {err}"),
        },
    }
}
