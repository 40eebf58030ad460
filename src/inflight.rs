//! The set of running handles the mapper races over.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{FuturesUnordered, Stream};
use futures::Future;
use pin_project::pin_project;

/// A future tagged with the position of the item it was started for.
#[pin_project]
#[must_use = "futures do nothing unless polled"]
pub struct Indexed<F> {
    index: usize,
    #[pin]
    future: F,
}

impl<F> Indexed<F> {
    /// Tags `future` with `index`.
    pub fn new(index: usize, future: F) -> Self {
        Self { index, future }
    }
}

impl<F> Future for Indexed<F>
where
    F: Future,
{
    type Output = (usize, F::Output);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let index = *this.index;
        this.future.poll(cx).map(|output| (index, output))
    }
}

/// Running handles, at most `max_concurrent` of which are expected at once.
///
/// The set doesn't refuse pushes past its capacity: the caller checks
/// [`InFlight::is_full`] after every push and drains one handle before
/// pushing again. Polling it as a `Stream` yields whichever handle settles
/// first, together with its index, and drops it from the set.
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct InFlight<F>
where
    F: Future,
{
    max_concurrent: usize,
    #[pin]
    running: FuturesUnordered<Indexed<F>>,
}

impl<F> InFlight<F>
where
    F: Future,
{
    /// Creates an empty set.
    ///
    /// Panics if `max_concurrent` is 0.
    /// ```rust
    /// use futures_boundedmap::inflight::InFlight;
    /// use futures::StreamExt;
    ///
    /// async fn dummy(val: u64) -> u64 {
    ///     val
    /// }
    ///
    /// let mut in_flight = InFlight::new(2);
    /// in_flight.push(0, dummy(10));
    /// assert!(!in_flight.is_full());
    /// in_flight.push(1, dummy(11));
    /// assert!(in_flight.is_full());
    ///
    /// tokio_test::block_on(async move {
    ///     let mut settled = Vec::new();
    ///     while let Some(pair) = in_flight.next().await {
    ///         settled.push(pair);
    ///     }
    ///     settled.sort();
    ///     assert_eq!(settled, vec![(0, 10), (1, 11)]);
    ///     assert!(in_flight.is_empty());
    /// });
    /// ```
    pub fn new(max_concurrent: usize) -> Self {
        assert!(max_concurrent > 0, "max_concurrent must be greater than 0");
        Self {
            max_concurrent,
            running: FuturesUnordered::new(),
        }
    }

    /// Adds a started handle for the item at `index`.
    pub fn push(&mut self, index: usize, future: F) {
        self.running.push(Indexed::new(index, future));
    }

    /// Number of handles that have not been yielded yet.
    pub fn len(&self) -> usize {
        self.running.len()
    }

    /// True when no handle is left.
    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// The `max_concurrent` the set was created with.
    pub fn capacity(&self) -> usize {
        self.max_concurrent
    }

    /// True once the set holds `max_concurrent` handles or more.
    pub fn is_full(&self) -> bool {
        self.len() >= self.max_concurrent
    }
}

impl<F> Stream for InFlight<F>
where
    F: Future,
{
    type Item = (usize, F::Output);

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().running.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cmp,
        sync::{
            atomic::{AtomicU8, Ordering},
            Arc,
        },
        time::Duration,
    };

    use futures::StreamExt;

    use super::*;

    /// Returns `val` after sleeping `delay_ms` milliseconds.
    async fn delayed(val: u64, delay_ms: u64) -> u64 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        val
    }

    /// Increments a counter while "running" and reports what it saw.
    async fn dummy_checked(val: Arc<AtomicU8>) -> u8 {
        let now = val.fetch_add(1, Ordering::AcqRel) + 1;
        tokio::time::sleep(Duration::from_millis(1)).await;
        val.fetch_sub(1, Ordering::AcqRel);
        now
    }

    #[tokio::test]
    async fn test_yields_first_settled() {
        let mut in_flight = InFlight::new(3);
        in_flight.push(0, delayed(100, 60));
        in_flight.push(1, delayed(101, 30));
        in_flight.push(2, delayed(102, 1));
        assert!(in_flight.is_full());
        assert_eq!(in_flight.size_hint(), (3, Some(3)));

        assert_eq!(in_flight.next().await, Some((2, 102)));
        assert_eq!(in_flight.len(), 2);
        assert!(!in_flight.is_full());
        assert_eq!(in_flight.next().await, Some((1, 101)));
        assert_eq!(in_flight.next().await, Some((0, 100)));
        assert_eq!(in_flight.next().await, None);
        assert!(in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_refill_stays_bounded() {
        let counter = Arc::new(AtomicU8::new(0));
        let mut in_flight = InFlight::new(4);
        let mut next = 0;
        let mut max_so_far = 0;
        let mut settled = 0;

        while next < 4 {
            in_flight.push(next, dummy_checked(Arc::clone(&counter)));
            next += 1;
        }
        while let Some((_, seen)) = in_flight.next().await {
            max_so_far = cmp::max(max_so_far, seen);
            settled += 1;
            if next < 20 {
                in_flight.push(next, dummy_checked(Arc::clone(&counter)));
                next += 1;
            }
            assert!(in_flight.len() <= in_flight.capacity());
        }
        assert_eq!(settled, 20);
        assert!(max_so_far <= 4);
    }

    #[test]
    fn test_indexed_keeps_index() {
        let fut = Indexed::new(7, async { "seven" });
        assert_eq!(tokio_test::block_on(fut), (7, "seven"));
    }

    #[test]
    #[should_panic(expected = "max_concurrent must be greater than 0")]
    fn test_zero_capacity() {
        let _ = InFlight::<std::future::Ready<()>>::new(0);
    }
}
