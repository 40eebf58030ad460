//! Configuration shared by the mapper and the in-flight set.

use std::num::NonZeroUsize;

use crate::error::{Error, Result};

/// A concurrency limit that is known to be greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Concurrency(NonZeroUsize);

impl Concurrency {
    /// Validates `max_concurrent`.
    ///
    /// ```rust
    /// use futures_boundedmap::common::Concurrency;
    /// use futures_boundedmap::error::Error;
    ///
    /// assert_eq!(Concurrency::new(4).map(|c| c.get()), Ok(4));
    /// assert_eq!(Concurrency::new(0), Err(Error::InvalidConcurrency));
    /// ```
    pub fn new(max_concurrent: usize) -> Result<Self> {
        NonZeroUsize::new(max_concurrent)
            .map(Self)
            .ok_or(Error::InvalidConcurrency)
    }

    /// The limit as a plain `usize`.
    pub fn get(&self) -> usize {
        self.0.get()
    }

    /// Whether this limit actually constrains a run over `len` items.
    /// A limit equal to or above the number of items lets everything run at once.
    pub fn limits(&self, len: usize) -> bool {
        self.get() < len
    }
}

impl TryFrom<usize> for Concurrency {
    type Error = Error;

    fn try_from(max_concurrent: usize) -> Result<Self> {
        Self::new(max_concurrent)
    }
}

/// What the initiation loop does with a failure it observes while waiting
/// for a free slot.
///
/// Work that has already been started is never cancelled, whichever policy
/// is picked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InitiationPolicy {
    /// Return the failure right away. Items that were not started yet are
    /// never started.
    #[default]
    StopOnFailure,
    /// Remember the first failure, keep starting the remaining items (still
    /// bounded), then return the remembered failure.
    InitiateAll,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_limits() {
        let limit = Concurrency::new(3).unwrap();
        assert!(limit.limits(4));
        assert!(!limit.limits(3));
        assert!(!limit.limits(0));
        assert_eq!(Concurrency::try_from(0), Err(Error::InvalidConcurrency));
    }

    #[test]
    fn test_default_policy() {
        assert_eq!(InitiationPolicy::default(), InitiationPolicy::StopOnFailure);
    }
}
