//! Errors raised by the crate itself.
//!
//! Errors produced by the transform are never wrapped in [`Error`]; they are
//! handed back to the caller untouched.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("max_concurrent must be greater than 0")]
    InvalidConcurrency,
}
