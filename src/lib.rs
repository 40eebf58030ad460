//! Bounded, order-preserving concurrent map over async transforms.
//!
//! [`map`] applies an async function to every item of a sequence while
//! keeping at most N transforms in flight, and hands back the outputs in
//! input order regardless of the order they completed in.
//!
//! Items are started eagerly and in input order: each call to the transform
//! is spawned as its own tokio task. Once N tasks are outstanding the loop
//! waits for the *first* of them to settle (not the whole batch) and then
//! starts the next item, so a fast task frees its slot right away.
//!
//! The call is all-or-nothing. Either every output comes back, or the first
//! failure observed is returned exactly as the transform produced it. Tasks
//! already running when that happens are left alone and their outcomes are
//! discarded.
//!
//! ```rust
//! use futures_boundedmap::{InitiationPolicy, Mapper};
//!
//! tokio_test::block_on(async {
//!     let mapper = Mapper::new(2).initiation_policy(InitiationPolicy::StopOnFailure);
//!     let result = mapper
//!         .run(vec![1, 2, 3], |x| async move {
//!             if x == 2 {
//!                 return Err("Test error");
//!             }
//!             Ok(x * 2)
//!         })
//!         .await;
//!     assert_eq!(result, Err("Test error"));
//! });
//! ```
pub mod common;
pub mod error;
pub mod inflight;
pub mod map;

pub use common::{Concurrency, InitiationPolicy};
pub use error::Error;
pub use map::{map, Mapper};
