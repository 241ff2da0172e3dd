//! Test helpers for konkurrensy's own test suite and benchmarks.
//!
//! This crate is not meant for public use and offers no stability guarantees.

#![cfg(not(tarpaulin_include))]

mod event_log;
mod store;

pub use event_log::{Event, EventLog};
pub use store::{AlreadyExists, IdempotentStore};
