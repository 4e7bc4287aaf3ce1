//! Test and validation crate for the I/O scheduler.
//!
//! Scenario tests exercise the public call surface end to end, and the
//! concurrency tests stress the worker pool with parallel submitters.

pub mod harness;

pub use harness::{test_scheduler, wait_until};
