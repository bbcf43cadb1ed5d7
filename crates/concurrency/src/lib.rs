//! Concurrency layer for SmartStore
//!
//! Each store is accessed through exactly one [`SerialQueue`]:
//! - operations run one at a time, in arrival order
//! - a transaction never outlives the queued operation that opened it
//! - different stores have independent queues and run in parallel

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod queue;

pub use queue::{QueueStats, SerialQueue};
