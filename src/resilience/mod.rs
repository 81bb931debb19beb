//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dependency acquisition (database at bootstrap):
//!     → retries.rs (fixed-interval retry, terminal signal stops early)
//! ```
//!
//! # Design Decisions
//! - The executor carries no policy: the operation decides what is retryable
//! - Fixed delay between attempts, no backoff growth, no jitter
//! - Attempts run strictly one after another on the calling task

pub mod retries;

pub use retries::{run, RetryError};
