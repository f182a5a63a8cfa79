//! Concurrent evaluation support
//!
//! Provides batch evaluation across a thread pool and a lock-protected
//! handle for sharing one [`Restrictions`](crate::Restrictions) between path
//! searches and the command stream.

mod executor;
mod shared;

pub use executor::{evaluate_batch, ParallelConfig};
pub use shared::SharedRestrictions;
