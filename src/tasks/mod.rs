//! Background Tasks Module
//!
//! Detached work that outlives the request which triggered it.
//!
//! # Tasks
//! - Asynchronous persistence of freshly captured responses
//! - Stale-while-revalidate refreshes

mod detached;

pub(crate) use detached::panic_message;
pub use detached::spawn_detached;
