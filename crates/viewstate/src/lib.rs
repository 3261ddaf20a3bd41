//! # Viewstate
//!
//! A concurrent, observable state store for view-models. Any thread may read
//! or write; every read and write is serialized into one ordered stream of
//! state transitions.
//!
//! ## Core Concepts
//!
//! - **State** is a plain value (`Clone + PartialEq`). It is never mutated in
//!   place by callers.
//! - **Writes** ([`Store::set`]) are reducers: `FnOnce(S) -> S`.
//! - **Reads** ([`Store::get`]) are callbacks that receive a snapshot.
//! - A [`Dispatcher`] is the single serial context where writes are applied
//!   and reads are served.
//!
//! ## Architecture
//!
//! ```text
//! any thread                              dispatcher (serial)
//! ──────────                              ───────────────────
//! set(reducer) ─┐
//!               ├─► JobQueue ─┐
//! get(callback) ┘   (mutex)   │
//!        │                    │
//!        ▼ signal()           │
//!     Trigger ── one task ──► flush()
//!   (coalesces)                │
//!                              ├─► fold writes ─► StateCell.publish()
//!                              │                       │ (only if changed)
//!                              │                       ▼
//!                              │                 StateStream subscribers
//!                              └─► one read(current), loop
//! ```
//!
//! ## Guarantees
//!
//! - Writes apply in enqueue order. Writes racing on different threads are
//!   ordered by which enqueue takes the queue lock first.
//! - A read observes every write enqueued before it.
//! - Writes queued before a flush are folded into at most one emission.
//! - Subscribers never see the same state twice in a row, and never miss a
//!   distinct state.
//! - After [`Store::dispose`], nothing queued runs, later jobs are dropped,
//!   and streams end.
//!
//! ## Example
//!
//! ```ignore
//! use viewstate_core::{Store, ThreadDispatcher};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, PartialEq, Default)]
//! struct Counter { count: u32 }
//!
//! let dispatcher = Arc::new(ThreadDispatcher::spawn("ui")?);
//! let store = Store::new(Counter::default(), dispatcher);
//!
//! store.set(|mut s| { s.count += 1; s });
//! store.get(|s| println!("count = {}", s.count));
//!
//! let mut counts = store.select(|s| s.count);
//! while let Some(count) = counts.next().await {
//!     render(count);
//! }
//! ```

mod cell;
mod error;
mod flush;
mod queue;
mod select;
mod stats;
mod store;
mod stream;
mod trigger;

pub mod dispatch;


// Re-export error types
pub use crate::error::{DispatchError, StoreError};

// Re-export dispatcher types
pub use dispatch::{Dispatcher, ManualDispatcher, Task, ThreadDispatcher, TokioDispatcher};

// Re-export job types
pub use queue::{ReadCallback, Reducer};

// Re-export projection types
pub use select::ViewModel;

// Re-export stats types
pub use stats::StoreStats;

// Re-export store types (primary entry point)
pub use store::{Store, StoreBuilder, StoreId};

// Re-export stream types
pub use stream::StateStream;
