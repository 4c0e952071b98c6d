//! # Core Dispatch Engine
//!
//! The core module turns a batch of independent rows into a bounded fan-out of
//! adapter calls and gathers the results back in input order.
//!
//! ## Module Structure
//!
//! * [`dispatch`] - The fan-out/fan-in loop. Every row becomes a task that waits for
//!   a concurrency slot, makes one adapter call and reports through a channel.
//!   Results are gathered by position, never by completion time.
//!
//! * [`unit`] - The queued row / pending row pair connecting a row task to the
//!   batch that is waiting on it.
//!
//! * [`worker`] - The dedicated runtime a worker drives its batches on, so that
//!   blocking callers never see the suspension happening inside.
//!
pub(crate) mod dispatch;
pub(crate) mod unit;
pub(crate) mod worker;
