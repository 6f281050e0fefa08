//! Application layer containing the pledge orchestration logic.
//!
//! [`service::TransactionService`] is the entry point for callers. It owns the
//! ports it talks to and serializes work on a single transaction through a
//! [`keyed_lock::KeyedLock`], so duplicate or concurrent gateway notifications
//! cannot credit a campaign twice.

pub mod keyed_lock;
pub mod service;
