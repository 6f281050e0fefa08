//! Domain model for pledges and their reconciliation.
//!
//! Entities and value objects live here together with the ports the
//! application layer depends on. Nothing in this module performs I/O.

pub mod campaign;
pub mod notification;
pub mod ports;
pub mod transaction;
pub mod user;

/// Store-assigned transaction identifier. Doubles as the gateway order id.
pub type TransactionId = u64;
pub type CampaignId = u64;
pub type UserId = u64;
