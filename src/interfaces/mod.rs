//! Batch adapters used by the `pledge-engine` binary.

pub mod csv;
