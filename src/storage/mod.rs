//! # Storage Module
//!
//! On-disk layout of the backup root and the persisted metadata
//! ledger that records every backup run.

pub mod layout;
pub mod ledger;

pub use layout::StorageLayout;
pub use ledger::{LedgerError, MetadataLedger};
