//! lifeboat - safety-first backup and restore orchestration for a
//! managed database
//!
//! Orchestrates the external dump/restore tools around a verified
//! artifact store: every backup is checksummed and recorded in a
//! ledger, every restore re-verifies the artifact and snapshots the
//! live database before touching it.

pub mod audit;
pub mod backup;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod connection;
pub mod errors;
pub mod flight;
pub mod http_server;
pub mod notify;
pub mod process;
pub mod restore;
pub mod settings;
pub mod storage;
pub mod workspace;
