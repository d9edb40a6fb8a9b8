//! Side-effecting operations: filesystem scans, tables, config and globbing.

pub mod config;
pub mod crash_log;
pub mod discover;
pub mod resolve;
pub mod table;
