//! Deterministic, pure logic shared by discovery, validation, and resolution.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod aggregate;
pub mod ident;
pub mod params;
pub mod pattern;
pub mod types;
