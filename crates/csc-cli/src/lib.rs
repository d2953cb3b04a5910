//! # csc-cli — Operator Command-Line Interface
//!
//! Offline access to the decision engine for operators and integrators.
//!
//! ## Subcommands
//!
//! - `validate`: run a transaction against a reference bundle
//! - `classify`: resolve a substance's classification as of a date
//! - `webhook`: sign or verify webhook payloads
//!
//! Handlers delegate to the domain crates; there is no business logic
//! here. Each handler returns the process exit code.

pub mod bundle;
pub mod classify;
pub mod validate;
pub mod webhook;
