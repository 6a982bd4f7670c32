#![forbid(unsafe_code)]
//! duet-core library.
//!
//! Owns everything that touches persistent state: the project configuration,
//! the document model, and the SQLite document store.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types; typed errors from
//!   [`error`] travel inside `anyhow::Error` and are recovered with
//!   `downcast_ref` where callers need to branch on them.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod db;
pub mod error;
pub mod model;
