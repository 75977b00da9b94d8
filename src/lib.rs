//! kicksync - offline-first local store and sync engine
//!
//! This crate keeps a user's pregnancy tracking records (profile, kick
//! counts, symptom logs, goals) durable on-device and reconciles them with a
//! remote backend when connectivity allows.
//!
//! # Architecture
//!
//! - [`storage`] - SQLite store: migrations, per-domain stores, content cache, sync state
//! - [`remote`] - Remote backend trait, REST client and in-process backend
//! - [`network`] - Reachability checks
//! - [`sync`] - Push-then-pull orchestrator
//! - [`scheduler`] - Periodic background invocation of the orchestrator
//! - [`model`] - Record types shared by the store and the wire
//! - [`config`] - Path resolution, settings and the local session marker
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod network;
pub mod remote;
pub mod scheduler;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};
