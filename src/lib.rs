//! Shadowtee is an HTTP reverse proxy that mirrors live traffic.
//!
//! Every incoming request is forwarded to one primary backend whose
//! response goes back to the client. A copy of the same request, with
//! an identical body, is sent to each secondary backend on a
//! fire-and-forget basis: secondary responses are logged and discarded,
//! and a slow or failing secondary never delays or alters what the
//! client sees.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate).
//! - [`config`] -- Configuration model, file sources and validation.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`proxy`] -- Request duplication, sampling, method filtering, outbound
//!   lanes and the response relay.
//! - [`server`] -- Axum server setup, shared application state, TLS and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod server;
