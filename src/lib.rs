//! waves-ext - formula extensions for the Wuthering Waves companion bot
//!
//! Scoring and damage-tier formulas ship separately from the bot as Lua
//! modules. This crate loads them on demand, forwards typed calls to them,
//! and swaps in new versions at runtime without restarting the host.
//!
//! # Modules
//!
//! - [`extension`]: Module loading, validation and atomic hot reload
//! - [`calculate`]: Scoring formula interface and forwarding facade
//! - [`damage`]: Damage-tier predicate interface and forwarding facade
//! - [`host`]: Owner of both loaders plus the file watcher
//! - [`stamina`]: Daily stamina card model
//! - [`config`]: Configuration management and serialization
//! - [`colors`]: Card palette

pub mod calculate;
pub mod colors;
pub mod config;
pub mod damage;
pub mod error;
pub mod extension;
pub mod host;
pub mod stamina;

pub use error::ExtensionError;
pub use host::ExtensionHost;
