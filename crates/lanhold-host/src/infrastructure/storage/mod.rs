//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the host's TOML configuration from the
//! platform config directory (or an explicit path), falls back to defaults
//! when no file exists, and converts the on-disk sections into the settings
//! the network and holds layers take.

pub mod config;
