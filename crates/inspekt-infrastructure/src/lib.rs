//! Infrastructure layer: persistence and configuration loading.
//!
//! Implements the `inspekt-core` seams against the file system: a
//! TOML-file-per-session repository for the optional persistence mirror, and
//! a loader for [`inspekt_core::config::LifecycleConfig`].

mod config_loader;
mod toml_session_repository;

pub use config_loader::load_config;
pub use toml_session_repository::TomlSessionRepository;
