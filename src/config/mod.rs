// src/config/mod.rs

//! Configuration loading and validation for modelwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Layer file, environment and CLI values (`loader.rs`).
//! - Validate timing and naming invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    apply_env, apply_overrides, load_config, load_from_path, load_from_process_env,
    ConfigOverrides,
};
pub use model::{
    AppConfig, RawConfigFile, RegistryCredentials, RegistrySection, WatcherConfig, WatcherSection,
};
