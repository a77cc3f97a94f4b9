// src/watch/mod.rs

//! Directory watching.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform recursive filesystem watcher (`notify`).
//! - Classifying raw notifications into directory creations and writes.
//! - Recovering creation events lost to `mkdir -p` races by scanning new
//!   directories.
//!
//! It does **not** decide what is a candidate or when anything fires; it only
//! turns filesystem changes into [`EngineEvent`](crate::engine::EngineEvent)s.

pub mod event_handler;
pub mod path_utils;
pub mod watcher;

pub use event_handler::classify_event;
pub use watcher::{spawn_watcher, WatcherHandle};
