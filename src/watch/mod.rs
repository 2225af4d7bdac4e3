// src/watch/mod.rs

//! File watching and change detection.
//!
//! - [`patterns`] compiles watch bindings (patterns -> task).
//! - [`watcher`] wraps the `notify` watcher.
//! - [`event_handler`] turns a changed path into task triggers, optionally
//!   skipping events that left the file's content hash unchanged
//!   ([`cache`], [`hash`]).
//! - [`session`] wires these to the watch coordinator.
//!
//! This module does not decide when tasks run; that is the coordinator's
//! job in [`crate::engine`].

pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod session;
pub mod watcher;

pub use hash::{compute_file_hash, hash_tree};
pub use patterns::{bindings_for_tasks, compile_bindings, CompiledBinding, WatchBinding};
pub use session::{start_watch, WatchOptions, WatchSession};
pub use watcher::{spawn_watcher, WatcherHandle};
