// src/exec/mod.rs

//! How the watch coordinator starts task runs.
//!
//! The runtime talks to a [`RunBackend`] instead of the executor directly,
//! so tests can swap in a backend that records or holds runs.

pub mod backend;

pub use backend::{PipelineRunBackend, RunBackend};
