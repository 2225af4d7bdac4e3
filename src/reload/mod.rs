// src/reload/mod.rs

//! Live reload.
//!
//! The composition engine only knows the [`Notifier`] capability; the
//! concrete [`LiveReloadServer`] serves the output tree over HTTP and pushes
//! [`ReloadMessage`]s to connected browsers over a WebSocket.

pub mod server;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use server::{LiveReloadServer, ServerOptions};

/// Receives "something was rebuilt" signals after successful task runs.
pub trait Notifier: Send + Sync {
    /// Reload every connected page.
    fn notify_reload(&self);

    /// Re-fetch stylesheets under the given output directories
    /// (project-relative, e.g. `dist/css`) without a full page reload.
    fn notify_style_update(&self, outputs: &[PathBuf]);
}

/// Message sent to browsers.
///
/// ```json
/// {"type":"reload"}
/// {"type":"css","paths":["/css"]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    Reload,
    Css { paths: Vec<String> },
}

impl ReloadMessage {
    pub fn to_json(&self) -> String {
        // Serializing a plain enum of strings cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_serialize_with_type_tag() {
        assert_eq!(ReloadMessage::Reload.to_json(), r#"{"type":"reload"}"#);
        let css = ReloadMessage::Css {
            paths: vec!["/css".to_string()],
        };
        assert_eq!(css.to_json(), r#"{"type":"css","paths":["/css"]}"#);
    }
}
