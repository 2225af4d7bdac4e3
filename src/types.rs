// src/types.rs

use std::str::FromStr;
use serde::Deserialize;

/// How a `Parallel` node reacts when one of its children fails.
///
/// - `WaitForAll`: every child runs to completion; the first failure (in
///   completion order) becomes the node's result.
/// - `FailFast`: the node completes as soon as one child fails. Remaining
///   children are aborted at their next suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    WaitForAll,
    FailFast,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::WaitForAll
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "wait_for_all" => Ok(FailurePolicy::WaitForAll),
            "fail_fast" => Ok(FailurePolicy::FailFast),
            other => Err(format!(
                "invalid failure_policy: {other} (expected \"wait_for_all\" or \"fail_fast\")"
            )),
        }
    }
}

/// What connected browsers should do after a task finishes successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadKind {
    /// Full page reload.
    Full,
    /// Re-fetch stylesheets under the task's output directory.
    Styles,
    /// Do not notify.
    None,
}

impl Default for ReloadKind {
    fn default() -> Self {
        ReloadKind::Full
    }
}
