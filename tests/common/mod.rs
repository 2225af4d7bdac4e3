#![allow(dead_code, unused_imports)]

pub use assetflow_test_utils::{builders, fake_backend, recording};
pub use assetflow_test_utils::{init_tracing, with_timeout};

use std::path::PathBuf;
use std::sync::Arc;

use assetflow::fs::mock::MockFileSystem;
use assetflow::fs::FileSystem;

/// Root used by every mock-filesystem test.
pub const ROOT: &str = "/project";

pub fn root() -> PathBuf {
    PathBuf::from(ROOT)
}

/// A mock filesystem seeded with `files` (paths relative to [`ROOT`]).
pub fn mock_fs(files: &[(&str, &str)]) -> (MockFileSystem, Arc<dyn FileSystem>) {
    let fs = MockFileSystem::new();
    for (path, contents) in files {
        fs.add_file(root().join(path), contents.as_bytes());
    }
    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
    (fs, shared)
}

/// File contents under [`ROOT`] as UTF-8.
pub fn read_text(fs: &MockFileSystem, path: &str) -> Option<String> {
    fs.contents(root().join(path))
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}
