// tests/cleanup.rs

mod common;
use crate::common::{mock_fs, root};

use std::error::Error;
use std::path::{Path, PathBuf};

use assetflow::cleanup::clean;
use assetflow::errors::AssetflowError;
use assetflow::fs::FileSystem;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn removes_stale_output_but_keeps_root_and_sources() -> TestResult {
    let (mock, fs) = mock_fs(&[
        ("dist/old.css", "x"),
        ("dist/img/old.png", "y"),
        ("dist/img/nested/deep.webp", "z"),
        ("src/css/a.css", "a"),
    ]);

    let removed = clean(fs.as_ref(), &root(), Path::new("dist"))?;

    assert_eq!(removed, 2);
    assert!(fs.is_dir(&root().join("dist")));
    assert_eq!(mock.file_paths(), vec![root().join("src/css/a.css")]);
    Ok(())
}

#[test]
fn missing_output_root_is_fine() -> TestResult {
    let (_mock, fs) = mock_fs(&[("src/a.css", "a")]);
    assert_eq!(clean(fs.as_ref(), &root(), Path::new("dist"))?, 0);
    Ok(())
}

#[test]
fn output_root_that_is_a_file_fails() {
    let (_mock, fs) = mock_fs(&[("dist", "oops")]);
    let err = clean(fs.as_ref(), &root(), Path::new("dist")).unwrap_err();
    match err {
        AssetflowError::Cleanup { path, .. } => assert_eq!(path, root().join("dist")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn cleaning_twice_is_a_no_op() -> TestResult {
    let (_mock, fs) = mock_fs(&[("dist/a.css", "a")]);
    assert_eq!(clean(fs.as_ref(), &root(), &PathBuf::from("dist"))?, 1);
    assert_eq!(clean(fs.as_ref(), &root(), &PathBuf::from("dist"))?, 0);
    Ok(())
}
