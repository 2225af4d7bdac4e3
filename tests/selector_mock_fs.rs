// tests/selector_mock_fs.rs

mod common;
use crate::common::{mock_fs, root};

use std::error::Error;
use std::path::PathBuf;

use assetflow::transform::selector::glob_base;
use assetflow::transform::Selector;

type TestResult = Result<(), Box<dyn Error>>;

fn patterns(p: &[&str]) -> Vec<String> {
    p.iter().map(|s| s.to_string()).collect()
}

#[test]
fn selects_recursively_relative_to_glob_base() -> TestResult {
    let (_fs, fs) = mock_fs(&[
        ("src/img/logo.png", "png"),
        ("src/img/icons/arrow.png", "png"),
        ("src/img/readme.txt", "txt"),
        ("src/css/main.css", "css"),
    ]);

    let selector = Selector::new(&patterns(&["src/img/**/*.png"]))?;
    let files = selector.resolve(fs.as_ref(), &root())?;

    let relative: Vec<PathBuf> = files.iter().map(|f| f.relative.clone()).collect();
    assert_eq!(
        relative,
        vec![PathBuf::from("icons/arrow.png"), PathBuf::from("logo.png")]
    );
    assert_eq!(files[1].source, PathBuf::from("src/img/logo.png"));
    assert_eq!(files[1].path, root().join("src/img/logo.png"));
    Ok(())
}

#[test]
fn single_star_does_not_cross_directories() -> TestResult {
    let (_fs, fs) = mock_fs(&[
        ("src/index.html", "<p>"),
        ("src/partials/card.html", "<div>"),
    ]);

    let files = Selector::new(&patterns(&["src/*.html"]))?.resolve(fs.as_ref(), &root())?;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].relative, PathBuf::from("index.html"));
    Ok(())
}

#[test]
fn negated_patterns_exclude() -> TestResult {
    let (_fs, fs) = mock_fs(&[
        ("src/js/app.js", "a"),
        ("src/js/vendor/lib.js", "b"),
    ]);

    let selector = Selector::new(&patterns(&["./src/js/**/*.js", "!src/js/vendor/**"]))?;
    let files = selector.resolve(fs.as_ref(), &root())?;

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].source, PathBuf::from("src/js/app.js"));
    assert!(selector.matches("src/js/app.js"));
    assert!(!selector.matches("src/js/vendor/lib.js"));
    Ok(())
}

#[test]
fn patterns_keep_declared_order_and_report_each_file_once() -> TestResult {
    let (_fs, fs) = mock_fs(&[
        ("src/js/b.js", "b"),
        ("src/js/a.js", "a"),
        ("src/vendor/z.js", "z"),
    ]);

    let selector = Selector::new(&patterns(&["src/vendor/*.js", "src/js/*.js", "src/**/*.js"]))?;
    let sources: Vec<PathBuf> = selector
        .resolve(fs.as_ref(), &root())?
        .into_iter()
        .map(|f| f.source)
        .collect();

    assert_eq!(
        sources,
        vec![
            PathBuf::from("src/vendor/z.js"),
            PathBuf::from("src/js/a.js"),
            PathBuf::from("src/js/b.js"),
        ]
    );
    Ok(())
}

#[test]
fn missing_base_selects_nothing() -> TestResult {
    let (_fs, fs) = mock_fs(&[("src/css/main.css", "css")]);
    let files = Selector::new(&patterns(&["assets/fonts/**/*"]))?.resolve(fs.as_ref(), &root())?;
    assert!(files.is_empty());
    Ok(())
}

#[test]
fn selection_reflects_current_filesystem() -> TestResult {
    let (mock, fs) = mock_fs(&[("src/css/a.css", "a")]);
    let selector = Selector::new(&patterns(&["src/css/*.css"]))?;
    assert_eq!(selector.resolve(fs.as_ref(), &root())?.len(), 1);

    mock.add_file(root().join("src/css/b.css"), "b");
    assert_eq!(selector.resolve(fs.as_ref(), &root())?.len(), 2);
    Ok(())
}

#[test]
fn glob_base_stops_at_first_wildcard() {
    assert_eq!(glob_base("src/img/**/*.png"), PathBuf::from("src/img"));
    assert_eq!(glob_base("src/index.html"), PathBuf::from("src"));
    assert_eq!(glob_base("*.css"), PathBuf::new());
    assert_eq!(glob_base("src/{a,b}/x.js"), PathBuf::from("src"));
}
