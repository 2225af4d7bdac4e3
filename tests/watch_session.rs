// tests/watch_session.rs

mod common;
use crate::common::fake_backend::FakeBackend;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};
use crate::common::recording::{Notification, RecordingNotifier};
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use assetflow::config::StepConfig;
use assetflow::errors::AssetflowError;
use assetflow::exec::PipelineRunBackend;
use assetflow::fs::{FileSystem, RealFileSystem};
use assetflow::pipeline::PipelineExecutor;
use assetflow::task::TaskRegistry;
use assetflow::types::{FailurePolicy, ReloadKind};
use assetflow::watch::{bindings_for_tasks, start_watch, WatchBinding, WatchOptions};

type TestResult = Result<(), Box<dyn Error>>;

fn binding(task: &str, pattern: &str) -> WatchBinding {
    WatchBinding::new(task, vec![pattern.to_string()])
}

/// Poll `cond` every 20ms for up to 5 seconds.
async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}

#[tokio::test]
async fn manual_triggers_collapse_while_a_run_is_in_flight() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let backend = FakeBackend::gated();

    let session = start_watch(
        dir.path(),
        &[binding("styles", "src/css/**/*.css")],
        backend.clone(),
        WatchOptions::default(),
    )
    .await?;

    session.trigger("styles").await?;
    assert!(eventually(|| backend.runs_of("styles") == 1).await);

    for _ in 0..4 {
        session.trigger("styles").await?;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.runs_of("styles"), 1);

    backend.release();
    assert!(eventually(|| backend.runs_of("styles") == 2).await);

    backend.release();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.runs_of("styles"), 2);

    with_timeout(session.stop()).await?;
    Ok(())
}

#[tokio::test]
async fn stop_waits_for_the_in_flight_run() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let backend = FakeBackend::gated();

    let session = start_watch(
        dir.path(),
        &[binding("scripts", "src/js/**/*.js")],
        backend.clone(),
        WatchOptions::default(),
    )
    .await?;
    session.trigger("scripts").await?;
    session.trigger("scripts").await?;
    assert!(eventually(|| backend.runs_of("scripts") == 1).await);

    let stop = tokio::spawn(session.stop());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!stop.is_finished());

    backend.release();
    with_timeout(stop).await??;
    // The pending re-run was discarded.
    assert_eq!(backend.runs_of("scripts"), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_pattern_is_a_setup_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let err = start_watch(
        dir.path(),
        &[binding("styles", "src/[css")],
        FakeBackend::immediate(),
        WatchOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AssetflowError::WatchSetup(_)));
    Ok(())
}

#[tokio::test]
async fn missing_root_is_a_setup_error() {
    let err = start_watch(
        Path::new("/definitely/not/here"),
        &[binding("styles", "**/*.css")],
        FakeBackend::immediate(),
        WatchOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AssetflowError::WatchSetup(_)));
}

fn write(root: &Path, rel: &str, contents: &str) -> std::io::Result<()> {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap())?;
    fs::write(path, contents)
}

#[tokio::test]
async fn editing_an_imported_stylesheet_reruns_only_styles() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;

    write(&root, "src/css/a.css", "@import \"b.css\";\n.a { color: red }\n")?;
    write(&root, "src/css/b.css", ".b { color: blue }\n")?;
    write(&root, "src/js/app.js", "console.log('hi');\n")?;

    let cfg = ConfigFileBuilder::new()
        .with_task(
            "styles",
            TaskConfigBuilder::new("src/css/a.css", "dist/css")
                .watch(&["src/css/**/*.css"])
                .reload(ReloadKind::Styles)
                .step(StepConfig::CssImport)
                .step(StepConfig::MinifyCss {
                    browsers: Default::default(),
                })
                .build(),
        )
        .with_task(
            "scripts",
            TaskConfigBuilder::new("src/js/**/*.js", "dist/js")
                .step(StepConfig::MinifyJs)
                .build(),
        )
        .build();

    let fs_impl: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let registry = Arc::new(TaskRegistry::from_config(&cfg, &root, fs_impl)?);
    let notifier = RecordingNotifier::new();
    let exec = Arc::new(
        PipelineExecutor::new(Arc::clone(&registry), FailurePolicy::WaitForAll)
            .with_notifier(Arc::new(notifier.clone())),
    );

    let bindings = bindings_for_tasks(&registry, ["styles", "scripts"])?;
    let session = start_watch(
        &root,
        &bindings,
        PipelineRunBackend::new(Arc::clone(&exec)),
        WatchOptions::default(),
    )
    .await?;

    // Give the OS watcher a moment to arm.
    tokio::time::sleep(Duration::from_millis(200)).await;
    write(&root, "src/css/b.css", ".b { color: green }\n")?;

    let out = root.join("dist/css/a.css");
    let rebuilt = eventually(|| {
        fs::read_to_string(&out)
            .map(|css| css.contains(".b{color:green}"))
            .unwrap_or(false)
    })
    .await;
    assert!(rebuilt, "styles were not rebuilt");
    assert!(!root.join("dist/js").exists());

    assert!(eventually(|| !notifier.calls().is_empty()).await);
    for call in notifier.calls() {
        assert_eq!(call, Notification::Styles(vec![PathBuf::from("dist/css")]));
    }

    with_timeout(session.stop()).await?;
    Ok(())
}
