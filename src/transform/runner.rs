// src/transform/runner.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::model::TaskConfig;
use crate::errors::{AssetflowError, Result};
use crate::fs::FileSystem;
use crate::task::{Completion, TaskFailure, TaskName};
use crate::transform::selector::Selector;
use crate::transform::size::SizeRecord;
use crate::transform::{build_steps, AssetFile, Step, StepContext};

/// Outcome of one transform run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Files written, relative to the project root, sorted.
    pub written: Vec<PathBuf>,
    pub sizes: Vec<SizeRecord>,
    /// Per-file (or per-barrier) failures in the order they happened.
    pub errors: Vec<AssetflowError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// The first failure decides the task's completion.
    pub fn completion(&self, task: &str) -> Completion {
        match self.errors.first() {
            None => Completion::Success,
            Some(err) => Completion::Failed(TaskFailure::from_error(task, err)),
        }
    }
}

/// Runs one task: select inputs, push them through the steps, write results.
#[derive(Debug)]
pub struct TransformRunner {
    task: TaskName,
    selector: Selector,
    steps: Vec<Step>,
    root: PathBuf,
    /// Output directory relative to `root`.
    output: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl TransformRunner {
    pub fn new(
        task: impl Into<TaskName>,
        selector: Selector,
        steps: Vec<Step>,
        root: PathBuf,
        output: PathBuf,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            task: task.into(),
            selector,
            steps,
            root,
            output,
            fs,
        }
    }

    pub fn from_config(
        name: &str,
        tc: &TaskConfig,
        root: PathBuf,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let selector = Selector::new(&tc.inputs).map_err(|e| {
            AssetflowError::ConfigError(format!("task '{name}' has invalid inputs: {e:#}"))
        })?;
        let steps = build_steps(&tc.steps).map_err(|e| {
            AssetflowError::ConfigError(format!("task '{name}' has an invalid step: {e:#}"))
        })?;
        Ok(Self::new(name, selector, steps, root, tc.output.clone(), fs))
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Run on the blocking pool and turn the report into a [`Completion`].
    pub async fn run(self: Arc<Self>) -> Completion {
        let task = self.task.clone();
        match tokio::task::spawn_blocking(move || self.execute()).await {
            Ok(report) => report.completion(&task),
            Err(e) => Completion::Failed(TaskFailure::new(
                task,
                format!("transform worker did not finish: {e}"),
            )),
        }
    }

    /// Run synchronously. Selection is evaluated fresh on every call.
    pub fn execute(&self) -> RunReport {
        let ctx = StepContext::new(self.task.clone(), self.root.clone(), Arc::clone(&self.fs));
        let mut report = RunReport::default();

        let selected = match self.selector.resolve(self.fs.as_ref(), &self.root) {
            Ok(selected) => selected,
            Err(e) => {
                report.errors.push(self.failure("select", None, &e));
                return report;
            }
        };
        debug!(task = %self.task, files = selected.len(), "selected input files");

        let mut stream = Vec::with_capacity(selected.len());
        for file in selected {
            match self.fs.read(&file.path) {
                Ok(contents) => {
                    let mut asset = AssetFile::new(file.relative, contents);
                    asset.origin = Some(file.path);
                    asset.sources.push(file.source);
                    stream.push(asset);
                }
                Err(e) => report
                    .errors
                    .push(self.failure("read", Some(file.source), &e)),
            }
        }

        for step in &self.steps {
            stream = self.apply_step(step, stream, &ctx, &mut report);
        }

        stream.sort_by(|a, b| a.path.cmp(&b.path));
        let out_dir = self.root.join(&self.output);
        for file in stream {
            let dest = out_dir.join(&file.path);
            match self.fs.write(&dest, &file.contents) {
                Ok(()) => {
                    debug!(task = %self.task, file = %dest.display(), bytes = file.contents.len(), "wrote file");
                    report.written.push(self.output.join(&file.path));
                }
                Err(e) => {
                    let source = file.sources.first().cloned().or(Some(file.path.clone()));
                    report.errors.push(self.failure("write", source, &e));
                }
            }
        }

        report.sizes = ctx.metrics.snapshot();
        for record in &report.sizes {
            info!(
                task = %self.task,
                title = %record.title,
                files = record.files,
                bytes = record.bytes,
                "size"
            );
        }

        if report.is_success() {
            info!(task = %self.task, written = report.written.len(), "transform finished");
        } else {
            warn!(
                task = %self.task,
                written = report.written.len(),
                failed = report.errors.len(),
                "transform finished with failures"
            );
        }

        report
    }

    fn apply_step(
        &self,
        step: &Step,
        stream: Vec<AssetFile>,
        ctx: &StepContext,
        report: &mut RunReport,
    ) -> Vec<AssetFile> {
        match step {
            Step::Map(transform) => {
                let mut next = Vec::with_capacity(stream.len());
                for file in stream {
                    let source = primary_source(&file);
                    match transform.apply(file, ctx) {
                        Ok(out) => next.extend(out),
                        Err(e) => {
                            let err = self.failure(transform.name(), Some(source), &e);
                            warn!(task = %self.task, step = transform.name(), "{err}");
                            report.errors.push(err);
                        }
                    }
                }
                next
            }
            Step::Merge(merge) => {
                if stream.is_empty() {
                    return stream;
                }
                match merge.merge(stream, ctx) {
                    Ok(out) => out,
                    Err(e) => {
                        let err = self.failure(merge.name(), None, &e);
                        warn!(task = %self.task, step = merge.name(), "{err}");
                        report.errors.push(err);
                        Vec::new()
                    }
                }
            }
        }
    }

    fn failure(&self, step: &str, file: Option<PathBuf>, cause: &anyhow::Error) -> AssetflowError {
        AssetflowError::Transform {
            task: self.task.clone(),
            step: step.to_string(),
            file,
            cause: format!("{cause:#}"),
        }
    }
}

fn primary_source(file: &AssetFile) -> PathBuf {
    file.sources
        .first()
        .cloned()
        .unwrap_or_else(|| file.path.clone())
}

