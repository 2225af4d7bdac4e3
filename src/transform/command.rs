// src/transform/command.rs

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use super::{AssetFile, StepContext, Transform};

/// Pipes a file through an external program.
///
/// The file's bytes go to the program's stdin and its stdout becomes the
/// new contents. `{input}` in `args` expands to the absolute path of the
/// source file, for tools that insist on reading from disk (`sass {input}`).
/// A non-zero exit fails the file with the program's stderr.
#[derive(Debug, Clone)]
pub struct CommandStep {
    pub program: String,
    pub args: Vec<String>,
    /// New extension for the output, with its dot (`".css"`).
    pub extname: Option<String>,
}

impl CommandStep {
    fn expand_args(&self, file: &AssetFile, ctx: &StepContext) -> Vec<String> {
        let input = file
            .origin
            .clone()
            .or_else(|| file.sources.first().map(|s| ctx.root.join(s)))
            .unwrap_or_else(|| ctx.root.join(&file.path));
        let input = input.to_string_lossy();

        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input))
            .collect()
    }
}

impl Transform for CommandStep {
    fn name(&self) -> &'static str {
        "command"
    }

    fn apply(&self, mut file: AssetFile, ctx: &StepContext) -> Result<Vec<AssetFile>> {
        let args = self.expand_args(&file, ctx);
        debug!(program = %self.program, ?args, file = %file.path.display(), "spawning command");

        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(&ctx.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning '{}'", self.program))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin of '{}' was not captured", self.program))?;

        // Stdin is written from another thread while stdout is drained.
        let output = std::thread::scope(|scope| {
            let contents = &file.contents;
            let writer = scope.spawn(move || {
                // A program that ignores stdin closes the pipe early; that
                // is not an error.
                let _ = stdin.write_all(contents);
            });
            let output = child.wait_with_output();
            let _ = writer.join();
            output
        })
        .with_context(|| format!("waiting for '{}'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ));
        }

        file.replace_unmapped(output.stdout);
        if let Some(ext) = &self.extname {
            file.path.set_extension(ext.trim_start_matches('.'));
        }
        Ok(vec![file])
    }
}
