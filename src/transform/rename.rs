// src/transform/rename.rs

use std::path::PathBuf;

use anyhow::Result;

use super::{AssetFile, StepContext, Transform};

/// Rewrites the file name, keeping the directory.
///
/// `styles/main.css` with `suffix = ".min"` becomes `styles/main.min.css`.
/// `extname` includes its dot (`".css"`); an empty string drops the extension.
#[derive(Debug, Clone, Default)]
pub struct Rename {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub basename: Option<String>,
    pub extname: Option<String>,
}

impl Rename {
    pub fn rename(&self, path: &std::path::Path) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let current_ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let basename = self.basename.clone().unwrap_or(stem);
        let ext = self.extname.clone().unwrap_or(current_ext);

        let file_name = format!(
            "{}{}{}{}",
            self.prefix.as_deref().unwrap_or(""),
            basename,
            self.suffix.as_deref().unwrap_or(""),
            ext
        );

        match path.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

impl Transform for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn apply(&self, mut file: AssetFile, _ctx: &StepContext) -> Result<Vec<AssetFile>> {
        file.path = self.rename(&file.path);
        Ok(vec![file])
    }
}
