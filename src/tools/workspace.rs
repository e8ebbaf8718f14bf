//! Workspace layout and task folder provisioning
//!
//! Tools resolve relative paths against the workspace root. Generated
//! artifacts go to `<root>/<output_dir>/<task folder>/`.

use chrono::Local;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::core::{PlanwiseError, Result, WorkspaceConfig};

/// Filesystem layout shared by all tool handlers
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    output_dir: String,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, output_dir: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::new(config.root.clone(), config.output_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    /// Resolve a path given by the model. Absolute paths are kept as is.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    /// Directory artifacts should be written to. A task folder that does not
    /// already live under the output directory is placed inside it; without
    /// a task folder the output directory itself is used.
    pub fn artifact_dir(&self, task_folder: Option<&str>) -> PathBuf {
        match task_folder.map(str::trim).filter(|f| !f.is_empty()) {
            Some(folder) if Path::new(folder).is_absolute() => PathBuf::from(folder),
            Some(folder) if self.is_under_output(folder) => self.root.join(folder),
            Some(folder) => self.root.join(&self.output_dir).join(folder),
            None => self.root.join(&self.output_dir),
        }
    }

    /// Full path of an artifact file. Without a task folder, a file name
    /// that already points into the output directory is taken as is.
    pub fn artifact_path(&self, task_folder: Option<&str>, file_name: &str) -> PathBuf {
        let has_folder = task_folder.map(|f| !f.trim().is_empty()).unwrap_or(false);
        if !has_folder && self.is_under_output(file_name) {
            return self.root.join(file_name);
        }
        self.artifact_dir(task_folder).join(file_name)
    }

    fn is_under_output(&self, path: &str) -> bool {
        Path::new(path).starts_with(&self.output_dir)
    }
}

/// Creates one uniquely named output folder per task
#[derive(Debug, Clone)]
pub struct TaskFolders {
    workspace: Workspace,
}

impl TaskFolders {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    /// Create `<output_dir>/<timestamp>_<message slug>_<uuid8>` and return it
    /// relative to the workspace root.
    pub fn create(&self, user_message: &str) -> Result<String> {
        let name = format!(
            "{}_{}_{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            slugify(user_message),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );

        let relative = Path::new(self.workspace.output_dir()).join(name);
        let full = self.workspace.root().join(&relative);

        std::fs::create_dir_all(&full).map_err(|e| {
            PlanwiseError::TaskFolder(format!("cannot create {}: {}", full.display(), e))
        })?;

        relative
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| PlanwiseError::TaskFolder("folder name is not valid UTF-8".into()))
    }
}

/// Keep word characters, spaces and dashes, take the first 30 characters and
/// turn (ideographic) spaces into underscores.
fn slugify(message: &str) -> String {
    static DISALLOWED: OnceLock<Option<Regex>> = OnceLock::new();

    let cleaned = match DISALLOWED.get_or_init(|| Regex::new(r"[^\w\s-]").ok()) {
        Some(re) => re.replace_all(message.trim(), "").into_owned(),
        None => message.trim().to_string(),
    };
    cleaned
        .chars()
        .take(30)
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}
