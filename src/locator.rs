//! Source Locator - Name to Source Path Resolution
//!
//! Candidates are visited in lexicographic path order. When several files share a
//! stem, the greatest path wins and the override is logged.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

use crate::pipeline::PipelineError;

/// Declared name -> source path relative to the output directory
pub type NameToPath = BTreeMap<String, String>;

pub const DEFAULT_SOURCE_EXTENSION: &str = "sol";

/// Where the project's sources live
pub trait SourceRoot {
    fn source_dir(&self) -> Result<PathBuf, PipelineError>;
}

/// Explicitly configured source directory
#[derive(Debug, Clone)]
pub struct FixedSourceRoot(pub PathBuf);

impl SourceRoot for FixedSourceRoot {
    fn source_dir(&self) -> Result<PathBuf, PipelineError> {
        Ok(self.0.clone())
    }
}

/// Asks `forge config --json` for the `src` directory
#[derive(Debug, Clone)]
pub struct ForgeSourceRoot {
    pub project_dir: PathBuf,
    pub program: String,
}

#[derive(Deserialize)]
struct ForgeConfig {
    src: PathBuf,
}

impl ForgeSourceRoot {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            program: "forge".to_string(),
        }
    }
}

impl SourceRoot for ForgeSourceRoot {
    fn source_dir(&self) -> Result<PathBuf, PipelineError> {
        let output = Command::new(&self.program)
            .args(["config", "--json"])
            .current_dir(&self.project_dir)
            .output()
            .map_err(|e| PipelineError::SourceRoot(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(PipelineError::SourceRoot(format!(
                "{} config exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let config: ForgeConfig = serde_json::from_slice(&output.stdout)
            .map_err(|e| PipelineError::SourceRoot(format!("invalid forge config: {}", e)))?;

        Ok(self.project_dir.join(config.src))
    }
}

/// Scans a source tree for files named after declared entities
#[derive(Debug, Clone)]
pub struct SourceLocator {
    extension: String,
}

impl SourceLocator {
    pub fn new(extension: impl Into<String>) -> Self {
        Self { extension: extension.into() }
    }

    pub fn locate(&self, names: &[String], source_dir: &Path, out_dir: &Path) -> Result<NameToPath, PipelineError> {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        let mut name_to_path = NameToPath::new();

        for file in self.candidates(source_dir) {
            let Some(name) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !wanted.contains(name) {
                continue;
            }

            let relative = relative_path(out_dir, &file)?;
            if let Some(previous) = name_to_path.insert(name.to_string(), relative.clone()) {
                tracing::warn!(name, previous = %previous, chosen = %relative, "multiple sources share a name, keeping the last");
            }
        }

        Ok(name_to_path)
    }

    /// Every file under `source_dir` with the configured extension, sorted
    fn candidates(&self, source_dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for entry in WalkDir::new(source_dir) {
            match entry {
                Ok(e) => {
                    if e.file_type().is_file()
                        && e.path().extension().map_or(false, |ext| ext == self.extension.as_str())
                    {
                        files.push(e.path().to_path_buf());
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable source entry");
                }
            }
        }

        files.sort();
        files
    }
}

impl Default for SourceLocator {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_EXTENSION)
    }
}

/// Path of `to` relative to the directory `from`, `/`-separated.
/// Relative inputs are anchored at the current directory.
pub fn relative_path(from: &Path, to: &Path) -> Result<String, PipelineError> {
    if from.is_absolute() && to.is_absolute() {
        return Ok(relative_path_in(Path::new("/"), from, to));
    }

    let cwd = env::current_dir()
        .map_err(|e| PipelineError::SourceRoot(format!("current directory unavailable: {}", e)))?;
    Ok(relative_path_in(&cwd, from, to))
}

fn relative_path_in(cwd: &Path, from: &Path, to: &Path) -> String {
    let from = absolute(cwd, from);
    let to = absolute(cwd, to);

    let from_parts: Vec<_> = from.components().collect();
    let to_parts: Vec<_> = to.components().collect();
    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = vec!["..".to_string(); from_parts.len() - common];
    segments.extend(
        to_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    segments.join("/")
}

/// Anchored at `cwd`, with `.` and `..` folded lexically
fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in cwd.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
