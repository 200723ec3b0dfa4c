//! Runs Python snippets with an external interpreter.
//!
//! This is NOT a sandbox. The snippet runs with the privileges of the tutor
//! process and can touch anything the user can.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use dstutor_types::TutorError;
use serde::Serialize;
use tokio::process::Command;

const SNIPPET_FILE: &str = "snippet.py";
const DRIVER_FILE: &str = "driver.py";
const FIGURE_PREFIX: &str = "figure_";
const SCRATCH_PREFIX: &str = "dstutor-run-";

/// Runs the snippet, then saves whatever matplotlib figures are still open
const DRIVER_SOURCE: &str = r#"import runpy
import sys

try:
    runpy.run_path("snippet.py", run_name="__main__")
finally:
    if "matplotlib.pyplot" in sys.modules:
        _plt = sys.modules["matplotlib.pyplot"]
        for _num in _plt.get_fignums():
            _plt.figure(_num).savefig("figure_%d.png" % _num)
"#;

/// What a snippet printed and drew
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
    /// PNG files of the figures the snippet left open, in figure order
    pub figures: Vec<PathBuf>,
    pub scratch_dir: PathBuf,
}

/// External Python interpreter driver
#[derive(Debug, Clone)]
pub struct PythonRunner {
    interpreter: String,
    timeout: Option<Duration>,
    work_root: PathBuf,
}

impl Default for PythonRunner {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl PythonRunner {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout: None,
            work_root: std::env::temp_dir(),
        }
    }

    /// Kill the interpreter after `timeout`; no limit by default
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Directory under which per-run scratch directories are created
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Run `code` in a fresh scratch directory and capture its output.
    ///
    /// On success the directory holds the figures and belongs to the caller,
    /// who releases it with [`remove_scratch_dir`]. On failure it is removed here.
    pub async fn run(&self, code: &str) -> Result<ExecutionOutput, TutorError> {
        let scratch_dir = self
            .prepare_scratch(code)
            .map_err(|e| TutorError::CodeExecution(format!("{:#}", e)))?;

        let result = self.execute(scratch_dir.clone()).await;
        if result.is_err() {
            remove_scratch_dir(&scratch_dir);
        }
        result
    }

    async fn execute(&self, scratch_dir: PathBuf) -> Result<ExecutionOutput, TutorError> {
        let mut command = Command::new(&self.interpreter);
        command
            .arg(DRIVER_FILE)
            .current_dir(&scratch_dir)
            .env("MPLBACKEND", "Agg")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log::info!("running snippet with {} in {}", self.interpreter, scratch_dir.display());
        let run = command.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                TutorError::CodeExecution(format!("snippet timed out after {:?}", limit))
            })?,
            None => run.await,
        }
        .map_err(|e| {
            TutorError::CodeExecution(format!("failed to start {}: {}", self.interpreter, e))
        })?;

        let figures = collect_figures(&scratch_dir)
            .map_err(|e| TutorError::CodeExecution(format!("{:#}", e)))?;

        Ok(ExecutionOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            success: output.status.success(),
            figures,
            scratch_dir,
        })
    }

    fn prepare_scratch(&self, code: &str) -> anyhow::Result<PathBuf> {
        let dir = self.work_root.join(format!("{}{}", SCRATCH_PREFIX, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create scratch directory {}", dir.display()))?;
        std::fs::write(dir.join(SNIPPET_FILE), code).context("Failed to write snippet")?;
        std::fs::write(dir.join(DRIVER_FILE), DRIVER_SOURCE).context("Failed to write driver")?;
        Ok(dir)
    }
}

/// Delete a run's scratch directory and the figures in it
pub fn remove_scratch_dir(dir: &Path) {
    let is_scratch = dir
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(SCRATCH_PREFIX));
    if !is_scratch {
        log::warn!("refusing to remove {}: not a scratch directory", dir.display());
        return;
    }
    match std::fs::remove_dir_all(dir) {
        Ok(()) => log::debug!("removed scratch directory {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("failed to remove {}: {}", dir.display(), e),
    }
}

fn collect_figures(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut figures: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let number = name
                .strip_prefix(FIGURE_PREFIX)?
                .strip_suffix(".png")?
                .parse::<u32>()
                .ok()?;
            Some((number, entry.path()))
        })
        .collect();
    figures.sort_by_key(|(number, _)| *number);
    Ok(figures.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_code_execution_error() {
        let root = TempDir::new().unwrap();
        let runner = PythonRunner::new("definitely-not-a-python-binary").with_work_root(root.path());

        let err = runner.run("print(1)").await.unwrap_err();
        assert!(matches!(err, TutorError::CodeExecution(ref m) if m.contains("failed to start")));
        // The failed run leaves nothing behind
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_remove_scratch_dir_only_touches_run_directories() {
        let root = TempDir::new().unwrap();
        let runner = PythonRunner::default().with_work_root(root.path());
        let scratch = runner.prepare_scratch("print(1)").unwrap();
        let other = root.path().join("keep-me");
        std::fs::create_dir(&other).unwrap();

        remove_scratch_dir(&scratch);
        remove_scratch_dir(&scratch);
        remove_scratch_dir(&other);

        assert!(!scratch.exists());
        assert!(other.exists());
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        if !python_available() {
            eprintln!("python3 not installed, skipping");
            return;
        }
        let root = TempDir::new().unwrap();
        let runner = PythonRunner::default().with_work_root(root.path());

        let output = runner.run("print('mean =', sum([1, 2, 3]) / 3)").await.unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "mean = 2.0");
        assert!(output.figures.is_empty());
    }

    #[tokio::test]
    async fn test_exception_is_reported_not_raised() {
        if !python_available() {
            eprintln!("python3 not installed, skipping");
            return;
        }
        let root = TempDir::new().unwrap();
        let runner = PythonRunner::default().with_work_root(root.path());

        let output = runner.run("raise ValueError('bad data')").await.unwrap();
        assert!(!output.success);
        assert!(output.stderr.contains("ValueError: bad data"));
    }

    #[tokio::test]
    async fn test_timeout() {
        if !python_available() {
            eprintln!("python3 not installed, skipping");
            return;
        }
        let root = TempDir::new().unwrap();
        let runner = PythonRunner::default()
            .with_work_root(root.path())
            .with_timeout(Some(Duration::from_millis(200)));

        let err = runner.run("import time\ntime.sleep(10)").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_collect_figures_sorted_by_number() {
        let dir = TempDir::new().unwrap();
        for name in ["figure_10.png", "figure_2.png", "figure_1.png", "notes.txt", "figure_x.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let names: Vec<String> = collect_figures(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["figure_1.png", "figure_2.png", "figure_10.png"]);
    }
}
