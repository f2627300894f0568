// src/tasks/command.rs

//! Tasks backed by external tools.
//!
//! The command template is run through the platform shell with the project
//! root as working directory. Placeholders are replaced by shell-quoted,
//! root-relative paths:
//!
//! - `each` mode, once per input: `{input}`, `{output}`, `{output_dir}`
//! - `once` mode, for the whole set: `{entry}`, `{inputs}`, `{output}`,
//!   `{output_dir}`
//!
//! Outputs are produced in a staging directory beside `dest` and only moved
//! into place once every invocation has succeeded, so a failed run leaves
//! the previous outputs alone. Files next to an expected output that extend
//! its name (such as `main.js.map`) belong to the task as well.
//!
//! In `once` mode, inputs whose file name starts with `_` are partials: they
//! are passed in `{inputs}` but never as an entry. Unless a fixed `entry` is
//! configured, `{entry}` is every non-partial input, or, with `entry_line`,
//! a generated file referencing each of them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use crate::fs::{FileSystem, walk_files};
use crate::types::CommandMode;

use super::output::write_if_changed;
use super::sources::SourceFile;
use super::{Task, TaskContext, TaskError, TaskReport};

/// Number of trailing stderr lines kept in a command failure.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub template: String,
    pub mode: CommandMode,
    /// `once`: fixed file passed as `{entry}`.
    pub entry: Option<String>,
    /// `once`: per-entry line of a generated entry file.
    pub entry_line: Option<String>,
    /// `once`: output file name inside `dest`.
    pub output: Option<String>,
    /// `each`: extension given to each output file.
    pub extension: Option<String>,
}

/// Where a run writes before its outputs are committed.
struct Stage {
    dir: TempDir,
    /// `dir` relative to the project root.
    rel: PathBuf,
}

impl Stage {
    fn path(&self) -> &Path {
        self.dir.path()
    }
}

pub async fn run(task: &Task, spec: &CommandSpec, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
    let dest_dir = ctx.dest_dir(task);

    let sources = {
        let fs = Arc::clone(&ctx.fs);
        let root = ctx.root.clone();
        let set = task.sources().clone();
        blocking(move || set.collect(fs.as_ref(), &root)).await?
    };
    let stage = {
        let dest = dest_dir.clone();
        let dir = blocking(move || staging_dir(&dest)).await?;
        let rel = dir.path().strip_prefix(&ctx.root).unwrap_or(dir.path()).to_path_buf();
        Stage { dir, rel }
    };

    let expected = match spec.mode {
        CommandMode::Each => run_each(task, spec, ctx, &sources, &stage).await?,
        CommandMode::Once => run_once(task, spec, ctx, &sources, &stage).await?,
    };

    let report = {
        let fs = Arc::clone(&ctx.fs);
        blocking(move || {
            let report = commit(fs.as_ref(), stage.path(), &dest_dir, &expected)?;
            stage.dir.close().context("removing staging dir")?;
            Ok(report)
        })
        .await?
    };
    debug!(
        task = %task.name(),
        outputs = report.outputs.len(),
        written = report.written.len(),
        "command task finished"
    );
    Ok(report)
}

async fn run_each(
    task: &Task,
    spec: &CommandSpec,
    ctx: &TaskContext,
    sources: &[SourceFile],
    stage: &Stage,
) -> Result<BTreeSet<PathBuf>, TaskError> {
    let mut expected = BTreeSet::new();
    for source in sources {
        let mut rel = source.rel.clone();
        if let Some(ext) = &spec.extension {
            rel.set_extension(ext.trim_start_matches('.'));
        }
        let output_abs = stage.path().join(&rel);
        ensure_parent(&output_abs).await?;

        let cmd = render(
            &spec.template,
            &[
                ("input", shell_quote(&relative(&ctx.root, &source.path))),
                ("output", shell_quote(&slash(&stage.rel.join(&rel)))),
                ("output_dir", shell_quote(&slash(&stage.rel))),
            ],
        );
        execute(task.name(), &cmd, &ctx.root).await?;
        expected.insert(output_abs);
    }
    Ok(expected)
}

async fn run_once(
    task: &Task,
    spec: &CommandSpec,
    ctx: &TaskContext,
    sources: &[SourceFile],
    stage: &Stage,
) -> Result<BTreeSet<PathBuf>, TaskError> {
    let mut expected = BTreeSet::new();
    let entries = entry_sources(sources);
    if sources.is_empty() || (spec.entry.is_none() && entries.is_empty()) {
        debug!(task = %task.name(), "no entry inputs matched; command skipped");
        return Ok(expected);
    }

    let name = spec
        .output
        .as_deref()
        .ok_or_else(|| anyhow!("task '{}' has no output name", task.name()))?;

    let entry = match (&spec.entry, &spec.entry_line) {
        (Some(entry), _) => shell_quote(entry),
        (None, Some(line)) => {
            let file = write_entry_file(line, &entries, ctx, stage).await?;
            shell_quote(&slash(&file))
        }
        (None, None) => quote_all(ctx, &entries),
    };
    let all: Vec<&SourceFile> = sources.iter().collect();

    let cmd = render(
        &spec.template,
        &[
            ("entry", entry),
            ("inputs", quote_all(ctx, &all)),
            ("output", shell_quote(&slash(&stage.rel.join(name)))),
            ("output_dir", shell_quote(&slash(&stage.rel))),
        ],
    );
    execute(task.name(), &cmd, &ctx.root).await?;
    expected.insert(stage.path().join(name));
    Ok(expected)
}

/// Inputs that are not partials, in source order.
fn entry_sources(sources: &[SourceFile]) -> Vec<&SourceFile> {
    sources.iter().filter(|s| !is_partial(&s.path)).collect()
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('_'))
}

fn quote_all(ctx: &TaskContext, sources: &[&SourceFile]) -> String {
    sources
        .iter()
        .map(|s| shell_quote(&relative(&ctx.root, &s.path)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write an entry file into the stage with one rendered `line` per entry
/// and return its root-relative path. `{input}` is relative to the
/// generated file.
async fn write_entry_file(
    line: &str,
    entries: &[&SourceFile],
    ctx: &TaskContext,
    stage: &Stage,
) -> Result<PathBuf, TaskError> {
    let up = "../".repeat(stage.rel.components().count());
    let mut text = String::new();
    for (index, source) in entries.iter().enumerate() {
        let input = format!("{up}{}", relative(&ctx.root, &source.path));
        text.push_str(&render(
            line,
            &[("input", input), ("index", (index + 1).to_string())],
        ));
        text.push('\n');
    }

    let name = match entries.first().and_then(|s| s.path.extension()) {
        Some(ext) => format!("_entry.{}", ext.to_string_lossy()),
        None => "_entry".to_string(),
    };
    let path = stage.path().join(&name);
    tokio::fs::write(&path, text)
        .await
        .with_context(|| format!("writing entry file {:?}", path))?;
    Ok(stage.rel.join(name))
}

/// A fresh directory beside `dest`. Being at the same depth, relative paths
/// a tool records in its outputs (source maps) stay valid after the move.
fn staging_dir(dest: &Path) -> anyhow::Result<TempDir> {
    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    tempfile::Builder::new()
        .prefix(".assetdag-")
        .tempdir_in(parent)
        .with_context(|| format!("creating staging dir in {:?}", parent))
}

/// Move the expected outputs (and their sidecars) from `staged` into `dest`.
fn commit(
    fs: &dyn FileSystem,
    staged: &Path,
    dest: &Path,
    expected: &BTreeSet<PathBuf>,
) -> anyhow::Result<TaskReport> {
    let mut report = TaskReport::default();
    for path in walk_files(fs, staged)? {
        if !owns(expected, &path) {
            continue;
        }
        let Ok(rel) = path.strip_prefix(staged) else {
            continue;
        };
        let target = dest.join(rel);
        let bytes = fs.read(&path)?;
        if write_if_changed(fs, &target, &bytes)? {
            report.written.push(target.clone());
        }
        report.outputs.push(target);
    }
    Ok(report)
}

/// Run `cmd` through the shell in `cwd` and wait for it.
pub async fn execute(task: &str, cmd: &str, cwd: &Path) -> Result<(), TaskError> {
    info!(task, cmd, "running command");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };
    command
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = command
        .output()
        .await
        .with_context(|| format!("spawning `{cmd}` for task '{task}'"))?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!(task, "stdout: {}", line);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(task, "stderr: {}", line);
    }

    if output.status.success() {
        Ok(())
    } else {
        Err(TaskError::Command {
            cmd: cmd.to_string(),
            code: output.status.code(),
            stderr: tail(&stderr, STDERR_TAIL_LINES),
        })
    }
}

/// Replace `{name}` placeholders. Unknown placeholders are left as-is.
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

/// Quote `s` for a POSIX shell unless it is made of safe characters only.
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+=:,@%".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Whether `path` is an expected output or a sidecar of one.
fn owns(expected: &BTreeSet<PathBuf>, path: &Path) -> bool {
    if expected.contains(path) {
        return true;
    }
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return false;
    };
    let name = name.to_string_lossy();
    expected.iter().any(|out| {
        out.parent() == Some(parent)
            && out.file_name().is_some_and(|base| {
                name.strip_prefix(base.to_string_lossy().as_ref())
                    .is_some_and(|rest| rest.starts_with('.'))
            })
    })
}

fn relative(root: &Path, path: &Path) -> String {
    slash(path.strip_prefix(root).unwrap_or(path))
}

fn slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

async fn ensure_parent(path: &Path) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating dir {:?}", parent))?;
    }
    Ok(())
}

async fn blocking<T, F>(f: F) -> Result<T, TaskError>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TaskError::Io(anyhow!("task worker panicked: {e}")))?
        .map_err(TaskError::Io)
}
