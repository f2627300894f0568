// src/tasks/mod.rs

//! Build tasks: what each named unit of work does to the filesystem.
//!
//! A [`Task`] is compiled from its `[task.<name>]` config section. Running it
//! produces a [`TaskReport`] describing the outputs it owns and which of them
//! actually changed on disk, or a [`TaskError`] describing why it failed.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use thiserror::Error;
use tracing::debug;

use crate::config::{PathsSection, TaskConfig};
use crate::engine::TaskName;
use crate::errors::{AssetdagError, Result};
use crate::fs::FileSystem;
use crate::types::{CommandMode, FailureKind, OnError, TaskKind};

pub mod clean;
pub mod command;
pub mod copy;
pub mod include;
pub mod minify;
pub mod output;
pub mod sources;
pub mod sprite;

pub use command::CommandSpec;
pub use include::IncludeOptions;
pub use output::OutputLedger;
pub use sources::{SourceFile, SourceSet};
pub use sprite::SpriteOptions;

/// What a task does with its sources.
#[derive(Debug, Clone)]
pub enum Transform {
    /// Remove the task's `dest` directory.
    Clean,
    /// Copy sources verbatim.
    Copy,
    /// Expand include directives in markup.
    Include(IncludeOptions),
    /// Combine SVG icons into one sprite sheet.
    Sprite(SpriteOptions),
    /// Delegate to an external command.
    Command(CommandSpec),
}

/// A compiled, runnable task.
#[derive(Debug, Clone)]
pub struct Task {
    name: TaskName,
    transform: Transform,
    sources: SourceSet,
    dest: PathBuf,
    watch: Vec<String>,
    on_error: OnError,
}

impl Task {
    /// Compile a task from its config section.
    pub fn from_config(name: &str, cfg: &TaskConfig, paths: &PathsSection) -> Result<Self> {
        let invalid = |msg: String| AssetdagError::ConfigError(format!("task '{name}': {msg}"));

        let dest = match (&cfg.dest, cfg.kind) {
            (Some(dest), _) => dest.clone(),
            (None, TaskKind::Clean) => paths.dest.clone(),
            (None, kind) => return Err(invalid(format!("{kind:?} tasks require `dest`"))),
        };
        ensure_relative(&dest).map_err(|msg| invalid(format!("`dest` {msg}")))?;

        let sources = SourceSet::new(&cfg.src).map_err(|e| invalid(format!("{e:#}")))?;
        if cfg.kind != TaskKind::Clean && sources.is_empty() {
            return Err(invalid("at least one `src` pattern is required".to_string()));
        }

        for pattern in &cfg.watch {
            sources::compile_glob(&sources::normalize_pattern(pattern))
                .map_err(|e| invalid(format!("{e:#}")))?;
        }

        let transform = match cfg.kind {
            TaskKind::Clean => Transform::Clean,
            TaskKind::Copy => Transform::Copy,
            TaskKind::Include => {
                let prefix = cfg.prefix.clone().unwrap_or_else(|| "@@".to_string());
                if prefix.is_empty() {
                    return Err(invalid("`prefix` must not be empty".to_string()));
                }
                Transform::Include(IncludeOptions {
                    prefix,
                    collapse_whitespace: cfg.collapse_whitespace,
                })
            }
            TaskKind::Sprite => {
                let output = cfg.output.clone().unwrap_or_else(|| "sprite.svg".to_string());
                ensure_file_name(&output).map_err(|msg| invalid(format!("`output` {msg}")))?;
                Transform::Sprite(SpriteOptions { output })
            }
            TaskKind::Command => {
                let template = cfg
                    .cmd
                    .clone()
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| invalid("command tasks require `cmd`".to_string()))?;
                if cfg.mode == CommandMode::Once {
                    let output = cfg.output.clone().ok_or_else(|| {
                        invalid("`mode = \"once\"` requires `output`".to_string())
                    })?;
                    ensure_file_name(&output).map_err(|msg| invalid(format!("`output` {msg}")))?;
                }
                if cfg.entry.is_some() && cfg.entry_line.is_some() {
                    return Err(invalid("`entry` and `entry_line` are exclusive".to_string()));
                }
                Transform::Command(CommandSpec {
                    template,
                    mode: cfg.mode,
                    entry: cfg.entry.clone(),
                    entry_line: cfg.entry_line.clone(),
                    output: cfg.output.clone(),
                    extension: cfg.extension.clone(),
                })
            }
        };

        Ok(Self {
            name: name.to_string(),
            transform,
            sources,
            dest,
            watch: cfg.watch.iter().map(|w| sources::normalize_pattern(w)).collect(),
            on_error: cfg.on_error,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TaskKind {
        match self.transform {
            Transform::Clean => TaskKind::Clean,
            Transform::Copy => TaskKind::Copy,
            Transform::Include(_) => TaskKind::Include,
            Transform::Sprite(_) => TaskKind::Sprite,
            Transform::Command(_) => TaskKind::Command,
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// Output directory, relative to the project root.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn watch(&self) -> &[String] {
        &self.watch
    }

    pub fn on_error(&self) -> OnError {
        self.on_error
    }
}

/// Where tasks run: the project root and the filesystem native transforms use.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
}

impl TaskContext {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    pub fn dest_dir(&self, task: &Task) -> PathBuf {
        self.root.join(task.dest())
    }
}

/// Result of a successful task run. Paths are absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Every output this task currently owns.
    pub outputs: Vec<PathBuf>,
    /// Outputs whose content changed on this run.
    pub written: Vec<PathBuf>,
    /// Paths deleted on this run.
    pub removed: Vec<PathBuf>,
}

impl TaskReport {
    pub fn has_changes(&self) -> bool {
        !self.written.is_empty() || !self.removed.is_empty()
    }

    /// Written and removed paths together.
    pub fn changed(&self) -> Vec<PathBuf> {
        self.written.iter().chain(self.removed.iter()).cloned().collect()
    }
}

/// Why a task failed.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A source could not be transformed (bad include, malformed SVG...).
    #[error("{}: {message}", path.display())]
    Transform { path: PathBuf, message: String },

    /// An external command exited unsuccessfully.
    #[error("`{cmd}` failed ({}): {stderr}", exit_label(*code))]
    Command {
        cmd: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl TaskError {
    pub fn transform(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Transform {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            TaskError::Transform { .. } => FailureKind::Transform,
            TaskError::Command { code, .. } => FailureKind::Command(*code),
            TaskError::Io(_) => FailureKind::Io,
        }
    }
}

/// Run `task` once.
///
/// `previous` lists the outputs the task produced on its last successful
/// run; any that are not produced again are deleted.
pub async fn run(
    task: Arc<Task>,
    ctx: TaskContext,
    previous: Vec<PathBuf>,
) -> std::result::Result<TaskReport, TaskError> {
    debug!(task = %task.name(), kind = ?task.kind(), "running task");

    let report = match task.transform() {
        Transform::Command(spec) => command::run(&task, spec, &ctx).await?,
        _ => {
            let task = Arc::clone(&task);
            let ctx = ctx.clone();
            tokio::task::spawn_blocking(move || run_native(&task, &ctx))
                .await
                .map_err(|e| TaskError::Io(anyhow!("task worker panicked: {e}")))??
        }
    };

    if task.kind() == TaskKind::Clean {
        return Ok(report);
    }
    Ok(output::prune_stale(ctx.fs.as_ref(), report, &previous)?)
}

/// Run a filesystem-only transformation synchronously.
pub fn run_native(task: &Task, ctx: &TaskContext) -> std::result::Result<TaskReport, TaskError> {
    match task.transform() {
        Transform::Clean => clean::run(task, ctx),
        Transform::Copy => copy::run(task, ctx),
        Transform::Include(opts) => include::run(task, opts, ctx),
        Transform::Sprite(opts) => sprite::run(task, opts, ctx),
        Transform::Command(_) => Err(TaskError::Io(anyhow!(
            "task '{}' runs an external command",
            task.name()
        ))),
    }
}

fn ensure_relative(path: &Path) -> std::result::Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("must not be empty".to_string());
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(format!("must stay inside the project root: {path:?}")),
        }
    }
    if path.components().all(|c| matches!(c, Component::CurDir)) {
        return Err("must not be the project root".to_string());
    }
    Ok(())
}

fn ensure_file_name(name: &str) -> std::result::Result<(), String> {
    let path = Path::new(name);
    if name.is_empty() || path.components().count() != 1 || path.file_name().is_none() {
        return Err(format!("must be a plain file name: {name:?}"));
    }
    Ok(())
}
