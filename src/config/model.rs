// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::engine::TaskName;
use crate::pipeline::Pipeline;
use crate::tasks::Task;
use crate::types::{CommandMode, OnError, TaskKind, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from TOML, before validation.
///
/// ```toml
/// [paths]
/// src = "src"
/// dest = "dist"
///
/// [task.styles]
/// kind = "command"
/// mode = "once"
/// cmd = "sass --style=compressed {entry} {output}"
/// src = ["src/assets/style/**/*.scss"]
/// entry_line = '@use "{input}" as s{index};'
/// dest = "dist/assets/style"
/// output = "style.min.css"
/// watch = ["src/assets/style/**/*.scss"]
///
/// [pipeline.default]
/// steps = ["clean", { parallel = ["styles", "markup"] }]
/// watch = true
/// serve = true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub server: ServerSection,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// All pipelines from `[pipeline.<name>]`.
    #[serde(default)]
    pub pipeline: BTreeMap<String, PipelineConfig>,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>`, so every task compiled
/// and every pipeline is a valid DAG over known tasks.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub paths: PathsSection,
    pub server: ServerSection,
    pub tasks: BTreeMap<TaskName, Arc<Task>>,
    pub pipelines: BTreeMap<String, Pipeline>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        paths: PathsSection,
        server: ServerSection,
        tasks: BTreeMap<TaskName, Arc<Task>>,
        pipelines: BTreeMap<String, Pipeline>,
    ) -> Self {
        Self {
            config,
            paths,
            server,
            tasks,
            pipelines,
        }
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks.get(name)
    }

    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.get(name)
    }
}

/// `[config]` section: behaviour of re-triggers during an active run.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued future runs to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_queue_length() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}

/// `[paths]` section: source and output roots, relative to the project root.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: PathBuf,
    #[serde(default = "default_dest")]
    pub dest: PathBuf,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_dest() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            dest: default_dest(),
        }
    }
}

/// `[server]` section for the live-reload dev server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `[task.<name>]` section.
///
/// Fields that only make sense for some kinds are optional here and checked
/// when the task is compiled.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub kind: TaskKind,

    /// Source globs, relative to the project root.
    #[serde(default)]
    pub src: Vec<String>,

    /// Output directory. `clean` defaults to `[paths].dest`.
    #[serde(default)]
    pub dest: Option<PathBuf>,

    /// Globs whose changes re-run this task while watching.
    #[serde(default)]
    pub watch: Vec<String>,

    #[serde(default)]
    pub on_error: OnError,

    /// `include`: directive prefix (default `@@`).
    #[serde(default)]
    pub prefix: Option<String>,

    /// `include`: collapse whitespace in the assembled markup.
    #[serde(default)]
    pub collapse_whitespace: bool,

    /// `command`: shell command template.
    #[serde(default)]
    pub cmd: Option<String>,

    /// `command`: one invocation per input, or one for all inputs.
    #[serde(default)]
    pub mode: CommandMode,

    /// `command` (once): the entry file substituted for `{entry}`. Defaults
    /// to every input whose file name does not start with `_`.
    #[serde(default)]
    pub entry: Option<String>,

    /// `command` (once): generate the entry file instead, one line per
    /// non-partial input (`{input}` relative to the generated file,
    /// `{index}` counting from 1).
    #[serde(default)]
    pub entry_line: Option<String>,

    /// `sprite` / `command` (once): output file name inside `dest`.
    #[serde(default)]
    pub output: Option<String>,

    /// `command` (each): replacement extension for output files.
    #[serde(default)]
    pub extension: Option<String>,
}

impl TaskConfig {
    /// A task config of the given kind with every optional field empty.
    pub fn of_kind(kind: TaskKind) -> Self {
        Self {
            kind,
            src: Vec::new(),
            dest: None,
            watch: Vec::new(),
            on_error: OnError::default(),
            prefix: None,
            collapse_whitespace: false,
            cmd: None,
            mode: CommandMode::default(),
            entry: None,
            entry_line: None,
            output: None,
            extension: None,
        }
    }
}

/// `[pipeline.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Top-level steps, run in series.
    pub steps: Vec<StepConfig>,

    /// After the build pass, keep watching sources and re-running tasks.
    #[serde(default)]
    pub watch: bool,

    /// While watching, serve the output root with live reload.
    #[serde(default)]
    pub serve: bool,
}

/// One step of a pipeline: a task name, or a nested series/parallel group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StepConfig {
    Task(String),
    Series { series: Vec<StepConfig> },
    Parallel { parallel: Vec<StepConfig> },
}
