#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use assetdag::config::{
    ConfigFile, ConfigSection, PathsSection, PipelineConfig, RawConfigFile, ServerSection,
    StepConfig, TaskConfig,
};
use assetdag::errors::Result;
use assetdag::types::{CommandMode, OnError, TaskKind, TriggerWhileRunningBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                paths: PathsSection::default(),
                server: ServerSection::default(),
                task: BTreeMap::new(),
                pipeline: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_pipeline(mut self, name: &str, pipeline: PipelineConfig) -> Self {
        self.config.pipeline.insert(name.to_string(), pipeline);
        self
    }

    pub fn with_paths(mut self, src: &str, dest: &str) -> Self {
        self.config.paths = PathsSection {
            src: PathBuf::from(src),
            dest: PathBuf::from(dest),
        };
        self
    }

    pub fn with_behaviour(
        mut self,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
    ) -> Self {
        self.config.config = ConfigSection {
            triggered_while_running_behaviour: behaviour,
            queue_length,
        };
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            task: TaskConfig::of_kind(kind),
        }
    }

    pub fn clean() -> Self {
        Self::new(TaskKind::Clean)
    }

    /// An `each` command task.
    pub fn command(cmd: &str) -> Self {
        let mut builder = Self::new(TaskKind::Command);
        builder.task.cmd = Some(cmd.to_string());
        builder
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.task.src.push(pattern.to_string());
        self
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.task.dest = Some(PathBuf::from(dest));
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.task.watch.push(pattern.to_string());
        self
    }

    pub fn on_error(mut self, on_error: OnError) -> Self {
        self.task.on_error = on_error;
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.task.prefix = Some(prefix.to_string());
        self
    }

    pub fn collapse_whitespace(mut self, val: bool) -> Self {
        self.task.collapse_whitespace = val;
        self
    }

    pub fn once(mut self, output: &str) -> Self {
        self.task.mode = CommandMode::Once;
        self.task.output = Some(output.to_string());
        self
    }

    pub fn entry(mut self, entry: &str) -> Self {
        self.task.entry = Some(entry.to_string());
        self
    }

    pub fn output(mut self, output: &str) -> Self {
        self.task.output = Some(output.to_string());
        self
    }

    pub fn extension(mut self, ext: &str) -> Self {
        self.task.extension = Some(ext.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for `PipelineConfig`. Top-level steps run in series.
pub struct PipelineBuilder {
    pipeline: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            pipeline: PipelineConfig {
                steps: Vec::new(),
                watch: false,
                serve: false,
            },
        }
    }

    pub fn task(mut self, name: &str) -> Self {
        self.pipeline.steps.push(StepConfig::Task(name.to_string()));
        self
    }

    pub fn parallel(mut self, names: &[&str]) -> Self {
        self.pipeline.steps.push(StepConfig::Parallel {
            parallel: names.iter().map(|n| StepConfig::Task(n.to_string())).collect(),
        });
        self
    }

    pub fn step(mut self, step: StepConfig) -> Self {
        self.pipeline.steps.push(step);
        self
    }

    pub fn watch(mut self, val: bool) -> Self {
        self.pipeline.watch = val;
        self
    }

    pub fn serve(mut self, val: bool) -> Self {
        self.pipeline.serve = val;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.pipeline
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
