// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod reload;
pub mod session;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, ConfigSource};
use crate::dag::Scheduler;
use crate::engine::{CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::AssetdagError;
use crate::exec::{ExecutorContext, RealExecutorBackend};
use crate::fs::RealFileSystem;
use crate::pipeline::Pipeline;
use crate::reload::ReloadNotifier;
use crate::session::{DevSession, ServeOptions, SessionOptions};
use crate::tasks::TaskContext;
use crate::watch::WatchBindings;

/// Knobs for [`run_target`] that come from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Exit after the build pass even if the pipeline watches.
    pub once: bool,
    /// Overrides `[server].port`.
    pub port: Option<u16>,
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config resolution
/// - target selection
/// - scheduler / queue / runtime
/// - executor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let explicit = args.config.as_deref().map(Path::new);
    let (cfg, source) = config::resolve(explicit, &cwd)?;
    let root = project_root(&source, &cwd);

    let pipeline = select_target(&cfg, &args.target)?;

    if args.dry_run {
        print_dry_run(&cfg, &source, &root, &pipeline);
        return Ok(());
    }

    let options = RunOptions {
        once: args.once,
        port: args.port,
    };
    let watching = pipeline.watch() && !options.once;
    let report = run_pipeline(&cfg, &root, &pipeline, options).await?;

    if watching {
        return Ok(());
    }
    if !report.build_pass_done && report.failed_tasks.is_empty() {
        warn!("interrupted before the build pass finished");
        return Ok(());
    }
    if !report.is_success() {
        let failed = report.failed_tasks.into_iter().collect();
        return Err(AssetdagError::BuildFailed(failed).into());
    }

    info!(pipeline = pipeline.name(), "build finished");
    Ok(())
}

/// Resolve `target` and run it from `root`.
pub async fn run_target(
    cfg: &ConfigFile,
    root: &Path,
    target: &str,
    options: RunOptions,
) -> Result<RunReport> {
    let pipeline = select_target(cfg, target)?;
    run_pipeline(cfg, root, &pipeline, options).await
}

/// Run `pipeline` to completion: the build pass, then, for watching
/// pipelines, watch and serve until Ctrl-C.
pub async fn run_pipeline(
    cfg: &ConfigFile,
    root: &Path,
    pipeline: &Pipeline,
    options: RunOptions,
) -> Result<RunReport> {
    let src_dir = root.join(&cfg.paths.src);
    if !src_dir.is_dir() {
        return Err(AssetdagError::MissingSourceRoot(src_dir).into());
    }

    let watching = pipeline.watch() && !options.once;
    let scheduler = Scheduler::new(pipeline, &cfg.tasks)?;

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let notifier = ReloadNotifier::new();
    let ctx = ExecutorContext::new(
        TaskContext::new(root, Arc::new(RealFileSystem)),
        notifier.clone(),
    );
    let executor = RealExecutorBackend::new(rt_tx.clone(), ctx);

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let runtime_options = RuntimeOptions {
        exit_when_idle: !watching,
        watch_after_build: watching,
    };
    let core = CoreRuntime::new(
        scheduler,
        cfg.config.triggered_while_running_behaviour,
        cfg.config.queue_length,
        runtime_options,
    );
    let mut runtime = Runtime::new(core, rt_rx, executor);

    if watching {
        let bindings = WatchBindings::from_pipeline(pipeline, &cfg.tasks)?;
        if bindings.is_empty() {
            warn!(pipeline = pipeline.name(), "no task declares watch globs");
        }
        let serve = pipeline.serve().then(|| ServeOptions {
            host: cfg.server.host.clone(),
            port: options.port.unwrap_or(cfg.server.port),
            dest: root.join(&cfg.paths.dest),
            notifier,
        });
        let session = SessionOptions {
            root: root.to_path_buf(),
            watch_dir: src_dir,
            bindings,
            runtime_tx: rt_tx.clone(),
            serve,
        };
        runtime = runtime.with_launcher(Box::new(move || DevSession::start(session)));
    }

    info!(
        pipeline = pipeline.name(),
        tasks = pipeline.tasks().len(),
        watching,
        "starting pipeline"
    );
    rt_tx.send(RuntimeEvent::RunPipeline).await?;
    drop(rt_tx);

    let report = runtime.run().await?;
    Ok(report)
}

/// A configured pipeline, or a single task run once.
pub fn select_target(cfg: &ConfigFile, target: &str) -> Result<Pipeline> {
    if let Some(pipeline) = cfg.pipeline(target) {
        return Ok(pipeline.clone());
    }
    if cfg.task(target).is_some() {
        return Ok(Pipeline::single(target));
    }
    Err(AssetdagError::UnknownTarget(target.to_string()).into())
}

/// Paths in a config file are relative to the directory holding it; the
/// built-in definition is relative to the working directory.
fn project_root(source: &ConfigSource, cwd: &Path) -> PathBuf {
    match source {
        ConfigSource::File(path) => match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
            _ => cwd.to_path_buf(),
        },
        ConfigSource::Builtin => cwd.to_path_buf(),
    }
}

/// Print the resolved target without running anything.
fn print_dry_run(cfg: &ConfigFile, source: &ConfigSource, root: &Path, pipeline: &Pipeline) {
    println!("assetdag dry-run");
    match source {
        ConfigSource::File(path) => println!("  config: {}", path.display()),
        ConfigSource::Builtin => println!("  config: built-in"),
    }
    println!("  root: {}", root.display());
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        cfg.config.triggered_while_running_behaviour
    );
    println!("  config.queue_length = {}", cfg.config.queue_length);
    println!();

    let mut flags = Vec::new();
    if pipeline.watch() {
        flags.push("watch");
    }
    if pipeline.serve() {
        flags.push("serve");
    }
    if flags.is_empty() {
        println!("pipeline '{}':", pipeline.name());
    } else {
        println!("pipeline '{}' ({}):", pipeline.name(), flags.join(", "));
    }

    for name in pipeline.tasks() {
        let Some(task) = cfg.task(name) else {
            continue;
        };
        println!("  - {name} ({:?})", task.kind());
        println!("      dest: {}", task.dest().display());
        if !task.sources().is_empty() {
            let src: Vec<&str> = task.sources().patterns().collect();
            println!("      src: {src:?}");
        }
        let after = pipeline.dependencies_of(name);
        if !after.is_empty() {
            println!("      after: {after:?}");
        }
        if !task.watch().is_empty() {
            println!("      watch: {:?}", task.watch());
        }
    }

    debug!("dry-run complete (no execution)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_resolve_to_pipelines_or_single_tasks() {
        let cfg = config::load_builtin().unwrap();

        let default = select_target(&cfg, "default").unwrap();
        assert!(default.watch() && default.serve());

        let single = select_target(&cfg, "sprite").unwrap();
        assert_eq!(single.tasks(), ["sprite".to_string()]);
        assert!(!single.watch());

        let err = select_target(&cfg, "deploy").unwrap_err();
        assert!(err.to_string().contains("deploy"));
    }

    #[test]
    fn project_root_follows_config_location() {
        let cwd = Path::new("/work");
        assert_eq!(
            project_root(&ConfigSource::File(PathBuf::from("site/Assetdag.toml")), cwd),
            PathBuf::from("/work/site")
        );
        assert_eq!(
            project_root(&ConfigSource::File(PathBuf::from("Assetdag.toml")), cwd),
            PathBuf::from("/work")
        );
        assert_eq!(project_root(&ConfigSource::Builtin, cwd), PathBuf::from("/work"));
    }
}
