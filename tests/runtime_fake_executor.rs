// tests/runtime_fake_executor.rs

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use assetdag::config::ConfigFile;
use assetdag::dag::Scheduler;
use assetdag::engine::{
    CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
};
use assetdag::select_target;
use assetdag::types::{OnError, TaskKind, TriggerWhileRunningBehaviour};
use assetdag_test_utils::builders::{ConfigFileBuilder, PipelineBuilder, TaskConfigBuilder};
use assetdag_test_utils::fake_executor::FakeExecutor;
use assetdag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn copy_task(name: &str) -> TaskConfigBuilder {
    TaskConfigBuilder::new(TaskKind::Copy)
        .src(&format!("src/{name}/**/*"))
        .dest(&format!("dist/{name}"))
}

/// clean -> [a, b] -> c
fn diamond_config(b_on_error: OnError) -> ConfigFile {
    ConfigFileBuilder::new()
        .with_task("clean", TaskConfigBuilder::clean().build())
        .with_task("a", copy_task("a").build())
        .with_task("b", copy_task("b").on_error(b_on_error).build())
        .with_task("c", copy_task("c").build())
        .with_pipeline(
            "default",
            PipelineBuilder::new()
                .task("clean")
                .parallel(&["a", "b"])
                .task("c")
                .build(),
        )
        .build()
}

async fn run_once(
    cfg: &ConfigFile,
    target: &str,
    failing: &[&str],
) -> Result<(Vec<String>, RunReport), Box<dyn Error>> {
    init_tracing();

    let pipeline = select_target(cfg, target)?;
    let scheduler = Scheduler::new(&pipeline, &cfg.tasks)?;
    let options = RuntimeOptions {
        exit_when_idle: true,
        watch_after_build: false,
    };

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone()).failing(failing);

    rt_tx.send(RuntimeEvent::RunPipeline).await?;

    let core = CoreRuntime::new(scheduler, TriggerWhileRunningBehaviour::Queue, 1, options);
    let runtime = Runtime::new(core, rt_rx, executor);
    let report = with_timeout(runtime.run()).await?;

    let executed = executed.lock().unwrap().clone();
    Ok((executed, report))
}

#[tokio::test]
async fn build_pass_runs_every_task_in_order() -> TestResult {
    let cfg = diamond_config(OnError::Fail);
    let (executed, report) = run_once(&cfg, "default", &[]).await?;

    assert_eq!(executed, vec!["clean", "a", "b", "c"]);
    assert!(report.build_pass_done);
    assert!(report.is_success());
    Ok(())
}

#[tokio::test]
async fn failed_task_blocks_its_dependents() -> TestResult {
    let cfg = diamond_config(OnError::Fail);
    let (executed, report) = run_once(&cfg, "default", &["b"]).await?;

    assert_eq!(executed, vec!["clean", "a", "b"]);
    assert!(report.build_pass_done);
    assert_eq!(
        report.failed_tasks.into_iter().collect::<Vec<_>>(),
        vec!["b".to_string(), "c".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn tolerated_failure_lets_dependents_run() -> TestResult {
    let cfg = diamond_config(OnError::Continue);
    let (executed, report) = run_once(&cfg, "default", &["b"]).await?;

    assert_eq!(executed, vec!["clean", "a", "b", "c"]);
    assert_eq!(
        report.failed_tasks.into_iter().collect::<Vec<_>>(),
        vec!["b".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn single_task_target_runs_only_that_task() -> TestResult {
    let cfg = diamond_config(OnError::Fail);
    let (executed, report) = run_once(&cfg, "c", &[]).await?;

    assert_eq!(executed, vec!["c"]);
    assert!(report.is_success());
    Ok(())
}

#[tokio::test]
async fn trigger_during_build_reruns_only_that_task_afterwards() -> TestResult {
    init_tracing();

    let cfg = diamond_config(OnError::Fail);
    let pipeline = select_target(&cfg, "default")?;
    let scheduler = Scheduler::new(&pipeline, &cfg.tasks)?;
    let options = RuntimeOptions {
        exit_when_idle: false,
        watch_after_build: true,
    };

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());

    // Both land before any completion, so `b` is still pending in the
    // build pass when its trigger arrives.
    rt_tx.send(RuntimeEvent::RunPipeline).await?;
    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: "b".to_string(),
            reason: TriggerReason::FileWatch,
        })
        .await?;

    let core = CoreRuntime::new(scheduler, TriggerWhileRunningBehaviour::Queue, 1, options);
    let runtime = Runtime::new(core, rt_rx, executor);
    let handle = tokio::spawn(runtime.run());

    with_timeout(async {
        while executed.lock().unwrap().len() < 5 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let report = with_timeout(handle).await??;
    assert_eq!(
        executed.lock().unwrap().clone(),
        vec!["clean", "a", "b", "c", "b"]
    );
    assert!(report.is_success());
    Ok(())
}

#[tokio::test]
async fn trigger_for_unknown_task_is_ignored() -> TestResult {
    init_tracing();

    let cfg = diamond_config(OnError::Fail);
    let pipeline = select_target(&cfg, "c")?;
    let scheduler = Scheduler::new(&pipeline, &cfg.tasks)?;
    let options = RuntimeOptions {
        exit_when_idle: true,
        watch_after_build: false,
    };

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());

    rt_tx.send(RuntimeEvent::RunPipeline).await?;
    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: "a".to_string(),
            reason: TriggerReason::Manual,
        })
        .await?;

    let core = CoreRuntime::new(scheduler, TriggerWhileRunningBehaviour::Queue, 1, options);
    let report = with_timeout(Runtime::new(core, rt_rx, executor).run()).await?;

    assert_eq!(executed.lock().unwrap().clone(), vec!["c"]);
    assert!(report.is_success());
    Ok(())
}

#[tokio::test]
async fn watching_recovers_when_a_failed_task_is_retriggered() -> TestResult {
    init_tracing();

    let cfg = diamond_config(OnError::Continue);
    let pipeline = select_target(&cfg, "default")?;
    let scheduler = Scheduler::new(&pipeline, &cfg.tasks)?;
    let options = RuntimeOptions {
        exit_when_idle: false,
        watch_after_build: true,
    };

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone()).failing_first(&["b"]);

    rt_tx.send(RuntimeEvent::RunPipeline).await?;

    let core = CoreRuntime::new(scheduler, TriggerWhileRunningBehaviour::Queue, 1, options);
    let runtime = Runtime::new(core, rt_rx, executor);
    let handle = tokio::spawn(runtime.run());

    with_timeout(async {
        while executed.lock().unwrap().len() < 4 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    // The failed build pass does not end a watching session.
    sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());

    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: "b".to_string(),
            reason: TriggerReason::FileWatch,
        })
        .await?;
    with_timeout(async {
        while executed.lock().unwrap().len() < 5 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    // Let the completion of the re-run reach the core before stopping.
    sleep(Duration::from_millis(50)).await;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let report = with_timeout(handle).await??;
    assert_eq!(
        executed.lock().unwrap().clone(),
        vec!["clean", "a", "b", "c", "b"]
    );
    assert!(report.build_pass_done);
    assert!(report.failed_tasks.is_empty(), "{report:?}");
    Ok(())
}
