// src/tasks/copy.rs

use tracing::debug;

use super::output::write_if_changed;
use super::{Task, TaskContext, TaskError, TaskReport};

/// Copy every matched source into `dest`, preserving its path relative to
/// the glob base.
pub fn run(task: &Task, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
    let fs = ctx.fs.as_ref();
    let dest = ctx.dest_dir(task);
    let mut report = TaskReport::default();

    for source in task.sources().collect(fs, &ctx.root)? {
        let target = dest.join(&source.rel);
        let bytes = fs.read(&source.path)?;
        if write_if_changed(fs, &target, &bytes)? {
            debug!(task = %task.name(), from = ?source.path, to = ?target, "copied");
            report.written.push(target.clone());
        }
        report.outputs.push(target);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::config::{PathsSection, TaskConfig};
    use crate::fs::mock::MockFileSystem;
    use crate::types::TaskKind;

    fn images_task() -> Task {
        let mut cfg = TaskConfig::of_kind(TaskKind::Copy);
        cfg.src = vec!["src/img/static/**/*".to_string()];
        cfg.dest = Some(PathBuf::from("dist/img"));
        Task::from_config("images", &cfg, &PathsSection::default()).unwrap()
    }

    #[test]
    fn copies_with_structure_and_skips_unchanged() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/img/static/logo.png", "png");
        fs.add_file("/p/src/img/static/bg/hero.jpg", "jpg");
        let ctx = TaskContext::new("/p", Arc::new(fs.clone()));
        let task = images_task();

        let first = run(&task, &ctx).unwrap();
        assert_eq!(
            first.outputs,
            vec![
                PathBuf::from("/p/dist/img/bg/hero.jpg"),
                PathBuf::from("/p/dist/img/logo.png"),
            ]
        );
        assert_eq!(first.written, first.outputs);

        let second = run(&task, &ctx).unwrap();
        assert_eq!(second.outputs, first.outputs);
        assert!(second.written.is_empty());
    }

    #[test]
    fn no_matches_produces_nothing() {
        let fs = MockFileSystem::new();
        let ctx = TaskContext::new("/p", Arc::new(fs.clone()));
        let report = run(&images_task(), &ctx).unwrap();
        assert_eq!(report, TaskReport::default());
        assert!(fs.files().is_empty());
    }
}
