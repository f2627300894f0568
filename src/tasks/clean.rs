// src/tasks/clean.rs

use tracing::{debug, info};

use super::{Task, TaskContext, TaskError, TaskReport};

/// Remove the task's `dest` directory and everything below it.
///
/// Running against an already-missing directory is a no-op.
pub fn run(task: &Task, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
    let dest = ctx.dest_dir(task);
    let mut report = TaskReport::default();

    if ctx.fs.exists(&dest) {
        ctx.fs.remove_dir_all(&dest)?;
        info!(task = %task.name(), dir = ?dest, "removed output directory");
        report.removed.push(dest);
    } else {
        debug!(task = %task.name(), dir = ?dest, "output directory already absent");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use super::*;
    use crate::config::{PathsSection, TaskConfig};
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;
    use crate::types::TaskKind;

    #[test]
    fn removes_only_the_output_root_and_is_idempotent() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/dist/index.html", "x");
        fs.add_file("/p/dist/assets/a.css", "x");
        fs.add_file("/p/src/index.html", "x");
        let ctx = TaskContext::new("/p", Arc::new(fs.clone()));
        let task = Task::from_config(
            "clean",
            &TaskConfig::of_kind(TaskKind::Clean),
            &PathsSection::default(),
        )
        .unwrap();

        let report = run(&task, &ctx).unwrap();
        assert_eq!(report.removed, vec![PathBuf::from("/p/dist")]);
        assert_eq!(fs.files(), vec![PathBuf::from("/p/src/index.html")]);
        assert!(!fs.exists(Path::new("/p/dist")));

        let again = run(&task, &ctx).unwrap();
        assert!(!again.has_changes());
    }
}
