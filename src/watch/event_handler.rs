// src/watch/event_handler.rs

//! Turning filesystem events into task triggers.

use std::collections::BTreeSet;
use std::path::Path;

use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchBindings;

/// Tasks bound to any path in `event`. Pure access events trigger nothing.
pub fn tasks_for_event(root: &Path, event: &Event, bindings: &WatchBindings) -> BTreeSet<TaskName> {
    if matches!(event.kind, EventKind::Access(_)) {
        return BTreeSet::new();
    }

    let mut tasks = BTreeSet::new();
    for path in &event.paths {
        let Some(rel) = relative_str(root, path) else {
            debug!(?path, "event outside project root; ignoring");
            continue;
        };
        let matched = bindings.tasks_for(&rel);
        if !matched.is_empty() {
            debug!(rel = %rel, tasks = ?matched, "watch match");
        }
        tasks.extend(matched);
    }
    tasks
}

/// Send one trigger per bound task.
///
/// Returns `false` once the runtime channel is closed, so the caller can
/// stop its loop.
pub async fn process_event(
    root: &Path,
    event: &Event,
    bindings: &WatchBindings,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    for task in tasks_for_event(root, event, bindings) {
        debug!(task = %task, "watch match -> triggering task");
        if let Err(err) = runtime_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::FileWatch,
            })
            .await
        {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

    use super::*;
    use crate::watch::patterns::WatchBinding;

    fn bindings() -> WatchBindings {
        WatchBindings::new(vec![
            WatchBinding::new("src/**/*.html", "markup").unwrap(),
            WatchBinding::new("src/assets/style/**/*.scss", "styles").unwrap(),
        ])
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for p in paths {
            event = event.add_path(PathBuf::from(p));
        }
        event
    }

    #[test]
    fn create_modify_remove_all_trigger() {
        let root = Path::new("/p");
        for kind in [
            EventKind::Create(CreateKind::File),
            EventKind::Modify(ModifyKind::Any),
            EventKind::Remove(RemoveKind::File),
        ] {
            let tasks = tasks_for_event(root, &event(kind, &["/p/src/index.html"]), &bindings());
            assert_eq!(tasks.into_iter().collect::<Vec<_>>(), vec!["markup"]);
        }
    }

    #[test]
    fn access_events_are_ignored() {
        let tasks = tasks_for_event(
            Path::new("/p"),
            &event(EventKind::Access(AccessKind::Any), &["/p/src/index.html"]),
            &bindings(),
        );
        assert!(tasks.is_empty());
    }

    #[test]
    fn rename_events_trigger_for_both_paths() {
        let tasks = tasks_for_event(
            Path::new("/p"),
            &event(
                EventKind::Modify(ModifyKind::Any),
                &["/p/src/assets/style/a.scss", "/p/src/about.html"],
            ),
            &bindings(),
        );
        assert_eq!(tasks.into_iter().collect::<Vec<_>>(), vec!["markup", "styles"]);
    }

    #[tokio::test]
    async fn triggers_are_sent_to_the_runtime() {
        let (tx, mut rx) = mpsc::channel(8);
        let ok = process_event(
            Path::new("/p"),
            &event(EventKind::Modify(ModifyKind::Any), &["/p/src/assets/style/a.scss"]),
            &bindings(),
            &tx,
        )
        .await;
        assert!(ok);
        match rx.recv().await {
            Some(RuntimeEvent::TaskTriggered { task, reason }) => {
                assert_eq!(task, "styles");
                assert_eq!(reason, TriggerReason::FileWatch);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
