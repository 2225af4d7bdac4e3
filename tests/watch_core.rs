// tests/watch_core.rs

use assetflow::engine::{CoreCommand, TaskState, WatchCore, WatchEvent};
use assetflow::task::{Completion, TaskFailure};

fn trigger(core: &mut WatchCore, task: &str) -> Vec<CoreCommand> {
    core.step(WatchEvent::Triggered {
        task: task.to_string(),
    })
    .commands
}

fn started(core: &mut WatchCore, task: &str) {
    core.step(WatchEvent::RunStarted {
        task: task.to_string(),
    });
}

fn finished(core: &mut WatchCore, task: &str) -> (Vec<CoreCommand>, bool) {
    let step = core.step(WatchEvent::RunFinished {
        task: task.to_string(),
        completion: Completion::Success,
    });
    (step.commands, step.keep_running)
}

fn start(task: &str) -> CoreCommand {
    CoreCommand::StartRun(task.to_string())
}

#[test]
fn idle_trigger_starts_a_run() {
    let mut core = WatchCore::new(["styles"]);
    assert_eq!(trigger(&mut core, "styles"), vec![start("styles")]);
    assert_eq!(core.state_of("styles"), Some(TaskState::Triggered));

    started(&mut core, "styles");
    assert_eq!(core.state_of("styles"), Some(TaskState::Running));

    let (cmds, keep) = finished(&mut core, "styles");
    assert!(cmds.is_empty());
    assert!(keep);
    assert_eq!(core.state_of("styles"), Some(TaskState::Idle));
}

#[test]
fn triggers_while_busy_collapse_into_one_rerun() {
    let mut core = WatchCore::new(["styles"]);
    trigger(&mut core, "styles");
    started(&mut core, "styles");

    for _ in 0..5 {
        assert!(trigger(&mut core, "styles").is_empty());
    }
    assert!(core.has_pending("styles"));

    let (cmds, _) = finished(&mut core, "styles");
    assert_eq!(cmds, vec![start("styles")]);
    assert_eq!(core.state_of("styles"), Some(TaskState::Triggered));
    assert!(!core.has_pending("styles"));

    started(&mut core, "styles");
    let (cmds, _) = finished(&mut core, "styles");
    assert!(cmds.is_empty());
    assert!(core.is_idle());
}

#[test]
fn trigger_before_run_starts_is_also_pending() {
    let mut core = WatchCore::new(["html"]);
    trigger(&mut core, "html");
    assert!(trigger(&mut core, "html").is_empty());
    assert!(core.has_pending("html"));
}

#[test]
fn tasks_are_independent() {
    let mut core = WatchCore::new(["styles", "scripts"]);
    assert_eq!(trigger(&mut core, "styles"), vec![start("styles")]);
    assert_eq!(trigger(&mut core, "scripts"), vec![start("scripts")]);
    started(&mut core, "styles");
    started(&mut core, "scripts");

    trigger(&mut core, "styles");
    let (cmds, _) = finished(&mut core, "scripts");
    assert!(cmds.is_empty());
    assert_eq!(core.state_of("scripts"), Some(TaskState::Idle));
    assert!(core.has_pending("styles"));
}

#[test]
fn failed_run_returns_to_idle_and_accepts_new_triggers() {
    let mut core = WatchCore::new(["styles"]);
    trigger(&mut core, "styles");
    started(&mut core, "styles");
    core.step(WatchEvent::RunFinished {
        task: "styles".to_string(),
        completion: Completion::Failed(TaskFailure::new("styles", "parse error")),
    });

    assert_eq!(core.state_of("styles"), Some(TaskState::Idle));
    assert_eq!(trigger(&mut core, "styles"), vec![start("styles")]);
}

#[test]
fn stop_when_idle_exits_immediately() {
    let mut core = WatchCore::new(["styles"]);
    let step = core.step(WatchEvent::StopRequested);
    assert!(!step.keep_running);
    assert!(core.is_stopping());
}

#[test]
fn stop_waits_for_in_flight_runs_and_drops_pending() {
    let mut core = WatchCore::new(["styles"]);
    trigger(&mut core, "styles");
    started(&mut core, "styles");
    trigger(&mut core, "styles");

    let step = core.step(WatchEvent::StopRequested);
    assert!(step.keep_running);
    assert!(!core.has_pending("styles"));

    // Ignored while stopping.
    assert!(trigger(&mut core, "styles").is_empty());

    let (cmds, keep) = finished(&mut core, "styles");
    assert!(cmds.is_empty());
    assert!(!keep);
}

#[test]
fn unknown_tasks_are_tracked_on_first_trigger() {
    let mut core = WatchCore::new(Vec::<String>::new());
    assert_eq!(core.state_of("fonts"), None);
    assert_eq!(trigger(&mut core, "fonts"), vec![start("fonts")]);
    assert_eq!(core.state_of("fonts"), Some(TaskState::Triggered));
}
