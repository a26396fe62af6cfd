//! Integration tests for the bot process supervisor.
//!
//! Scripted children from `discordum-test` record launch and end instants,
//! what arrived on stdin, and kill requests.

#![allow(clippy::arithmetic_side_effects)]

use std::time::Duration;

use discordum_runtime::supervisor::SHUTDOWN_SIGNAL;
use discordum_runtime::{Platform, SHUTDOWN_TIMEOUT, Supervisor, SupervisorError, SupervisorState};
use discordum_test::{ChildScript, MockLauncher, init_test_logging, test_config};

const SHORT_TIMEOUT: Duration = Duration::from_millis(150);

fn supervisor(launcher: &MockLauncher) -> Supervisor {
    init_test_logging();
    Supervisor::new(Box::new(launcher.clone()), "/srv/DiscordUM", Platform::Linux)
        .with_shutdown_timeout(SHORT_TIMEOUT)
}

#[test]
fn default_shutdown_timeout_is_ten_seconds() {
    assert_eq!(SHUTDOWN_TIMEOUT, Duration::from_secs(10));

    let sup = Supervisor::new(Box::new(MockLauncher::new()), "data", Platform::Linux);
    assert_eq!(sup.shutdown_timeout(), SHUTDOWN_TIMEOUT);
    assert_eq!(
        supervisor(&MockLauncher::new()).shutdown_timeout(),
        SHORT_TIMEOUT
    );
}

#[test]
fn start_launches_node_with_script_and_arguments() {
    let launcher = MockLauncher::new();
    let mut sup = supervisor(&launcher);

    let pid = sup.start(&test_config()).unwrap();

    assert_eq!(sup.state(), SupervisorState::Running { pid });
    let child = &launcher.children()[0];
    assert!(child.spec.program.ends_with("node/bin/node"));
    assert_eq!(child.spec.args[0], "bot.js");
    assert_eq!(child.spec.args[1], "test-token");
    assert_eq!(child.spec.args.len(), 20);
    assert_eq!(child.spec.cwd, std::path::Path::new("/srv/DiscordUM"));
}

#[test]
fn windows_launches_node_exe() {
    let launcher = MockLauncher::new();
    let mut sup = Supervisor::new(Box::new(launcher.clone()), "data", Platform::Windows);

    sup.start(&test_config()).unwrap();

    assert!(launcher.children()[0].spec.program.ends_with("node.exe"));
}

#[test]
fn start_while_running_is_rejected() {
    let launcher = MockLauncher::new();
    let mut sup = supervisor(&launcher);
    let pid = sup.start(&test_config()).unwrap();

    let err = sup.start(&test_config()).unwrap_err();

    assert!(matches!(err, SupervisorError::AlreadyRunning { pid: p } if p == pid));
    assert_eq!(launcher.launch_count(), 1);
}

#[test]
fn cooperative_stop_sends_stop_line_without_kill() {
    let launcher = MockLauncher::new();
    let mut sup = supervisor(&launcher);
    sup.start(&test_config()).unwrap();

    sup.stop();

    assert_eq!(sup.state(), SupervisorState::Stopped);
    let child = &launcher.children()[0];
    assert_eq!(child.stdin, SHUTDOWN_SIGNAL);
    assert_eq!(child.kills, 0);
    assert_eq!(child.exit.and_then(|e| e.code), Some(0));
}

#[test]
fn stubborn_child_is_killed_after_timeout() {
    let launcher = MockLauncher::new().with_script(ChildScript::Stubborn);
    let mut sup = supervisor(&launcher);
    sup.start(&test_config()).unwrap();

    sup.stop();

    let child = &launcher.children()[0];
    assert_eq!(child.stdin, b"STOP\n");
    assert_eq!(child.kills, 1);
    let lived = child.ended_at.unwrap() - child.started_at;
    assert!(lived >= SHORT_TIMEOUT, "killed after {lived:?}");
    assert_eq!(sup.state(), SupervisorState::Stopped);
}

#[test]
fn broken_stdin_kills_immediately() {
    let launcher = MockLauncher::new().with_script(ChildScript::BrokenStdin);
    let mut sup = supervisor(&launcher).with_shutdown_timeout(Duration::from_secs(30));
    sup.start(&test_config()).unwrap();

    sup.stop();

    let child = &launcher.children()[0];
    assert_eq!(child.kills, 1);
    assert!(child.stdin.is_empty());
    let lived = child.ended_at.unwrap() - child.started_at;
    assert!(lived < Duration::from_secs(30));
}

#[test]
fn failed_kill_still_releases_handle() {
    let launcher = MockLauncher::new().with_script(ChildScript::Unkillable);
    let mut sup = supervisor(&launcher);
    sup.start(&test_config()).unwrap();

    sup.stop();

    assert_eq!(launcher.children()[0].kills, 1);
    assert_eq!(sup.state(), SupervisorState::Stopped);
    sup.start(&test_config()).unwrap();
    assert_eq!(launcher.launch_count(), 2);
}

#[test]
fn stop_when_stopped_is_a_no_op() {
    let launcher = MockLauncher::new();
    let mut sup = supervisor(&launcher);

    sup.stop();
    sup.stop();

    assert_eq!(sup.state(), SupervisorState::Stopped);
    assert_eq!(launcher.launch_count(), 0);
}

#[test]
fn exited_child_is_dropped_without_handshake() {
    let launcher = MockLauncher::new().with_script(ChildScript::Exited(1));
    let mut sup = supervisor(&launcher);
    sup.start(&test_config()).unwrap();

    assert!(!sup.is_running());
    sup.stop();

    let child = &launcher.children()[0];
    assert!(child.stdin.is_empty());
    assert_eq!(child.kills, 0);

    sup.start(&test_config()).unwrap();
    assert_eq!(launcher.launch_count(), 2);
}

#[test]
fn reload_ends_old_child_before_starting_new_one() {
    let launcher = MockLauncher::new().with_script(ChildScript::Stubborn);
    let mut sup = supervisor(&launcher);
    let first = sup.start(&test_config()).unwrap();

    let second = sup.reload(&test_config()).unwrap();

    assert_ne!(first, second);
    let children = launcher.children();
    assert_eq!(children.len(), 2);
    let old_end = children[0].ended_at.expect("old child ended");
    assert!(old_end <= children[1].started_at);
    assert_eq!(sup.state(), SupervisorState::Running { pid: second });
}

#[test]
fn reload_from_stopped_just_starts() {
    let launcher = MockLauncher::new();
    let mut sup = supervisor(&launcher);

    sup.reload(&test_config()).unwrap();

    assert_eq!(launcher.launch_count(), 1);
    assert!(sup.is_running());
}

#[test]
fn launch_failure_leaves_supervisor_stopped() {
    let launcher = MockLauncher::new();
    launcher.set_fail_launch(true);
    let mut sup = supervisor(&launcher);

    let err = sup.start(&test_config()).unwrap_err();

    assert!(matches!(err, SupervisorError::Launch { .. }));
    assert_eq!(sup.state(), SupervisorState::Stopped);
}

#[test]
fn dropping_supervisor_stops_child() {
    let launcher = MockLauncher::new();
    {
        let mut sup = supervisor(&launcher);
        sup.start(&test_config()).unwrap();
    }
    assert_eq!(launcher.children()[0].stdin, b"STOP\n");
}

#[cfg(unix)]
mod real_process {
    use std::path::PathBuf;

    use discordum_runtime::ProcessLauncher;

    use super::*;

    /// Lays out `node/bin/node` as a shell script standing in for the bot.
    fn data_dir_with_runtime(script: &str) -> tempfile::TempDir {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let bin = tmp.path().join("node/bin");
        std::fs::create_dir_all(&bin).unwrap();
        let node: PathBuf = bin.join("node");
        std::fs::write(&node, script).unwrap();
        std::fs::set_permissions(&node, std::fs::Permissions::from_mode(0o755)).unwrap();
        tmp
    }

    #[test]
    fn real_child_honours_stop() {
        let tmp = data_dir_with_runtime(
            "#!/bin/sh\n[ \"$1\" = bot.js ] || exit 9\nwhile read line; do [ \"$line\" = STOP ] && exit 0; done\nexit 2\n",
        );
        let mut sup = Supervisor::new(Box::new(ProcessLauncher), tmp.path(), Platform::Linux);

        sup.start(&test_config()).unwrap();
        assert!(sup.is_running());
        sup.stop();

        assert_eq!(sup.state(), SupervisorState::Stopped);
    }

    #[test]
    fn real_child_ignoring_stop_is_killed() {
        let tmp = data_dir_with_runtime("#!/bin/sh\nexec sleep 30\n");
        let mut sup = Supervisor::new(Box::new(ProcessLauncher), tmp.path(), Platform::Linux)
            .with_shutdown_timeout(Duration::from_millis(200));

        sup.start(&test_config()).unwrap();
        let started = std::time::Instant::now();
        sup.stop();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }
}
