//! End-to-end runs against shell scripts standing in for nbdkit and nbd-client.
//!
//! `wait(2)` reaps any child of the test process, so every test is serial.

use nbd_trampoline::{
    LogHandle, ReadinessConfig, TrampolineError, TrampolineSettings, run_trampoline,
};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use serial_test::serial;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    dir: TempDir,
    sockets: PathBuf,
    device: tempfile::NamedTempFile,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let sockets = dir.path().join("sockets");
        std::fs::create_dir(&sockets).unwrap();
        Self {
            dir,
            sockets,
            device: tempfile::NamedTempFile::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Server that records its pid and argv, creates its socket, then runs `tail`
    fn server(&self, create_socket: bool, tail: &str) -> PathBuf {
        let dir = self.dir.path().display();
        let touch = if create_socket { "touch \"$sock\"" } else { ":" };
        self.script(
            "fake-nbdkit",
            &format!(
                "echo $$ > {dir}/server.pid\n\
                 echo \"$@\" > {dir}/server.args\n\
                 sock=\"\"\n\
                 while [ $# -gt 0 ]; do\n\
                 \x20 if [ \"$1\" = \"--unix\" ]; then sock=\"$2\"; fi\n\
                 \x20 shift\n\
                 done\n\
                 {touch}\n\
                 {tail}"
            ),
        )
    }

    /// Client that appends its argv to `client.log` and exits
    fn client(&self) -> PathBuf {
        let dir = self.dir.path().display();
        self.script("fake-nbd-client", &format!("echo \"$@\" >> {dir}/client.log"))
    }

    fn settings(&self, server: &Path, client: &Path) -> TrampolineSettings {
        TrampolineSettings {
            server_executable: server.display().to_string(),
            client_executable: client.display().to_string(),
            socket_dir: self.sockets.clone(),
            readiness: ReadinessConfig {
                poll_interval_ms: 20,
                max_wait_ms: 400,
            },
            ..Default::default()
        }
    }

    fn device(&self) -> String {
        self.device.path().display().to_string()
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).unwrap_or_default()
    }

    fn server_pid(&self) -> Pid {
        Pid::from_raw(self.read("server.pid").trim().parse().unwrap())
    }

    fn sockets_left(&self) -> usize {
        std::fs::read_dir(&self.sockets).unwrap().count()
    }
}

#[test]
#[serial]
fn test_foreground_run_connects_and_disconnects() {
    let harness = Harness::new();
    let server = harness.server(true, "sleep 1");
    let client = harness.client();
    let settings = harness.settings(&server, &client);
    let device = harness.device();

    run_trampoline(
        &["--nbd", "-f", "--region=eu-west-1", "mybucket/dir", device.as_str()],
        settings,
        &LogHandle::init(),
    )
    .unwrap();

    let server_args = harness.read("server.args");
    assert!(server_args.starts_with("--foreground --filter=exitlast --unix "));
    assert!(server_args.contains(" s3backer s3b_region=eu-west-1 bucket=mybucket/dir"));

    let client_log = harness.read("client.log");
    let calls: Vec<&str> = client_log.lines().collect();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("-unix "));
    assert!(calls[0].ends_with(&format!("-block-size 4096 -nofork {device}")));
    assert_eq!(calls[1], format!("-d {device}"));

    assert_eq!(harness.sockets_left(), 0);
}

#[test]
#[serial]
fn test_read_only_reaches_both_sides() {
    let harness = Harness::new();
    let server = harness.server(true, "sleep 1");
    let client = harness.client();
    let settings = harness.settings(&server, &client);
    let device = harness.device();

    run_trampoline(
        &["-f", "--readOnly", "bucket", device.as_str()],
        settings,
        &LogHandle::init(),
    )
    .unwrap();

    assert!(harness.read("server.args").contains("--read-only"));
    assert!(harness.read("client.log").contains("-nofork -readonly "));
}

#[test]
#[serial]
fn test_readiness_timeout_leaves_nothing_running() {
    let harness = Harness::new();
    let server = harness.server(false, "exec sleep 30");
    let client = harness.client();
    let settings = harness.settings(&server, &client);
    let device = harness.device();

    let err = run_trampoline(&["-f", "bucket", device.as_str()], settings, &LogHandle::init())
        .unwrap_err();

    assert!(matches!(err, TrampolineError::ReadinessTimeout { waited_ms: 400, .. }));
    assert_eq!(err.exit_code(), 1);
    // Killed and reaped, so the pid is gone
    assert_eq!(kill(harness.server_pid(), None), Err(Errno::ESRCH));
    assert!(harness.read("client.log").is_empty());
}

#[test]
#[serial]
fn test_missing_server_executable() {
    let harness = Harness::new();
    let client = harness.client();
    let settings = harness.settings(&harness.path("no-such-nbdkit"), &client);
    let device = harness.device();

    let err = run_trampoline(&["-f", "bucket", device.as_str()], settings, &LogHandle::init())
        .unwrap_err();

    assert!(matches!(err, TrampolineError::Spawn(_)));
    assert!(harness.read("client.log").is_empty());
}

#[test]
#[serial]
fn test_invalid_command_line_spawns_nothing() {
    let harness = Harness::new();
    let server = harness.server(true, "sleep 1");
    let client = harness.client();
    let device = harness.device();

    for raw in [
        vec!["bucket"],
        vec!["--noSuchFlag", "bucket", device.as_str()],
        vec!["--debug=yes", "bucket", device.as_str()],
    ] {
        let err = run_trampoline(&raw, harness.settings(&server, &client), &LogHandle::init())
            .unwrap_err();
        assert!(err.is_usage_error(), "{raw:?} gave {err}");
        assert_eq!(err.exit_code(), 2);
    }
    assert!(!harness.path("server.pid").exists());
}

#[test]
#[serial]
fn test_invalid_readiness_settings_spawn_nothing() {
    let harness = Harness::new();
    let server = harness.server(true, "sleep 1");
    let client = harness.client();
    let device = harness.device();

    for (poll_interval_ms, max_wait_ms) in [(0, 400), (500, 400), (20, 120_000)] {
        let mut settings = harness.settings(&server, &client);
        settings.readiness = ReadinessConfig {
            poll_interval_ms,
            max_wait_ms,
        };
        let err = run_trampoline(&["-f", "bucket", device.as_str()], settings, &LogHandle::init())
            .unwrap_err();
        assert!(matches!(err, TrampolineError::Settings(_)), "{err}");
        assert_eq!(err.exit_code(), 1);
    }
    assert!(!harness.path("server.pid").exists());
}

#[test]
#[serial]
fn test_missing_device() {
    let harness = Harness::new();
    let server = harness.server(true, "sleep 1");
    let client = harness.client();
    let missing = harness.path("no-such-device").display().to_string();

    let err = run_trampoline(
        &["-f", "bucket", missing.as_str()],
        harness.settings(&server, &client),
        &LogHandle::init(),
    )
    .unwrap_err();

    assert!(matches!(err, TrampolineError::DeviceLookup { .. }));
    assert!(!harness.path("server.pid").exists());
}

#[test]
#[serial]
fn test_termination_signal_shuts_everything_down() {
    let harness = Harness::new();
    let server = harness.server(true, "exec sleep 30");
    let client = harness.client();
    let settings = harness.settings(&server, &client);
    let device = harness.device();

    let runner = nix::sys::pthread::pthread_self();
    let sender = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(500));
        nix::sys::pthread::pthread_kill(runner, Signal::SIGTERM).unwrap();
    });

    let result = run_trampoline(&["-f", "bucket", device.as_str()], settings, &LogHandle::init());
    sender.join().unwrap();
    nbd_trampoline_unix::UnixSignalBridge::restore_defaults().unwrap();

    result.unwrap();
    assert_eq!(kill(harness.server_pid(), None), Err(Errno::ESRCH));
    assert!(harness.read("client.log").contains(&format!("-d {device}")));
    assert_eq!(harness.sockets_left(), 0);
}

#[test]
#[serial]
fn test_settings_file_drives_the_run() {
    let harness = Harness::new();
    let server = harness.server(true, "sleep 1");
    let client = harness.client();
    let device = harness.device();

    let file = harness.path("settings.json");
    std::fs::write(
        &file,
        format!(
            r#"{{
                "serverExecutable": "{}",
                "clientExecutable": "{}",
                "socketDir": "{}",
                "pluginName": "s3b",
                "paramPrefix": "x_",
                "clientBlockSize": 512,
                "readiness": {{ "pollIntervalMs": 20 }}
            }}"#,
            server.display(),
            client.display(),
            harness.sockets.display()
        ),
    )
    .unwrap();
    let settings = TrampolineSettings::load(&file).unwrap();

    run_trampoline(
        &["-f", "--region=us-east-2", "bucket", device.as_str()],
        settings,
        &LogHandle::init(),
    )
    .unwrap();

    assert!(harness.read("server.args").contains(" s3b x_region=us-east-2 bucket=bucket"));
    assert!(harness.read("client.log").contains("-block-size 512 "));
}
