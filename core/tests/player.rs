#![cfg(unix)]

use std::path::PathBuf;
use std::time::Duration;

use open_tv_core::{CoreError, Launcher, LauncherOptions, PlayerCommand};

/// A fake player: `sh -c <script>` receives the url and flags as `$1..`.
fn fake_player(script: &str, timeout: Duration, record_dir: PathBuf) -> Launcher {
    Launcher::new(LauncherOptions {
        command: PlayerCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".into(), script.into(), "fake-mpv".into()],
        },
        startup_timeout: timeout,
        kill_on_timeout: false,
        record_dir,
    })
}

const STARTS: &str = "echo 'AO: [pulse] 48000Hz stereo 2ch'; exec sleep 30";

fn is_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn play_succeeds_once_output_is_reported() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = fake_player(STARTS, Duration::from_secs(5), dir.path().into());

    launcher.play("http://live/stream", false).await?;

    let playing = launcher.now_playing().await.expect("confirmed session");
    assert_eq!(playing.url, "http://live/stream");
    assert!(!playing.recording);

    launcher.stop().await;
    assert!(launcher.tracked_pid().await.is_none());
    Ok(())
}

#[tokio::test]
async fn silent_player_times_out() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = fake_player("exec sleep 30", Duration::from_millis(300), dir.path().into());

    let err = launcher.play("http://live/stream", true).await.unwrap_err();
    assert!(matches!(err, CoreError::StartupTimeout { .. }));
    assert!(launcher.now_playing().await.is_none());
    // The process is left running and tracked.
    assert!(launcher.tracked_pid().await.is_some());

    launcher.stop().await;
    Ok(())
}

#[tokio::test]
async fn timed_out_player_can_be_killed() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = Launcher::new(LauncherOptions {
        command: PlayerCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".into(), "exec sleep 30".into(), "fake-mpv".into()],
        },
        startup_timeout: Duration::from_millis(200),
        kill_on_timeout: true,
        record_dir: dir.path().into(),
    });

    let err = launcher.play("http://live/stream", false).await.unwrap_err();
    assert!(matches!(err, CoreError::StartupTimeout { .. }));
    assert!(launcher.tracked_pid().await.is_none());
    Ok(())
}

#[tokio::test]
async fn early_exit_reports_the_exit_code() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = fake_player("echo 'cannot open'; exit 3", Duration::from_secs(5), dir.path().into());

    let err = launcher.play("http://live/stream", false).await.unwrap_err();
    assert!(matches!(err, CoreError::ProcessExited { code: Some(3) }));
    assert!(launcher.now_playing().await.is_none());
    Ok(())
}

const STARTS_THEN_EXITS: &str = "echo 'AO: [pulse] 48000Hz stereo 2ch'; exit 0";

async fn marker_before_exit_is_a_start(launcher: &Launcher) -> anyhow::Result<()> {
    for _ in 0..30 {
        if let Err(e) = launcher.play("http://live/stream", false).await {
            anyhow::bail!("marker printed before exit was not seen: {}", e);
        }
    }
    launcher.stop().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn output_before_exit_confirms_startup() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = fake_player(STARTS_THEN_EXITS, Duration::from_secs(5), dir.path().into());
    marker_before_exit_is_a_start(&launcher).await
}

#[tokio::test(flavor = "current_thread")]
async fn output_before_exit_confirms_startup_single_threaded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = fake_player(STARTS_THEN_EXITS, Duration::from_secs(5), dir.path().into());
    marker_before_exit_is_a_start(&launcher).await
}

#[tokio::test]
async fn missing_player_is_a_spawn_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = Launcher::new(LauncherOptions {
        command: PlayerCommand::new(dir.path().join("no-such-player")),
        startup_timeout: Duration::from_secs(1),
        kill_on_timeout: false,
        record_dir: dir.path().into(),
    });

    let err = launcher.play("http://live/stream", false).await.unwrap_err();
    assert!(matches!(err, CoreError::Spawn { .. }));
    assert!(launcher.tracked_pid().await.is_none());
    Ok(())
}

#[tokio::test]
async fn second_play_replaces_the_first() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = fake_player(STARTS, Duration::from_secs(5), dir.path().into());

    launcher.play("http://live/one", false).await?;
    let first = launcher.tracked_pid().await.expect("first pid");

    launcher.play("http://live/two", false).await?;
    let second = launcher.tracked_pid().await.expect("second pid");

    assert_ne!(first, second);
    assert!(!is_alive(first));
    assert_eq!(launcher.now_playing().await.expect("session").url, "http://live/two");

    launcher.stop().await;
    Ok(())
}

#[tokio::test]
async fn concurrent_plays_leave_one_process() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = fake_player(STARTS, Duration::from_secs(5), dir.path().into());

    let (a, b) = tokio::join!(
        launcher.play("http://live/a", false),
        launcher.play("http://live/b", false)
    );
    a?;
    b?;

    let pid = launcher.tracked_pid().await.expect("one tracked process");
    assert!(is_alive(pid));

    launcher.stop().await;
    assert!(!is_alive(pid));
    Ok(())
}

#[tokio::test]
async fn recording_creates_the_target_directory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let record_dir = dir.path().join("Videos").join("open-tv");
    let launcher = fake_player(STARTS, Duration::from_secs(5), record_dir.clone());

    launcher.play("http://live/stream", true).await?;

    assert!(record_dir.is_dir());
    assert!(launcher.now_playing().await.expect("session").recording);

    launcher.stop().await;
    Ok(())
}

#[tokio::test]
async fn local_video_never_records() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let record_dir = dir.path().join("rec");
    let launcher = fake_player(STARTS, Duration::from_secs(5), record_dir.clone());

    launcher.play("movie.mp4", true).await?;

    assert!(!record_dir.exists());
    assert!(!launcher.now_playing().await.expect("session").recording);

    launcher.stop().await;
    Ok(())
}

#[tokio::test]
async fn wait_for_exit_reports_natural_exit() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = fake_player(
        "echo 'VO: [gpu] 1280x720'; sleep 0.3; exit 0",
        Duration::from_secs(5),
        dir.path().into(),
    );

    launcher.play("http://live/short", false).await?;
    let status = launcher.wait_for_exit().await.expect("exit status");
    assert!(status.success());
    assert!(launcher.tracked_pid().await.is_none());
    assert!(launcher.wait_for_exit().await.is_none());
    Ok(())
}
