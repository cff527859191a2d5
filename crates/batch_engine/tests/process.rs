#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use batch_core::{Job, JobOutcome, ProxySettings, DEFAULT_FAILURE_MARKERS};
use batch_engine::{
    FetchCommand, LaunchRequest, LaunchResult, Launcher, ProcessLauncher, WorkerConfig,
    WorkerRunner,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Runs `script` through `sh -c`; the per-job flags arrive as `$1..$8`,
/// so the target is `$4` and the output path is `$6`.
fn shell(script: &str) -> ProcessLauncher {
    ProcessLauncher::new(FetchCommand {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string(), "fetch".to_string()],
        launch_flags: vec!["--no-sandbox".to_string()],
    })
}

fn job(root: &Path, name: &str) -> Job {
    let job = Job::new(
        root.join(format!("{name}.html")),
        format!("https://{name}.example/"),
        &root.join("out"),
    )
    .unwrap();
    fs::create_dir_all(job.output_path.parent().unwrap()).unwrap();
    job
}

fn browser() -> PathBuf {
    PathBuf::from("/usr/bin/brave")
}

#[test]
fn arguments_follow_the_crawl_cli() {
    let args = FetchCommand::default().arguments(
        Path::new("/opt/brave"),
        "https://a.example/",
        Path::new("/out/a/a.graphml"),
    );
    assert_eq!(
        args,
        vec![
            "run",
            "crawl",
            "--",
            "-b",
            "/opt/brave",
            "-u",
            "https://a.example/",
            "-o",
            "/out/a/a.graphml",
            "-x",
            "[\"--no-sandbox\"]",
        ]
    );
}

#[tokio::test]
async fn captures_both_streams_and_passes_proxy_env() {
    let temp = TempDir::new().unwrap();
    let job = job(temp.path(), "site");
    let launcher = shell(
        r#"printf '<graphml/>' > "$6"; echo "fetched $4 with $8"; echo "proxy=$http_proxy|$https_proxy|$no_proxy" >&2"#,
    );
    let browser = browser();
    let proxy = ProxySettings::default().assign(3).unwrap();

    let result = launcher
        .launch(LaunchRequest {
            job: &job,
            browser_path: &browser,
            proxy: &proxy,
            timeout: Duration::from_secs(10),
        })
        .await
        .unwrap();

    let (code, log) = match result {
        LaunchResult::Exited { code, log } => (code, log),
        other => panic!("expected exit, got {other:?}"),
    };
    assert_eq!(code, Some(0));
    assert!(log.contains("fetched https://site.example/ with [\"--no-sandbox\"]"));
    assert!(log.contains("proxy=http://localhost:8003|https://localhost:8003|localhost,127.0.0.1"));
    assert_eq!(fs::read_to_string(&job.output_path).unwrap(), "<graphml/>");
}

#[tokio::test]
async fn deadline_kills_the_whole_process_group() {
    let temp = TempDir::new().unwrap();
    let job = job(temp.path(), "hang");
    let late = temp.path().join("late-marker");
    let script = format!(
        r#"(sleep 1; touch "{}") & sleep 30"#,
        late.display()
    );
    let launcher = shell(&script);
    let browser = browser();
    let proxy = ProxySettings::default().assign(1).unwrap();

    let started = Instant::now();
    let result = launcher
        .launch(LaunchRequest {
            job: &job,
            browser_path: &browser,
            proxy: &proxy,
            timeout: Duration::from_millis(300),
        })
        .await
        .unwrap();

    assert_eq!(result, LaunchResult::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(10));

    // The backgrounded grandchild would have created the marker after one second.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!late.exists());
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let temp = TempDir::new().unwrap();
    let job = job(temp.path(), "none");
    let launcher = ProcessLauncher::new(FetchCommand {
        program: temp.path().join("no-such-tool").display().to_string(),
        ..FetchCommand::default()
    });
    let browser = browser();
    let proxy = ProxySettings::default().assign(1).unwrap();

    let result = launcher
        .launch(LaunchRequest {
            job: &job,
            browser_path: &browser,
            proxy: &proxy,
            timeout: Duration::from_secs(1),
        })
        .await;
    assert!(matches!(result, Err(batch_engine::LaunchError::Spawn { .. })));
}

#[tokio::test]
async fn worker_survives_timeout_and_crash_marker() {
    let temp = TempDir::new().unwrap();
    let jobs = vec![
        job(temp.path(), "slow"),
        job(temp.path(), "crash"),
        job(temp.path(), "fine"),
    ];
    // Dispatch on the target so one script plays all three roles.
    let launcher = Arc::new(shell(
        r#"case "$4" in
             *slow*) sleep 30 ;;
             *crash*) printf '<graphml>partial' > "$6"; echo "new Error('Page crashed!')" >&2 ;;
             *) printf '<graphml/>' > "$6" ;;
           esac"#,
    ));
    let config = WorkerConfig {
        browser_path: browser(),
        timeout: Duration::from_millis(500),
        failure_markers: DEFAULT_FAILURE_MARKERS.iter().map(|m| m.to_string()).collect(),
    };
    let runner = WorkerRunner::new(config, launcher);
    let proxy = ProxySettings::default().assign(1).unwrap();

    assert_eq!(runner.run_job(&jobs[0], &proxy).await, JobOutcome::TimedOut);
    assert_eq!(runner.run_job(&jobs[1], &proxy).await, JobOutcome::Failed);
    assert_eq!(runner.run_job(&jobs[2], &proxy).await, JobOutcome::Completed);

    assert_eq!(fs::metadata(&jobs[0].output_path).unwrap().len(), 0);
    assert_eq!(fs::metadata(&jobs[1].output_path).unwrap().len(), 0);
    assert_eq!(fs::read_to_string(&jobs[2].output_path).unwrap(), "<graphml/>");
}
