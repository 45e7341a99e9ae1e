use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use batchrun_model::TaskEnv;
use tempfile::TempDir;

use super::*;
use crate::{
    provenance::{FAST_EXIT_FILE, RECORD_FILE, TASK_DESCRIPTION_FILE},
    runner::{ExitReport, RunnerError},
};

const PID: u32 = 4242;

/// Pretends to run commands of the form `exit <code>`, `sleep` or `missing`.
#[derive(Default)]
struct FakeRunner {
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
    selectors: Mutex<Vec<String>>,
    /// pid stored on disk (before on_spawn, after on_spawn).
    checkpoints: Mutex<Vec<(Option<u32>, Option<u32>)>>,
}

impl FakeRunner {
    fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }
}

fn on_disk_pid(stdout: &Path) -> Option<u32> {
    let path = stdout
        .parent()
        .unwrap()
        .join("provenance")
        .join(RECORD_FILE);
    let rec: ExecutionRecord = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
    rec.pid
}

#[async_trait]
impl Runner for FakeRunner {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn run(
        &self,
        inv: &Invocation,
        on_spawn: &mut (dyn FnMut(u32) + Send),
    ) -> Result<ExitReport, RunnerError> {
        let cmd = inv.command.command_string();
        if cmd == "missing" {
            return Err(RunnerError::Spawn("No such file or directory".into()));
        }

        let before = on_disk_pid(&inv.stdout);
        on_spawn(PID);
        let after = on_disk_pid(&inv.stdout);
        self.checkpoints.lock().unwrap().push((before, after));
        self.selectors
            .lock()
            .unwrap()
            .push(inv.env.get(CUDA_VISIBLE_DEVICES).unwrap_or("").to_string());

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        let code = cmd
            .strip_prefix("exit ")
            .map(|c| c.parse().unwrap_or(1))
            .unwrap_or(0);
        Ok(ExitReport {
            pid: PID,
            code: Some(code),
        })
    }
}

fn launcher(tokens: u32, runner: Arc<FakeRunner>) -> Launcher {
    let config = LauncherConfig::default()
        .with_poll_interval(Duration::from_millis(10))
        .with_fast_exit_threshold(Duration::from_millis(150));
    Launcher::with_config(ResourcePool::new(0..tokens).unwrap(), runner, config)
}

fn task(dir: &TempDir, name: &str, cmd: &str) -> TaskSpec {
    TaskSpec::new(cmd, dir.path(), io(dir, name))
        .with_identifier(name)
        .with_env(TaskEnv::single("KEEP", "1"))
}

fn io(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

fn qty(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn read_record(dir: &TempDir, name: &str) -> ExecutionRecord {
    let path = io(dir, name).join("provenance").join(RECORD_FILE);
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn k_single_token_tasks_all_complete_and_pool_is_restored() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::with_delay(Duration::from_millis(30));
    let launcher = launcher(4, Arc::clone(&runner));
    let before = launcher.pool().snapshot();

    let tasks = (0..4)
        .map(|i| task(&dir, &format!("t{i}"), "true"))
        .collect();
    let report = launcher.run(tasks).await;

    assert_eq!(report.len(), 4);
    assert!(report.all_succeeded());
    for (i, r) in report.results.iter().enumerate() {
        assert_eq!(r.index, i);
        assert_eq!(r.identifier, format!("t{i}"));
        assert_eq!(r.tokens.len(), 1);
    }
    assert_eq!(launcher.pool().snapshot(), before);
    assert_eq!(runner.peak.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn full_pool_tasks_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::with_delay(Duration::from_millis(40));
    let launcher = launcher(3, Arc::clone(&runner));

    let tasks = vec![
        task(&dir, "a", "true").with_quantity(qty(3)),
        task(&dir, "b", "true").with_quantity(qty(3)),
    ];
    let report = launcher.run(tasks).await;

    assert!(report.all_succeeded());
    assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
    for r in &report.results {
        assert_eq!(r.tokens.len(), 3);
    }
    assert_eq!(launcher.pool().available(), 3);
}

#[tokio::test]
async fn more_tasks_than_tokens_never_oversubscribe() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::with_delay(Duration::from_millis(15));
    let launcher = launcher(2, Arc::clone(&runner));

    let tasks = (0..7)
        .map(|i| task(&dir, &format!("t{i}"), "true"))
        .collect();
    let report = launcher.run(tasks).await;

    assert_eq!(report.len(), 7);
    assert!(report.all_succeeded());
    assert!(runner.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(launcher.pool().available(), 2);
}

#[tokio::test]
async fn exit_code_decides_status_regardless_of_quantity() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = launcher(4, FakeRunner::with_delay(Duration::ZERO));

    let tasks = vec![
        task(&dir, "ok1", "exit 0"),
        task(&dir, "ok3", "exit 0").with_quantity(qty(3)),
        task(&dir, "bad1", "exit 2"),
        task(&dir, "bad3", "exit 1").with_quantity(qty(3)),
    ];
    let report = launcher.run(tasks).await;

    assert_eq!(report.get("ok1").unwrap().status, TaskStatus::Success);
    assert_eq!(report.get("ok3").unwrap().status, TaskStatus::Success);
    let bad1 = report.get("bad1").unwrap();
    assert_eq!(bad1.status, TaskStatus::Fail);
    assert_eq!(bad1.exit_code, Some(2));
    assert!(bad1.error.is_none());
    assert_eq!(report.get("bad3").unwrap().status, TaskStatus::Fail);
}

#[tokio::test]
async fn selector_variable_carries_granted_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::with_delay(Duration::ZERO);
    let launcher = launcher(2, Arc::clone(&runner));

    let report = launcher
        .run(vec![task(&dir, "pair", "true").with_quantity(qty(2))])
        .await;
    assert!(report.all_succeeded());

    let selectors = runner.selectors.lock().unwrap().clone();
    assert_eq!(selectors.len(), 1);
    let mut granted: Vec<&str> = selectors[0].split(',').collect();
    granted.sort();
    assert_eq!(granted, vec!["0", "1"]);

    let rec = read_record(&dir, "pair");
    assert_eq!(rec.env.get("KEEP"), Some("1"));
    assert_eq!(rec.env.get(CUDA_VISIBLE_DEVICES), Some(selectors[0].as_str()));
}

#[tokio::test]
async fn provenance_checkpoints_are_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::with_delay(Duration::ZERO);
    let launcher = launcher(1, Arc::clone(&runner));

    launcher.run(vec![task(&dir, "p", "true")]).await;

    let checkpoints = runner.checkpoints.lock().unwrap().clone();
    assert_eq!(checkpoints, vec![(None, Some(PID))]);

    let rec = read_record(&dir, "p");
    assert_eq!(rec.pid, Some(PID));
    assert!(rec.ended_at.is_some());
    assert_eq!(rec.status, Some(TaskStatus::Success));
    assert_eq!(rec.exit_code, Some(0));
    assert_eq!(rec.run_id, launcher.run_id());
    assert!(rec.cwd.is_absolute());

    assert!(io(&dir, "p").join(TASK_DESCRIPTION_FILE).is_file());
    assert!(io(&dir, "p").join("provenance/command.sh").is_file());
}

#[tokio::test]
async fn fast_exit_marker_only_below_threshold() {
    let dir = tempfile::tempdir().unwrap();

    let quick = launcher(1, FakeRunner::with_delay(Duration::ZERO));
    quick.run(vec![task(&dir, "quick", "true")]).await;
    assert!(io(&dir, "quick").join(FAST_EXIT_FILE).is_file());

    let slow = launcher(1, FakeRunner::with_delay(Duration::from_millis(300)));
    slow.run(vec![task(&dir, "slow", "true")]).await;
    assert!(!io(&dir, "slow").join(FAST_EXIT_FILE).exists());
}

#[tokio::test]
async fn spawn_failure_is_fail_and_releases_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = launcher(1, FakeRunner::with_delay(Duration::ZERO));

    let report = launcher
        .run(vec![task(&dir, "gone", "missing"), task(&dir, "next", "true")])
        .await;

    let gone = report.get("gone").unwrap();
    assert_eq!(gone.status, TaskStatus::Fail);
    assert!(gone.pid.is_none());
    assert!(gone.error.as_deref().unwrap().contains("spawn"));
    assert!(gone.elapsed < Duration::from_secs(1));
    assert_eq!(report.get("next").unwrap().status, TaskStatus::Success);
    assert_eq!(launcher.pool().available(), 1);

    let rec = read_record(&dir, "gone");
    assert_eq!(rec.status, Some(TaskStatus::Fail));
    assert!(rec.pid.is_none());
    assert!(rec.ended_at.is_some());
}

#[tokio::test]
async fn pre_hook_failure_releases_tokens_for_waiting_sibling() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = launcher(1, FakeRunner::with_delay(Duration::from_millis(10)));

    let tasks = vec![
        task(&dir, "broken", "true").with_pre_hook(|| Err("cannot stage inputs".into())),
        task(&dir, "sibling", "true"),
    ];
    let report = launcher.run(tasks).await;

    let broken = report.get("broken").unwrap();
    assert_eq!(broken.status, TaskStatus::Fail);
    assert!(broken.error.as_deref().unwrap().contains("cannot stage inputs"));
    assert_eq!(broken.tokens.len(), 1);
    assert!(!io(&dir, "broken").exists());

    assert_eq!(report.get("sibling").unwrap().status, TaskStatus::Success);
    assert_eq!(launcher.pool().available(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pre_hook_failure_leaves_running_sibling_alone() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::with_delay(Duration::from_millis(300));
    let launcher = launcher(2, Arc::clone(&runner));

    // The hook only fails once the sibling is inside the runner.
    let board = launcher.board();
    let overlapped = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&overlapped);
    let hook = move || {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if board.get(0).is_some_and(|e| e.phase == TaskPhase::Running) {
                seen.store(true, Ordering::SeqCst);
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Err("cannot stage inputs".into())
    };

    let tasks = vec![
        task(&dir, "sibling", "true"),
        task(&dir, "broken", "true").with_pre_hook(hook),
    ];
    let report = launcher.run(tasks).await;

    assert!(overlapped.load(Ordering::SeqCst));
    let broken = report.get("broken").unwrap();
    assert_eq!(broken.status, TaskStatus::Fail);
    assert_eq!(broken.tokens.len(), 1);

    let sibling = report.get("sibling").unwrap();
    assert_eq!(sibling.status, TaskStatus::Success);
    assert_eq!(sibling.exit_code, Some(0));
    assert!(sibling.elapsed >= Duration::from_millis(300));
    assert_eq!(read_record(&dir, "sibling").status, Some(TaskStatus::Success));
    assert_eq!(launcher.pool().available(), 2);
}

#[tokio::test]
async fn pre_hook_runs_before_io_dir_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = launcher(1, FakeRunner::with_delay(Duration::ZERO));
    let staged = io(&dir, "staged");
    let marker = staged.join("input.txt");

    let hook_dir = staged.clone();
    let spec = task(&dir, "staged", "true").with_pre_hook(move || {
        fs::create_dir_all(&hook_dir)?;
        fs::write(hook_dir.join("input.txt"), "data")?;
        Ok(())
    });
    let report = launcher.run(vec![spec]).await;

    assert!(report.all_succeeded());
    assert_eq!(fs::read_to_string(marker).unwrap(), "data");
}

#[tokio::test]
async fn panicking_pre_hook_is_reported_and_released() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = launcher(1, FakeRunner::with_delay(Duration::ZERO));

    let tasks = vec![
        task(&dir, "panics", "true").with_pre_hook(|| panic!("hook exploded")),
        task(&dir, "fine", "true"),
    ];
    let report = launcher.run(tasks).await;

    assert_eq!(report.len(), 2);
    let panicked = &report.results[0];
    assert_eq!(panicked.identifier, "panics");
    assert_eq!(panicked.status, TaskStatus::Fail);
    assert!(panicked.error.as_deref().unwrap().contains("aborted"));
    assert_eq!(report.results[1].status, TaskStatus::Success);
    assert_eq!(launcher.pool().available(), 1);
    assert_eq!(
        launcher.board().get(0).unwrap().phase,
        TaskPhase::Completed(TaskStatus::Fail)
    );
}

#[tokio::test]
async fn oversized_request_is_rejected_without_blocking() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = launcher(2, FakeRunner::with_delay(Duration::ZERO));

    let tasks = vec![
        task(&dir, "huge", "true").with_quantity(qty(5)),
        task(&dir, "normal", "true"),
    ];
    let report = tokio::time::timeout(Duration::from_secs(5), launcher.run(tasks))
        .await
        .expect("oversized request must not deadlock the batch");

    let huge = report.get("huge").unwrap();
    assert_eq!(huge.status, TaskStatus::Fail);
    assert!(huge.tokens.is_empty());
    assert!(huge.error.as_deref().unwrap().contains("only holds 2"));
    assert!(!io(&dir, "huge").exists());
    assert_eq!(report.get("normal").unwrap().status, TaskStatus::Success);
}

#[tokio::test]
async fn board_is_terminal_after_run() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = launcher(2, FakeRunner::with_delay(Duration::ZERO));
    let board = launcher.board();

    launcher
        .run(vec![task(&dir, "x", "exit 0"), task(&dir, "y", "exit 3")])
        .await;

    assert_eq!(board.len(), 2);
    assert_eq!(board.count(TaskPhase::is_terminal), 2);
    assert_eq!(board.tokens_held(), 0);
    assert_eq!(
        board.get(1).unwrap().phase,
        TaskPhase::Completed(TaskStatus::Fail)
    );
}

#[tokio::test]
async fn empty_batch_returns_empty_report() {
    let launcher = launcher(1, FakeRunner::with_delay(Duration::ZERO));
    let report = launcher.run(Vec::new()).await;
    assert!(report.is_empty());
    assert!(report.all_succeeded());
}

#[test]
fn run_blocking_drives_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = launcher(1, FakeRunner::with_delay(Duration::ZERO));

    let report = launcher
        .run_blocking(vec![task(&dir, "a", "true"), task(&dir, "b", "exit 1")])
        .unwrap();

    assert_eq!(report.succeeded().count(), 1);
    assert_eq!(report.failed().count(), 1);
}
