//! Bounded worker queue for compile-and-fetch tasks.
//!
//! A fixed set of workers consumes one shared task channel, so at most
//! `workers` tasks are between submission and the end of their download at any
//! time. Pushing never waits. Each task walks
//! `Queued -> Submitting -> Compiled -> Downloading -> Done` or stops in
//! `Errored`; a failed task is logged and reported, never retried, and never
//! stops the queue.

use super::client::{CompileError, CompileService};
use super::CompileJob;
use crate::domain::MemberId;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One member's compile-and-fetch work item.
#[derive(Debug, Clone)]
pub struct QueueTask {
    pub member_id: MemberId,
    pub project_base: String,
    pub compile_job: CompileJob,
    pub output_dir: PathBuf,
    pub output_file_name: String,
}

impl QueueTask {
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskState {
    Queued,
    Submitting,
    Compiled,
    Downloading,
    Done,
    Errored,
}

/// Final report for one task, handed to the [`QueueListener`].
#[derive(Debug)]
pub struct TaskReport {
    pub seq: u64,
    pub member_id: MemberId,
    /// States the task passed through, in order.
    pub trail: Vec<TaskState>,
    /// Path of the written artifact, or why the task errored.
    pub outcome: Result<PathBuf, CompileError>,
}

impl TaskReport {
    pub fn state(&self) -> TaskState {
        self.trail.last().copied().unwrap_or(TaskState::Queued)
    }

    pub fn is_done(&self) -> bool {
        self.state() == TaskState::Done
    }
}

/// Per-task notifications.
///
/// `on_complete` fires exactly once per task, then `on_drained` fires once
/// the task's worker slot is free again.
pub trait QueueListener: Send + Sync {
    fn on_complete(&self, report: &TaskReport);

    fn on_drained(&self, _member_id: &MemberId) {}
}

/// Listener that prints progress lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl QueueListener for LoggingListener {
    fn on_complete(&self, report: &TaskReport) {
        match &report.outcome {
            Ok(path) => info!("finished {} -> {}", report.member_id, path.display()),
            Err(e) => warn!("pdf error for {}: {}", report.member_id, e),
        }
    }

    fn on_drained(&self, member_id: &MemberId) {
        debug!("finished batch {}", member_id);
    }
}

#[derive(Debug, Clone)]
pub struct QueueOptions {
    pub workers: usize,
    /// Bound on one artifact download; `None` waits indefinitely.
    pub download_timeout: Option<Duration>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            workers: 2,
            download_timeout: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("compile queue is closed")]
pub struct QueueClosed;

struct Queued {
    seq: u64,
    task: QueueTask,
}

pub struct CompileQueue {
    tx: Option<mpsc::UnboundedSender<Queued>>,
    workers: Vec<JoinHandle<()>>,
    next_seq: AtomicU64,
}

impl CompileQueue {
    /// Spawn the workers. Must be called inside a Tokio runtime.
    pub fn start(
        service: Arc<dyn CompileService>,
        listener: Arc<dyn QueueListener>,
        options: QueueOptions,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(Mutex::new(rx));
        let worker_count = options.workers.max(1);

        let workers = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    rx.clone(),
                    service.clone(),
                    listener.clone(),
                    options.download_timeout,
                ))
            })
            .collect();

        Self {
            tx: Some(tx),
            workers,
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue a task without waiting for a free worker.
    pub fn push(&self, task: QueueTask) -> Result<u64, QueueClosed> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        debug!("Queued task {} for {}", seq, task.member_id);
        self.tx
            .as_ref()
            .ok_or(QueueClosed)?
            .send(Queued { seq, task })
            .map_err(|_| QueueClosed)?;
        Ok(seq)
    }

    /// Stop admitting tasks and wait until every queued task has finished.
    pub async fn shutdown(mut self) {
        self.tx.take();
        for (worker_id, handle) in self.workers.drain(..).enumerate() {
            if let Err(e) = handle.await {
                warn!("Compile worker {} ended abnormally: {}", worker_id, e);
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Queued>>>,
    service: Arc<dyn CompileService>,
    listener: Arc<dyn QueueListener>,
    download_timeout: Option<Duration>,
) {
    debug!("Compile worker {} started", worker_id);

    loop {
        let next = rx.lock().await.recv().await;
        let Some(Queued { seq, task }) = next else {
            break;
        };

        let member_id = task.member_id.clone();
        let report = run_task(seq, task, service.as_ref(), download_timeout).await;
        listener.on_complete(&report);
        listener.on_drained(&member_id);
    }

    debug!("Compile worker {} stopped", worker_id);
}

async fn run_task(
    seq: u64,
    task: QueueTask,
    service: &dyn CompileService,
    download_timeout: Option<Duration>,
) -> TaskReport {
    let mut trail = vec![TaskState::Queued];
    let outcome = compile_and_fetch(seq, &task, service, download_timeout, &mut trail).await;
    trail.push(match outcome {
        Ok(_) => TaskState::Done,
        Err(_) => TaskState::Errored,
    });

    TaskReport {
        seq,
        member_id: task.member_id,
        trail,
        outcome,
    }
}

async fn compile_and_fetch(
    seq: u64,
    task: &QueueTask,
    service: &dyn CompileService,
    download_timeout: Option<Duration>,
    trail: &mut Vec<TaskState>,
) -> Result<PathBuf, CompileError> {
    trail.push(TaskState::Submitting);
    tokio::fs::create_dir_all(&task.output_dir).await?;

    let response = service.submit(&task.project_base, &task.compile_job).await?;
    if !response.is_success() {
        if let Some(log) = &response.compile.error {
            debug!("Compile log for {}: {}", task.member_id, log);
        }
        return Err(CompileError::Failed {
            status: response.compile.status,
        });
    }
    trail.push(TaskState::Compiled);

    trail.push(TaskState::Downloading);
    let final_path = task.output_path();
    let part_path = task
        .output_dir
        .join(format!(".{}.{}.part", task.output_file_name, seq));

    match download_to(&part_path, &task.project_base, service, download_timeout).await {
        Ok(bytes) => {
            tokio::fs::rename(&part_path, &final_path).await?;
            debug!("Wrote {} bytes to {}", bytes, final_path.display());
            Ok(final_path)
        }
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&part_path).await {
                debug!("Could not remove {}: {}", part_path.display(), rm);
            }
            Err(e)
        }
    }
}

async fn download_to(
    part_path: &Path,
    project_base: &str,
    service: &dyn CompileService,
    download_timeout: Option<Duration>,
) -> Result<u64, CompileError> {
    let mut file = tokio::fs::File::create(part_path).await?;
    let bytes = match download_timeout {
        Some(limit) => tokio::time::timeout(limit, service.download(project_base, &mut file))
            .await
            .map_err(|_| CompileError::Timeout(limit))??,
        None => service.download(project_base, &mut file).await?,
    };
    file.flush().await?;
    file.sync_all().await?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{CompileOptions, MockCompileService};
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        events: StdMutex<Vec<String>>,
    }

    impl QueueListener for Recorder {
        fn on_complete(&self, report: &TaskReport) {
            self.events
                .lock()
                .unwrap()
                .push(format!("complete:{}:{:?}", report.member_id, report.state()));
        }

        fn on_drained(&self, member_id: &MemberId) {
            self.events
                .lock()
                .unwrap()
                .push(format!("drained:{}", member_id));
        }
    }

    fn task(dir: &Path, id: &str) -> QueueTask {
        let member_id = MemberId::parse(id).unwrap();
        QueueTask {
            project_base: format!("http://latex/project/{}", id),
            compile_job: CompileJob {
                options: CompileOptions::default(),
                root_resource_path: "main.tex".to_string(),
                resources: vec![],
            },
            output_dir: dir.to_path_buf(),
            output_file_name: member_id.output_file_name(),
            member_id,
        }
    }

    #[tokio::test]
    async fn test_task_walks_states_in_order() {
        let temp = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let queue = CompileQueue::start(
            Arc::new(MockCompileService::new().with_artifact(b"pdf")),
            recorder.clone(),
            QueueOptions::default(),
        );
        let out = temp.path().join("out");
        queue.push(task(&out, "M1")).unwrap();
        queue.shutdown().await;

        assert_eq!(std::fs::read(out.join("M1.pdf")).unwrap(), b"pdf");
        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events, vec!["complete:M1:Done", "drained:M1"]);
    }

    #[tokio::test]
    async fn test_run_task_trail() {
        let temp = TempDir::new().unwrap();
        let mock = MockCompileService::new();
        let report = run_task(0, task(temp.path(), "M2"), &mock, None).await;
        assert_eq!(
            report.trail,
            vec![
                TaskState::Queued,
                TaskState::Submitting,
                TaskState::Compiled,
                TaskState::Downloading,
                TaskState::Done
            ]
        );

        let failing = MockCompileService::new().with_status_for("/M3", "failure");
        let report = run_task(1, task(temp.path(), "M3"), &failing, None).await;
        assert_eq!(
            report.trail,
            vec![TaskState::Queued, TaskState::Submitting, TaskState::Errored]
        );
        assert!(matches!(report.outcome, Err(CompileError::Failed { .. })));
    }

    #[tokio::test]
    async fn test_refused_submission_trail() {
        let temp = TempDir::new().unwrap();
        let mock = MockCompileService::new().with_failing_submit_for("/M5");
        let report = run_task(0, task(temp.path(), "M5"), &mock, None).await;

        assert_eq!(
            report.trail,
            vec![TaskState::Queued, TaskState::Submitting, TaskState::Errored]
        );
        assert!(matches!(report.outcome, Err(CompileError::Transport(_))));
        assert_eq!(mock.download_count(), 0);
        let leftovers: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_broken_download_leaves_no_file() {
        let temp = TempDir::new().unwrap();
        let mock = MockCompileService::new().with_failing_download_for("/M4");
        let report = run_task(0, task(temp.path(), "M4"), &mock, None).await;

        assert_eq!(report.state(), TaskState::Errored);
        assert_eq!(
            report.trail[report.trail.len() - 2],
            TaskState::Downloading
        );
        let leftovers: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_download_timeout() {
        let temp = TempDir::new().unwrap();
        let mock = MockCompileService::new().with_delay(Duration::from_millis(200));
        let report = run_task(
            0,
            task(temp.path(), "M5"),
            &mock,
            Some(Duration::from_millis(20)),
        )
        .await;
        assert!(matches!(report.outcome, Err(CompileError::Timeout(_))));
        assert!(!temp.path().join("M5.pdf").exists());
    }

    #[tokio::test]
    async fn test_push_after_close_is_rejected() {
        let queue = CompileQueue::start(
            Arc::new(MockCompileService::new()),
            Arc::new(LoggingListener),
            QueueOptions {
                workers: 0,
                download_timeout: None,
            },
        );
        // zero workers is clamped to one
        assert_eq!(queue.worker_count(), 1);

        let mut queue = queue;
        queue.tx.take();
        let temp = TempDir::new().unwrap();
        assert_eq!(queue.push(task(temp.path(), "M6")), Err(QueueClosed));
    }
}
