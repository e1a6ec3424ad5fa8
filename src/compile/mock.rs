//! Mock compile service for testing without network calls.

use super::client::{CompileError, CompileService};
use super::{CompileJob, CompileResponse, COMPILE_SUCCESS};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Mock compile service that reports success unless told otherwise and serves
/// a fixed artifact.
///
/// It counts jobs between submission and the end of their download so tests
/// can observe how many run at once.
#[derive(Debug)]
pub struct MockCompileService {
    artifact: Vec<u8>,
    delay: Duration,
    status_overrides: HashMap<String, String>,
    failing_downloads: HashSet<String>,
    failing_submits: HashSet<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    submissions: Mutex<Vec<(String, CompileJob)>>,
    downloads: AtomicUsize,
}

impl MockCompileService {
    pub fn new() -> Self {
        Self {
            artifact: b"%PDF-1.5 mock".to_vec(),
            delay: Duration::ZERO,
            status_overrides: HashMap::new(),
            failing_downloads: HashSet::new(),
            failing_submits: HashSet::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
            downloads: AtomicUsize::new(0),
        }
    }

    /// Set the bytes served by `download`.
    pub fn with_artifact(mut self, artifact: &[u8]) -> Self {
        self.artifact = artifact.to_vec();
        self
    }

    /// Sleep this long in both submit and download.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Report `status` for jobs submitted to a project base ending in `suffix`.
    pub fn with_status_for(mut self, suffix: &str, status: &str) -> Self {
        self.status_overrides
            .insert(suffix.to_string(), status.to_string());
        self
    }

    /// Break the download stream midway for project bases ending in `suffix`.
    pub fn with_failing_download_for(mut self, suffix: &str) -> Self {
        self.failing_downloads.insert(suffix.to_string());
        self
    }

    /// Refuse the submission itself for project bases ending in `suffix`.
    pub fn with_failing_submit_for(mut self, suffix: &str) -> Self {
        self.failing_submits.insert(suffix.to_string());
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<(String, CompileJob)> {
        self.submissions
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn status_for(&self, project_base: &str) -> &str {
        self.status_overrides
            .iter()
            .find(|(suffix, _)| project_base.ends_with(suffix.as_str()))
            .map(|(_, status)| status.as_str())
            .unwrap_or(COMPILE_SUCCESS)
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for MockCompileService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompileService for MockCompileService {
    async fn submit(
        &self,
        project_base: &str,
        job: &CompileJob,
    ) -> Result<CompileResponse, CompileError> {
        self.enter();
        if let Ok(mut submissions) = self.submissions.lock() {
            submissions.push((project_base.to_string(), job.clone()));
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self
            .failing_submits
            .iter()
            .any(|suffix| project_base.ends_with(suffix.as_str()))
        {
            self.leave();
            return Err(CompileError::Transport("connection refused".to_string()));
        }

        let response = CompileResponse::with_status(self.status_for(project_base));
        if !response.is_success() {
            self.leave();
        }
        Ok(response)
    }

    async fn download(
        &self,
        project_base: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, CompileError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failing = self
            .failing_downloads
            .iter()
            .any(|suffix| project_base.ends_with(suffix.as_str()));
        let result = if failing {
            let half = &self.artifact[..self.artifact.len() / 2];
            match sink.write_all(half).await {
                Ok(()) => Err(CompileError::Transport("connection reset".to_string())),
                Err(e) => Err(CompileError::Io(e)),
            }
        } else {
            match sink.write_all(&self.artifact).await {
                Ok(()) => Ok(self.artifact.len() as u64),
                Err(e) => Err(CompileError::Io(e)),
            }
        };

        self.leave();
        result
    }
}
