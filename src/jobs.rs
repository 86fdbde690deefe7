//! Concurrent cutting jobs.
//!
//! Each submitted document runs as its own tokio task with its own
//! [`crate::pipeline::merge::ScanState`]; jobs share nothing but the
//! registry below. The registry only tracks which jobs are still running so
//! callers can wait for all of them at shutdown. Each task removes its own
//! entry when it finishes, and reports its result once through a oneshot
//! channel held by the [`JobHandle`].
//!
//! ```rust,no_run
//! use quizcut::jobs::{CutRequest, JobRunner};
//! use quizcut::CutConfig;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let runner = JobRunner::new();
//! let handle = runner.submit(CutRequest::new("exam.pdf", "out", "exam", CutConfig::default()));
//! match handle.wait().await {
//!     Ok(out) => println!("{} files", out.files.len()),
//!     Err(e) => eprintln!("{e}"),
//! }
//! # }
//! ```

use crate::config::CutConfig;
use crate::cut::cut_pdf;
use crate::error::CutError;
use crate::output::CutOutput;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Identifier of a submitted job, unique per runner.
pub type JobId = u64;

type JobResult = Result<CutOutput, CutError>;

/// One document to cut.
#[derive(Debug, Clone)]
pub struct CutRequest {
    pub pdf_path: PathBuf,
    pub output_dir: PathBuf,
    pub prefix: String,
    pub config: CutConfig,
}

impl CutRequest {
    pub fn new(
        pdf_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        config: CutConfig,
    ) -> Self {
        Self {
            pdf_path: pdf_path.into(),
            output_dir: output_dir.into(),
            prefix: prefix.into(),
            config,
        }
    }
}

/// Completion signal for one job.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    done: oneshot::Receiver<JobResult>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Wait for the job to finish.
    ///
    /// Failures are wrapped once in [`CutError::JobFailed`] carrying the job id.
    pub async fn wait(self) -> Result<CutOutput, CutError> {
        let id = self.id;
        match self.done.await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(CutError::JobFailed {
                job: id,
                source: Box::new(e),
            }),
            Err(_) => Err(CutError::JobFailed {
                job: id,
                source: Box::new(CutError::Internal(
                    "job ended without reporting a result".into(),
                )),
            }),
        }
    }
}

/// Spawns cutting jobs and tracks the ones still running.
///
/// Cloning a runner shares its registry.
#[derive(Debug, Clone, Default)]
pub struct JobRunner {
    next_id: Arc<AtomicU64>,
    running: Arc<Mutex<HashMap<JobId, JoinHandle<()>>>>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start cutting one PDF. Must be called within a tokio runtime.
    pub fn submit(&self, request: CutRequest) -> JobHandle {
        let CutRequest {
            pdf_path,
            output_dir,
            prefix,
            config,
        } = request;
        info!("Submitting cut of {}", pdf_path.display());
        self.spawn(async move { cut_pdf(&pdf_path, &output_dir, &prefix, &config).await })
    }

    /// Run an arbitrary blocking cut (e.g. over a custom
    /// [`crate::pipeline::source::PageSource`]) as a tracked job.
    pub fn submit_blocking<F>(&self, job: F) -> JobHandle
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        self.spawn(async move {
            tokio::task::spawn_blocking(job)
                .await
                .map_err(|e| CutError::Internal(format!("Cut task panicked: {}", e)))?
        })
    }

    /// Number of jobs that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.registry().len()
    }

    /// Wait for every job submitted so far.
    pub async fn join_all(&self) {
        let handles: Vec<_> = self.registry().drain().map(|(_, h)| h).collect();
        debug!("Joining {} running job(s)", handles.len());
        for res in futures::future::join_all(handles).await {
            if let Err(e) = res {
                warn!("Job task ended abnormally: {}", e);
            }
        }
    }

    fn spawn<Fut>(&self, work: Fut) -> JobHandle
    where
        Fut: std::future::Future<Output = JobResult> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let running = Arc::clone(&self.running);

        let handle = tokio::spawn(async move {
            let result = work.await;
            match &result {
                Ok(out) => info!("Job {} finished: {} file(s)", id, out.files.len()),
                Err(e) => warn!("Job {} failed: {}", id, e),
            }
            // The entry must exist before it can be removed.
            let _ = registered_rx.await;
            running
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .remove(&id);
            // The handle may have been dropped; nobody is waiting then.
            let _ = tx.send(result);
        });
        self.registry().insert(id, handle);
        let _ = registered_tx.send(());

        JobHandle { id, done: rx }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<JobId, JoinHandle<()>>> {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CutStats;

    fn empty_output() -> CutOutput {
        CutOutput {
            files: Vec::new(),
            stats: CutStats::default(),
        }
    }

    #[tokio::test]
    async fn failed_job_is_wrapped_once() {
        let runner = JobRunner::new();
        let dir = tempfile::tempdir().unwrap();
        let handle = runner.submit(CutRequest::new(
            "/no/such/exam.pdf",
            dir.path(),
            "exam",
            CutConfig::default(),
        ));
        let id = handle.id();
        let err = handle.wait().await.unwrap_err();
        match &err {
            CutError::JobFailed { job, source } => {
                assert_eq!(*job, id);
                assert!(matches!(**source, CutError::FileNotFound { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(err.root_cause(), CutError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let runner = JobRunner::new();
        let a = runner.submit_blocking(|| Ok(empty_output()));
        let b = runner.submit_blocking(|| Ok(empty_output()));
        assert_ne!(a.id(), b.id());
        assert!(a.wait().await.is_ok());
        assert!(b.wait().await.is_ok());
    }

    #[tokio::test]
    async fn registry_empties_after_join_all() {
        let runner = JobRunner::new();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let handle = runner.submit_blocking(move || {
            let _ = release_rx.recv();
            Ok(empty_output())
        });
        assert_eq!(runner.in_flight(), 1);

        release_tx.send(()).unwrap();
        runner.join_all().await;
        assert_eq!(runner.in_flight(), 0);
        assert!(handle.wait().await.is_ok());
    }

    #[tokio::test]
    async fn finished_job_removes_itself() {
        let runner = JobRunner::new();
        let handle = runner.submit_blocking(|| Err(CutError::NoContentFound));
        assert!(handle.wait().await.is_err());
        // The entry is removed before the result is sent.
        assert_eq!(runner.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn instant_jobs_on_worker_threads_leave_no_entries() {
        let runner = JobRunner::new();
        let handles: Vec<_> = (0..64)
            .map(|i| {
                if i % 2 == 0 {
                    runner.submit_blocking(|| Ok(empty_output()))
                } else {
                    runner.submit_blocking(|| Err(CutError::NoContentFound))
                }
            })
            .collect();

        let mut failed = 0;
        for h in handles {
            if h.wait().await.is_err() {
                failed += 1;
            }
        }
        assert_eq!(failed, 32);
        assert_eq!(runner.in_flight(), 0);
        runner.join_all().await;
        assert_eq!(runner.in_flight(), 0);
    }
}
