use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info};
use tokio::sync::broadcast;

use crate::broadcast::{JobPhase, JobProgressEvent};
use crate::config::EngineConfig;
use crate::error::WorkerError;
use crate::job::{JobOutcome, JobRequest};
use crate::pipeline::{BroadcastProgress, NoopProgress, Pipeline, ProgressEvent, ProgressReporter};
use crate::store::JobStore;

/// Fixed-size pool of conversion workers fed by a bounded queue.
///
/// The queue holds at most `queue_capacity` pending jobs; a full queue makes
/// `submit` fail immediately instead of blocking or spawning, which is the
/// caller's signal to shed load.
pub struct WorkerPool {
    job_sender: Sender<JobRequest>,
    result_receiver: Receiver<JobOutcome>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    /// Kept alive so late subscribers can still attach to the channel.
    #[allow(dead_code)]
    progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
}

impl WorkerPool {
    pub fn new(config: Arc<EngineConfig>, store: Arc<JobStore>) -> Self {
        Self::with_progress_sender(config, store, None)
    }

    /// Creates a pool with an optional progress broadcaster.
    ///
    /// # Panics
    /// Panics if `config.worker_count` is 0.
    pub fn with_progress_sender(
        config: Arc<EngineConfig>,
        store: Arc<JobStore>,
        progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
    ) -> Self {
        assert!(config.worker_count > 0, "worker_count must be > 0");
        let capacity = config.queue_capacity();
        let (job_sender, job_receiver) = bounded::<JobRequest>(capacity);
        // Results are unbounded: a worker must never block on reporting an
        // outcome, or `wait()` would deadlock when callers join without
        // draining every result first.
        let (result_sender, result_receiver) = unbounded::<JobOutcome>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(config.worker_count);

        for worker_id in 0..config.worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_config = Arc::clone(&config);
            let worker_store = Arc::clone(&store);
            let progress = progress_sender.clone();

            let handle = thread::spawn(move || {
                run_worker(
                    worker_id,
                    job_rx,
                    result_tx,
                    shutdown_flag,
                    worker_config,
                    worker_store,
                    progress,
                );
            });

            workers.push(handle);
        }

        info!(
            "Started {} workers (queue capacity {})",
            config.worker_count, capacity
        );

        Self {
            job_sender,
            result_receiver,
            workers,
            shutdown,
            progress_sender,
        }
    }

    /// Enqueues a job without blocking. A full queue returns
    /// `WorkerError::QueueFull` and the job is not accepted.
    pub fn submit(&self, request: JobRequest) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender.try_send(request).map_err(|e| match e {
            crossbeam_channel::TrySendError::Full(_) => WorkerError::QueueFull,
            crossbeam_channel::TrySendError::Disconnected(_) => WorkerError::ChannelClosed,
        })
    }

    pub fn try_recv_result(&self) -> Option<JobOutcome> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<JobOutcome> {
        self.result_receiver.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Joins all workers after the queue drains. Undelivered results stay
    /// buffered and are simply dropped with the pool; callers need not drain
    /// them first.
    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<JobRequest>,
    result_sender: Sender<JobOutcome>,
    shutdown: Arc<AtomicBool>,
    config: Arc<EngineConfig>,
    store: Arc<JobStore>,
    progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
) {
    debug!("Worker {} started", worker_id);

    let pipeline = Pipeline::from_config(&config, store);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(request) => {
                debug!(
                    "Worker {} processing job {} ({})",
                    worker_id, request.id, request.original_filename
                );

                let outcome = if let Some(ref sender) = progress_sender {
                    let progress = BroadcastProgress::new(
                        request.id,
                        &request.original_filename,
                        Arc::clone(sender),
                    );
                    progress.report(ProgressEvent::Phase {
                        phase: JobPhase::Queued,
                        message: "Job picked up by worker".to_string(),
                    });
                    pipeline.run(request, &progress)
                } else {
                    pipeline.run(request, &NoopProgress)
                };

                if let Err(e) = result_sender.send(outcome) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
