use std::sync::Arc;

use courier_handler::{HttpJobHandler, JobOutcome};
use courier_job::{Job, JobClient};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::WorkerError;

/// Jobs handled concurrently unless configured otherwise.
pub const DEFAULT_MAX_JOBS_ACTIVE: usize = 32;

/// Runs jobs received on a channel and reports their outcomes.
pub struct JobWorker {
  sender: mpsc::Sender<Job>,
  receiver: mpsc::Receiver<Job>,
  handler: Arc<HttpJobHandler>,
  client: Arc<dyn JobClient>,
  max_jobs_active: usize,
}

impl JobWorker {
  pub fn new(handler: Arc<HttpJobHandler>, client: Arc<dyn JobClient>) -> Self {
    Self::with_max_jobs_active(handler, client, DEFAULT_MAX_JOBS_ACTIVE)
  }

  /// Create a worker handling at most `max_jobs_active` jobs at once.
  ///
  /// The intake channel buffers the same number of jobs.
  pub fn with_max_jobs_active(
    handler: Arc<HttpJobHandler>,
    client: Arc<dyn JobClient>,
    max_jobs_active: usize,
  ) -> Self {
    let max_jobs_active = max_jobs_active.max(1);
    let (sender, receiver) = mpsc::channel(max_jobs_active);
    Self {
      sender,
      receiver,
      handler,
      client,
      max_jobs_active,
    }
  }

  /// Get a sender handle for submitting jobs.
  ///
  /// The loop ends once every sender is dropped and queued jobs are done.
  pub fn sender(&self) -> mpsc::Sender<Job> {
    self.sender.clone()
  }

  /// Submit one job through the channel.
  pub async fn submit(&self, job: Job) -> Result<(), WorkerError> {
    self
      .sender
      .send(job)
      .await
      .map_err(|_| WorkerError::ChannelClosed)
  }

  /// Run the intake loop until cancelled or the channel closes.
  ///
  /// Cancellation stops intake only. Jobs already started run to completion
  /// (or time out) before this returns.
  pub async fn start(self, cancel: CancellationToken) -> Result<(), WorkerError> {
    let Self {
      sender,
      mut receiver,
      handler,
      client,
      max_jobs_active,
    } = self;
    // Only external senders keep the channel open.
    drop(sender);

    info!(max_jobs_active, "starting job worker");

    let permits = Arc::new(Semaphore::new(max_jobs_active));
    let mut tasks = JoinSet::new();

    loop {
      let permit = tokio::select! {
        _ = cancel.cancelled() => {
          info!("job worker cancelled");
          break;
        }
        permit = permits.clone().acquire_owned() => {
          permit.map_err(|_| WorkerError::ChannelClosed)?
        }
      };

      let job = tokio::select! {
        _ = cancel.cancelled() => {
          info!("job worker cancelled");
          break;
        }
        job = receiver.recv() => match job {
          Some(job) => job,
          None => {
            info!("job worker channel closed");
            break;
          }
        }
      };

      let handler = handler.clone();
      let client = client.clone();
      tasks.spawn(async move {
        process(&handler, client.as_ref(), job).await;
        drop(permit);
      });

      while let Some(result) = tasks.try_join_next() {
        log_join(result);
      }
    }

    if !tasks.is_empty() {
      info!(in_flight = tasks.len(), "waiting for in-flight jobs");
    }
    while let Some(result) = tasks.join_next().await {
      log_join(result);
    }

    info!("job worker stopped");
    Ok(())
  }
}

#[instrument(skip_all, fields(job_key = job.key))]
async fn process(handler: &HttpJobHandler, client: &dyn JobClient, job: Job) {
  info!(retries = job.retries, "job_started");

  let outcome = match handler.handle(&job).await {
    Ok(outcome) => outcome,
    Err(e) => {
      error!(error = %e, retryable = e.is_retryable(), "job_handler_error");
      JobOutcome::from_error(&job, &e)
    }
  };

  if let Err(e) = outcome.report(job.key, client).await {
    error!(error = %e, "job_report_failed");
  }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
  if let Err(e) = result {
    warn!(error = %e, "job task aborted");
  }
}
