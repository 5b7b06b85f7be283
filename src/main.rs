use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use courier_config::WorkerConfig;
use courier_handler::{HttpJobHandler, JobOutcome};
use courier_job::{Job, JobClient, JobClientError};
use courier_worker::JobWorker;

/// Courier - an HTTP job worker for workflow brokers
#[derive(Parser)]
#[command(name = "courier")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the worker configuration file (default: ~/.courier/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Handle a single job and print its outcome
  Run {
    /// Path to the job file (JSON). Reads stdin when omitted.
    job_file: Option<PathBuf>,
  },

  /// Handle newline-delimited jobs from stdin until it closes
  Work {
    /// Maximum number of jobs handled at once
    #[arg(long, default_value_t = courier_worker::DEFAULT_MAX_JOBS_ACTIVE)]
    max_jobs_active: usize,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let config = load_config(cli.config.as_deref())?;

  match cli.command {
    Some(Commands::Run { job_file }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_job(config, job_file))
    }
    Some(Commands::Work { max_jobs_active }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(work(config, max_jobs_active))
    }
    None => {
      println!("courier - use --help to see available commands");
      Ok(())
    }
  }
}

fn load_config(path: Option<&Path>) -> Result<WorkerConfig> {
  let config = match path {
    Some(path) => WorkerConfig::from_file(path)?,
    None => {
      let default = dirs::home_dir().map(|home| home.join(".courier").join("config.json"));
      match default {
        Some(path) if path.is_file() => WorkerConfig::from_file(&path)?,
        _ => WorkerConfig::default(),
      }
    }
  };

  config
    .apply_env(std::env::vars())
    .context("invalid configuration in environment")
}

async fn build_handler(config: &WorkerConfig) -> Result<Arc<HttpJobHandler>> {
  let variables =
    courier_variables::from_config(config).context("failed to create variables provider")?;

  // Surface a misconfigured remote endpoint before any job arrives.
  if config.remote.url().is_some() {
    let loaded = variables
      .variables()
      .await
      .context("failed to load remote variables")?;
    info!(count = loaded.len(), "remote variables loaded");
  }

  let handler = HttpJobHandler::new(&config.http, variables).context("failed to create handler")?;
  Ok(Arc::new(handler))
}

async fn run_job(config: WorkerConfig, job_file: Option<PathBuf>) -> Result<()> {
  let input = match &job_file {
    Some(path) => tokio::fs::read_to_string(path)
      .await
      .with_context(|| format!("failed to read job file: {}", path.display()))?,
    None => read_stdin()?,
  };

  let job: Job = serde_json::from_str(&input).context("failed to parse job JSON")?;
  let handler = build_handler(&config).await?;

  let outcome = match handler.handle(&job).await {
    Ok(outcome) => outcome,
    Err(e) => {
      warn!(job_key = job.key, error = %e, "job_handler_error");
      JobOutcome::from_error(&job, &e)
    }
  };

  println!("{}", serde_json::to_string_pretty(&outcome)?);
  Ok(())
}

async fn work(config: WorkerConfig, max_jobs_active: usize) -> Result<()> {
  let handler = build_handler(&config).await?;
  let worker = JobWorker::with_max_jobs_active(handler, Arc::new(StdoutJobClient), max_jobs_active);
  let sender = worker.sender();

  let cancel = CancellationToken::new();
  let worker = tokio::spawn(worker.start(cancel.clone()));

  let shutdown = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("shutdown requested");
      shutdown.cancel();
    }
  });

  info!(max_jobs_active, "reading jobs from stdin");

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  loop {
    let line = tokio::select! {
      _ = cancel.cancelled() => break,
      line = lines.next_line() => line.context("failed to read from stdin")?,
    };
    let Some(line) = line else { break };
    if line.trim().is_empty() {
      continue;
    }

    match serde_json::from_str::<Job>(&line) {
      Ok(job) => {
        if sender.send(job).await.is_err() {
          break;
        }
      }
      Err(e) => warn!(error = %e, "skipping invalid job line"),
    }
  }

  // Closing the channel lets the worker drain and stop.
  drop(sender);
  worker.await.context("job worker task failed")??;
  Ok(())
}

fn read_stdin() -> Result<String> {
  if io::stdin().is_terminal() {
    bail!("no job file given and stdin is a terminal");
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read job from stdin")?;
  Ok(input)
}

/// Prints each broker call as a JSON line on stdout.
struct StdoutJobClient;

impl StdoutJobClient {
  fn emit(&self, call: Value) -> Result<(), JobClientError> {
    println!("{}", call);
    Ok(())
  }
}

#[async_trait]
impl JobClient for StdoutJobClient {
  async fn complete(&self, job_key: i64, variables: Map<String, Value>) -> Result<(), JobClientError> {
    self.emit(json!({ "command": "complete", "jobKey": job_key, "variables": variables }))
  }

  async fn fail(&self, job_key: i64, retries: u32, message: &str) -> Result<(), JobClientError> {
    self.emit(json!({ "command": "fail", "jobKey": job_key, "retries": retries, "message": message }))
  }

  async fn throw_error(
    &self,
    job_key: i64,
    error_code: &str,
    message: &str,
  ) -> Result<(), JobClientError> {
    self.emit(json!({
      "command": "throw_error",
      "jobKey": job_key,
      "errorCode": error_code,
      "message": message
    }))
  }
}
