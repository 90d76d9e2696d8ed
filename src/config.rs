use super::*;

#[derive(Clone, Debug, Parser)]
#[command(
  name = "hn-consumer",
  about = "Ingest Hacker News items and rebuild their comment trees"
)]
pub(crate) struct Config {
  #[arg(long, env = "HN_BASE_URL", default_value = Client::DEFAULT_BASE_URL)]
  pub(crate) base_url: String,
  /// SQLite URL, or `memory` to keep everything in process
  #[arg(long, env = "HN_DATABASE", default_value = "sqlite://hn.sqlite3")]
  pub(crate) database: String,
  #[arg(long, env = "HN_EXECUTOR_CORE_POOL_SIZE", default_value_t = 1)]
  pub(crate) executor_core_pool_size: usize,
  #[arg(long, env = "HN_EXECUTOR_MAX_POOL_SIZE", default_value_t = 1)]
  pub(crate) executor_max_pool_size: usize,
  #[arg(long, env = "HN_QUEUE_BATCH_SIZE", default_value_t = 50)]
  pub(crate) queue_batch_size: usize,
  #[arg(long, env = "HN_QUEUE_CONCURRENT_CONSUMERS", default_value_t = 1)]
  pub(crate) queue_concurrent_consumers: usize,
  /// Milliseconds a partial batch waits before it is written
  #[arg(long, env = "HN_QUEUE_RECEIVE_TIMEOUT", default_value_t = 1000)]
  pub(crate) queue_receive_timeout: u64,
  /// Seconds before an item request is abandoned
  #[arg(long, env = "HN_REQUEST_TIMEOUT", default_value_t = 10)]
  pub(crate) request_timeout: u64,
  #[arg(long, env = "HN_RETRIEVE_COUNT", default_value_t = 1000)]
  pub(crate) retrieve_count: u64,
  #[arg(long, env = "HN_START_ID", default_value_t = 0)]
  pub(crate) start_id: i64,
}

impl Config {
  pub(crate) const MEMORY_DATABASE: &str = "memory";

  pub(crate) fn batch_settings(&self) -> BatchSettings {
    BatchSettings {
      batch_size: self.queue_batch_size,
      concurrent_consumers: self.queue_concurrent_consumers,
      receive_timeout: Duration::from_millis(self.queue_receive_timeout),
    }
  }

  pub(crate) fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout)
  }

  pub(crate) fn validate(&self) -> Result {
    for (name, value) in [
      ("executor core pool size", self.executor_core_pool_size),
      ("executor max pool size", self.executor_max_pool_size),
      ("queue batch size", self.queue_batch_size),
      ("queue concurrent consumers", self.queue_concurrent_consumers),
    ] {
      ensure!(value > 0, "{name} must be at least 1");
    }

    ensure!(
      self.executor_core_pool_size <= self.executor_max_pool_size,
      "executor core pool size {} exceeds max pool size {}",
      self.executor_core_pool_size,
      self.executor_max_pool_size
    );

    Ok(())
  }

  /// Dispatch work waits in an unbounded queue, so only the core workers
  /// ever run.
  pub(crate) fn workers(&self) -> usize {
    self.executor_core_pool_size
  }
}
