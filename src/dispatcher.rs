use super::*;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RunState {
  Done,
  NotStarted,
  Running,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Stats {
  pub(crate) dispatched: u64,
  pub(crate) elapsed: Duration,
  pub(crate) scheduled: u64,
}

#[derive(Debug)]
pub(crate) struct Dispatcher<C> {
  completed: Arc<AtomicU64>,
  queue: Queue,
  source: C,
  state: Mutex<RunState>,
  workers: usize,
}

impl<C: ItemSource> Dispatcher<C> {
  pub(crate) fn completed(&self) -> u64 {
    self.completed.load(Ordering::Relaxed)
  }

  async fn dispatch(source: &C, queue: &Queue, id: i64) -> Result<Kind, Error> {
    let item = match source.fetch(id).await {
      Ok(item) => item,
      Err(error) => {
        warn!(id, %error, "item not retrieved, retrying");
        source.fetch(id).await?
      }
    };

    let record = Record::try_from(item)?;

    let kind = record.kind();

    debug!(id, topic = kind.topic(), "publishing item");

    queue.publish(record)?;

    Ok(kind)
  }

  pub(crate) fn new(source: C, queue: Queue, workers: usize) -> Self {
    Self {
      completed: Arc::new(AtomicU64::new(0)),
      queue,
      source,
      state: Mutex::new(RunState::NotStarted),
      workers: workers.max(1),
    }
  }

  fn set_state(&self, state: RunState) {
    *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
  }

  #[cfg(test)]
  pub(crate) fn state(&self) -> RunState {
    *self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Dispatches ids `start_id..start_id + count` and waits until every unit
  /// has finished. Returns `None` without fetching anything if this
  /// dispatcher has already run or is running.
  pub(crate) async fn try_run(&self, start_id: i64, count: u64) -> Option<Stats> {
    {
      let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

      match *state {
        RunState::NotStarted => *state = RunState::Running,
        RunState::Running => {
          info!("items are being consumed already");
          return None;
        }
        RunState::Done => {
          info!("items were consumed already");
          return None;
        }
      }
    }

    let started = Instant::now();

    let before = self.completed();

    let end = start_id.saturating_add(i64::try_from(count).unwrap_or(i64::MAX));

    stream::iter(start_id..end)
      .map(|id| {
        let (source, queue, completed) = (
          self.source.clone(),
          self.queue.clone(),
          Arc::clone(&self.completed),
        );

        tokio::spawn(async move {
          match Self::dispatch(&source, &queue, id).await {
            Ok(_) => {
              completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => error!(id, %error, "dropping item"),
          }
        })
      })
      .buffer_unordered(self.workers)
      .for_each(|result| async move {
        if let Err(error) = result {
          error!(%error, "dispatch task failed");
        }
      })
      .await;

    self.set_state(RunState::Done);

    let stats = Stats {
      dispatched: self.completed() - before,
      elapsed: started.elapsed(),
      scheduled: u64::try_from(end - start_id).unwrap_or(0),
    };

    info!(
      dispatched = stats.dispatched,
      scheduled = stats.scheduled,
      elapsed_ms = stats.elapsed.as_millis(),
      "finished consuming items"
    );

    Some(stats)
  }
}
