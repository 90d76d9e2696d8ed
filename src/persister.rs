use super::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BatchSettings {
  pub(crate) batch_size: usize,
  pub(crate) concurrent_consumers: usize,
  pub(crate) receive_timeout: Duration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct BatchOutcome {
  pub(crate) rejected: usize,
  pub(crate) written: usize,
}

#[derive(Debug)]
pub(crate) struct Persister<T, S> {
  settings: BatchSettings,
  store: S,
  topic: Topic<T>,
}

impl<T: Document, S: Store> Persister<T, S> {
  async fn consume(self) {
    while let Some(batch) = self
      .topic
      .receive_batch(self.settings.batch_size, self.settings.receive_timeout)
      .await
    {
      self.on_batch(batch).await;
    }

    debug!(topic = self.topic.name(), "consumer stopped");
  }

  pub(crate) fn new(topic: Topic<T>, store: S, settings: BatchSettings) -> Self {
    Self {
      settings,
      store,
      topic,
    }
  }

  /// Bulk inserts `batch`. If the batch is rejected because some of its ids
  /// are already stored, the remaining items are written one at a time.
  pub(crate) async fn on_batch(&self, batch: Vec<T>) -> BatchOutcome {
    info!(count = batch.len(), kind = %T::KIND, "processing batch");

    match T::insert_all(&self.store, &batch).await {
      Ok(()) => BatchOutcome {
        rejected: 0,
        written: batch.len(),
      },
      Err(error) if error.is_duplicate() => {
        warn!(%error, kind = %T::KIND, "batch rejected, writing items one by one");
        self.write_individually(batch).await
      }
      Err(error) => {
        error!(%error, count = batch.len(), kind = %T::KIND, "dropping batch");

        BatchOutcome {
          rejected: batch.len(),
          written: 0,
        }
      }
    }
  }

  pub(crate) fn spawn(
    topic: &Topic<T>,
    store: &S,
    settings: BatchSettings,
  ) -> Vec<JoinHandle<()>> {
    (0..settings.concurrent_consumers.max(1))
      .map(|_| {
        tokio::spawn(
          Self::new(topic.clone(), store.clone(), settings).consume(),
        )
      })
      .collect()
  }

  async fn write_individually(&self, batch: Vec<T>) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for document in batch {
      match T::insert_all(&self.store, slice::from_ref(&document)).await {
        Ok(()) => outcome.written += 1,
        Err(error) => {
          outcome.rejected += 1;

          if error.is_duplicate() {
            warn!(external_id = document.external_id(), kind = %T::KIND, "skipping duplicate");
          } else {
            error!(%error, external_id = document.external_id(), kind = %T::KIND, "failed to write item");
          }
        }
      }
    }

    outcome
  }
}

#[cfg(test)]
mod tests {
  use {
    super::*,
    crate::memory_store::tests::{comment, story},
  };

  fn settings(batch_size: usize, concurrent_consumers: usize) -> BatchSettings {
    BatchSettings {
      batch_size,
      concurrent_consumers,
      receive_timeout: Duration::from_millis(20),
    }
  }

  #[tokio::test]
  async fn batch_is_written_in_one_insert() {
    let store = MemoryStore::default();

    let persister =
      Persister::new(Topic::new("queue.story"), store.clone(), settings(50, 1));

    let outcome = persister
      .on_batch(vec![story(1, "a", &[]), story(2, "b", &[])])
      .await;

    assert_eq!(
      outcome,
      BatchOutcome {
        rejected: 0,
        written: 2
      }
    );

    assert_eq!(store.story_titles().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn duplicate_only_loses_the_duplicate() {
    let store = MemoryStore::default();

    store.insert_comments(&[comment(7, 1, "old", &[])]).await.unwrap();

    let persister = Persister::new(
      Topic::new("queue.comment"),
      store.clone(),
      settings(50, 1),
    );

    let outcome = persister
      .on_batch(vec![
        comment(5, 1, "a", &[]),
        comment(7, 1, "dup", &[]),
        comment(9, 1, "b", &[]),
      ])
      .await;

    assert_eq!(
      outcome,
      BatchOutcome {
        rejected: 1,
        written: 2
      }
    );

    assert!(store.exists(5, Kind::Comment).await.unwrap());
    assert!(store.exists(9, Kind::Comment).await.unwrap());

    let lineage = store.comment_with_ancestors(7).await.unwrap().unwrap();

    assert_eq!(lineage.comment.text.as_deref(), Some("old"));
  }

  #[tokio::test]
  async fn consumers_drain_topic_until_closed() {
    let store = MemoryStore::default();

    let topic = Topic::new("queue.comment");

    let handles = Persister::spawn(&topic, &store, settings(3, 2));

    assert_eq!(handles.len(), 2);

    for id in 1..=10 {
      topic.publish(comment(id, 100, "text", &[])).unwrap();
    }

    topic.close();

    for handle in handles {
      handle.await.unwrap();
    }

    for id in 1..=10 {
      assert!(store.exists(id, Kind::Comment).await.unwrap());
    }
  }
}
