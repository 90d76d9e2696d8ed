use super::*;

#[derive(Debug)]
struct Envelope<T> {
  message: T,
  published: Instant,
}

#[derive(Debug)]
struct Shared<T> {
  buffer: Mutex<VecDeque<Envelope<T>>>,
  closed: AtomicBool,
  name: &'static str,
  notify: Notify,
}

#[derive(Debug)]
pub(crate) struct Topic<T> {
  shared: Arc<Shared<T>>,
}

impl<T> Clone for Topic<T> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T> Topic<T> {
  fn buffer(&self) -> MutexGuard<'_, VecDeque<Envelope<T>>> {
    self
      .shared
      .buffer
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  /// Stops accepting messages. Consumers drain what is left and then see the
  /// end of the topic.
  pub(crate) fn close(&self) {
    self.shared.closed.store(true, Ordering::SeqCst);
    self.shared.notify.notify_waiters();
  }

  fn is_closed(&self) -> bool {
    self.shared.closed.load(Ordering::SeqCst)
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.buffer().len()
  }

  pub(crate) fn name(&self) -> &'static str {
    self.shared.name
  }

  pub(crate) fn new(name: &'static str) -> Self {
    Self {
      shared: Arc::new(Shared {
        buffer: Mutex::new(VecDeque::new()),
        closed: AtomicBool::new(false),
        name,
        notify: Notify::new(),
      }),
    }
  }

  pub(crate) fn publish(&self, message: T) -> Result<(), Error> {
    if self.is_closed() {
      return Err(Error::QueueClosed {
        topic: self.shared.name,
      });
    }

    self.buffer().push_back(Envelope {
      message,
      published: Instant::now(),
    });

    self.shared.notify.notify_one();

    Ok(())
  }

  pub(crate) fn purge(&self) -> usize {
    let mut buffer = self.buffer();
    let purged = buffer.len();
    buffer.clear();
    purged
  }

  /// Waits for the next batch. The batch is handed over as soon as it holds
  /// `size` messages, or once `timeout` has passed since its oldest message
  /// was published. Returns `None` once the topic is closed and empty.
  pub(crate) async fn receive_batch(
    &self,
    size: usize,
    timeout: Duration,
  ) -> Option<Vec<T>> {
    let size = size.max(1);

    let oldest = loop {
      let notified = self.shared.notify.notified();
      pin!(notified);
      notified.as_mut().enable();

      let popped = self.buffer().pop_front();

      if let Some(envelope) = popped {
        break envelope;
      }

      if self.is_closed() {
        return None;
      }

      notified.await;
    };

    let deadline = oldest.published + timeout;

    let mut batch = Vec::with_capacity(size);

    batch.push(oldest.message);

    loop {
      let notified = self.shared.notify.notified();
      pin!(notified);
      notified.as_mut().enable();

      {
        let mut buffer = self.buffer();

        while batch.len() < size {
          let Some(envelope) = buffer.pop_front() else {
            break;
          };

          batch.push(envelope.message);
        }

        if !buffer.is_empty() {
          self.shared.notify.notify_one();
        }
      }

      if batch.len() >= size || self.is_closed() {
        break;
      }

      if time::timeout_at(deadline, notified).await.is_err() {
        break;
      }
    }

    Some(batch)
  }
}

#[derive(Clone, Debug)]
pub(crate) struct Queue {
  pub(crate) comments: Topic<Comment>,
  pub(crate) stories: Topic<Story>,
}

impl Default for Queue {
  fn default() -> Self {
    Self {
      comments: Topic::new(Kind::Comment.topic()),
      stories: Topic::new(Kind::Story.topic()),
    }
  }
}

impl Queue {
  pub(crate) fn close(&self) {
    self.comments.close();
    self.stories.close();
  }

  pub(crate) fn publish(&self, record: Record) -> Result<(), Error> {
    match record {
      Record::Comment(comment) => self.comments.publish(comment),
      Record::Story(story) => self.stories.publish(story),
    }
  }

  pub(crate) fn purge(&self) -> usize {
    let purged = self.comments.purge() + self.stories.purge();

    info!(purged, "cleared queues");

    purged
  }
}
