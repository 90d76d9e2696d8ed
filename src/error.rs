use super::*;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
  #[error("failed to build HTTP client")]
  Client(#[source] reqwest::Error),
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
  #[error("{kind} {external_id} already exists")]
  Duplicate { external_id: i64, kind: Kind },
  #[error("failed to fetch item {id}")]
  Fetch {
    id: i64,
    #[source]
    source: reqwest::Error,
  },
  #[error("item {id} does not exist")]
  MissingItem { id: i64 },
  #[error("comment {id} has no parent")]
  MissingParent { id: i64 },
  #[error("topic `{topic}` is closed")]
  QueueClosed { topic: &'static str },
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
  #[error("item {id} has unexpected type {}", kind.as_deref().unwrap_or("<none>"))]
  UnexpectedKind { id: i64, kind: Option<String> },
}

impl Error {
  pub(crate) fn is_duplicate(&self) -> bool {
    matches!(self, Self::Duplicate { .. })
  }
}
