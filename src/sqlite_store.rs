use {
  super::*,
  sqlx::{
    FromRow, SqlitePool, Transaction,
    sqlite::{Sqlite, SqliteConnectOptions, SqlitePoolOptions},
  },
};

const CREATE_COMMENT_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS comment (
  external_id INTEGER PRIMARY KEY NOT NULL,
  author TEXT,
  parent_external_id INTEGER NOT NULL,
  date INTEGER,
  text TEXT,
  dead INTEGER NOT NULL DEFAULT 0,
  kids TEXT NOT NULL DEFAULT '[]'
)";

const CREATE_STORY_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS story (
  external_id INTEGER PRIMARY KEY NOT NULL,
  author TEXT,
  date INTEGER,
  descendant_count INTEGER,
  score INTEGER,
  title TEXT,
  url TEXT,
  kids TEXT NOT NULL DEFAULT '[]'
)";

const SELECT_ANCESTORS: &str = r"
WITH RECURSIVE ancestor(external_id, depth) AS (
  SELECT parent_external_id, 0
  FROM comment
  WHERE external_id = ?1
  UNION
  SELECT comment.parent_external_id, ancestor.depth + 1
  FROM ancestor, comment
  WHERE comment.external_id = ancestor.external_id
    AND ancestor.depth < ?2
)
SELECT
  comment.external_id,
  comment.author,
  comment.parent_external_id,
  comment.date,
  comment.text,
  comment.dead,
  comment.kids,
  MIN(ancestor.depth) AS min_depth
FROM ancestor, comment
WHERE comment.external_id = ancestor.external_id
GROUP BY comment.external_id
ORDER BY min_depth, comment.external_id DESC";

const SELECT_DESCENDANTS: &str = r"
WITH RECURSIVE descendant(external_id, depth) AS (
  SELECT kid.value, 0
  FROM story, json_each(story.kids) AS kid
  WHERE story.external_id = ?1
  UNION
  SELECT kid.value, descendant.depth + 1
  FROM descendant, comment, json_each(comment.kids) AS kid
  WHERE comment.external_id = descendant.external_id
    AND descendant.depth < ?2
)
SELECT
  comment.external_id,
  comment.author,
  comment.parent_external_id,
  comment.date,
  comment.text,
  comment.dead,
  comment.kids,
  MIN(descendant.depth) AS min_depth
FROM descendant, comment
WHERE comment.external_id = descendant.external_id
GROUP BY comment.external_id
ORDER BY min_depth, comment.external_id DESC";

/// Recursive expansions stop at this depth, which bounds malformed cyclic
/// chains.
const MAX_DEPTH: i64 = 1024;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, FromRow)]
struct CommentRow {
  author: Option<String>,
  date: Option<i64>,
  dead: bool,
  external_id: i64,
  kids: String,
  parent_external_id: i64,
  text: Option<String>,
}

impl TryFrom<CommentRow> for Comment {
  type Error = Error;

  fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
    Ok(Self {
      author: row.author,
      date: row.date.and_then(|secs| DateTime::from_timestamp(secs, 0)),
      dead: row.dead,
      external_id: row.external_id,
      kids: serde_json::from_str(&row.kids)?,
      parent_external_id: row.parent_external_id,
      text: row.text,
    })
  }
}

#[derive(Debug, FromRow)]
struct StoryRow {
  author: Option<String>,
  date: Option<i64>,
  descendant_count: Option<i32>,
  external_id: i64,
  kids: String,
  score: Option<i32>,
  title: Option<String>,
  url: Option<String>,
}

impl TryFrom<StoryRow> for Story {
  type Error = Error;

  fn try_from(row: StoryRow) -> Result<Self, Self::Error> {
    Ok(Self {
      author: row.author,
      date: row.date.and_then(|secs| DateTime::from_timestamp(secs, 0)),
      descendant_count: row.descendant_count,
      external_id: row.external_id,
      kids: serde_json::from_str(&row.kids)?,
      score: row.score,
      title: row.title,
      url: row.url,
    })
  }
}

#[derive(Debug, FromRow)]
struct TraversedRow {
  #[sqlx(flatten)]
  comment: CommentRow,
  min_depth: i64,
}

impl TryFrom<TraversedRow> for Traversed {
  type Error = Error;

  fn try_from(row: TraversedRow) -> Result<Self, Self::Error> {
    Ok(Self {
      comment: row.comment.try_into()?,
      depth: u32::try_from(row.min_depth).unwrap_or(u32::MAX),
    })
  }
}

#[derive(Clone, Debug)]
pub(crate) struct SqliteStore {
  pool: SqlitePool,
  // SQLite admits one writer; a deferred transaction that reads before it
  // writes fails with SQLITE_BUSY instead of waiting for another writer.
  write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl SqliteStore {
  pub(crate) async fn connect(url: &str) -> Result<Self, Error> {
    let options = SqliteConnectOptions::from_str(url)?
      .busy_timeout(BUSY_TIMEOUT)
      .create_if_missing(true);

    let in_memory = url.contains(":memory:") || url.contains("mode=memory");

    let pool = SqlitePoolOptions::new()
      .max_connections(if in_memory { 1 } else { 8 })
      .idle_timeout(None)
      .max_lifetime(None)
      .connect_with(options)
      .await?;

    let store = Self {
      pool,
      write_lock: Arc::default(),
    };

    store.migrate().await?;

    Ok(store)
  }

  async fn ensure_absent(
    tx: &mut Transaction<'_, Sqlite>,
    external_id: i64,
    kind: Kind,
  ) -> Result<(), Error> {
    let (exists,) = sqlx::query_as::<_, (bool,)>(
      "SELECT EXISTS(SELECT 1 FROM story WHERE external_id = ?1)
         OR EXISTS(SELECT 1 FROM comment WHERE external_id = ?1)",
    )
    .bind(external_id)
    .fetch_one(&mut **tx)
    .await?;

    if exists {
      return Err(Error::Duplicate { external_id, kind });
    }

    Ok(())
  }

  #[cfg(test)]
  pub(crate) async fn in_memory() -> Result<Self, Error> {
    Self::connect("sqlite::memory:").await
  }

  async fn migrate(&self) -> Result<(), Error> {
    for statement in [CREATE_STORY_TABLE, CREATE_COMMENT_TABLE] {
      sqlx::query(statement).execute(&self.pool).await?;
    }

    Ok(())
  }

  async fn traverse(
    &self,
    query: &str,
    external_id: i64,
  ) -> Result<Vec<Traversed>, Error> {
    sqlx::query_as::<_, TraversedRow>(query)
      .bind(external_id)
      .bind(MAX_DEPTH)
      .fetch_all(&self.pool)
      .await?
      .into_iter()
      .map(Traversed::try_from)
      .collect()
  }
}

impl Store for SqliteStore {
  async fn comment_with_ancestors(
    &self,
    external_id: i64,
  ) -> Result<Option<CommentWithAncestors>, Error> {
    let Some(row) = sqlx::query_as::<_, CommentRow>(
      "SELECT external_id, author, parent_external_id, date, text, dead, kids
       FROM comment WHERE external_id = ?1",
    )
    .bind(external_id)
    .fetch_optional(&self.pool)
    .await?
    else {
      return Ok(None);
    };

    Ok(Some(CommentWithAncestors {
      ancestors: self.traverse(SELECT_ANCESTORS, external_id).await?,
      comment: row.try_into()?,
    }))
  }

  async fn exists(&self, external_id: i64, kind: Kind) -> Result<bool, Error> {
    let query = match kind {
      Kind::Comment => "SELECT EXISTS(SELECT 1 FROM comment WHERE external_id = ?1)",
      Kind::Story => "SELECT EXISTS(SELECT 1 FROM story WHERE external_id = ?1)",
    };

    let (exists,) = sqlx::query_as::<_, (bool,)>(query)
      .bind(external_id)
      .fetch_one(&self.pool)
      .await?;

    Ok(exists)
  }

  async fn insert_comments(&self, comments: &[Comment]) -> Result<(), Error> {
    let _writer = self.write_lock.lock().await;

    let mut tx = self.pool.begin().await?;

    for comment in comments {
      Self::ensure_absent(&mut tx, comment.external_id, Kind::Comment).await?;

      sqlx::query(
        "INSERT INTO comment
           (external_id, author, parent_external_id, date, text, dead, kids)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
      )
      .bind(comment.external_id)
      .bind(comment.author.as_deref())
      .bind(comment.parent_external_id)
      .bind(comment.date.map(|date| date.timestamp()))
      .bind(comment.text.as_deref())
      .bind(comment.dead)
      .bind(serde_json::to_string(&comment.kids)?)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;

    debug!(count = comments.len(), "inserted comments");

    Ok(())
  }

  async fn insert_stories(&self, stories: &[Story]) -> Result<(), Error> {
    let _writer = self.write_lock.lock().await;

    let mut tx = self.pool.begin().await?;

    for story in stories {
      Self::ensure_absent(&mut tx, story.external_id, Kind::Story).await?;

      sqlx::query(
        "INSERT INTO story
           (external_id, author, date, descendant_count, score, title, url, kids)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      )
      .bind(story.external_id)
      .bind(story.author.as_deref())
      .bind(story.date.map(|date| date.timestamp()))
      .bind(story.descendant_count)
      .bind(story.score)
      .bind(story.title.as_deref())
      .bind(story.url.as_deref())
      .bind(serde_json::to_string(&story.kids)?)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;

    debug!(count = stories.len(), "inserted stories");

    Ok(())
  }

  async fn story_titles(&self) -> Result<Vec<StoryTitle>, Error> {
    let rows = sqlx::query_as::<_, (i64, Option<String>)>(
      "SELECT external_id, title FROM story ORDER BY external_id",
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(external_id, title)| StoryTitle { external_id, title })
        .collect(),
    )
  }

  async fn story_with_descendants(
    &self,
    external_id: i64,
  ) -> Result<Option<StoryWithDescendants>, Error> {
    let Some(row) = sqlx::query_as::<_, StoryRow>(
      "SELECT external_id, author, date, descendant_count, score, title, url, kids
       FROM story WHERE external_id = ?1",
    )
    .bind(external_id)
    .fetch_optional(&self.pool)
    .await?
    else {
      return Ok(None);
    };

    Ok(Some(StoryWithDescendants {
      descendants: self.traverse(SELECT_DESCENDANTS, external_id).await?,
      story: row.try_into()?,
    }))
  }
}

#[cfg(test)]
mod tests {
  use {
    super::*,
    crate::{
      memory_store::tests::{comment, seed, story, write_concurrently},
      persister::BatchOutcome,
    },
    tempfile::TempDir,
  };

  async fn on_disk() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();

    let store = SqliteStore::connect(&format!(
      "sqlite://{}",
      dir.path().join("hn.sqlite3").display()
    ))
    .await
    .unwrap();

    (dir, store)
  }

  async fn seeded() -> SqliteStore {
    let store = SqliteStore::in_memory().await.unwrap();
    seed(&store).await;
    store
  }

  fn ids(traversed: &[Traversed]) -> Vec<(i64, u32)> {
    traversed
      .iter()
      .map(|entry| (entry.comment.external_id, entry.depth))
      .collect()
  }

  #[tokio::test]
  async fn round_trips_every_field() {
    let store = SqliteStore::in_memory().await.unwrap();

    let story = Story {
      author: Some("pg".into()),
      date: DateTime::from_timestamp(1_160_418_111, 0),
      descendant_count: Some(3),
      external_id: 1,
      kids: vec![15, 234_509],
      score: Some(57),
      title: Some("Y Combinator".into()),
      url: Some("http://ycombinator.com".into()),
    };

    let comment = Comment {
      author: Some("sama".into()),
      date: DateTime::from_timestamp(1_160_423_461, 0),
      dead: true,
      external_id: 15,
      kids: vec![17],
      parent_external_id: 1,
      text: Some("the rising star".into()),
    };

    store.insert_stories(&[story.clone()]).await.unwrap();
    store.insert_comments(&[comment.clone()]).await.unwrap();

    let expansion = store.story_with_descendants(1).await.unwrap().unwrap();

    assert_eq!(expansion.story, story);
    assert_eq!(
      expansion.descendants,
      vec![Traversed { comment, depth: 0 }]
    );
  }

  #[tokio::test]
  async fn exists_distinguishes_kinds() {
    let store = seeded().await;

    assert!(store.exists(1, Kind::Story).await.unwrap());
    assert!(!store.exists(1, Kind::Comment).await.unwrap());
    assert!(store.exists(7, Kind::Comment).await.unwrap());
    assert!(!store.exists(999, Kind::Comment).await.unwrap());
  }

  #[tokio::test]
  async fn descendants_are_ordered_by_depth_then_newest_first() {
    let store = seeded().await;

    let expansion = store.story_with_descendants(1).await.unwrap().unwrap();

    assert_eq!(ids(&expansion.descendants), vec![(3, 0), (2, 0), (7, 1)]);

    let expansion = store.story_with_descendants(21).await.unwrap().unwrap();

    assert_eq!(ids(&expansion.descendants), vec![(45, 0), (41, 0)]);
  }

  #[tokio::test]
  async fn ancestors_are_tagged_with_distance_from_origin() {
    let store = SqliteStore::in_memory().await.unwrap();

    store
      .insert_comments(&[
        comment(10, 1, "a", &[11]),
        comment(11, 10, "b", &[12]),
        comment(12, 11, "c", &[]),
      ])
      .await
      .unwrap();

    let lineage = store.comment_with_ancestors(12).await.unwrap().unwrap();

    assert_eq!(ids(&lineage.ancestors), vec![(11, 0), (10, 1)]);

    let lineage = store.comment_with_ancestors(10).await.unwrap().unwrap();

    assert!(lineage.ancestors.is_empty());
  }

  #[tokio::test]
  async fn cyclic_chains_terminate() {
    let store = SqliteStore::in_memory().await.unwrap();

    store
      .insert_comments(&[comment(30, 31, "a", &[31]), comment(31, 30, "b", &[30])])
      .await
      .unwrap();

    let lineage = store.comment_with_ancestors(30).await.unwrap().unwrap();

    assert_eq!(ids(&lineage.ancestors), vec![(31, 0), (30, 1)]);
  }

  #[tokio::test]
  async fn duplicate_batch_writes_nothing() {
    let store = seeded().await;

    let error = store
      .insert_comments(&[comment(50, 1, "new", &[]), comment(7, 2, "dup", &[])])
      .await
      .unwrap_err();

    assert!(matches!(
      error,
      Error::Duplicate {
        external_id: 7,
        kind: Kind::Comment
      }
    ));

    assert!(!store.exists(50, Kind::Comment).await.unwrap());

    assert!(
      store
        .insert_stories(&[story(3, "clash", &[])])
        .await
        .unwrap_err()
        .is_duplicate()
    );
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_writers_keep_every_batch() {
    let (_dir, store) = on_disk().await;

    write_concurrently(&store).await;
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn story_and_comment_persisters_write_side_by_side() {
    let (_dir, store) = on_disk().await;

    let settings = BatchSettings {
      batch_size: 5,
      concurrent_consumers: 1,
      receive_timeout: Duration::from_millis(10),
    };

    let stories =
      Persister::new(Topic::new("queue.story"), store.clone(), settings);

    let comments =
      Persister::new(Topic::new("queue.comment"), store.clone(), settings);

    let story_writer = tokio::spawn(async move {
      let mut total = BatchOutcome::default();

      for start in (0..200).map(|batch| batch * 5 + 1) {
        let outcome = stories
          .on_batch((start..start + 5).map(|id| story(id, "s", &[])).collect())
          .await;

        total.rejected += outcome.rejected;
        total.written += outcome.written;
      }

      total
    });

    let comment_writer = tokio::spawn(async move {
      let mut total = BatchOutcome::default();

      for start in (0..200).map(|batch| batch * 5 + 10_001) {
        let outcome = comments
          .on_batch(
            (start..start + 5)
              .map(|id| comment(id, 1, "c", &[]))
              .collect(),
          )
          .await;

        total.rejected += outcome.rejected;
        total.written += outcome.written;
      }

      total
    });

    let expected = BatchOutcome {
      rejected: 0,
      written: 1000,
    };

    assert_eq!(story_writer.await.unwrap(), expected);
    assert_eq!(comment_writer.await.unwrap(), expected);
    assert_eq!(store.story_titles().await.unwrap().len(), 1000);
  }

  #[tokio::test]
  async fn story_titles_are_listed_by_id() {
    let store = seeded().await;

    assert_eq!(
      store
        .story_titles()
        .await
        .unwrap()
        .into_iter()
        .map(|title| title.external_id)
        .collect::<Vec<_>>(),
      vec![1, 4, 21]
    );
  }
}
