use super::*;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct StoryWithDescendants {
  pub(crate) descendants: Vec<Traversed>,
  pub(crate) story: Story,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CommentWithAncestors {
  pub(crate) ancestors: Vec<Traversed>,
  pub(crate) comment: Comment,
}

/// Expansions return comments ordered by depth, then by external id
/// descending. Bulk inserts are atomic: a batch containing an id that is
/// already stored, in either collection, writes nothing and fails with
/// [`Error::Duplicate`].
pub(crate) trait Store: Clone + Send + Sync + 'static {
  fn comment_with_ancestors(
    &self,
    external_id: i64,
  ) -> impl Future<Output = Result<Option<CommentWithAncestors>, Error>> + Send;

  fn exists(
    &self,
    external_id: i64,
    kind: Kind,
  ) -> impl Future<Output = Result<bool, Error>> + Send;

  fn insert_comments(
    &self,
    comments: &[Comment],
  ) -> impl Future<Output = Result<(), Error>> + Send;

  fn insert_stories(
    &self,
    stories: &[Story],
  ) -> impl Future<Output = Result<(), Error>> + Send;

  fn story_titles(
    &self,
  ) -> impl Future<Output = Result<Vec<StoryTitle>, Error>> + Send;

  fn story_with_descendants(
    &self,
    external_id: i64,
  ) -> impl Future<Output = Result<Option<StoryWithDescendants>, Error>> + Send;
}

pub(crate) trait Document: Clone + Debug + Send + Sync + 'static {
  const KIND: Kind;

  fn external_id(&self) -> i64;

  fn insert_all<S: Store>(
    store: &S,
    documents: &[Self],
  ) -> impl Future<Output = Result<(), Error>> + Send;
}

impl Document for Comment {
  const KIND: Kind = Kind::Comment;

  fn external_id(&self) -> i64 {
    self.external_id
  }

  async fn insert_all<S: Store>(
    store: &S,
    documents: &[Self],
  ) -> Result<(), Error> {
    store.insert_comments(documents).await
  }
}

impl Document for Story {
  const KIND: Kind = Kind::Story;

  fn external_id(&self) -> i64 {
    self.external_id
  }

  async fn insert_all<S: Store>(
    store: &S,
    documents: &[Self],
  ) -> Result<(), Error> {
    store.insert_stories(documents).await
  }
}
