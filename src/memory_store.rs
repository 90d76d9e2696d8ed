use super::*;

#[derive(Debug, Default)]
struct Collections {
  comments: BTreeMap<i64, Comment>,
  stories: BTreeMap<i64, Story>,
}

impl Collections {
  fn contains(&self, external_id: i64) -> bool {
    self.comments.contains_key(&external_id)
      || self.stories.contains_key(&external_id)
  }

  fn ensure_absent(
    &self,
    kind: Kind,
    ids: impl IntoIterator<Item = i64>,
  ) -> Result<(), Error> {
    let mut batch = HashSet::new();

    for external_id in ids {
      if self.contains(external_id) || !batch.insert(external_id) {
        return Err(Error::Duplicate { external_id, kind });
      }
    }

    Ok(())
  }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryStore {
  collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
  fn ancestors(collections: &Collections, comment: &Comment) -> Vec<Traversed> {
    let mut ancestors = Vec::new();
    let mut visited = HashSet::new();
    let mut next = comment.parent_external_id;
    let mut depth = 0;

    while visited.insert(next) {
      let Some(parent) = collections.comments.get(&next) else {
        break;
      };

      ancestors.push(Traversed {
        comment: parent.clone(),
        depth,
      });

      next = parent.parent_external_id;
      depth += 1;
    }

    ancestors
  }

  fn descendants(collections: &Collections, story: &Story) -> Vec<Traversed> {
    let mut descendants = Vec::new();
    let mut visited = HashSet::new();
    let mut frontier = story.kids.clone();
    let mut depth = 0;

    while !frontier.is_empty() {
      let mut level = frontier
        .iter()
        .filter(|id| visited.insert(**id))
        .filter_map(|id| collections.comments.get(id))
        .collect::<Vec<_>>();

      level.sort_by(|a, b| b.external_id.cmp(&a.external_id));

      frontier = level
        .iter()
        .flat_map(|comment| comment.kids.iter().copied())
        .collect();

      descendants.extend(level.into_iter().map(|comment| Traversed {
        comment: comment.clone(),
        depth,
      }));

      depth += 1;
    }

    descendants
  }
}

impl Store for MemoryStore {
  async fn comment_with_ancestors(
    &self,
    external_id: i64,
  ) -> Result<Option<CommentWithAncestors>, Error> {
    let collections = self.collections.read().await;

    Ok(collections.comments.get(&external_id).map(|comment| {
      CommentWithAncestors {
        ancestors: Self::ancestors(&collections, comment),
        comment: comment.clone(),
      }
    }))
  }

  async fn exists(&self, external_id: i64, kind: Kind) -> Result<bool, Error> {
    let collections = self.collections.read().await;

    Ok(match kind {
      Kind::Comment => collections.comments.contains_key(&external_id),
      Kind::Story => collections.stories.contains_key(&external_id),
    })
  }

  async fn insert_comments(&self, comments: &[Comment]) -> Result<(), Error> {
    let mut collections = self.collections.write().await;

    collections.ensure_absent(
      Kind::Comment,
      comments.iter().map(|comment| comment.external_id),
    )?;

    for comment in comments {
      collections
        .comments
        .insert(comment.external_id, comment.clone());
    }

    Ok(())
  }

  async fn insert_stories(&self, stories: &[Story]) -> Result<(), Error> {
    let mut collections = self.collections.write().await;

    collections.ensure_absent(
      Kind::Story,
      stories.iter().map(|story| story.external_id),
    )?;

    for story in stories {
      collections.stories.insert(story.external_id, story.clone());
    }

    Ok(())
  }

  async fn story_titles(&self) -> Result<Vec<StoryTitle>, Error> {
    Ok(
      self
        .collections
        .read()
        .await
        .stories
        .values()
        .map(StoryTitle::from)
        .collect(),
    )
  }

  async fn story_with_descendants(
    &self,
    external_id: i64,
  ) -> Result<Option<StoryWithDescendants>, Error> {
    let collections = self.collections.read().await;

    Ok(collections.stories.get(&external_id).map(|story| {
      StoryWithDescendants {
        descendants: Self::descendants(&collections, story),
        story: story.clone(),
      }
    }))
  }
}
