use super::*;

#[derive(Clone, Debug)]
pub(crate) struct Resolver<S> {
  store: S,
}

impl<S: Store> Resolver<S> {
  async fn locate(&self, external_id: i64) -> Result<Option<Kind>, Error> {
    if self.store.exists(external_id, Kind::Story).await? {
      return Ok(Some(Kind::Story));
    }

    if self.store.exists(external_id, Kind::Comment).await? {
      return Ok(Some(Kind::Comment));
    }

    Ok(None)
  }

  pub(crate) fn new(store: S) -> Self {
    Self { store }
  }

  /// The ancestor farthest from the origin comment. Ties go to the first one
  /// in expansion order.
  fn outermost(ancestors: &[Traversed]) -> Option<&Traversed> {
    ancestors.iter().fold(None, |outermost, ancestor| match outermost {
      Some(current) if current.depth >= ancestor.depth => Some(current),
      _ => Some(ancestor),
    })
  }

  pub(crate) async fn resolve(
    &self,
    external_id: i64,
  ) -> Result<Option<StoryTree>, Error> {
    let mut visited = HashSet::new();

    let mut current = external_id;

    loop {
      if !visited.insert(current) {
        warn!(external_id, "parent chain loops back on itself");
        return Ok(None);
      }

      match self.locate(current).await? {
        Some(Kind::Story) => {
          return Ok(
            self
              .store
              .story_with_descendants(current)
              .await?
              .map(StoryTree::assemble),
          );
        }
        Some(Kind::Comment) => {
          let Some(lineage) = self.store.comment_with_ancestors(current).await?
          else {
            return Ok(None);
          };

          current = Self::outermost(&lineage.ancestors)
            .map_or(lineage.comment.parent_external_id, |ancestor| {
              ancestor.comment.parent_external_id
            });
        }
        None => {
          info!(external_id = current, "entity not present");
          return Ok(None);
        }
      }
    }
  }
}
