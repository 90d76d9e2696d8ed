use super::*;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoryTree {
  #[serde(rename = "by")]
  pub(crate) author: Option<String>,
  pub(crate) children: Option<Vec<CommentNode>>,
  pub(crate) date: Option<DateTime<Utc>>,
  pub(crate) external_id: i64,
  pub(crate) score: Option<i32>,
  pub(crate) title: Option<String>,
  pub(crate) url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommentNode {
  #[serde(rename = "by")]
  pub(crate) author: Option<String>,
  pub(crate) children: Option<Vec<CommentNode>>,
  pub(crate) date: Option<DateTime<Utc>>,
  pub(crate) external_id: i64,
  pub(crate) parent_external_id: i64,
  pub(crate) text: Option<String>,
}

impl StoryTree {
  /// Rebuilds the tree from a flat, depth-tagged expansion. Depth-0 comments
  /// hang off the story in expansion order; below that every comment adopts
  /// those of its `kids` that were found one level deeper. Kids missing from
  /// the expansion are left out.
  pub(crate) fn assemble(expansion: StoryWithDescendants) -> Self {
    let StoryWithDescendants { descendants, story } = expansion;

    let index = descendants
      .iter()
      .map(|entry| (entry.comment.external_id, entry))
      .collect::<HashMap<_, _>>();

    let roots = descendants
      .iter()
      .filter(|entry| entry.depth == 0)
      .map(|entry| CommentNode::assemble(entry, &index))
      .collect::<Vec<_>>();

    Self {
      author: story.author,
      children: (!roots.is_empty()).then_some(roots),
      date: story.date,
      external_id: story.external_id,
      score: story.score,
      title: story.title,
      url: story.url,
    }
  }
}

impl CommentNode {
  fn assemble(entry: &Traversed, index: &HashMap<i64, &Traversed>) -> Self {
    let children = entry
      .comment
      .kids
      .iter()
      .filter_map(|kid| index.get(kid))
      .filter(|kid| kid.depth == entry.depth + 1)
      .map(|kid| Self::assemble(kid, index))
      .collect::<Vec<_>>();

    let comment = &entry.comment;

    Self {
      author: comment.author.clone(),
      children: (!children.is_empty()).then_some(children),
      date: comment.date,
      external_id: comment.external_id,
      parent_external_id: comment.parent_external_id,
      text: comment.text.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use {
    super::*,
    crate::memory_store::tests::{comment, story},
    serde_json::json,
  };

  fn traversed(comment: Comment, depth: u32) -> Traversed {
    Traversed { comment, depth }
  }

  #[test]
  fn story_without_comments_has_null_children() {
    let tree = StoryTree::assemble(StoryWithDescendants {
      descendants: Vec::new(),
      story: story(4, "Title 2", &[]),
    });

    assert_eq!(
      serde_json::to_value(&tree).unwrap(),
      json!({
        "by": null,
        "children": null,
        "date": null,
        "externalId": 4,
        "score": null,
        "title": "Title 2",
        "url": null,
      })
    );
  }

  #[test]
  fn serializes_nested_comments() {
    let tree = StoryTree::assemble(StoryWithDescendants {
      descendants: vec![
        traversed(comment(3, 1, "Comment 2", &[]), 0),
        traversed(comment(2, 1, "Comment 1", &[7]), 0),
        traversed(comment(7, 2, "Comment 3", &[]), 1),
      ],
      story: story(1, "Title 1", &[2, 3]),
    });

    assert_eq!(
      serde_json::to_value(&tree).unwrap(),
      json!({
        "by": null,
        "date": null,
        "externalId": 1,
        "score": null,
        "title": "Title 1",
        "url": null,
        "children": [
          {
            "by": null,
            "children": null,
            "date": null,
            "externalId": 3,
            "parentExternalId": 1,
            "text": "Comment 2",
          },
          {
            "by": null,
            "date": null,
            "externalId": 2,
            "parentExternalId": 1,
            "text": "Comment 1",
            "children": [
              {
                "by": null,
                "children": null,
                "date": null,
                "externalId": 7,
                "parentExternalId": 2,
                "text": "Comment 3",
              }
            ],
          }
        ],
      })
    );
  }

  #[test]
  fn kids_are_attached_in_kids_order_one_level_down() {
    let tree = StoryTree::assemble(StoryWithDescendants {
      descendants: vec![
        traversed(comment(2, 1, "parent", &[9, 8, 2]), 0),
        traversed(comment(8, 2, "older", &[]), 1),
        traversed(comment(9, 2, "newer", &[]), 1),
      ],
      story: story(1, "Title", &[2]),
    });

    let children = tree.children.unwrap();

    assert_eq!(children.len(), 1);

    assert_eq!(
      children[0]
        .children
        .as_ref()
        .unwrap()
        .iter()
        .map(|child| child.external_id)
        .collect::<Vec<_>>(),
      vec![9, 8]
    );
  }

  #[test]
  fn dates_serialize_as_rfc3339() {
    let mut story = story(1, "Title", &[]);

    story.date = DateTime::from_timestamp(1_160_418_111, 0);

    let tree = StoryTree::assemble(StoryWithDescendants {
      descendants: Vec::new(),
      story,
    });

    assert_eq!(
      serde_json::to_value(&tree).unwrap()["date"],
      json!("2006-10-09T18:21:51Z")
    );
  }
}
