use super::*;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Record {
  Comment(Comment),
  Story(Story),
}

impl Record {
  pub(crate) fn kind(&self) -> Kind {
    match self {
      Self::Comment(_) => Kind::Comment,
      Self::Story(_) => Kind::Story,
    }
  }
}

impl TryFrom<Item> for Record {
  type Error = Error;

  fn try_from(item: Item) -> Result<Self, Self::Error> {
    match item.r#type.as_deref() {
      Some("comment") => {
        let parent_external_id =
          item.parent.ok_or(Error::MissingParent { id: item.id })?;

        Ok(Self::Comment(Comment {
          author: item.by,
          date: item.time,
          dead: item.dead.unwrap_or(false),
          external_id: item.id,
          kids: item.kids,
          parent_external_id,
          text: item.text,
        }))
      }
      Some("story") => Ok(Self::Story(Story {
        author: item.by,
        date: item.time,
        descendant_count: item.descendants,
        external_id: item.id,
        kids: item.kids,
        score: item.score,
        title: item.title,
        url: item.url,
      })),
      _ => Err(Error::UnexpectedKind {
        id: item.id,
        kind: item.r#type,
      }),
    }
  }
}
