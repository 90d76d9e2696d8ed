use super::*;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Kind {
  Comment,
  Story,
}

impl Kind {
  pub(crate) fn topic(self) -> &'static str {
    match self {
      Self::Comment => "queue.comment",
      Self::Story => "queue.story",
    }
  }
}

impl Display for Kind {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    f.write_str(match self {
      Self::Comment => "comment",
      Self::Story => "story",
    })
  }
}
