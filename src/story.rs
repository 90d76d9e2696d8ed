use super::*;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Story {
  pub(crate) author: Option<String>,
  pub(crate) date: Option<DateTime<Utc>>,
  pub(crate) descendant_count: Option<i32>,
  pub(crate) external_id: i64,
  pub(crate) kids: Vec<i64>,
  pub(crate) score: Option<i32>,
  pub(crate) title: Option<String>,
  pub(crate) url: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct StoryTitle {
  pub(crate) external_id: i64,
  pub(crate) title: Option<String>,
}

impl From<&Story> for StoryTitle {
  fn from(story: &Story) -> Self {
    Self {
      external_id: story.external_id,
      title: story.title.clone(),
    }
  }
}
