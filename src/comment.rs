use super::*;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Comment {
  pub(crate) author: Option<String>,
  pub(crate) date: Option<DateTime<Utc>>,
  pub(crate) dead: bool,
  pub(crate) external_id: i64,
  pub(crate) kids: Vec<i64>,
  pub(crate) parent_external_id: i64,
  pub(crate) text: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Traversed {
  pub(crate) comment: Comment,
  pub(crate) depth: u32,
}
