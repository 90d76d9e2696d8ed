use super::*;

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Item {
  pub(crate) by: Option<String>,
  pub(crate) dead: Option<bool>,
  pub(crate) descendants: Option<i32>,
  pub(crate) id: i64,
  #[serde(default)]
  pub(crate) kids: Vec<i64>,
  pub(crate) parent: Option<i64>,
  pub(crate) score: Option<i32>,
  pub(crate) text: Option<String>,
  #[serde(default, with = "chrono::serde::ts_seconds_option")]
  pub(crate) time: Option<DateTime<Utc>>,
  pub(crate) title: Option<String>,
  pub(crate) r#type: Option<String>,
  pub(crate) url: Option<String>,
}
