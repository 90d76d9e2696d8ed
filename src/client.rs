use super::*;

pub(crate) trait ItemSource: Clone + Send + Sync + 'static {
  fn fetch(&self, id: i64) -> impl Future<Output = Result<Item, Error>> + Send;
}

#[derive(Clone, Debug)]
pub(crate) struct Client {
  base_url: String,
  client: reqwest::Client,
}

impl Client {
  pub(crate) const DEFAULT_BASE_URL: &str =
    "https://hacker-news.firebaseio.com/v0";

  fn item_url(&self, id: i64) -> String {
    format!("{}/item/{id}.json", self.base_url.trim_end_matches('/'))
  }

  pub(crate) fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
    Ok(Self {
      base_url: base_url.to_string(),
      client: reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(Error::Client)?,
    })
  }
}

impl ItemSource for Client {
  async fn fetch(&self, id: i64) -> Result<Item, Error> {
    debug!(id, "retrieving item");

    self
      .client
      .get(self.item_url(id))
      .send()
      .await
      .and_then(reqwest::Response::error_for_status)
      .map_err(|source| Error::Fetch { id, source })?
      .json::<Option<Item>>()
      .await
      .map_err(|source| Error::Fetch { id, source })?
      .ok_or(Error::MissingItem { id })
  }
}
