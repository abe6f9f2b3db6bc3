//! Client for the 8tracks mix service.
//!
//! Every call is a GET returning a JSON document whose `status` field must
//! read `"200 OK"`; anything else counts as a failure of that call.

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Url, header::ACCEPT};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::constants::constants;
use crate::model::{Mix, Track, decode_mix, decode_mix_list, decode_track};

const STATUS_OK: &str = "200 OK";

/// Cheap to clone; clones share the connection pool and play token.
#[derive(Clone)]
pub struct MixClient {
  http: Client,
  base: Url,
  api_key: String,
  /// Obtained on first use, then kept for the whole process.
  play_token: Arc<OnceCell<String>>,
}

impl MixClient {
  pub fn new(base: &str, api_key: &str) -> Result<Self> {
    let base = Url::parse(base).with_context(|| format!("Invalid API URL: {}", base))?;
    if base.cannot_be_a_base() {
      return Err(anyhow!("API URL cannot take a path: {}", base));
    }
    let http = Client::builder()
      .user_agent(constants().user_agent.as_str())
      .timeout(Duration::from_secs(constants().request_timeout_secs))
      .build()
      .context("Failed to build HTTP client")?;
    Ok(Self { http, base, api_key: api_key.to_string(), play_token: Arc::new(OnceCell::new()) })
  }

  fn endpoint(&self, segments: &[&str], params: &[(&str, &str)]) -> Url {
    let mut url = self.base.clone();
    // Checked in `new`.
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    if !params.is_empty() {
      url.query_pairs_mut().extend_pairs(params);
    }
    url
  }

  /// GET `url` and return the document if the service says it succeeded.
  async fn fetch(&self, url: Url) -> Result<Value> {
    debug!(url = %url, "api: GET");
    let response = self
      .http
      .get(url.clone())
      .header("X-Api-Key", &self.api_key)
      .header("X-Api-Version", &constants().api_version)
      .header(ACCEPT, "application/json")
      .send()
      .await
      .with_context(|| format!("Request to {} failed", url))?;

    let doc: Value = response.json().await.with_context(|| format!("Invalid JSON from {}", url))?;
    match doc.get("status").and_then(Value::as_str) {
      Some(STATUS_OK) => Ok(doc),
      Some(status) => Err(anyhow!("Mix service answered '{}' for {}", status, url)),
      None => Err(anyhow!("Mix service response without status for {}", url)),
    }
  }

  pub async fn play_token(&self) -> Result<String> {
    let token = self
      .play_token
      .get_or_try_init(|| async {
        let doc = self.fetch(self.endpoint(&["sets", "new"], &[])).await?;
        let token = doc.get("play_token").and_then(Value::as_str).context("Response has no play_token")?;
        debug!("api: obtained play token");
        Ok::<_, anyhow::Error>(token.to_string())
      })
      .await?;
    Ok(token.clone())
  }

  /// Mixes matching a smart id, one entry per listed mix.
  pub async fn search(&self, smart_id: &str) -> Result<Vec<Option<Mix>>> {
    let url = self.endpoint(&["mix_sets", smart_id], &[("include", &constants().mix_include)]);
    let doc = self.fetch(url).await?;
    let mixes = doc
      .get("mix_set")
      .context("Response has no mix_set")?
      .get("mixes")
      .and_then(Value::as_array)
      .context("mix_set.mixes is not a list")?;
    Ok(decode_mix_list(mixes))
  }

  /// First track of a mix (`first`) or the one after the current.
  pub async fn next_track(&self, mix_id: u64, first: bool) -> Result<Track> {
    let token = self.play_token().await?;
    let action = if first { "play" } else { "next" };
    let url = self.endpoint(&["sets", &token, action], &[("mix_id", &mix_id.to_string())]);
    let doc = self.fetch(url).await?;
    decode_track(doc.get("set").context("Response has no set")?)
  }

  /// A mix similar to `mix_id`, drawn from the same smart id.
  pub async fn next_mix(&self, mix_id: u64, smart_id: &str) -> Result<Mix> {
    let token = self.play_token().await?;
    let url = self.endpoint(
      &["sets", &token, "next_mix"],
      &[("mix_id", &mix_id.to_string()), ("include", &constants().mix_include), ("smart_id", smart_id)],
    );
    let doc = self.fetch(url).await?;
    decode_mix(doc.get("next_mix").context("Response has no next_mix")?)
  }

  /// Tell the service a track has been listened to.
  pub async fn report(&self, track_id: u64, mix_id: u64) -> Result<()> {
    let token = self.play_token().await?;
    let url = self.endpoint(
      &["sets", &token, "report"],
      &[("track_id", &track_id.to_string()), ("mix_id", &mix_id.to_string())],
    );
    self.fetch(url).await?;
    Ok(())
  }
}
