use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate};
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

use super::api_types::{AnnotationPatch, ApiQuoteDoc, ApiQuoteEntry};
use super::error::RemoteError;
use crate::config::Config;
use crate::record::{date_id, Emotion, QuoteRecord, Topic};

/// Typed accessor over the remote document store keyed by calendar date.
///
/// Implementations hold no cache; staleness and merging live above this
/// seam, so tests can swap in an in-memory store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
  /// Text for `topic` from the record keyed by `day`.
  ///
  /// `RecordMissing` means the generation job has not produced the day yet;
  /// `FieldMissing` means the record exists without the topic's field. The
  /// resolver converts both into placeholder strings.
  async fn fetch_day(&self, day: NaiveDate, topic: Topic) -> Result<String, RemoteError>;

  /// All records, sorted by date descending, with `text` resolved for
  /// `topic` and the remote's annotation copies dropped.
  async fn fetch_all(&self, topic: Topic) -> Result<Vec<QuoteRecord>, RemoteError>;

  /// Partial update of exactly the two annotation fields; never a
  /// full-document overwrite. Keeps the remote copy in sync for cross-device
  /// continuity even though annotations are locally owned.
  async fn update_annotations(
    &self,
    id: &str,
    memo: Option<&str>,
    emotion: Option<Emotion>,
  ) -> Result<(), RemoteError>;
}

/// Remote store client over HTTP.
#[derive(Clone)]
pub struct HttpRemoteStore {
  http: reqwest::Client,
  base: Url,
  token: Option<String>,
  tz: FixedOffset,
}

impl HttpRemoteStore {
  pub fn new(config: &Config) -> Result<Self> {
    let base = Url::parse(&config.remote.url)
      .map_err(|e| eyre!("Invalid remote url {}: {}", config.remote.url, e))?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.remote.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      token: Config::api_token(),
      tz: config.reference_zone()?,
    })
  }

  /// `{base}/quotes` or `{base}/quotes/{id}`.
  fn endpoint(&self, id: Option<&str>) -> Result<Url, RemoteError> {
    let mut url = self.base.clone();
    {
      let mut path = url
        .path_segments_mut()
        .map_err(|_| RemoteError::Transport("remote url cannot be a base".into()))?;
      path.pop_if_empty().push("quotes");
      if let Some(id) = id {
        path.push(id);
      }
    }
    Ok(url)
  }

  fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
  async fn fetch_day(&self, day: NaiveDate, topic: Topic) -> Result<String, RemoteError> {
    let id = date_id(day);
    let url = self.endpoint(Some(&id))?;

    let resp = self
      .authorize(self.http.get(url))
      .send()
      .await
      .map_err(RemoteError::from_reqwest)?;

    if resp.status() == StatusCode::NOT_FOUND {
      return Err(RemoteError::RecordMissing { day: id });
    }
    if !resp.status().is_success() {
      return Err(RemoteError::Status(resp.status().as_u16()));
    }

    let doc: ApiQuoteDoc = resp
      .json()
      .await
      .map_err(|e| RemoteError::Decode(e.to_string()))?;

    doc
      .text_for(topic)
      .map(str::to_string)
      .ok_or(RemoteError::FieldMissing { day: id, topic })
  }

  async fn fetch_all(&self, topic: Topic) -> Result<Vec<QuoteRecord>, RemoteError> {
    let url = self.endpoint(None)?;

    let resp = self
      .authorize(self.http.get(url))
      .send()
      .await
      .map_err(RemoteError::from_reqwest)?;

    if !resp.status().is_success() {
      return Err(RemoteError::Status(resp.status().as_u16()));
    }

    let entries: Vec<ApiQuoteEntry> = resp
      .json()
      .await
      .map_err(|e| RemoteError::Decode(e.to_string()))?;

    let mut records: Vec<QuoteRecord> = entries
      .into_iter()
      .filter_map(|entry| {
        // Entries with neither a date-shaped key nor a timestamp cannot be
        // placed on the calendar; skip them.
        let day = entry.day(self.tz)?;
        Some(entry.doc.into_record(topic, day))
      })
      .collect();

    records.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(records)
  }

  async fn update_annotations(
    &self,
    id: &str,
    memo: Option<&str>,
    emotion: Option<Emotion>,
  ) -> Result<(), RemoteError> {
    let url = self.endpoint(Some(id))?;
    let patch = AnnotationPatch { memo, emotion };

    let resp = self
      .authorize(self.http.patch(url))
      .json(&patch)
      .send()
      .await
      .map_err(RemoteError::from_reqwest)?;

    if resp.status() == StatusCode::NOT_FOUND {
      return Err(RemoteError::RecordMissing {
        day: id.to_string(),
      });
    }
    if !resp.status().is_success() {
      return Err(RemoteError::Status(resp.status().as_u16()));
    }

    Ok(())
  }
}
