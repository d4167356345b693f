//! Access to the racing authority's JSON feed: meetings, race programs, probable odds and results.
//!
//! Transport is a seam ([Transport]); [HttpTransport] talks to the live feed and tests substitute
//! an in-memory one. [RaceFeed] knows the paths and decodes payloads tolerantly, distinguishing
//! between a malformed payload, data that has not been published yet and a network failure.

use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, bail};
use chrono::NaiveDate;
use reqwest::{StatusCode, Url};
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::{BetType, Meeting, OddsPayload, RaceProgram, RaceResult, DOMESTIC_CUTOFF};
use crate::decode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Meetings with a numeric code at or above the cutoff are excluded from the race list.
    pub domestic_cutoff: u32,
}
impl FeedConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let url = Url::parse(&self.base_url)
            .map_err(|err| anyhow!("invalid base URL '{}': {err}", self.base_url))?;
        if url.cannot_be_a_base() {
            bail!("base URL '{}' cannot have paths appended", self.base_url);
        }
        if self.timeout_secs == 0 {
            bail!("timeout must be at least one second");
        }
        Ok(())
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ebayi.tjk.org/s/d/".into(),
            timeout_secs: 30,
            user_agent: concat!("hipodrom/", env!("CARGO_PKG_VERSION")).into(),
            domestic_cutoff: DOMESTIC_CUTOFF,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("malformed payload at {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("nothing published at {path}")]
    NotFound { path: String },

    #[error("failed to fetch {path}: {reason}")]
    Network { path: String, reason: String },
}
impl FeedError {
    fn malformed(path: &str, reason: impl ToString) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    fn network(path: &str, reason: impl ToString) -> Self {
        Self::Network {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::Network { .. })
    }

    /// What to tell the user. None of these end the session.
    pub fn user_message(&self) -> &'static str {
        match self {
            FeedError::Malformed { .. } => "The data could not be read.",
            FeedError::NotFound { .. } => "Not published yet.",
            FeedError::Network { .. } => "Connection problem. Please try again.",
        }
    }
}

pub trait FeedResultExt<T> {
    /// Substitutes an empty value for a malformed payload. Other failures pass through.
    fn or_empty(self) -> Result<T, FeedError>;
}

impl<T: Default> FeedResultExt<T> for Result<T, FeedError> {
    fn or_empty(self) -> Result<T, FeedError> {
        match self {
            Err(err @ FeedError::Malformed { .. }) => {
                warn!("{err}; substituting an empty value");
                Ok(T::default())
            }
            other => other,
        }
    }
}

/// Fetches a raw payload by its path relative to the feed root.
pub trait Transport {
    fn get(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, FeedError>> + Send;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}
impl HttpTransport {
    pub fn new(config: &FeedConfig) -> Result<Self, anyhow::Error> {
        config.validate()?;
        let mut base_url = Url::parse(&config.base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client, base_url })
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, FeedError>> + Send {
        let url = self.base_url.join(path);
        let client = self.client.clone();
        let path = path.to_owned();
        async move {
            let url = url.map_err(|err| FeedError::network(&path, err))?;
            debug!("GET {url}");
            let response = client
                .get(url)
                .send()
                .await
                .map_err(|err| FeedError::network(&path, err))?;
            match response.status() {
                StatusCode::NOT_FOUND => Err(FeedError::NotFound { path }),
                status if !status.is_success() => Err(FeedError::network(&path, status)),
                _ => {
                    let bytes = response
                        .bytes()
                        .await
                        .map_err(|err| FeedError::network(&path, err))?;
                    Ok(bytes.to_vec())
                }
            }
        }
    }
}

pub fn meetings_path(date: NaiveDate) -> String {
    format!("program/{}/meetings.json", date_segment(date))
}

pub fn program_path(date: NaiveDate, city: &str) -> String {
    format!("program/{}/{city}.json", date_segment(date))
}

pub fn checksum_path(date: NaiveDate) -> String {
    format!("muhtemeller/{}/checksum.json", date_segment(date))
}

pub fn odds_path(date: NaiveDate, race_key: &str, content_hash: &str) -> String {
    format!("muhtemeller/{}/{race_key}/{content_hash}.json", date_segment(date))
}

pub fn results_path(date: NaiveDate, city: &str) -> String {
    format!("sonuclar/{}/{city}.json", date_segment(date))
}

fn date_segment(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub struct RaceFeed<T: Transport> {
    transport: T,
    domestic_cutoff: u32,
}
impl<T: Transport> RaceFeed<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            domestic_cutoff: DOMESTIC_CUTOFF,
        }
    }

    pub fn with_domestic_cutoff(mut self, cutoff: u32) -> Self {
        self.domestic_cutoff = cutoff;
        self
    }

    async fn fetch<D: DeserializeOwned>(&self, path: &str) -> Result<D, FeedError> {
        debug!("fetching {path}");
        let bytes = self.transport.get(path).await?;
        serde_json::from_slice(&bytes).map_err(|err| FeedError::malformed(path, err))
    }

    /// Cities racing on `date`, in feed order, without duplicates.
    pub async fn fetch_race_list(&self, date: NaiveDate) -> Result<Vec<String>, FeedError> {
        let path = meetings_path(date);
        let value: Value = self.fetch(&path).await?;
        if !value.is_array() {
            return Err(FeedError::malformed(&path, "expected a list of meetings"));
        }
        let meetings: Vec<Meeting> =
            decode::lenient_vec(value).map_err(|err| FeedError::malformed(&path, err))?;
        let mut cities: Vec<String> = Vec::with_capacity(meetings.len());
        for meeting in meetings {
            if meeting.is_domestic(self.domestic_cutoff) && !cities.contains(&meeting.city) {
                cities.push(meeting.city);
            }
        }
        Ok(cities)
    }

    pub async fn fetch_program(
        &self,
        date: NaiveDate,
        city: &str,
    ) -> Result<RaceProgram, FeedError> {
        let program: RaceProgram = self.fetch(&program_path(date, city)).await?;
        debug!(
            "{city}: {} races, weather: {}",
            program.races.len(),
            program.weather.is_some()
        );
        Ok(program)
    }

    /// Content hashes of the current odds payloads, keyed by race.
    pub async fn fetch_odds_checksum(
        &self,
        date: NaiveDate,
    ) -> Result<FxHashMap<String, Vec<String>>, FeedError> {
        let path = checksum_path(date);
        let value: Value = self.fetch(&path).await?;
        let Value::Object(entries) = value else {
            return Err(FeedError::malformed(&path, "expected a map of race keys"));
        };
        Ok(entries
            .into_iter()
            .map(|(race_key, hashes)| {
                let hashes = match hashes {
                    Value::Array(items) => items.into_iter().filter_map(scalar_string).collect(),
                    other => scalar_string(other).into_iter().collect(),
                };
                (race_key, hashes)
            })
            .collect())
    }

    pub async fn fetch_odds_payload(
        &self,
        date: NaiveDate,
        race_key: &str,
        content_hash: &str,
    ) -> Result<OddsPayload, FeedError> {
        self.fetch(&odds_path(date, race_key, content_hash)).await
    }

    /// Resolves the race's current content hash and fetches its bet types.
    pub async fn fetch_odds(
        &self,
        date: NaiveDate,
        race_key: &str,
    ) -> Result<Vec<BetType>, FeedError> {
        let checksums = self.fetch_odds_checksum(date).await?;
        let content_hash = checksums
            .get(race_key)
            .and_then(|hashes| hashes.first())
            .ok_or_else(|| FeedError::NotFound {
                path: format!("{}#{race_key}", checksum_path(date)),
            })?;
        let payload = self.fetch_odds_payload(date, race_key, content_hash).await?;
        Ok(payload.into_bet_types())
    }

    pub async fn fetch_result(
        &self,
        date: NaiveDate,
        city: &str,
        race_code: &str,
    ) -> Result<RaceResult, FeedError> {
        let path = results_path(date, city);
        let value: Value = self.fetch(&path).await?;
        if !value.is_array() {
            return Err(FeedError::malformed(&path, "expected a list of results"));
        }
        let results: Vec<RaceResult> =
            decode::lenient_vec(value).map_err(|err| FeedError::malformed(&path, err))?;
        results
            .into_iter()
            .find(|result| result.code == race_code)
            .ok_or_else(|| FeedError::NotFound {
                path: format!("{path}#{race_code}"),
            })
    }
}

fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
