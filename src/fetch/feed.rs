use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Url};
use serde::Serialize;
use tracing::debug;

use super::basic::BasicClient;
use super::client::HttpClient;
use crate::config::PollerConfig;
use crate::error::FeedError;
use crate::parser::{ParsedBatch, parse_flights};
use crate::types::Direction;
use crate::window::DayWindow;

/// Source of today's flights for one direction.
#[async_trait]
pub trait FlightFeed: Send + Sync {
    async fn fetch(&self, direction: Direction, window: DayWindow) -> Result<ParsedBatch, FeedError>;
}

/// Body of a FIDS request.
#[derive(Debug, Serialize)]
struct FeedRequest {
    limit: u32,
    #[serde(flatten)]
    window: DayWindow,
}

/// [`FlightFeed`] backed by the airport's FIDS web service.
pub struct HttpFeed<C> {
    client: C,
    departures_url: Url,
    arrivals_url: Url,
    record_limit: u32,
}

impl HttpFeed<BasicClient> {
    pub fn from_config(config: &PollerConfig) -> anyhow::Result<Self> {
        let client = BasicClient::new(config.request_timeout, config.connect_timeout)
            .context("Failed to build HTTP client")?;
        Self::new(client, &config.base_url, config.record_limit)
    }
}

impl<C: HttpClient> HttpFeed<C> {
    pub fn new(client: C, base_url: &str, record_limit: u32) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            departures_url: endpoint(base_url, Direction::Departures)?,
            arrivals_url: endpoint(base_url, Direction::Arrivals)?,
            record_limit,
        })
    }

    fn url(&self, direction: Direction) -> &Url {
        match direction {
            Direction::Departures => &self.departures_url,
            Direction::Arrivals => &self.arrivals_url,
        }
    }

    /// Builds the POST for `direction`, stamped with the current time so
    /// intermediate caches never serve a stale board.
    fn request(&self, direction: Direction, window: DayWindow) -> Result<Request, FeedError> {
        let mut url = self.url(direction).clone();
        url.query_pairs_mut()
            .append_pair("t", &Utc::now().timestamp_millis().to_string());

        let body = FeedRequest {
            limit: self.record_limit,
            window,
        };
        let payload =
            serde_json::to_vec(&body).map_err(|source| FeedError::Encode { direction, source })?;

        let mut req = Request::new(Method::POST, url);
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(payload.into());
        Ok(req)
    }
}

#[async_trait]
impl<C: HttpClient> FlightFeed for HttpFeed<C> {
    #[tracing::instrument(skip(self), fields(%direction))]
    async fn fetch(&self, direction: Direction, window: DayWindow) -> Result<ParsedBatch, FeedError> {
        let req = self.request(direction, window)?;
        debug!(url = %req.url(), "Requesting flights");

        let resp = self
            .client
            .execute(req)
            .await
            .map_err(|source| FeedError::Unavailable { direction, source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status { direction, status });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|source| FeedError::Unavailable { direction, source })?;
        debug!(bytes = bytes.len(), "Feed bytes received, parsing");

        parse_flights(&bytes, direction)
    }
}

/// `{base_url}/webservices/fids/{departures|arrivals}`
pub fn endpoint(base_url: &str, direction: Direction) -> anyhow::Result<Url> {
    let raw = format!(
        "{}/webservices/fids/{}",
        base_url.trim_end_matches('/'),
        direction.path()
    );
    Url::parse(&raw).with_context(|| format!("Invalid feed URL '{raw}'"))
}
