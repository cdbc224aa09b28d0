#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Client for the ABC Emergency `emergencySearch` API.
//!
//! The [`EmergencyFeed`] trait is the seam between incident processing and
//! the network: the coordinator only ever talks to the trait, so tests can
//! substitute canned responses. Retry and backoff are left to the caller's
//! poll schedule; a failed request simply fails that poll.

use std::time::Duration;

use async_trait::async_trait;
use emergency_watch_feed_models::FeedResponse;
use emergency_watch_incident_models::AustralianState;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://www.abc.net.au/emergency-web/api";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("emergency-watch/", env!("CARGO_PKG_VERSION"), " (ABCEmergency)");

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Errors that can occur while fetching the feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The server could not be reached or the request timed out.
    #[error("Connection to emergency feed failed: {0}")]
    Connection(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Emergency feed returned HTTP {status} for {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The body was received but is not a valid feed response.
    #[error("Failed to decode emergency feed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request URL could not be built.
    #[error("Invalid feed request: {message}")]
    Request {
        /// Description of what went wrong.
        message: String,
    },
}

impl FeedError {
    /// Returns `true` for transport-level failures (unreachable, timeout).
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Every incident in one state or territory.
    State(AustralianState),
    /// Incidents in a set of geohash tiles.
    Geohashes(Vec<String>),
}

/// A source of emergency incident data.
#[async_trait]
pub trait EmergencyFeed: Send + Sync {
    /// Fetches the incidents matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the request fails, the server returns a
    /// non-success status, or the body cannot be decoded.
    async fn search(&self, query: &SearchQuery) -> Result<FeedResponse, FeedError>;

    /// Fetches every incident in `state`.
    ///
    /// # Errors
    ///
    /// See [`Self::search`].
    async fn emergencies_by_state(
        &self,
        state: AustralianState,
    ) -> Result<FeedResponse, FeedError> {
        self.search(&SearchQuery::State(state)).await
    }

    /// Fetches incidents in the given geohash tiles.
    ///
    /// # Errors
    ///
    /// See [`Self::search`].
    async fn emergencies_by_geohash(
        &self,
        geohashes: &[String],
    ) -> Result<FeedResponse, FeedError> {
        self.search(&SearchQuery::Geohashes(geohashes.to_vec()))
            .await
    }
}

/// HTTP implementation of [`EmergencyFeed`].
#[derive(Debug, Clone)]
pub struct AbcEmergencyClient {
    client: reqwest::Client,
    base_url: String,
}

impl AbcEmergencyClient {
    /// Creates a client rooted at `base_url`. A trailing slash is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Connection`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds the request URL for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Request`] if the base URL is not a valid URL.
    pub fn search_url(&self, query: &SearchQuery) -> Result<reqwest::Url, FeedError> {
        let endpoint = format!("{}/emergencySearch", self.base_url);

        let param = match query {
            SearchQuery::State(state) => ("state", state.as_ref().to_string()),
            SearchQuery::Geohashes(geohashes) => ("geohashes", serde_json::to_string(geohashes)?),
        };

        reqwest::Url::parse_with_params(&endpoint, [param]).map_err(|e| FeedError::Request {
            message: format!("{endpoint}: {e}"),
        })
    }
}

#[async_trait]
impl EmergencyFeed for AbcEmergencyClient {
    async fn search(&self, query: &SearchQuery) -> Result<FeedResponse, FeedError> {
        let url = self.search_url(query)?;
        log::debug!("Fetching {url}");

        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        decode_response(&text).inspect_err(|e| {
            let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
            log::debug!("Undecodable body from {url}: {e}\n  preview: {preview}");
        })
    }
}

/// Decodes a raw `emergencySearch` body.
///
/// # Errors
///
/// Returns [`FeedError::Decode`] if `body` is not a valid response.
pub fn decode_response(body: &str) -> Result<FeedResponse, FeedError> {
    Ok(serde_json::from_str(body)?)
}
