use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use quiz_core::model::{Question, Tier};

use super::{
    AnswerResponse, BatchResponse, CompleteRequest, CompletionSummary, QuizApi,
    SessionCredentials, StartRequest, StartResponse, SubmitRequest,
};
use crate::error::{ApiError, ConfigError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct ApiConfig {
    base_url: String,
    timeout: Duration,
}

impl ApiConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` if `base_url` does not parse.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = base_url.into();
        Url::parse(&raw).map_err(|source| ConfigError::InvalidBaseUrl {
            raw: raw.clone(),
            source,
        })?;
        Ok(Self {
            base_url: raw.trim_end_matches('/').to_owned(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `QUIZ_API_BASE_URL` and `QUIZ_API_TIMEOUT_SECS`.
    ///
    /// Returns `None` when the base url is unset, blank, or invalid.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("QUIZ_API_BASE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let config = Self::new(base_url.trim()).ok()?;
        let timeout = env::var("QUIZ_API_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);
        Some(config.with_timeout(timeout))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// `QuizApi` over HTTP with JSON bodies and bearer auth.
#[derive(Clone)]
pub struct HttpQuizApi {
    client: Client,
    config: ApiConfig,
}

impl HttpQuizApi {
    /// # Errors
    ///
    /// Returns `ConfigError::Client` if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }

    fn session_endpoint(&self, credentials: &SessionCredentials, path: &str) -> String {
        self.endpoint(&format!("sessions/{}/{path}", credentials.session_id))
    }
}

fn tier_query(tier: Tier) -> (&'static str, u8) {
    match tier {
        Tier::Level(level) => ("level", level.value()),
        Tier::Stage(stage) => ("stage", stage.value()),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Err(ApiError::SessionExpired),
        status if !status.is_success() => Err(ApiError::HttpStatus(status)),
        _ => Ok(response.json().await?),
    }
}

#[async_trait]
impl QuizApi for HttpQuizApi {
    async fn start_session(&self, access_code: &str) -> Result<StartResponse, ApiError> {
        let payload = StartRequest {
            access_code: access_code.to_owned(),
        };
        let response = self
            .client
            .post(self.endpoint("sessions"))
            .json(&payload)
            .send()
            .await?;
        read_json(response).await
    }

    async fn submit_answer(
        &self,
        credentials: &SessionCredentials,
        request: &SubmitRequest,
    ) -> Result<AnswerResponse, ApiError> {
        let response = self
            .client
            .post(self.session_endpoint(credentials, "answers"))
            .bearer_auth(&credentials.access_token)
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }

    async fn fetch_batch(
        &self,
        credentials: &SessionCredentials,
        tier: Tier,
    ) -> Result<Vec<Question>, ApiError> {
        let (key, value) = tier_query(tier);
        debug!(%tier, "fetching question batch");
        let response = self
            .client
            .get(self.session_endpoint(credentials, "questions"))
            .bearer_auth(&credentials.access_token)
            .query(&[(key, value)])
            .send()
            .await?;
        let body: BatchResponse = read_json(response).await?;
        Ok(body.questions)
    }

    async fn complete_session(
        &self,
        credentials: &SessionCredentials,
        request: &CompleteRequest,
    ) -> Result<CompletionSummary, ApiError> {
        let response = self
            .client
            .post(self.session_endpoint(credentials, "complete"))
            .bearer_auth(&credentials.access_token)
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }
}
