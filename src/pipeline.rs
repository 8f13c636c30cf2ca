use crate::config::ValidatorConfig;
use crate::diagnostic::Diagnostic;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// What markup to fetch for validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRequest {
    /// An arbitrary page URL
    Url(String),
    /// A dev server on localhost
    Port(u16),
}

impl ValidationRequest {
    pub fn target_url(&self) -> String {
        match self {
            ValidationRequest::Url(url) => url.clone(),
            ValidationRequest::Port(port) => format!("http://localhost:{}", port),
        }
    }
}

/// The validator's JSON response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorReport {
    pub messages: Vec<Diagnostic>,
}

/// Successful pipeline outcome: the fetched markup and the validator findings
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub html: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Pipeline failure, tagged by the hop that failed
///
/// Callers across the messaging boundary only ever see the message string;
/// the tag exists for logging.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{0}")]
    Fetch(String),
    #[error("{0}")]
    Validator(String),
}

/// Outbound HTTP seam for the two pipeline hops
#[async_trait]
pub trait Transport: Send + Sync {
    /// Plain GET of the target page, no custom headers
    async fn get(&self, url: &str) -> anyhow::Result<String>;

    /// POST raw markup to the validator, returning the response body
    async fn post_html(&self, url: &str, user_agent: &str, body: &str) -> anyhow::Result<String>;
}

/// Production transport backed by reqwest with an explicit request timeout
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> anyhow::Result<String> {
        let response = self.client.get(url).send().await?;
        Ok(response.text().await?)
    }

    async fn post_html(&self, url: &str, user_agent: &str, body: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .header(USER_AGENT, user_agent)
            .body(body.to_string())
            .send()
            .await?;
        Ok(response.text().await?)
    }
}

/// Fetch-then-validate pipeline
///
/// Two sequential network hops: GET the target markup, then POST it to the
/// validator endpoint and parse the JSON report. A first-hop failure
/// short-circuits; the validator is never contacted.
pub struct Pipeline<T: Transport> {
    transport: T,
    endpoint: String,
    user_agent: String,
}

impl<T: Transport> Pipeline<T> {
    pub fn new(transport: T, config: &ValidatorConfig) -> Self {
        Self {
            transport,
            endpoint: config.endpoint.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    pub async fn validate(&self, request: &ValidationRequest) -> Result<Validated, PipelineError> {
        let target = request.target_url();
        debug!("Fetching markup from {}", target);
        let html = self
            .transport
            .get(&target)
            .await
            .map_err(|e| PipelineError::Fetch(e.to_string()))?;

        debug!("Submitting {} bytes to {}", html.len(), self.endpoint);
        let body = self
            .transport
            .post_html(&self.endpoint, &self.user_agent, &html)
            .await
            .map_err(|e| PipelineError::Validator(e.to_string()))?;

        let report: ValidatorReport =
            serde_json::from_str(&body).map_err(|e| PipelineError::Validator(e.to_string()))?;
        debug!("Validator returned {} findings", report.messages.len());

        Ok(Validated {
            html,
            diagnostics: report.messages,
        })
    }
}
