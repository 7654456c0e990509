use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::PipelineError;
use crate::models::{AdviceResponse, ChatRequest, ReportRequest};

/// The remote text-generation endpoints.
#[async_trait]
pub trait AdviceClient: Send + Sync {
    async fn report(&self, request: &ReportRequest) -> Result<AdviceResponse, PipelineError>;
    async fn chat(&self, request: &ChatRequest) -> Result<AdviceResponse, PipelineError>;
}

/// Upper bound on one advice round trip; shutdown waits for in-flight
/// requests, so none may hang forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// `POST /report` and `POST /chat` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAdviceClient {
    http: reqwest::Client,
    report_url: String,
    chat_url: String,
}

impl HttpAdviceClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            report_url: config.endpoint("/report"),
            chat_url: config.endpoint("/chat"),
        })
    }

    async fn post<T: Serialize + Sync>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<AdviceResponse, PipelineError> {
        debug!("POST {url}");

        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| PipelineError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Status(status.as_u16()));
        }

        response
            .json::<AdviceResponse>()
            .await
            .map_err(|err| PipelineError::Decode(err.to_string()))
    }
}

#[async_trait]
impl AdviceClient for HttpAdviceClient {
    async fn report(&self, request: &ReportRequest) -> Result<AdviceResponse, PipelineError> {
        self.post(&self.report_url, request).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<AdviceResponse, PipelineError> {
        self.post(&self.chat_url, request).await
    }
}
