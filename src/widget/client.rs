use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client as HttpClient;
use thiserror::Error;
use crate::models::wire::{ AskRequest, AskResponse };
use super::WidgetConfig;

/// Header carrying the anti-forgery token on outbound questions.
pub const NONCE_HEADER: &str = "X-LCW-Nonce";

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response body is null")]
    EmptyBody,
}

/// Sends one question to the question-answering backend.
#[async_trait]
pub trait AskClient: Send + Sync {
    async fn ask(
        &self,
        config: &WidgetConfig,
        request: &AskRequest
    ) -> Result<AskResponse, WidgetError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpAskClient {
    http: HttpClient,
}

impl HttpAskClient {
    pub fn new() -> Self {
        Self { http: HttpClient::new() }
    }

    pub fn with_client(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AskClient for HttpAskClient {
    async fn ask(
        &self,
        config: &WidgetConfig,
        request: &AskRequest
    ) -> Result<AskResponse, WidgetError> {
        let mut req = self.http
            .post(&config.endpoint_url)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(request)?);

        if !config.csrf_token.is_empty() {
            req = req.header(NONCE_HEADER, &config.csrf_token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(WidgetError::Status(status));
        }

        let body = resp.text().await?;
        debug!("Backend replied with {} bytes", body.len());
        AskResponse::from_body(&body)
    }
}
