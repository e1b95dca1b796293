use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::ServiceError;
use crate::services::{AnswerBackend, QueryLogStore};
use crate::types::{ChatReply, ChatRequest, LogsResponse, Query, QueryKey};

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(cfg: &BackendConfig) -> Result<Self, ServiceError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = cfg.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|source| ServiceError::Transport {
            endpoint: cfg.base_url.clone(),
            source,
        })?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let response = check_status(endpoint, response).await?;
        let body = response.text().await.map_err(|source| ServiceError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| ServiceError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl AnswerBackend for HttpBackend {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatReply, ServiceError> {
        let endpoint = self.endpoint("/chat");
        debug!(endpoint = %endpoint, "backend: asking question");
        let response = self
            .client
            .post(&endpoint)
            .json(request)
            .send()
            .await
            .map_err(|source| ServiceError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        Self::read_json(&endpoint, response).await
    }
}

#[async_trait]
impl QueryLogStore for HttpBackend {
    async fn list(&self) -> Result<Vec<Query>, ServiceError> {
        let endpoint = self.endpoint("/logs");
        debug!(endpoint = %endpoint, "backend: listing pending queries");
        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|source| ServiceError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        let logs: LogsResponse = Self::read_json(&endpoint, response).await?;
        Ok(logs.logs)
    }

    async fn delete(&self, key: &QueryKey) -> Result<(), ServiceError> {
        let endpoint = self.endpoint("/log");
        let url = Url::parse_with_params(
            &endpoint,
            [("email", key.email.as_str()), ("question", key.question.as_str())],
        )
        .map_err(|err| ServiceError::InvalidUrl {
            url: endpoint.clone(),
            reason: err.to_string(),
        })?;
        debug!(endpoint = %endpoint, email = %key.email, "backend: deleting query");
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|source| ServiceError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        check_status(&endpoint, response).await?;
        Ok(())
    }
}

pub(crate) async fn check_status(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}
