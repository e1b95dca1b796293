use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::backend::check_status;
use crate::config::EmailConfig;
use crate::error::ServiceError;
use crate::services::EmailDispatcher;
use crate::types::EmailMessage;

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: &'a EmailMessage,
}

#[derive(Debug, Clone)]
pub struct EmailJsDispatcher {
    client: reqwest::Client,
    cfg: EmailConfig,
}

impl EmailJsDispatcher {
    pub fn new(cfg: &EmailConfig) -> Result<Self, ServiceError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = cfg.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|source| ServiceError::Transport {
            endpoint: cfg.endpoint.clone(),
            source,
        })?;
        Ok(Self {
            client,
            cfg: cfg.clone(),
        })
    }
}

#[async_trait]
impl EmailDispatcher for EmailJsDispatcher {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        let endpoint = &self.cfg.endpoint;
        let request = SendRequest {
            service_id: &self.cfg.service_id,
            template_id: &self.cfg.template_id,
            user_id: &self.cfg.public_key,
            access_token: self.cfg.private_key.as_deref(),
            template_params: message,
        };
        debug!(endpoint = %endpoint, recipient = %message.recipient, "email: sending");
        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|source| ServiceError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        check_status(endpoint, response).await?;
        info!(recipient = %message.recipient, "email: delivered");
        Ok(())
    }
}
