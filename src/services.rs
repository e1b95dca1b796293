use async_trait::async_trait;

use crate::error::ServiceError;
use crate::types::{ChatReply, ChatRequest, EmailMessage, Query, QueryKey};

#[async_trait]
pub trait AnswerBackend: Send + Sync {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatReply, ServiceError>;
}

#[async_trait]
pub trait QueryLogStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Query>, ServiceError>;

    /// Removes the query with this identity. Expected to be idempotent.
    async fn delete(&self, key: &QueryKey) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), ServiceError>;
}
