use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::error::ServiceError;
use crate::services::{AnswerBackend, EmailDispatcher, QueryLogStore};
use crate::types::{ChatReply, ChatRequest, EmailMessage, Query, QueryKey};

fn unavailable(endpoint: &str) -> ServiceError {
    ServiceError::Status {
        endpoint: endpoint.to_string(),
        status: 503,
        body: "unavailable".to_string(),
    }
}

pub fn query(email: &str, question: &str) -> Query {
    Query {
        email: email.to_string(),
        question: question.to_string(),
        score: None,
        timestamp: None,
        auto_logged: false,
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub logs: Mutex<Vec<Query>>,
    pub fail_list: AtomicBool,
    pub fail_delete: AtomicBool,
    pub deleted: Mutex<Vec<QueryKey>>,
    pub list_calls: Mutex<usize>,
    pub list_gate: Option<Arc<Notify>>,
}

impl FakeStore {
    pub fn with(logs: Vec<Query>) -> Arc<Self> {
        Arc::new(Self {
            logs: Mutex::new(logs),
            ..Self::default()
        })
    }

    pub fn gated(logs: Vec<Query>, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            logs: Mutex::new(logs),
            list_gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl QueryLogStore for FakeStore {
    async fn list(&self) -> Result<Vec<Query>, ServiceError> {
        *self.list_calls.lock().unwrap() += 1;
        // Snapshot first so a gated list returns what the store held when asked.
        let snapshot = self.logs.lock().unwrap().clone();
        if let Some(gate) = &self.list_gate {
            gate.notified().await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable("fake://logs"));
        }
        Ok(snapshot)
    }

    async fn delete(&self, key: &QueryKey) -> Result<(), ServiceError> {
        self.deleted.lock().unwrap().push(key.clone());
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(unavailable("fake://log"));
        }
        self.logs.lock().unwrap().retain(|q| !q.matches(key));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMailer {
    pub fail: AtomicBool,
    pub sent: Mutex<Vec<EmailMessage>>,
    pub gate: Option<Arc<Notify>>,
}

impl FakeMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailDispatcher for FakeMailer {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable("fake://email"));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub struct FakeBackend {
    pub answer: Option<String>,
    pub requests: Mutex<Vec<ChatRequest>>,
    pub gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    pub fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(answer.to_string()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated(answer: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(answer.to_string()),
            requests: Mutex::new(Vec::new()),
            gate: Some(gate),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerBackend for FakeBackend {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatReply, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.answer {
            Some(answer) => Ok(ChatReply {
                answer: answer.clone(),
                score: None,
                ticket_id: None,
            }),
            None => Err(unavailable("fake://chat")),
        }
    }
}
