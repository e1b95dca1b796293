use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::config::ChatConfig;
use crate::services::AnswerBackend;
use crate::types::{ChatRequest, ChatTurn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ignored,
    Busy,
    Answered,
    FellBack,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AskerProfile {
    pub user_name: Option<String>,
    pub contact: Option<String>,
    pub priority: Option<String>,
}

impl AskerProfile {
    pub fn from_config(cfg: &ChatConfig) -> Self {
        Self {
            user_name: cfg.user_name.clone(),
            contact: cfg.contact.clone(),
            priority: cfg.priority.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct ChatState {
    turns: Vec<ChatTurn>,
    loading: bool,
}

pub struct ChatSession {
    backend: Arc<dyn AnswerBackend>,
    fallback: String,
    profile: AskerProfile,
    state: Mutex<ChatState>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn AnswerBackend>, fallback: impl Into<String>) -> Self {
        Self {
            backend,
            fallback: fallback.into(),
            profile: AskerProfile::default(),
            state: Mutex::new(ChatState::default()),
        }
    }

    pub fn with_profile(mut self, profile: AskerProfile) -> Self {
        self.profile = profile;
        self
    }

    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn transcript(&self) -> Vec<ChatTurn> {
        self.state().turns.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        {
            let mut state = self.state();
            if state.loading {
                return SubmitOutcome::Busy;
            }
            state.loading = true;
            state.turns.push(ChatTurn::user(text));
        }

        let request = ChatRequest {
            question: text.to_string(),
            user_name: self.profile.user_name.clone(),
            contact: self.profile.contact.clone(),
            priority: self.profile.priority.clone(),
        };
        let result = self.backend.ask(&request).await;

        let mut state = self.state();
        state.loading = false;
        match result {
            Ok(reply) => {
                debug!(score = ?reply.score, ticket = ?reply.ticket_id, "chat: answered");
                state.turns.push(ChatTurn::assistant(reply.answer));
                SubmitOutcome::Answered
            }
            Err(err) => {
                warn!(error = %err, "chat: backend failed, using fallback");
                state.turns.push(ChatTurn::assistant(self.fallback.clone()));
                SubmitOutcome::FellBack
            }
        }
    }
}
