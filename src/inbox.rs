use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

use crate::error::SendRejection;
use crate::services::{EmailDispatcher, QueryLogStore};
use crate::types::{EmailMessage, Notice, Query, QueryKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Replaced { count: usize },
    Kept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Retired { remote_deleted: bool },
    Rejected(SendRejection),
    DeliveryFailed(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissOutcome {
    Dismissed,
    Reconciled { notice: Notice, reload: LoadOutcome },
    SendInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InboxStats {
    pub total: usize,
    pub pending: usize,
    pub unique_askers: usize,
}

#[derive(Debug)]
struct InboxState {
    queries: Vec<Query>,
    drafts: HashMap<String, String>,
    in_flight: HashSet<QueryKey>,
    unreconciled: HashSet<QueryKey>,
    // Removed locally, store delete not yet answered.
    deleting: HashSet<QueryKey>,
    // Removed locally while at least one load was outstanding.
    removed_during_load: HashSet<QueryKey>,
    loads_in_flight: usize,
    loading: bool,
}

impl InboxState {
    fn remove_locally(&mut self, key: &QueryKey) {
        self.queries.retain(|q| !q.matches(key));
        self.deleting.insert(key.clone());
        if self.loads_in_flight > 0 {
            self.removed_during_load.insert(key.clone());
        }
    }
}

pub struct QueryInbox {
    store: Arc<dyn QueryLogStore>,
    mailer: Arc<dyn EmailDispatcher>,
    state: Mutex<InboxState>,
}

impl QueryInbox {
    pub fn new(store: Arc<dyn QueryLogStore>, mailer: Arc<dyn EmailDispatcher>) -> Self {
        Self {
            store,
            mailer,
            state: Mutex::new(InboxState {
                queries: Vec::new(),
                drafts: HashMap::new(),
                in_flight: HashSet::new(),
                unreconciled: HashSet::new(),
                deleting: HashSet::new(),
                removed_during_load: HashSet::new(),
                loads_in_flight: 0,
                loading: true,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, InboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn load_queries(&self) -> LoadOutcome {
        {
            let mut state = self.state();
            state.loading = true;
            state.loads_in_flight += 1;
        }
        let result = self.store.list().await;

        let mut state = self.state();
        state.loads_in_flight -= 1;
        state.loading = state.loads_in_flight > 0;
        let outcome = match result {
            Ok(mut queries) => {
                let state = &mut *state;
                queries.retain(|q| {
                    let key = q.key();
                    !state.deleting.contains(&key) && !state.removed_during_load.contains(&key)
                });
                let count = queries.len();
                state.queries = queries;
                let skipped = &state.removed_during_load;
                state.unreconciled.retain(|key| skipped.contains(key));
                info!(count, "inbox: loaded pending queries");
                LoadOutcome::Replaced { count }
            }
            Err(err) => {
                warn!(error = %err, "inbox: failed to load pending queries");
                LoadOutcome::Kept
            }
        };
        if state.loads_in_flight == 0 {
            state.removed_during_load.clear();
        }
        outcome
    }

    pub fn set_draft(&self, email: &str, text: impl Into<String>) {
        self.state().drafts.insert(email.to_string(), text.into());
    }

    /// Drafts are keyed by asker email, so every pending question from the same
    /// asker shares one draft.
    pub fn draft(&self, email: &str) -> String {
        self.state().drafts.get(email).cloned().unwrap_or_default()
    }

    pub fn can_send(&self, key: &QueryKey) -> bool {
        let state = self.state();
        let has_text = state
            .drafts
            .get(&key.email)
            .is_some_and(|draft| !draft.trim().is_empty());
        has_text && !state.in_flight.contains(key)
    }

    pub fn is_sending(&self, key: &QueryKey) -> bool {
        self.state().in_flight.contains(key)
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn queries(&self) -> Vec<Query> {
        self.state().queries.clone()
    }

    pub fn stats(&self) -> InboxStats {
        let state = self.state();
        let askers: HashSet<&str> = state.queries.iter().map(|q| q.email.as_str()).collect();
        let sending = state
            .queries
            .iter()
            .filter(|q| state.in_flight.contains(&q.key()))
            .count();
        InboxStats {
            total: state.queries.len(),
            pending: state.queries.len() - sending,
            unique_askers: askers.len(),
        }
    }

    pub fn pending_reconciliation(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self.state().unreconciled.iter().cloned().collect();
        keys.sort_by(|a, b| (&a.email, &a.question).cmp(&(&b.email, &b.question)));
        keys
    }

    /// Delivery must succeed before anything else changes. A failed store delete
    /// after that is recorded for the next load, not rolled back.
    pub async fn send(&self, key: &QueryKey) -> SendOutcome {
        let message = {
            let mut state = self.state();
            if state.in_flight.contains(key) {
                return SendOutcome::Rejected(SendRejection::AlreadySending);
            }
            if !state.queries.iter().any(|q| q.matches(key)) {
                return SendOutcome::Rejected(SendRejection::NotQueued);
            }
            let draft = state.drafts.get(&key.email).cloned().unwrap_or_default();
            if draft.trim().is_empty() {
                return SendOutcome::Rejected(SendRejection::EmptyDraft);
            }
            state.in_flight.insert(key.clone());
            EmailMessage {
                recipient: key.email.clone(),
                question: key.question.clone(),
                message: draft,
            }
        };

        if let Err(err) = self.mailer.deliver(&message).await {
            warn!(query = %key, error = %err, "inbox: delivery failed, query kept");
            self.state().in_flight.remove(key);
            return SendOutcome::DeliveryFailed(Notice::DeliveryFailed);
        }

        {
            let mut state = self.state();
            state.drafts.remove(&key.email);
            state.remove_locally(key);
        }

        let deleted = self.store.delete(key).await;

        let mut state = self.state();
        state.in_flight.remove(key);
        state.deleting.remove(key);
        match deleted {
            Ok(()) => {
                info!(query = %key, "inbox: answer sent, query retired");
                SendOutcome::Retired {
                    remote_deleted: true,
                }
            }
            Err(err) => {
                warn!(
                    query = %key,
                    error = %err,
                    "inbox: answer sent but store delete failed, reconcile on next load"
                );
                state.unreconciled.insert(key.clone());
                SendOutcome::Retired {
                    remote_deleted: false,
                }
            }
        }
    }

    /// Drops a query without answering it. Refused while a send for the same
    /// query is outstanding. A failed store delete triggers a full reload.
    pub async fn dismiss(&self, key: &QueryKey) -> DismissOutcome {
        {
            let mut state = self.state();
            if state.in_flight.contains(key) {
                return DismissOutcome::SendInFlight;
            }
            state.remove_locally(key);
        }

        let deleted = self.store.delete(key).await;
        self.state().deleting.remove(key);

        match deleted {
            Ok(()) => {
                info!(query = %key, "inbox: query dismissed");
                DismissOutcome::Dismissed
            }
            Err(err) => {
                warn!(query = %key, error = %err, "inbox: dismiss delete failed, reloading");
                self.state().unreconciled.insert(key.clone());
                let reload = self.load_queries().await;
                DismissOutcome::Reconciled {
                    notice: Notice::DismissFailed,
                    reload,
                }
            }
        }
    }
}
