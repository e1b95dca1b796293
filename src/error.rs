use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendRejection {
    #[error("the draft is empty")]
    EmptyDraft,
    #[error("a send for this query is already in flight")]
    AlreadySending,
    #[error("the query is not in the queue")]
    NotQueued,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty input")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0} requires a query number")]
    MissingIndex(&'static str),
    #[error("invalid query number: {0}")]
    InvalidIndex(String),
    #[error("draft requires text after the query number")]
    MissingText,
    #[error("no query #{0} in the current list")]
    NoSuchQuery(usize),
}
