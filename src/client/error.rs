use thiserror::Error;

/// Errors surfaced by [`SwipeClient`](super::SwipeClient) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("server answered with status {status}")]
    Status { status: u16 },

    #[error("server answered with a body the client couldn't read")]
    Malformed,

    /// The server already holds a swipe for this listing; `interested`
    /// is the stored direction, when the server reported it.
    #[error("listing was already swiped on")]
    AlreadySwiped { interested: Option<bool> },

    #[error("all {stages} endpoint stages failed, last error: {last}")]
    Exhausted {
        stages: usize,
        #[source]
        last: Box<ClientError>,
    },

    #[error("swipe update endpoint is not reachable on this server")]
    UpdateUnavailable,

    #[error("circuit breaker is open, not sending requests")]
    CircuitOpen,

    #[error("not logged in")]
    NotAuthenticated,
}

impl ClientError {
    /// Fatal errors carry a definite server verdict; falling back to
    /// another endpoint stage can't change the answer. 401 is not fatal:
    /// the token-in-query stage exists to rescue servers that mishandle
    /// the `Authorization` header.
    pub fn is_fatal(&self) -> bool {
        match self {
            ClientError::AlreadySwiped { .. } => true,
            ClientError::Status { status } => *status == 403,
            ClientError::NotAuthenticated => true,
            _ => false,
        }
    }

    /// Whether retrying the same request later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(_) => true,
            ClientError::Status { status } => *status >= 500,
            _ => false,
        }
    }
}
