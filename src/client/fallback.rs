use std::future::Future;

use tracing::debug;

use super::error::ClientError;

/// One way of reaching the server. Older deployments exposed the same
/// reads under token-in-query and `/debug` paths; the chain walks them
/// in order until one answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Versioned API with an `Authorization` header.
    Primary,
    /// Versioned API with the token as a query parameter.
    TokenQuery,
    /// Legacy unversioned paths under `/debug`.
    Debug,
}

pub static READ_ORDER: &[Stage] = &[Stage::Primary, Stage::TokenQuery, Stage::Debug];

impl Stage {
    pub fn url(&self, base_url: &str, path: &str, token: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            Stage::Primary => format!("{}/api/v1{}", base, path),
            Stage::TokenQuery => {
                let separator = if path.contains('?') { '&' } else { '?' };
                format!("{}/api/v1{}{}token={}", base, path, separator, token)
            }
            Stage::Debug => format!("{}/debug{}", base, path),
        }
    }

    pub fn sends_auth_header(&self) -> bool {
        !matches!(self, Stage::TokenQuery)
    }
}

/// Tries each stage in order, returning the first success. Intermediate
/// failures are logged and swallowed; only the final error surfaces,
/// wrapped so callers see a single failure for the whole chain.
pub async fn first_success<T, F, Fut>(stages: &[Stage], mut attempt: F) -> Result<T, ClientError>
where
    F: FnMut(Stage) -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut last: Option<ClientError> = None;

    for &stage in stages {
        match attempt(stage).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!("stage {:?} failed: {}", stage, e);
                last = Some(e);
            }
        }
    }

    Err(ClientError::Exhausted {
        stages: stages.len(),
        last: Box::new(last.unwrap_or(ClientError::Malformed)),
    })
}
