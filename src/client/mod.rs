//! HTTP client for the swipe backend.
//!
//! Wraps the raw endpoints with the resilience behavior the web client
//! grew over time: retry with backoff, a circuit breaker, and a
//! fallback chain across legacy endpoint layouts for reads.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::data::listing::{Listing, ListingWithFaculty};
use crate::data::swipe::{StudentMatchView, Swipe, SwipeOutcome, SwipeWithListing};
use crate::data::user::db::{UserLoginData, UserSignupData};
use crate::data::user::UserResponse;
use crate::route::swipes::{SwipeRequest, SwipeRespondRequest, SwipeUpdateRequest};
use crate::route::users::LoginResponse;
use crate::route::HealthStatus;

pub mod cache;
pub mod error;
pub mod fallback;
pub mod retry;

pub use cache::SwipeDeck;
pub use error::ClientError;
pub use fallback::{first_success, Stage, READ_ORDER};
pub use retry::{with_retry, CircuitBreaker, RetryPolicy};

pub struct SwipeClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    /// Cached result of the update endpoint probe; older servers never
    /// shipped `/swipe/update`.
    update_reachable: Option<bool>,
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();

    if status == reqwest::StatusCode::BAD_REQUEST {
        let body: serde_json::Value = response.json().await.map_err(|_| ClientError::Malformed)?;
        if body["code"] == "ALREADY_SWIPED" {
            return Err(ClientError::AlreadySwiped {
                interested: body["interested"].as_bool(),
            });
        }
        return Err(ClientError::Status {
            status: status.as_u16(),
        });
    }

    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
        });
    }

    response.json().await.map_err(|_| ClientError::Malformed)
}

async fn get_staged<T: DeserializeOwned>(
    http: &reqwest::Client,
    stage: Stage,
    base_url: &str,
    path: &str,
    token: &str,
) -> Result<T, ClientError> {
    let url = stage.url(base_url, path, token);
    let mut request = http.get(&url);
    if stage.sends_auth_header() {
        request = request.bearer_auth(token);
    }

    decode_response(request.send().await?).await
}

impl SwipeClient {
    pub fn new(base_url: impl Into<String>) -> SwipeClient {
        SwipeClient::with_policies(base_url, RetryPolicy::default(), CircuitBreaker::default())
    }

    pub fn with_policies(
        base_url: impl Into<String>,
        retry: RetryPolicy,
        breaker: CircuitBreaker,
    ) -> SwipeClient {
        SwipeClient {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
            retry,
            breaker,
            update_reachable: None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    fn token(&self) -> Result<&str, ClientError> {
        self.token.as_deref().ok_or(ClientError::NotAuthenticated)
    }

    fn primary_url(&self, path: &str) -> String {
        Stage::Primary.url(&self.base_url, path, "")
    }

    async fn post_primary<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        authorized: bool,
    ) -> Result<T, ClientError> {
        let mut request = self.http.post(self.primary_url(path)).json(body);
        if authorized {
            request = request.bearer_auth(self.token()?);
        }

        decode_response(request.send().await?).await
    }

    /// Authenticated GET through the retry policy, breaker, and the
    /// full endpoint fallback chain.
    async fn get_resilient<T: DeserializeOwned>(&mut self, path: &str) -> Result<T, ClientError> {
        let token = self.token()?.to_string();
        let Self {
            ref http,
            ref base_url,
            ref retry,
            ref mut breaker,
            ..
        } = *self;

        with_retry(retry, breaker, || {
            let token = token.clone();
            async move {
                first_success(READ_ORDER, |stage| {
                    let token = token.clone();
                    async move { get_staged(http, stage, base_url, path, &token).await }
                })
                .await
            }
        })
        .await
    }

    pub async fn register(&mut self, signup: &UserSignupData) -> Result<UserResponse, ClientError> {
        let response: LoginResponse = self.post_primary("/register", signup, false).await?;
        self.token = Some(response.token);
        Ok(response.user)
    }

    pub async fn login(
        &mut self,
        email: impl ToString,
        password: impl ToString,
    ) -> Result<UserResponse, ClientError> {
        let login = UserLoginData {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response: LoginResponse = self.post_primary("/login", &login, false).await?;
        self.token = Some(response.token);
        Ok(response.user)
    }

    pub async fn listings(&mut self) -> Result<Vec<ListingWithFaculty>, ClientError> {
        self.get_resilient("/listings").await
    }

    pub async fn listing(&mut self, id: Uuid) -> Result<ListingWithFaculty, ClientError> {
        self.get_resilient(&format!("/listing/{}", id)).await
    }

    pub async fn listings_batch(&mut self, ids: &[Uuid]) -> Result<Vec<Listing>, ClientError> {
        let joined = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.get_resilient(&format!("/listings/batch?ids={}", joined))
            .await
    }

    pub async fn student_matches(&mut self) -> Result<Vec<StudentMatchView>, ClientError> {
        self.get_resilient("/matches/student").await
    }

    pub async fn swipe_history(&mut self) -> Result<Vec<Swipe>, ClientError> {
        self.get_resilient("/swipes/history").await
    }

    pub async fn swipe_history_detailed(&mut self) -> Result<Vec<SwipeWithListing>, ClientError> {
        self.get_resilient("/swipes/all").await
    }

    /// Submits a swipe. Never retried: a timed out submission may have
    /// landed, and resubmitting would just turn into ALREADY_SWIPED.
    pub async fn swipe(
        &mut self,
        listing_id: Uuid,
        interested: bool,
    ) -> Result<SwipeOutcome, ClientError> {
        let request = SwipeRequest {
            listing_id,
            interested,
        };
        self.post_primary("/swipe", &request, true).await
    }

    /// Probes whether this server supports swipe updates; the result is
    /// cached for the lifetime of the client.
    pub async fn update_available(&mut self) -> bool {
        if let Some(known) = self.update_reachable {
            return known;
        }

        let url = format!("{}/health", self.base_url.trim_end_matches('/'));
        let reachable = match self.http.get(&url).send().await {
            Ok(response) => match response.json::<HealthStatus>().await {
                Ok(health) => health.status == "ok",
                Err(_) => false,
            },
            Err(e) => {
                debug!("health probe failed: {}", e);
                false
            }
        };

        self.update_reachable = Some(reachable);
        reachable
    }

    pub async fn update_swipe(
        &mut self,
        swipe_id: Uuid,
        interested: bool,
    ) -> Result<SwipeOutcome, ClientError> {
        if !self.update_available().await {
            return Err(ClientError::UpdateUnavailable);
        }

        let request = SwipeUpdateRequest {
            swipe_id,
            interested,
        };
        self.post_primary("/swipe/update", &request, true).await
    }

    pub async fn respond(
        &mut self,
        swipe_id: Uuid,
        accept: bool,
    ) -> Result<SwipeOutcome, ClientError> {
        let request = SwipeRespondRequest { swipe_id, accept };
        self.post_primary("/swipe/respond", &request, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_starts_unauthenticated() {
        let client = SwipeClient::new("http://localhost:8000");
        assert!(!client.is_logged_in());
    }

    #[rocket::async_test]
    async fn reads_require_a_token() {
        let mut client = SwipeClient::new("http://localhost:8000");
        let result = client.listings().await;
        assert!(matches!(result, Err(ClientError::NotAuthenticated)));
    }

    #[rocket::async_test]
    async fn update_is_gated_on_probe() {
        // Nothing listens here, so the probe fails and the gate closes.
        let mut client = SwipeClient::new("http://127.0.0.1:1");
        client.token = Some("tok".to_string());

        let result = client.update_swipe(Uuid::new_v4(), false).await;
        assert!(matches!(result, Err(ClientError::UpdateUnavailable)));
        assert_eq!(client.update_reachable, Some(false));
    }
}
