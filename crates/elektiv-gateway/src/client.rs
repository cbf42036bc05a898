//! The request gateway: bearer attachment and 401-driven retry.

use crate::error::{GatewayError, GatewayResult};
use crate::types::{
    NewReview, PreferenceKind, Preferences, Review, StudentData, StudentForm, Subject,
};
use elektiv_session::SessionManager;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether a request carries the session's bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestAuth {
    Authenticated,
    Public,
}

/// Typed client for the elektiv API.
///
/// Cloning is cheap; clones share the session and the connection pool.
#[derive(Clone)]
pub struct ApiGateway {
    session: Arc<SessionManager>,
    http_client: reqwest::Client,
    base_url: String,
}

impl ApiGateway {
    pub fn new(session: Arc<SessionManager>, base_url: &str) -> Self {
        Self {
            session,
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send a request, refreshing the session and replaying once on a 401.
    ///
    /// The retry is tracked per logical request, so a 401 on the replay is
    /// returned as-is instead of triggering another refresh. Public requests
    /// never carry a token and never retry.
    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        auth: RequestAuth,
    ) -> GatewayResult<reqwest::Response> {
        let mut token = match auth {
            RequestAuth::Authenticated => self.session.access_token()?,
            RequestAuth::Public => None,
        };
        let mut retried = false;

        loop {
            let url = format!("{}{}", self.base_url, path);
            let mut request = self.http_client.request(method.clone(), &url);
            if let Some(token) = &token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;

            if response.status() == StatusCode::UNAUTHORIZED
                && auth == RequestAuth::Authenticated
                && !retried
            {
                retried = true;
                debug!(path = %path, "Request unauthorized, refreshing session");
                match self.session.refresh().await {
                    Ok(fresh) => {
                        token = Some(fresh);
                        continue;
                    }
                    Err(err) => {
                        warn!(path = %path, error = %err, "Session refresh failed");
                        return Err(GatewayError::SessionExpired(err.to_string()));
                    }
                }
            }

            return Ok(response);
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        auth: RequestAuth,
    ) -> GatewayResult<T> {
        let response = self.dispatch(method, path, body, auth).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        Err(Self::error_for(status, response).await)
    }

    async fn send_only(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        auth: RequestAuth,
    ) -> GatewayResult<()> {
        let response = self.dispatch(method, path, body, auth).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Self::error_for(status, response).await)
    }

    async fn error_for(status: StatusCode, response: reqwest::Response) -> GatewayError {
        if status == StatusCode::UNAUTHORIZED {
            return GatewayError::Unauthorized;
        }
        let message = response.text().await.unwrap_or_else(|_| status.to_string());
        GatewayError::Api {
            status: status.as_u16(),
            message,
        }
    }

    /// Fetch the full subject catalog. Public, no session needed.
    pub async fn subjects(&self) -> GatewayResult<Vec<Subject>> {
        self.fetch(Method::GET, "/subjects/all/", None, RequestAuth::Public)
            .await
    }

    /// Fetch subject recommendations for the logged-in student.
    pub async fn recommendations(&self) -> GatewayResult<Vec<Subject>> {
        self.fetch(
            Method::GET,
            "/subjects/recommendations/",
            None,
            RequestAuth::Authenticated,
        )
        .await
    }

    /// Fetch the logged-in student's form data.
    pub async fn student_form(&self) -> GatewayResult<StudentData> {
        self.fetch(Method::GET, "/auth/form/", None, RequestAuth::Authenticated)
            .await
    }

    /// Submit the student form for the first time.
    pub async fn submit_student_form(&self, form: &StudentForm) -> GatewayResult<StudentData> {
        let body = serde_json::to_value(form)?;
        self.fetch(
            Method::POST,
            "/auth/form/",
            Some(&body),
            RequestAuth::Authenticated,
        )
        .await
    }

    /// Update an already-submitted student form.
    pub async fn update_student_form(&self, form: &StudentForm) -> GatewayResult<StudentData> {
        let body = serde_json::to_value(form)?;
        self.fetch(
            Method::PATCH,
            "/auth/form/",
            Some(&body),
            RequestAuth::Authenticated,
        )
        .await
    }

    /// Fetch the student's subject preferences.
    pub async fn preferences(&self) -> GatewayResult<Preferences> {
        self.fetch(
            Method::GET,
            "/subjects/preferences/",
            None,
            RequestAuth::Authenticated,
        )
        .await
    }

    /// Toggle a subject in or out of one of the preference buckets.
    pub async fn toggle_preference(
        &self,
        subject_id: i64,
        kind: PreferenceKind,
    ) -> GatewayResult<()> {
        let body = serde_json::json!({ "subject_id": subject_id, "preference": kind });
        self.send_only(
            Method::POST,
            "/subjects/toggle-subject-pref/",
            Some(&body),
            RequestAuth::Authenticated,
        )
        .await
    }

    /// Fetch published reviews for a subject by its code.
    pub async fn reviews_for_subject(&self, code: &str) -> GatewayResult<Vec<Review>> {
        self.fetch(
            Method::GET,
            &format!("/subjects/subject-review/{code}/"),
            None,
            RequestAuth::Authenticated,
        )
        .await
    }

    /// Submit a review for a subject.
    pub async fn submit_review(&self, review: &NewReview) -> GatewayResult<()> {
        let body = serde_json::to_value(review)?;
        self.send_only(
            Method::POST,
            "/subjects/subject-review/",
            Some(&body),
            RequestAuth::Authenticated,
        )
        .await
    }
}
