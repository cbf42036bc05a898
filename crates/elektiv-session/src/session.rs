//! Session lifecycle management.
//!
//! `SessionManager` owns the token pair, the session state machine, and the
//! proactive renewal timer. All refresh triggers (the timer, explicit calls,
//! 401-driven retries) funnel into [`SessionManager::refresh`], which
//! collapses concurrent callers into a single network request.

use crate::claims;
use crate::error::{AuthError, AuthResult};
use crate::fsm::{SessionInput, SessionMachine, SessionState};
use elektiv_storage::{SessionMeta, SessionVault, UserType};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long before expiry the proactive renewal fires.
const RENEWAL_LEAD: Duration = Duration::from_secs(15);

/// Fallback delay when the token is already inside the renewal window.
const IMMEDIATE_RENEWAL_DELAY: Duration = Duration::from_secs(1);

/// Outcome of a refresh, broadcast to every caller that was waiting on it.
type RefreshOutcome = Result<String, String>;

/// Profile of the authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub full_name: String,
    pub user_type: UserType,
    /// Student index number, present once the student form is filled
    #[serde(default)]
    pub index: Option<String>,
}

/// Events emitted as the session changes.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session state machine moved to a new state.
    StateChanged { state: SessionState },
    /// The session ended because a refresh failed. Emitted once per
    /// termination so the UI can show a single "logged out" notice.
    SessionExpired,
}

pub type SessionEventCallback = Box<dyn Fn(SessionEvent) + Send + Sync>;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    full_name: String,
    user_type: UserType,
}

#[derive(Serialize)]
struct RefreshRequest {
    refresh: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present when the backend rotates refresh tokens
    #[serde(default)]
    refresh: Option<String>,
}

#[derive(Serialize)]
struct LogoutRequest {
    refresh: String,
}

/// Manages the authenticated session against the elektiv backend.
pub struct SessionManager {
    vault: SessionVault,
    http_client: reqwest::Client,
    base_url: String,
    fsm: Mutex<SessionMachine>,
    user: Mutex<Option<UserProfile>>,
    /// Sender for the refresh currently in flight, if any. Holding the lock
    /// only for slot inspection keeps registration atomic with the decision
    /// to lead or follow.
    in_flight: Mutex<Option<broadcast::Sender<RefreshOutcome>>>,
    renewal: Mutex<Option<JoinHandle<()>>>,
    event_callback: Mutex<Option<SessionEventCallback>>,
}

impl SessionManager {
    /// Create a new session manager talking to the given API base URL.
    pub fn new(vault: SessionVault, base_url: &str) -> Self {
        Self {
            vault,
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            fsm: Mutex::new(SessionMachine::new()),
            user: Mutex::new(None),
            in_flight: Mutex::new(None),
            renewal: Mutex::new(None),
            event_callback: Mutex::new(None),
        }
    }

    /// Register a callback invoked on every session event.
    pub fn set_event_callback(&self, callback: SessionEventCallback) {
        *self.event_callback.lock().unwrap() = Some(callback);
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        SessionState::from(self.fsm.lock().unwrap().state())
    }

    /// Profile of the logged-in user, if any.
    pub fn current_user(&self) -> Option<UserProfile> {
        self.user.lock().unwrap().clone()
    }

    /// The stored access token, without any freshness guarantee.
    pub fn access_token(&self) -> AuthResult<Option<String>> {
        Ok(self.vault.access_token()?)
    }

    /// True when a complete session is persisted.
    pub fn is_logged_in(&self) -> AuthResult<bool> {
        Ok(self.vault.has_session()?)
    }

    /// Validate a persisted session on startup.
    ///
    /// Returns `Ok(true)` when a stored token was accepted by the server and
    /// the session is live again. A missing or rejected session yields
    /// `Ok(false)` rather than an error so startup never hard-fails on stale
    /// credentials.
    pub async fn initialize(self: &Arc<Self>) -> AuthResult<bool> {
        self.transition(&SessionInput::ValidateSession)?;

        if !self.vault.has_session()? {
            info!("No stored session found");
            self.transition(&SessionInput::NoSession)?;
            return Ok(false);
        }

        let access = match self.vault.access_token()? {
            Some(token) => token,
            None => {
                warn!("Stored session is incomplete, clearing it");
                self.vault.clear_session()?;
                self.transition(&SessionInput::NoSession)?;
                return Ok(false);
            }
        };

        match self.fetch_user(&access).await {
            Ok(profile) => {
                info!(user = %profile.full_name, "Stored session validated");
                if let Some(mut meta) = self.vault.session_meta()? {
                    meta.full_name = profile.full_name.clone();
                    meta.user_type = profile.user_type;
                    meta.index = profile.index.clone();
                    self.vault.set_session_meta(&meta)?;
                }
                *self.user.lock().unwrap() = Some(profile);
                self.schedule_renewal(&access);
                self.transition(&SessionInput::SessionRestored)?;
                Ok(true)
            }
            Err(err) => {
                warn!(error = %err, "Stored session rejected, treating as absent");
                self.vault.clear_session()?;
                self.transition(&SessionInput::ValidationFailed)?;
                Ok(false)
            }
        }
    }

    /// Log in with email and password.
    pub async fn login(self: &Arc<Self>, email: &str, password: &str) -> AuthResult<UserProfile> {
        self.transition(&SessionInput::LoginAttempt)?;

        let url = format!("{}/auth/login/", self.base_url);
        debug!(url = %url, email = %email, "Attempting login");

        let response = match self
            .http_client
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let _ = self.transition(&SessionInput::LoginFailed);
                return Err(AuthError::Http(err));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Login rejected");
            let _ = self.transition(&SessionInput::LoginFailed);
            return Err(AuthError::InvalidCredentials(format!(
                "HTTP {status}: {body}"
            )));
        }

        let data: LoginResponse = match response.json().await {
            Ok(data) => data,
            Err(err) => {
                let _ = self.transition(&SessionInput::LoginFailed);
                return Err(AuthError::Http(err));
            }
        };

        let profile = UserProfile {
            full_name: data.full_name,
            user_type: data.user_type,
            index: None,
        };
        self.install_session(&data.access, &data.refresh, &profile)?;
        self.transition(&SessionInput::LoginSuccess)?;
        info!(user = %profile.full_name, "Login successful");
        Ok(profile)
    }

    /// Persist a token pair and profile, and arm the renewal timer.
    pub fn install_session(
        self: &Arc<Self>,
        access_token: &str,
        refresh_token: &str,
        profile: &UserProfile,
    ) -> AuthResult<()> {
        let meta = SessionMeta {
            full_name: profile.full_name.clone(),
            user_type: profile.user_type,
            index: profile.index.clone(),
            expires_at: claims::expiry(access_token).map(|t| t.to_rfc3339()),
        };
        self.vault.set_session(access_token, refresh_token, &meta)?;
        *self.user.lock().unwrap() = Some(profile.clone());
        self.schedule_renewal(access_token);
        Ok(())
    }

    /// Log out: best-effort server invalidation, then local teardown.
    ///
    /// The local session is always cleared, even when the server cannot be
    /// reached.
    pub async fn logout(&self) -> AuthResult<()> {
        let _ = self.transition(&SessionInput::LogoutRequested);
        self.cancel_renewal();

        if let Some(refresh) = self.vault.refresh_token()? {
            let url = format!("{}/auth/logout/", self.base_url);
            let mut request = self.http_client.post(&url).json(&LogoutRequest { refresh });
            if let Some(access) = self.vault.access_token()? {
                request = request.bearer_auth(access);
            }
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Server acknowledged logout");
                }
                Ok(response) => {
                    warn!(status = %response.status(), "Server-side logout failed");
                }
                Err(err) => {
                    warn!(error = %err, "Could not reach server for logout");
                }
            }
        }

        self.vault.clear_session()?;
        *self.user.lock().unwrap() = None;
        let _ = self.transition(&SessionInput::LogoutComplete);
        self.force_not_logged_in();
        info!("Logged out");
        Ok(())
    }

    /// Return an access token that is not known to be expired, refreshing
    /// first when the stored one is inside the expiry skew window.
    pub async fn get_valid_access_token(self: &Arc<Self>) -> AuthResult<String> {
        let token = self.vault.access_token()?.ok_or(AuthError::NotLoggedIn)?;
        if !self.vault.is_session_expired()? {
            return Ok(token);
        }
        info!("Access token expired, refreshing");
        self.refresh().await
    }

    /// Refresh the access token, collapsing concurrent callers.
    ///
    /// The first caller becomes the leader and performs the network request;
    /// everyone arriving while it is in flight waits on the broadcast channel
    /// and receives the same outcome. The in-flight slot is cleared before
    /// the outcome is sent, so a caller arriving after completion starts a
    /// fresh cycle.
    pub async fn refresh(self: &Arc<Self>) -> AuthResult<String> {
        enum Role {
            Leader(broadcast::Sender<RefreshOutcome>),
            Follower(broadcast::Receiver<RefreshOutcome>),
        }

        let role = {
            let mut in_flight = self.in_flight.lock().unwrap();
            match in_flight.as_ref().map(|sender| sender.subscribe()) {
                Some(receiver) => Role::Follower(receiver),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    *in_flight = Some(sender.clone());
                    Role::Leader(sender)
                }
            }
        };

        match role {
            Role::Follower(mut receiver) => {
                debug!("Refresh already in flight, waiting for its outcome");
                match receiver.recv().await {
                    Ok(Ok(token)) => Ok(token),
                    Ok(Err(message)) => Err(AuthError::TokenRefresh(message)),
                    Err(_) => Err(AuthError::TokenRefresh(
                        "refresh outcome channel closed".to_string(),
                    )),
                }
            }
            Role::Leader(sender) => {
                let result = self.perform_refresh().await;
                let outcome = match &result {
                    Ok(token) => Ok(token.clone()),
                    Err(err) => Err(err.to_string()),
                };
                *self.in_flight.lock().unwrap() = None;
                // No receivers is fine; nobody else asked.
                let _ = sender.send(outcome);
                result
            }
        }
    }

    async fn perform_refresh(self: &Arc<Self>) -> AuthResult<String> {
        let refresh_token = match self.vault.refresh_token()? {
            Some(token) => token,
            None => {
                if self.vault.has_session()? {
                    self.terminate_session("refresh token missing from storage");
                }
                return Err(AuthError::NotLoggedIn);
            }
        };

        let _ = self.transition(&SessionInput::TokenExpired);

        let url = format!("{}/auth/refresh/", self.base_url);
        debug!(url = %url, "Refreshing access token");

        // The refresh request deliberately carries no Authorization header;
        // the expired access token must not ride along.
        let response = match self
            .http_client
            .post(&url)
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                self.terminate_session(&err.to_string());
                return Err(AuthError::TokenRefresh(err.to_string()));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            self.terminate_session(&format!("HTTP {status}"));
            return Err(AuthError::TokenRefresh(format!("HTTP {status}: {body}")));
        }

        let data: RefreshResponse = match response.json().await {
            Ok(data) => data,
            Err(err) => {
                self.terminate_session(&err.to_string());
                return Err(AuthError::TokenRefresh(err.to_string()));
            }
        };

        self.vault.set_access_token(&data.access)?;
        if let Some(rotated) = &data.refresh {
            debug!("Refresh token rotated");
            self.vault.set_refresh_token(rotated)?;
        }
        if let Some(mut meta) = self.vault.session_meta()? {
            meta.expires_at = claims::expiry(&data.access).map(|t| t.to_rfc3339());
            self.vault.set_session_meta(&meta)?;
        }

        let _ = self.transition(&SessionInput::RefreshSuccess);
        self.schedule_renewal(&data.access);
        info!("Access token refreshed");
        Ok(data.access)
    }

    /// Arm the proactive renewal timer for the given access token.
    ///
    /// The timer fires [`RENEWAL_LEAD`] before the token's expiry claim. A
    /// token already inside that window renews after a short fixed delay. A
    /// token whose claims cannot be decoded gets no timer; the 401-driven
    /// refresh path covers it.
    fn schedule_renewal(self: &Arc<Self>, access_token: &str) {
        let expires_at = match claims::expiry(access_token) {
            Some(ts) => ts,
            None => {
                warn!("Could not decode token expiry, proactive renewal disabled");
                self.cancel_renewal();
                return;
            }
        };

        let until_expiry = expires_at.signed_duration_since(chrono::Utc::now());
        let lead = chrono::Duration::seconds(RENEWAL_LEAD.as_secs() as i64);
        let delay = (until_expiry - lead)
            .to_std()
            .unwrap_or(IMMEDIATE_RENEWAL_DELAY);

        debug!(delay_secs = delay.as_secs(), "Scheduling token renewal");

        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("Proactive renewal timer fired");
            if let Err(err) = manager.refresh().await {
                warn!(error = %err, "Proactive token renewal failed");
            }
        });

        let mut slot = self.renewal.lock().unwrap();
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn cancel_renewal(&self) {
        if let Some(handle) = self.renewal.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Tear the session down after a failed refresh: cancel the timer, wipe
    /// storage, reset the state machine, and emit a single `SessionExpired`.
    fn terminate_session(&self, reason: &str) {
        warn!(reason = %reason, "Session terminated, clearing credentials");
        self.cancel_renewal();
        if let Err(err) = self.vault.clear_session() {
            warn!(error = %err, "Failed to clear session storage");
        }
        *self.user.lock().unwrap() = None;
        self.force_not_logged_in();
        self.notify(SessionEvent::SessionExpired);
    }

    /// Reset the state machine to NotLoggedIn, notifying if that is a change.
    fn force_not_logged_in(&self) {
        let changed = {
            let mut fsm = self.fsm.lock().unwrap();
            let was = SessionState::from(fsm.state());
            *fsm = SessionMachine::new();
            was != SessionState::NotLoggedIn
        };
        if changed {
            self.notify(SessionEvent::StateChanged {
                state: SessionState::NotLoggedIn,
            });
        }
    }

    async fn fetch_user(&self, access_token: &str) -> AuthResult<UserProfile> {
        let url = format!("{}/auth/user/", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AuthError::SessionInvalid(format!("HTTP {status}")));
        }

        Ok(response.json().await?)
    }

    fn transition(&self, input: &SessionInput) -> AuthResult<SessionState> {
        let new_state = {
            let mut fsm = self.fsm.lock().unwrap();
            let old_state = SessionState::from(fsm.state());
            fsm.consume(input).map_err(|_| {
                AuthError::InvalidStateTransition(format!(
                    "Cannot apply {input:?} in state {old_state:?}"
                ))
            })?;
            let new_state = SessionState::from(fsm.state());
            if old_state == new_state {
                return Ok(new_state);
            }
            debug!(from = ?old_state, to = ?new_state, "Session state transition");
            new_state
        };
        self.notify(SessionEvent::StateChanged { state: new_state });
        Ok(new_state)
    }

    fn notify(&self, event: SessionEvent) {
        let callback = self.event_callback.lock().unwrap();
        if let Some(callback) = callback.as_ref() {
            callback(event);
        }
    }
}
