use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::client::LoginGrant;
use crate::error::SessionError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Who is signed in, written only at login and logout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SessionState {
    pub authenticated: bool,
    pub username: String,
    #[serde(skip)]
    pub token: Option<String>,
}

impl SessionState {
    pub fn signed_in(grant: LoginGrant) -> Self {
        SessionState {
            authenticated: true,
            username: grant.comment,
            token: Some(grant.token),
        }
    }

    pub fn signed_out() -> Self {
        SessionState::default()
    }
}

/// Sign-in form as submitted by the browser.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(SessionError::InvalidForm(
                "Email and password are required".to_string(),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SessionError::InvalidForm(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    Login,
    Main,
    InvoiceReport,
    CryptoReport,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Main => "/main",
            Route::InvoiceReport => "/api/invoices/view",
            Route::CryptoReport => "/api/crypto/view",
        }
    }

    pub fn is_protected(self) -> bool {
        !matches!(self, Route::Login)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

/// Where a request for `route` ends up given the session.
///
/// Protected routes send signed-out users to the login page; the login page
/// sends signed-in users on to the main menu.
pub fn guard(route: Route, session: &SessionState) -> Navigation {
    match (route.is_protected(), session.authenticated) {
        (true, false) => Navigation::Redirect(Route::Login),
        (false, true) => Navigation::Redirect(Route::Main),
        _ => Navigation::Render(route),
    }
}

#[derive(Debug)]
struct Entry<T> {
    state: SessionState,
    data: T,
    expires_at: SystemTime,
}

/// Server-side sessions keyed by cookie id, each carrying per-user data.
#[derive(Debug)]
pub struct SessionRegistry<T> {
    sessions: HashMap<String, Entry<T>>,
    ttl: Duration,
}

impl<T> SessionRegistry<T> {
    pub fn new(ttl: Duration) -> Self {
        SessionRegistry {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// Start a session and return its id.
    pub fn create(&mut self, state: SessionState, data: T) -> String {
        self.prune();
        let session_id = Uuid::new_v4().to_string();
        info!("session started for {}", state.username);
        self.sessions.insert(
            session_id.clone(),
            Entry {
                state,
                data,
                expires_at: SystemTime::now() + self.ttl,
            },
        );
        session_id
    }

    /// The session for `session_id`, or a signed-out state if it is unknown
    /// or expired.
    pub fn state(&self, session_id: &str) -> SessionState {
        self.live(session_id)
            .map(|entry| entry.state.clone())
            .unwrap_or_else(SessionState::signed_out)
    }

    pub fn data(&self, session_id: &str) -> Option<&T> {
        self.live(session_id).map(|entry| &entry.data)
    }

    pub fn remove(&mut self, session_id: &str) -> Option<SessionState> {
        let entry = self.sessions.remove(session_id)?;
        info!("session ended for {}", entry.state.username);
        Some(entry.state)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn live(&self, session_id: &str) -> Option<&Entry<T>> {
        self.sessions
            .get(session_id)
            .filter(|entry| entry.expires_at > SystemTime::now())
    }

    fn prune(&mut self) {
        let now = SystemTime::now();
        self.sessions.retain(|_, entry| entry.expires_at > now);
    }
}
