use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

// Constants
pub const DEMO_USERNAME: &str = "admin";
pub const DEMO_PASSWORD: &str = "admin123";
pub const SESSION_COOKIE: &str = "session";
const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// Credential data for login
///
/// Used to receive the login form from the client.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserCredentials {
    /// Username for login
    pub username: String,

    /// Password in plaintext (only compared, never stored)
    pub password: String,
}

/// Check a username/password pair against the demo account.
///
/// There is a single local user; this is an equality check, not a real
/// authentication backend.
///
/// # Returns
/// * `bool` - True if both the username and the password match
pub fn verify_credentials(username: &str, password: &str) -> bool {
    username == DEMO_USERNAME && password == DEMO_PASSWORD
}

/// User session data
///
/// Represents an authenticated browser session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Username of the authenticated user
    pub user_id: String,

    /// Time when the session expires
    pub expires_at: SystemTime,
}

/// Active sessions, owned by the server state.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new user session
    ///
    /// # Returns
    /// * `String` - A unique session ID
    pub fn create(&mut self, username: &str) -> String {
        self.purge_expired();

        let session_id = Uuid::new_v4().to_string();
        let expires_at = SystemTime::now() + Duration::from_secs(SESSION_DURATION);

        self.sessions.insert(
            session_id.clone(),
            Session {
                user_id: username.to_string(),
                expires_at,
            },
        );

        session_id
    }

    /// Validate a session
    ///
    /// # Returns
    /// * `Option<String>` - The username for the session if valid, None otherwise
    pub fn validate(&self, session_id: &str) -> Option<String> {
        self.sessions
            .get(session_id)
            .filter(|session| session.expires_at > SystemTime::now())
            .map(|session| session.user_id.clone())
    }

    pub fn revoke(&mut self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    pub fn revoke_all(&mut self) {
        self.sessions.clear();
    }

    fn purge_expired(&mut self) {
        let now = SystemTime::now();
        self.sessions.retain(|_, session| session.expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_demo_pair_is_accepted() {
        assert!(verify_credentials("admin", "admin123"));
        assert!(!verify_credentials("admin", "wrong"));
        assert!(!verify_credentials("Admin", "admin123"));
    }

    #[test]
    fn sessions_validate_until_revoked() {
        let mut registry = SessionRegistry::new();
        let id = registry.create("admin");
        assert_eq!(registry.validate(&id), Some("admin".to_string()));

        registry.revoke(&id);
        assert_eq!(registry.validate(&id), None);
        assert_eq!(registry.validate("unknown"), None);
    }
}
