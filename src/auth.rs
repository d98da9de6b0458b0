use std::fmt;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::watch;

/// Minimal session identity: ownership comparisons use the email only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
}

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

/// Provider rejections, mapped to a small fixed set of user-facing messages.
/// Never fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidEmail,
    UserNotFound,
    WrongPassword,
    EmailInUse,
    WeakPassword,
    Provider(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidEmail => f.write_str("Please enter a valid email address."),
            AuthError::UserNotFound => f.write_str("No account found with this email."),
            AuthError::WrongPassword => f.write_str("Incorrect password. Please try again."),
            AuthError::EmailInUse => f.write_str("This email is already registered."),
            AuthError::WeakPassword => {
                f.write_str("Password must be at least 6 characters.")
            }
            AuthError::Provider(msg) => write!(f, "auth provider error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// `local@domain.tld`, no whitespace — the same shape check the sign-in
/// form applies before calling the provider.
pub fn valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.split('.').count() >= 2
                && domain.split('.').all(|seg| !seg.is_empty())
        }
        _ => false,
    }
}

const MIN_PASSWORD_LEN: usize = 6;

/// The injected identity collaborator. The session stream emits the current
/// identity (or `None`) and replays the latest value to new subscribers.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_out(&self);
    fn session(&self) -> watch::Receiver<Option<Identity>>;
}

/// In-memory reference provider for tests and local development.
pub struct MemoryIdentity {
    accounts: DashMap<String, String>,
    session: watch::Sender<Option<Identity>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            accounts: DashMap::new(),
            session,
        }
    }

    /// Seed an account without going through the sign-up checks.
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.accounts
            .insert(email.to_string(), password.to_string());
        self
    }
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if !valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        let stored = self
            .accounts
            .get(email)
            .ok_or(AuthError::UserNotFound)?;
        if stored.value() != password {
            return Err(AuthError::WrongPassword);
        }
        drop(stored);
        let identity = Identity::new(email);
        let _ = self.session.send(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if !valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if self.accounts.contains_key(email) {
            return Err(AuthError::EmailInUse);
        }
        self.accounts
            .insert(email.to_string(), password.to_string());
        let identity = Identity::new(email);
        let _ = self.session.send(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) {
        let _ = self.session.send(None);
    }

    fn session(&self) -> watch::Receiver<Option<Identity>> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(valid_email("user@example.com"));
        assert!(valid_email("a.b@sub.example.co"));
        assert!(!valid_email("userexample.com"));
        assert!(!valid_email("user@example"));
        assert!(!valid_email("user@@example.com"));
        assert!(!valid_email("us er@example.com"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("user@.com"));
    }

    #[tokio::test]
    async fn sign_in_unknown_user() {
        let provider = MemoryIdentity::new();
        let err = provider.sign_in("x@example.com", "secret1").await.unwrap_err();
        assert_eq!(err, AuthError::UserNotFound);
    }

    #[tokio::test]
    async fn sign_in_wrong_password() {
        let provider = MemoryIdentity::new().with_account("x@example.com", "secret1");
        let err = provider.sign_in("x@example.com", "nope99").await.unwrap_err();
        assert_eq!(err, AuthError::WrongPassword);
    }

    #[tokio::test]
    async fn sign_up_rejects_duplicates_and_weak_passwords() {
        let provider = MemoryIdentity::new();
        assert_eq!(
            provider.sign_up("x@example.com", "short").await.unwrap_err(),
            AuthError::WeakPassword
        );
        provider.sign_up("x@example.com", "secret1").await.unwrap();
        assert_eq!(
            provider.sign_up("x@example.com", "secret2").await.unwrap_err(),
            AuthError::EmailInUse
        );
    }

    #[tokio::test]
    async fn malformed_email_rejected_before_lookup() {
        let provider = MemoryIdentity::new();
        assert_eq!(
            provider.sign_in("bad-email", "secret1").await.unwrap_err(),
            AuthError::InvalidEmail
        );
        assert_eq!(
            provider.sign_up("bad-email", "secret1").await.unwrap_err(),
            AuthError::InvalidEmail
        );
    }

    #[tokio::test]
    async fn session_stream_tracks_sign_in_and_out() {
        let provider = MemoryIdentity::new().with_account("x@example.com", "secret1");
        let mut session = provider.session();
        assert!(session.borrow().is_none());

        provider.sign_in("x@example.com", "secret1").await.unwrap();
        session.changed().await.unwrap();
        assert_eq!(
            session.borrow().as_ref().map(|i| i.email.clone()),
            Some("x@example.com".to_string())
        );

        provider.sign_out().await;
        session.changed().await.unwrap();
        assert!(session.borrow().is_none());
    }
}
