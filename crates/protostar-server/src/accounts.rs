//! Account helpers: password hashing, registration checks and sessions

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::OnceLock;
use uuid::Uuid;

pub const USERNAME_MIN_CHARS: usize = 2;
pub const USERNAME_MAX_CHARS: usize = 20;
pub const EMAIL_MAX_CHARS: usize = 120;

/// Hash a password into an argon2 PHC string
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| format!("Failed to hash password: {e}"))
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Run a full argon2 verification for a username that does not exist.
///
/// Keeps the unknown-user path as slow as a wrong password. Always false.
pub fn verify_unknown_user(password: &str) -> bool {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    if let Some(hash) = DUMMY_HASH.get_or_init(|| hash_password("protostar-unknown-user").ok()) {
        let _ = verify_password(password, hash);
    }
    false
}

/// Validate registration fields, returning the first problem found
pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), String> {
    let name_len = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&name_len) {
        return Err(format!(
            "Username must be between {USERNAME_MIN_CHARS} and {USERNAME_MAX_CHARS} characters"
        ));
    }
    validate_email(email)?;
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if password != confirm_password {
        return Err("Passwords must match".to_string());
    }
    Ok(())
}

/// Minimal shape check: `local@domain.tld`, no whitespace
pub fn validate_email(email: &str) -> Result<(), String> {
    let invalid = || Err("Invalid email address".to_string());
    if email.chars().count() > EMAIL_MAX_CHARS || email.chars().any(char::is_whitespace) {
        return invalid();
    }
    let Some((local, domain)) = email.split_once('@') else {
        return invalid();
    };
    if local.is_empty() || domain.contains('@') {
        return invalid();
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => invalid(),
    }
}

#[derive(Debug, Clone)]
struct Session {
    user_id: u64,
    expires_at: DateTime<Utc>,
}

/// Bearer-token sessions
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
    remember_ttl: Duration,
}

impl SessionStore {
    /// `ttl` applies to normal logins, `remember_ttl` to "remember me" logins
    pub fn new(ttl: Duration, remember_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            remember_ttl,
        }
    }

    /// Start a session and return its token
    pub fn create(&self, user_id: u64, remember: bool) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let ttl = if remember { self.remember_ttl } else { self.ttl };
        let session = Session {
            user_id,
            expires_at: Utc::now() + ttl,
        };

        let mut sessions = self.sessions.write();
        let now = Utc::now();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(token.clone(), session);
        token
    }

    /// User id for a live token
    pub fn resolve(&self, token: &str) -> Option<u64> {
        let sessions = self.sessions.read();
        sessions
            .get(token)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.user_id)
    }

    /// End a session; returns false if the token was unknown
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }

    pub fn active(&self) -> usize {
        let now = Utc::now();
        self.sessions
            .read()
            .values()
            .filter(|s| s.expires_at > now)
            .count()
    }
}
