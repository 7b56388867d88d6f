// src/auth/mod.rs
//
// Token-based auth: salted password digests, opaque bearer tokens with a
// 30-day expiry, and the lookup path used by the server's extractor.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use naturequest_common::models::{AuthToken, User};
use crate::repositories::postgres::{AuthTokenRepo, ProfileRepo, UserRepo};
use crate::Error;

const TOKEN_BYTES: usize = 32;
const TOKEN_TTL_DAYS: i64 = 30;

pub struct AuthService {
    users: Arc<dyn UserRepo>,
    tokens: Arc<dyn AuthTokenRepo>,
    profiles: Arc<dyn ProfileRepo>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        tokens: Arc<dyn AuthTokenRepo>,
        profiles: Arc<dyn ProfileRepo>,
    ) -> Self {
        Self {
            users,
            tokens,
            profiles,
        }
    }

    /// Create an account with an empty profile.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, Error> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::Validation("username must not be empty".into()));
        }
        if password.len() < 8 {
            return Err(Error::Validation(
                "password must be at least 8 characters".into(),
            ));
        }
        if self.users.get_by_username(username).await?.is_some() {
            return Err(Error::Conflict(format!(
                "username '{}' is already taken",
                username
            )));
        }

        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hash_password(password),
            is_active: true,
            created_at: now,
            last_seen: now,
        };
        self.users.create(&user).await?;
        self.profiles.get_or_create(user.user_id).await?;
        info!("Registered user '{}'", user.username);
        Ok(user)
    }

    /// Verify credentials and mint a fresh bearer token.
    pub async fn issue_token(&self, username: &str, password: &str) -> Result<AuthToken, Error> {
        let user = self
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| Error::Auth("invalid username or password".into()))?;

        if !user.is_active || !verify_password(password, &user.password_hash) {
            return Err(Error::Auth("invalid username or password".into()));
        }

        let now = Utc::now();
        let token = AuthToken {
            token: generate_token(),
            user_id: user.user_id,
            created_at: now,
            expires_at: now + Duration::days(TOKEN_TTL_DAYS),
        };
        self.tokens.insert(&token).await?;

        // Piggyback housekeeping on the issue path.
        self.tokens.delete_expired(now).await?;

        Ok(token)
    }

    /// Resolve a bearer token to its user, bumping last_seen.
    pub async fn authenticate(&self, token: &str) -> Result<User, Error> {
        let now = Utc::now();
        let stored = self
            .tokens
            .get(token)
            .await?
            .ok_or_else(|| Error::Auth("invalid token".into()))?;

        if stored.is_expired(now) {
            return Err(Error::Auth("token expired".into()));
        }

        let user = self
            .users
            .get(stored.user_id)
            .await?
            .ok_or_else(|| Error::Auth("invalid token".into()))?;
        if !user.is_active {
            return Err(Error::Auth("account is inactive".into()));
        }

        self.users.touch_last_seen(user.user_id, now).await?;
        Ok(user)
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Stored form is `salt_hex$digest_hex` where digest = SHA-256(salt || password).
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::rng().fill_bytes(&mut salt);
    let digest = digest_with_salt(&salt, password);
    format!("{}${}", hex_encode(&salt), digest)
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let Some(salt) = hex_decode(salt_hex) else {
        return false;
    };
    digest_with_salt(&salt, password) == digest_hex
}

fn digest_with_salt(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::postgres::auth_token::MockAuthTokenRepo;
    use crate::repositories::postgres::profile::MockProfileRepo;
    use crate::repositories::postgres::user::MockUserRepo;
    use naturequest_common::models::UserProfile;

    fn sample_user(password: &str) -> User {
        let now = Utc::now();
        User {
            user_id: Uuid::new_v4(),
            username: "hiker".to_string(),
            password_hash: hash_password(password),
            is_active: true,
            created_at: now,
            last_seen: now,
        }
    }

    #[test]
    fn password_roundtrip() {
        let stored = hash_password("correct horse");
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
    }

    #[test]
    fn distinct_salts_produce_distinct_hashes() {
        let a = hash_password("same password");
        let b = hash_password("same password");
        assert_ne!(a, b);
        assert!(verify_password("same password", &a));
        assert!(verify_password("same password", &b));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("pw", "no-dollar-sign"));
        assert!(!verify_password("pw", "zz$alsozz"));
    }

    #[test]
    fn tokens_are_unique_and_urlsafe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn issue_token_rejects_bad_password() {
        let user = sample_user("right-password");
        let mut users = MockUserRepo::new();
        users
            .expect_get_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        let tokens = MockAuthTokenRepo::new();
        let profiles = MockProfileRepo::new();

        let service = AuthService::new(Arc::new(users), Arc::new(tokens), Arc::new(profiles));
        let err = service.issue_token("hiker", "wrong-password").await;
        assert!(matches!(err, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn issue_token_returns_unexpired_token() {
        let user = sample_user("right-password");
        let user_id = user.user_id;
        let mut users = MockUserRepo::new();
        users
            .expect_get_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        let mut tokens = MockAuthTokenRepo::new();
        tokens.expect_insert().returning(|_| Ok(()));
        tokens.expect_delete_expired().returning(|_| Ok(0));
        let profiles = MockProfileRepo::new();

        let service = AuthService::new(Arc::new(users), Arc::new(tokens), Arc::new(profiles));
        let token = service.issue_token("hiker", "right-password").await.unwrap();
        assert_eq!(token.user_id, user_id);
        assert!(!token.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn authenticate_rejects_expired_token() {
        let user = sample_user("pw-not-used");
        let stored = AuthToken {
            token: "stale".to_string(),
            user_id: user.user_id,
            created_at: Utc::now() - Duration::days(60),
            expires_at: Utc::now() - Duration::days(30),
        };
        let mut tokens = MockAuthTokenRepo::new();
        tokens
            .expect_get()
            .returning(move |_| Ok(Some(stored.clone())));
        let users = MockUserRepo::new();
        let profiles = MockProfileRepo::new();

        let service = AuthService::new(Arc::new(users), Arc::new(tokens), Arc::new(profiles));
        let err = service.authenticate("stale").await;
        assert!(matches!(err, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username() {
        let existing = sample_user("whatever-pw");
        let mut users = MockUserRepo::new();
        users
            .expect_get_by_username()
            .returning(move |_| Ok(Some(existing.clone())));
        let tokens = MockAuthTokenRepo::new();
        let profiles = MockProfileRepo::new();

        let service = AuthService::new(Arc::new(users), Arc::new(tokens), Arc::new(profiles));
        let err = service.register("hiker", "long-enough-pw").await;
        assert!(matches!(err, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn register_creates_user_and_profile() {
        let mut users = MockUserRepo::new();
        users.expect_get_by_username().returning(|_| Ok(None));
        users.expect_create().returning(|_| Ok(()));
        let tokens = MockAuthTokenRepo::new();
        let mut profiles = MockProfileRepo::new();
        profiles
            .expect_get_or_create()
            .returning(|user_id| Ok(UserProfile::new(user_id)));

        let service = AuthService::new(Arc::new(users), Arc::new(tokens), Arc::new(profiles));
        let user = service.register("new_hiker", "long-enough-pw").await.unwrap();
        assert_eq!(user.username, "new_hiker");
        assert!(verify_password("long-enough-pw", &user.password_hash));
    }
}
