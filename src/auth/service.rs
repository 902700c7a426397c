use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::auth::error::AuthError;
use crate::auth::password::CredentialHasher;
use crate::auth::repo_types::{NewUser, User};
use crate::auth::session;
use crate::auth::store::UserStore;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Orchestrates sign-up, login, logout and session resolution against the
/// user store. Immutable after construction, shared across requests.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    password_min_len: usize,
    decoy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: CredentialHasher,
        password_min_len: usize,
    ) -> Result<Self, AuthError> {
        // Hashed once up front; unknown-email logins verify against this so
        // they cost the same as a wrong-password attempt.
        let decoy_hash = hasher.hash("decoy-password")?;
        Ok(Self {
            store,
            hasher,
            password_min_len,
            decoy_hash,
        })
    }

    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let full_name = full_name.trim();
        let email = email.trim().to_lowercase();

        if full_name.is_empty() {
            return Err(AuthError::InvalidInput("full name must not be empty"));
        }
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidInput("invalid email address"));
        }
        if password.chars().count() < self.password_min_len {
            return Err(AuthError::InvalidInput("password too short"));
        }

        let password_hash = self.hasher.hash(password)?;
        let user = self
            .store
            .create(NewUser {
                full_name: full_name.to_string(),
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Verify credentials and mint a new session key, replacing any previous
    /// one for the account. Unknown email and wrong password are reported
    /// identically.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let email = email.trim().to_lowercase();

        let Some(mut user) = self.store.find_by_email(&email).await? else {
            let _ = self.hasher.verify(password, &self.decoy_hash);
            warn!("login failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!("login failed");
            return Err(AuthError::InvalidCredentials);
        }

        let key = session::issue();
        user.session_key = Some(key.clone());
        self.store.update(&user).await?;

        info!(user_id = %user.id, "user logged in");
        Ok(key)
    }

    /// Invalidate the presented session key by rotating the account's key.
    /// The replacement is never handed out, so the account ends up with no
    /// usable session. Rotating an already-stale key reports
    /// [`AuthError::NotAuthenticated`]; a second logout is a no-op error,
    /// not a crash.
    #[instrument(skip(self, session_key))]
    pub async fn logout(&self, session_key: &str) -> Result<(), AuthError> {
        let Some(mut user) = self.resolve_session(session_key).await? else {
            return Err(AuthError::NotAuthenticated);
        };

        // The write targets the record id; the presented key only located it.
        user.session_key = Some(session::rotate(session_key));
        self.store.update(&user).await?;

        info!(user_id = %user.id, "user logged out");
        Ok(())
    }

    /// The single checkpoint for protected operations: resolve a presented
    /// key to its account or reject. Performs no mutation.
    pub async fn authenticate(&self, presented_key: &str) -> Result<User, AuthError> {
        self.resolve_session(presented_key)
            .await?
            .ok_or(AuthError::NotAuthenticated)
    }

    async fn resolve_session(&self, key: &str) -> Result<Option<User>, AuthError> {
        if !session::is_well_formed(key) {
            return Ok(None);
        }
        self.store.find_by_session_key(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::test_hasher;
    use std::sync::Mutex;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use axum::async_trait;

    /// In-memory store double; each method locks once, so updates are atomic
    /// at record granularity just like the real store.
    #[derive(Default)]
    struct MemoryUserStore {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.email == email).cloned())
        }

        async fn find_by_session_key(&self, key: &str) -> Result<Option<User>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users
                .iter()
                .find(|u| u.session_key.as_deref() == Some(key))
                .cloned())
        }

        async fn create(&self, new: NewUser) -> Result<User, AuthError> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == new.email) {
                return Err(AuthError::DuplicateEmail);
            }
            let user = User {
                id: Uuid::new_v4(),
                full_name: new.full_name,
                email: new.email,
                password_hash: new.password_hash,
                session_key: None,
                created_at: OffsetDateTime::now_utc(),
            };
            users.push(user.clone());
            Ok(user)
        }

        async fn update(&self, user: &User) -> Result<(), AuthError> {
            let mut users = self.users.lock().unwrap();
            let slot = users
                .iter_mut()
                .find(|u| u.id == user.id)
                .expect("update of unknown user");
            *slot = user.clone();
            Ok(())
        }
    }

    fn service() -> (Arc<AuthService>, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::default());
        let service = AuthService::new(store.clone(), test_hasher(), 8).expect("service");
        (Arc::new(service), store)
    }

    async fn alice(service: &AuthService) -> User {
        service
            .sign_up("Alice", "a@x.com", "Secret123")
            .await
            .expect("sign up")
    }

    #[tokio::test]
    async fn sign_up_rejects_bad_input() {
        let (service, _) = service();
        let cases = [
            ("", "a@x.com", "Secret123"),
            ("   ", "a@x.com", "Secret123"),
            ("Alice", "not-an-email", "Secret123"),
            ("Alice", "a@x.com", "short"),
        ];
        for (name, email, password) in cases {
            let err = service.sign_up(name, email, password).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidInput(_)), "{name:?}/{email:?}");
        }
    }

    #[tokio::test]
    async fn sign_up_hashes_password_and_normalizes_email() {
        let (service, _) = service();
        let user = service
            .sign_up("  Alice  ", "  A@X.Com ", "Secret123")
            .await
            .expect("sign up");
        assert_eq!(user.full_name, "Alice");
        assert_eq!(user.email, "a@x.com");
        assert!(user.session_key.is_none());
        assert_ne!(user.password_hash, "Secret123");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn sign_up_rejects_duplicate_email_case_insensitively() {
        let (service, _) = service();
        alice(&service).await;
        let err = service
            .sign_up("Alice Again", "A@X.COM", "Another123")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn failed_logins_are_indistinguishable() {
        let (service, _) = service();
        alice(&service).await;

        let wrong_password = service.login("a@x.com", "wrong").await.unwrap_err();
        let unknown_email = service.login("noone@x.com", "wrong").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn login_resolves_case_variant_email() {
        let (service, _) = service();
        alice(&service).await;
        let key = service.login(" A@X.COM ", "Secret123").await.expect("login");
        assert!(session::is_well_formed(&key));
    }

    #[tokio::test]
    async fn login_authenticate_logout_chain() {
        let (service, _) = service();
        let user = alice(&service).await;

        let key = service.login("a@x.com", "Secret123").await.expect("login");
        let resolved = service.authenticate(&key).await.expect("authenticate");
        assert_eq!(resolved.id, user.id);

        service.logout(&key).await.expect("logout");
        let err = service.authenticate(&key).await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn relogin_invalidates_previous_key() {
        let (service, _) = service();
        alice(&service).await;

        let first = service.login("a@x.com", "Secret123").await.expect("login");
        let second = service.login("a@x.com", "Secret123").await.expect("login");
        assert_ne!(first, second);

        assert!(matches!(
            service.authenticate(&first).await.unwrap_err(),
            AuthError::NotAuthenticated
        ));
        assert!(service.authenticate(&second).await.is_ok());
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let (service, _) = service();
        alice(&service).await;

        let key = service.login("a@x.com", "Secret123").await.expect("login");
        service.logout(&key).await.expect("first logout");
        let err = service.logout(&key).await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn authenticate_rejects_missing_or_malformed_keys() {
        let (service, _) = service();
        for key in ["", "garbage", "AAAA"] {
            let err = service.authenticate(key).await.unwrap_err();
            assert!(matches!(err, AuthError::NotAuthenticated));
        }
    }

    #[tokio::test]
    async fn concurrent_logins_leave_exactly_one_live_key() {
        let (service, store) = service();
        let user = alice(&service).await;

        let (a, b) = tokio::join!(
            tokio::spawn({
                let service = service.clone();
                async move { service.login("a@x.com", "Secret123").await }
            }),
            tokio::spawn({
                let service = service.clone();
                async move { service.login("a@x.com", "Secret123").await }
            }),
        );
        let k1 = a.expect("task").expect("login");
        let k2 = b.expect("task").expect("login");
        assert_ne!(k1, k2);

        let live = store
            .find_by_email("a@x.com")
            .await
            .expect("store lookup")
            .expect("user present")
            .session_key
            .expect("a key is live");
        assert!(live == k1 || live == k2);
        assert_eq!(
            service.authenticate(&live).await.expect("live key resolves").id,
            user.id
        );

        let stale = if live == k1 { &k2 } else { &k1 };
        assert!(matches!(
            service.authenticate(stale).await.unwrap_err(),
            AuthError::NotAuthenticated
        ));
    }
}
