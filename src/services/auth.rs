use crate::db::token_repository::RefreshTokenRepository;
use crate::db::user_repository::UserRepository;
use crate::errors::ApiError;
use crate::models::token::RefreshToken;
use crate::models::user::{Role, User};
use crate::utils::auth::{hash_password, verify_password, TokenService};
use tracing::{error, info, warn};

#[derive(Debug)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Orchestrates the three session operations: signup, login and access-token
/// refresh. All state lives in the repositories; the service itself is
/// stateless and cheap to clone per worker.
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    tokens: RefreshTokenRepository,
    token_service: TokenService,
    refresh_ttl: chrono::Duration,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        tokens: RefreshTokenRepository,
        token_service: TokenService,
        refresh_ttl: chrono::Duration,
    ) -> Self {
        AuthService {
            users,
            tokens,
            token_service,
            refresh_ttl,
        }
    }

    /// Creates a user with a hashed password. Role defaults to EMPLOYEE.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Option<Role>,
    ) -> Result<User, ApiError> {
        if username.is_empty() || email.is_empty() || password.is_empty() {
            warn!(username = %username, email = %email, "Signup failed: missing fields");
            return Err(ApiError::Validation("All fields are required".to_string()));
        }
        if password.len() < 8 {
            return Err(ApiError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        if self
            .users
            .exists_with_username_or_email(username, email)
            .await?
        {
            warn!(username = %username, email = %email, "Signup failed: user already exists");
            return Err(ApiError::Conflict("User already exists".to_string()));
        }

        let password_hash = hash_password(password).map_err(|e| {
            error!(error = ?e, "Failed to hash password");
            ApiError::Internal
        })?;

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role: role.unwrap_or_default(),
            created_at: chrono::Utc::now(),
        };

        let user = self.users.create(user).await?;

        info!(user_id = %user.id, username = %user.username, "User registered successfully");

        Ok(user)
    }

    /// Verifies credentials, issues an access/refresh token pair and persists
    /// the refresh token. Unknown email and wrong password fail identically
    /// so callers cannot enumerate registered accounts.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionTokens, ApiError> {
        let user = match self.users.get_by_email(email).await? {
            Some(user) => user,
            None => {
                warn!(email = %email, "Login failed: user not found");
                return Err(ApiError::Authentication);
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!(email = %email, "Login failed: invalid credentials");
            return Err(ApiError::Authentication);
        }

        let access_token = self
            .token_service
            .issue_access_token(&user.id, user.role)
            .map_err(|e| {
                error!(error = ?e, user_id = %user.id, "Failed to issue access token");
                ApiError::Internal
            })?;
        let refresh_token = self
            .token_service
            .issue_refresh_token(&user.id, user.role)
            .map_err(|e| {
                error!(error = ?e, user_id = %user.id, "Failed to issue refresh token");
                ApiError::Internal
            })?;

        self.tokens
            .create(RefreshToken {
                token: refresh_token.clone(),
                user_id: user.id.clone(),
                expires_at: chrono::Utc::now() + self.refresh_ttl,
            })
            .await?;

        info!(user_id = %user.id, email = %email, "User logged in successfully");

        Ok(SessionTokens {
            access_token,
            refresh_token,
            user,
        })
    }

    /// Exchanges a live refresh token for a new access token.
    ///
    /// The signed expiry and the stored expiry must independently agree the
    /// token is live; the double-check guards against store/secret
    /// desynchronization. The refresh token is not rotated and stays valid
    /// until its original expiry.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let claims = self
            .token_service
            .verify_refresh_token(refresh_token)
            .map_err(|e| {
                warn!(error = ?e, "Refresh failed: token verification failed");
                ApiError::InvalidToken
            })?;

        let stored = match self.tokens.find_by_value(refresh_token).await? {
            Some(stored) => stored,
            None => {
                warn!(user_id = %claims.sub, "Refresh failed: token not found in store");
                return Err(ApiError::ExpiredOrInvalidToken);
            }
        };

        if stored.is_expired(chrono::Utc::now()) {
            warn!(user_id = %claims.sub, "Refresh failed: stored token expired");
            return Err(ApiError::ExpiredOrInvalidToken);
        }

        let access_token = self
            .token_service
            .issue_access_token(&claims.sub, claims.role)
            .map_err(|e| {
                error!(error = ?e, user_id = %claims.sub, "Failed to issue access token");
                ApiError::Internal
            })?;

        info!(user_id = %claims.sub, "Access token refreshed");

        Ok(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::db::Database;
    use chrono::{Duration, Utc};

    fn test_service(db: &Database) -> AuthService {
        let config = AuthConfig {
            access_secret: "access-test-secret".to_string(),
            refresh_secret: "refresh-test-secret".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        };
        AuthService::new(
            UserRepository::new(db.clone()),
            RefreshTokenRepository::new(db.clone()),
            TokenService::new(&config),
            config.refresh_ttl,
        )
    }

    async fn signup_alice(service: &AuthService) -> User {
        service
            .signup("alice", "a@x.com", "pw123456", None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_signup_defaults_to_employee_and_hashes_password() {
        let db = Database::in_memory().unwrap();
        let service = test_service(&db);

        let user = signup_alice(&service).await;
        assert_eq!(user.role, Role::Employee);
        assert_ne!(user.password_hash, "pw123456");
        assert!(verify_password("pw123456", &user.password_hash));
    }

    #[tokio::test]
    async fn test_signup_honors_explicit_role() {
        let db = Database::in_memory().unwrap();
        let service = test_service(&db);

        let user = service
            .signup("boss", "boss@x.com", "pw123456", Some(Role::Admin))
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_signup_rejects_missing_and_short_fields() {
        let db = Database::in_memory().unwrap();
        let service = test_service(&db);

        let err = service.signup("", "a@x.com", "pw123456", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = service.signup("alice", "a@x.com", "short", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_signup_conflicts_on_email_or_username() {
        let db = Database::in_memory().unwrap();
        let service = test_service(&db);
        signup_alice(&service).await;

        // Same email, different username.
        let err = service
            .signup("alice2", "a@x.com", "pw123456", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // Same username, different email.
        let err = service
            .signup("alice", "other@x.com", "pw123456", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let db = Database::in_memory().unwrap();
        let service = test_service(&db);
        signup_alice(&service).await;

        let wrong_password = service.login("a@x.com", "wrong").await.unwrap_err();
        let unknown_email = service.login("nobody@x.com", "pw123456").await.unwrap_err();

        assert!(matches!(wrong_password, ApiError::Authentication));
        assert!(matches!(unknown_email, ApiError::Authentication));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_login_persists_one_refresh_token_with_seven_day_expiry() {
        let db = Database::in_memory().unwrap();
        let service = test_service(&db);
        let user = signup_alice(&service).await;

        let tokens_repo = RefreshTokenRepository::new(db.clone());
        assert_eq!(tokens_repo.count_for_user(&user.id).await.unwrap(), 0);

        let session = service.login("a@x.com", "pw123456").await.unwrap();
        assert_eq!(tokens_repo.count_for_user(&user.id).await.unwrap(), 1);

        let stored = tokens_repo
            .find_by_value(&session.refresh_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_id, user.id);

        let expected = Utc::now() + Duration::days(7);
        let drift = (stored.expires_at - expected).num_seconds().abs();
        assert!(drift < 5, "expiry drifted by {}s", drift);
    }

    #[tokio::test]
    async fn test_concurrent_logins_accumulate_tokens() {
        let db = Database::in_memory().unwrap();
        let service = test_service(&db);
        let user = signup_alice(&service).await;

        service.login("a@x.com", "pw123456").await.unwrap();
        service.login("a@x.com", "pw123456").await.unwrap();

        let tokens_repo = RefreshTokenRepository::new(db.clone());
        assert_eq!(tokens_repo.count_for_user(&user.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_refresh_returns_access_token_for_same_principal() {
        let db = Database::in_memory().unwrap();
        let service = test_service(&db);
        let user = signup_alice(&service).await;

        let session = service.login("a@x.com", "pw123456").await.unwrap();
        let access = service
            .refresh_access_token(&session.refresh_token)
            .await
            .unwrap();

        let config = AuthConfig {
            access_secret: "access-test-secret".to_string(),
            refresh_secret: "refresh-test-secret".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        };
        let claims = TokenService::new(&config).verify_access_token(&access).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Employee);
    }

    #[tokio::test]
    async fn test_refresh_token_is_reusable_without_rotation() {
        let db = Database::in_memory().unwrap();
        let service = test_service(&db);
        signup_alice(&service).await;

        let session = service.login("a@x.com", "pw123456").await.unwrap();

        // Same refresh token works repeatedly until its own expiry.
        service.refresh_access_token(&session.refresh_token).await.unwrap();
        service.refresh_access_token(&session.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_rejects_unsigned_garbage() {
        let db = Database::in_memory().unwrap();
        let service = test_service(&db);

        let err = service.refresh_access_token("not.a.jwt").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[tokio::test]
    async fn test_refresh_rejects_token_absent_from_store() {
        let db = Database::in_memory().unwrap();
        let service = test_service(&db);
        let user = signup_alice(&service).await;

        // Validly signed but never persisted (e.g. store was wiped).
        let config = AuthConfig {
            access_secret: "access-test-secret".to_string(),
            refresh_secret: "refresh-test-secret".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        };
        let orphan = TokenService::new(&config)
            .issue_refresh_token(&user.id, user.role)
            .unwrap();

        let err = service.refresh_access_token(&orphan).await.unwrap_err();
        assert!(matches!(err, ApiError::ExpiredOrInvalidToken));
    }

    #[tokio::test]
    async fn test_refresh_rejects_store_expired_token_even_if_present() {
        let db = Database::in_memory().unwrap();
        let service = test_service(&db);
        signup_alice(&service).await;

        let session = service.login("a@x.com", "pw123456").await.unwrap();

        // Overwrite the stored record with a past expiry; the signed expiry
        // is still fine, so only the store check can reject this.
        let tokens_repo = RefreshTokenRepository::new(db.clone());
        let mut stored = tokens_repo
            .find_by_value(&session.refresh_token)
            .await
            .unwrap()
            .unwrap();
        stored.expires_at = Utc::now() - Duration::days(1);
        tokens_repo.create(stored).await.unwrap();

        let err = service
            .refresh_access_token(&session.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ExpiredOrInvalidToken));
    }
}
