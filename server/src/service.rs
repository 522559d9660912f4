//! User operations.
//!
//! [`UserService`] is the business layer behind the HTTP handlers. It
//! validates input, talks to the [`UserRepository`], hashes and verifies
//! passwords off the async executor, issues credentials and hands lifecycle
//! events to the [`EventEmitter`].
//!
//! Event publication is fire-and-forget: it happens after the repository
//! call succeeded and its outcome never changes the operation's result.

use crate::api::pagination::Page;
use crate::models::{
    LoginRequest, LoginResponse, Paginated, RegisterRequest, UpdateProfileRequest,
    UpdateUserRequest,
};
use portal_auth::utils::{MIN_PASSWORD_LEN, is_acceptable_password, is_valid_email};
use portal_auth::{CredentialAuthority, SecretHasher};
use portal_core::environment::Clock;
use portal_core::error::Result;
use portal_core::{
    DomainEvent, EventType, NewUser, RepositoryError, RequestMetadata, Role, ServiceError, User,
    UserRepository, UserResponse,
};
use portal_runtime::EventEmitter;
use std::sync::Arc;

/// User operations with their collaborators injected.
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    hasher: Arc<SecretHasher>,
    authority: Arc<CredentialAuthority>,
    emitter: EventEmitter,
    clock: Arc<dyn Clock>,
}

impl UserService {
    /// Create a service from its collaborators.
    #[must_use]
    pub fn new(
        repository: Arc<dyn UserRepository>,
        hasher: Arc<SecretHasher>,
        authority: Arc<CredentialAuthority>,
        emitter: EventEmitter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            hasher,
            authority,
            emitter,
            clock,
        }
    }

    /// Register a new user and emit `user_register`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] for an empty name, malformed email,
    ///   short password or unknown role
    /// - [`ServiceError::Conflict`] if the email is taken
    pub async fn register(
        &self,
        request: RegisterRequest,
        metadata: RequestMetadata,
    ) -> Result<UserResponse> {
        let name = required_name(&request.name)?;
        let email = valid_email(&request.email)?;
        let role = parse_role(&request.role)?;
        if !is_acceptable_password(&request.password) {
            return Err(ServiceError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = self.hash(request.password).await?;
        let user = self
            .repository
            .create(&NewUser {
                name,
                email,
                password_hash,
                role,
            })
            .await?;

        tracing::info!(user_id = user.id, role = %user.role, "User registered");
        self.emit(EventType::UserRegister, &user, metadata);
        Ok(UserResponse::from(&user))
    }

    /// Exchange credentials for a bearer token and emit `user_login`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Authentication`] for an unknown email or a
    /// wrong password; the two are indistinguishable to the caller.
    pub async fn login(
        &self,
        request: LoginRequest,
        metadata: RequestMetadata,
    ) -> Result<LoginResponse> {
        let user = match self.repository.get_by_email(request.email.trim()).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound) => {
                tracing::warn!("Login attempt for unknown email");
                return Err(ServiceError::Authentication);
            }
            Err(e) => return Err(e.into()),
        };

        if !self.verify(request.password, user.password_hash.clone()).await? {
            tracing::warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(ServiceError::Authentication);
        }

        let token = self.authority.issue(user.id, &user.email, user.role)?;
        tracing::info!(user_id = user.id, "User logged in");
        self.emit(EventType::UserLogin, &user, metadata);

        Ok(LoginResponse {
            token,
            user: UserResponse::from(&user),
        })
    }

    /// Fetch one user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no such user exists.
    pub async fn get(&self, id: i64) -> Result<UserResponse> {
        let user = self.repository.get_by_id(id).await?;
        Ok(UserResponse::from(&user))
    }

    /// Change the caller's own name or email and emit `user_update`.
    ///
    /// # Errors
    ///
    /// Validation, not-found and conflict failures as for
    /// [`update_user`](Self::update_user).
    pub async fn update_profile(
        &self,
        id: i64,
        request: UpdateProfileRequest,
        metadata: RequestMetadata,
    ) -> Result<UserResponse> {
        self.apply_update(
            id,
            UpdateUserRequest {
                name: request.name,
                email: request.email,
                role: None,
            },
            metadata,
        )
        .await
    }

    /// Change any user's name, email or role and emit `user_update`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] for an empty name, malformed email or
    ///   unknown role
    /// - [`ServiceError::NotFound`] if the user does not exist
    /// - [`ServiceError::Conflict`] if the new email is taken
    pub async fn update_user(
        &self,
        id: i64,
        request: UpdateUserRequest,
        metadata: RequestMetadata,
    ) -> Result<UserResponse> {
        self.apply_update(id, request, metadata).await
    }

    /// Delete a user. No event is emitted.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the user does not exist.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.repository.delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    /// List users one page at a time.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the repository fails.
    pub async fn list(&self, page: Page) -> Result<Paginated<UserResponse>> {
        let (users, total) = self.repository.list(page.limit(), page.offset()).await?;
        Ok(Paginated {
            data: users.iter().map(UserResponse::from).collect(),
            page: page.number(),
            limit: page.limit(),
            total_count: total,
            total_pages: page.total_pages(total),
        })
    }

    async fn apply_update(
        &self,
        id: i64,
        request: UpdateUserRequest,
        metadata: RequestMetadata,
    ) -> Result<UserResponse> {
        let name = request.name.as_deref().map(required_name).transpose()?;
        let email = request.email.as_deref().map(valid_email).transpose()?;
        let role = request.role.as_deref().map(parse_role).transpose()?;

        let mut user = self.repository.get_by_id(id).await?;
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(role) = role {
            user.role = role;
        }

        let user = self.repository.update(&user).await?;
        tracing::info!(user_id = user.id, "User updated");
        self.emit(EventType::UserUpdate, &user, metadata);
        Ok(UserResponse::from(&user))
    }

    fn emit(&self, event_type: EventType, user: &User, metadata: RequestMetadata) {
        self.emitter.publish(DomainEvent::for_user(
            event_type,
            user,
            self.clock.now(),
            metadata,
        ));
    }

    async fn hash(&self, password: String) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ServiceError::internal(format!("Password hashing task failed: {e}")))??;
        Ok(hashed)
    }

    async fn verify(&self, password: String, hash: String) -> Result<bool> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| ServiceError::internal(format!("Password verification task failed: {e}")))
    }
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService").finish_non_exhaustive()
    }
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("Name is required"));
    }
    Ok(name.to_string())
}

fn valid_email(email: &str) -> Result<String> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(ServiceError::validation("Email address is invalid"));
    }
    Ok(email.to_string())
}

fn parse_role(role: &str) -> Result<Role> {
    role.parse()
        .map_err(|_| ServiceError::validation("Role must be one of: student, admin"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use portal_auth::AuthConfig;
    use portal_runtime::EmitterConfig;
    use portal_testing::{InMemoryUserRepository, RecordingEventSink, test_clock};
    use std::time::Duration;

    struct Fixture {
        service: UserService,
        repository: Arc<InMemoryUserRepository>,
        sink: RecordingEventSink,
        authority: Arc<CredentialAuthority>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(test_clock());
        let repository = Arc::new(InMemoryUserRepository::with_clock(clock.clone()));
        let sink = RecordingEventSink::new();
        let (emitter, _handle) = EventEmitter::start(Arc::new(sink.clone()), EmitterConfig::default());
        let config = AuthConfig::new("service-test-secret", ChronoDuration::hours(1)).unwrap();
        let authority = Arc::new(CredentialAuthority::new(&config, clock.clone()));
        let hasher = Arc::new(SecretHasher::with_params(8, 1, 1).unwrap());

        let service = UserService::new(
            repository.clone(),
            hasher,
            authority.clone(),
            emitter,
            clock,
        );
        Fixture {
            service,
            repository,
            sink,
            authority,
        }
    }

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada Lovelace".to_string(),
            email: email.to_string(),
            password: "engine42".to_string(),
            role: "student".to_string(),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_stores_hash_and_emits_event() {
        let f = fixture();
        let metadata = RequestMetadata {
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: Some("test-agent".to_string()),
            correlation_id: Some("req-1".to_string()),
        };

        let user = f
            .service
            .register(registration("ada@example.com"), metadata)
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, Role::Student);

        let stored = f.repository.get_by_id(user.id).await.unwrap();
        assert_ne!(stored.password_hash, "engine42");
        assert!(stored.password_hash.starts_with("$argon2id$"));

        let events = f.sink.wait_for(1, Duration::from_secs(2)).await;
        assert_eq!(events[0].event_type, EventType::UserRegister);
        assert_eq!(events[0].user_id, user.id);
        assert_eq!(events[0].ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(events[0].correlation_id.as_deref(), Some("req-1"));
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let f = fixture();
        let cases = [
            RegisterRequest {
                name: "  ".to_string(),
                ..registration("a@example.com")
            },
            registration("not-an-email"),
            RegisterRequest {
                password: "12345".to_string(),
                ..registration("b@example.com")
            },
            RegisterRequest {
                role: "instructor".to_string(),
                ..registration("c@example.com")
            },
        ];

        for request in cases {
            let result = f.service.register(request, RequestMetadata::default()).await;
            assert!(matches!(result, Err(ServiceError::Validation(_))), "{result:?}");
        }
        assert!(f.repository.is_empty());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let f = fixture();
        f.service
            .register(registration("ada@example.com"), RequestMetadata::default())
            .await
            .unwrap();

        let result = f
            .service
            .register(registration("ada@example.com"), RequestMetadata::default())
            .await;
        assert_eq!(
            result.unwrap_err(),
            ServiceError::Conflict("Email already exists".to_string())
        );
        assert_eq!(f.repository.len(), 1);
    }

    #[tokio::test]
    async fn login_issues_verifiable_token() {
        let f = fixture();
        let user = f
            .service
            .register(registration("ada@example.com"), RequestMetadata::default())
            .await
            .unwrap();

        let response = f
            .service
            .login(login("ada@example.com", "engine42"), RequestMetadata::default())
            .await
            .unwrap();
        let claims = f.authority.verify(&response.token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.role, Role::Student);
        assert_eq!(response.user.id, user.id);

        let events = f.sink.wait_for(2, Duration::from_secs(2)).await;
        assert!(events.iter().any(|e| e.event_type == EventType::UserLogin));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let f = fixture();
        f.service
            .register(registration("ada@example.com"), RequestMetadata::default())
            .await
            .unwrap();

        let wrong_password = f
            .service
            .login(login("ada@example.com", "wrong-password"), RequestMetadata::default())
            .await;
        let unknown_email = f
            .service
            .login(login("nobody@example.com", "engine42"), RequestMetadata::default())
            .await;

        assert_eq!(wrong_password.unwrap_err(), ServiceError::Authentication);
        assert_eq!(unknown_email.unwrap_err(), ServiceError::Authentication);
    }

    #[tokio::test]
    async fn update_profile_changes_only_given_fields() {
        let f = fixture();
        let user = f
            .service
            .register(registration("ada@example.com"), RequestMetadata::default())
            .await
            .unwrap();

        let updated = f
            .service
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    name: Some("Countess of Lovelace".to_string()),
                    email: None,
                },
                RequestMetadata::default(),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Countess of Lovelace");
        assert_eq!(updated.email, "ada@example.com");
        assert_eq!(updated.role, Role::Student);

        let events = f.sink.wait_for(2, Duration::from_secs(2)).await;
        let update = events
            .iter()
            .find(|e| e.event_type == EventType::UserUpdate)
            .expect("user_update event");
        assert_eq!(update.name, "Countess of Lovelace");
    }

    #[tokio::test]
    async fn update_user_can_change_role() {
        let f = fixture();
        let user = f
            .service
            .register(registration("ada@example.com"), RequestMetadata::default())
            .await
            .unwrap();

        let updated = f
            .service
            .update_user(
                user.id,
                UpdateUserRequest {
                    role: Some("admin".to_string()),
                    ..UpdateUserRequest::default()
                },
                RequestMetadata::default(),
            )
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Admin);
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let f = fixture();
        let result = f
            .service
            .update_user(99, UpdateUserRequest::default(), RequestMetadata::default())
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_emits_nothing() {
        let f = fixture();
        let user = f
            .service
            .register(registration("ada@example.com"), RequestMetadata::default())
            .await
            .unwrap();
        f.sink.wait_for(1, Duration::from_secs(2)).await;

        f.service.delete(user.id).await.unwrap();
        assert!(matches!(
            f.service.delete(user.id).await,
            Err(ServiceError::NotFound(_))
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(f.sink.events().len(), 1);
    }

    #[tokio::test]
    async fn list_reports_totals() {
        let f = fixture();
        for i in 0..5 {
            f.service
                .register(registration(&format!("user{i}@example.com")), RequestMetadata::default())
                .await
                .unwrap();
        }

        let page = f.service.list(Page::new(2, 2)).await.unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.limit, 2);
        assert_eq!(page.total_count, 5);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn repository_outage_is_internal() {
        let f = fixture();
        f.repository.set_unavailable(true);
        let result = f.service.get(1).await;
        assert!(matches!(result, Err(ServiceError::Internal(_))));
    }
}
