//! Account service: signup and credential checks.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use kotoba_common::{AppError, AppResult, IdGenerator};
use kotoba_db::{entities::user, repositories::UserRepository};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::Set;
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

/// Minimum password length accepted at signup.
const MIN_PASSWORD_LENGTH: usize = 8;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

/// Account service for signup and authentication.
#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for registering a new account.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupInput {
    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    #[validate(
        length(min = 1, max = 150),
        regex(
            path = *USERNAME_RE,
            message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
        )
    )]
    pub username: String,

    #[validate(email(message = "Enter a valid email address."), length(max = 254))]
    pub email: String,

    pub password1: String,

    pub password2: String,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account.
    pub async fn signup(&self, input: SignupInput) -> AppResult<user::Model> {
        input.validate()?;
        validate_password(&input)?;

        // Usernames are unique ignoring case
        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::field(
                "username",
                "A user with that username already exists.",
            ));
        }

        let password_hash = hash_password(&input.password1)?;
        let user_id = self.id_gen.generate();

        let model = user::ActiveModel {
            id: Set(user_id),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            email: Set(input.email),
            password_hash: Set(password_hash),
            first_name: Set(input.first_name.filter(|s| !s.is_empty())),
            last_name: Set(input.last_name.filter(|s| !s.is_empty())),
            ..Default::default()
        };

        let user = self.user_repo.create(model).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "New account registered");

        Ok(user)
    }

    /// Authenticate a user by username and password.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_username(username).await
    }

    /// Find a user by username, case-insensitively.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        self.user_repo.find_by_username(username).await
    }
}

/// Check the password pair against the signup password rules.
///
/// Every rule is checked so the caller gets all violations at once, each
/// one attached to the `password2` field.
fn validate_password(input: &SignupInput) -> AppResult<()> {
    let mut errors = ValidationErrors::new();

    if input.password1 != input.password2 {
        add_password_error(
            &mut errors,
            "password_mismatch",
            "The two password fields didn't match.",
        );
    }

    let password = &input.password1;
    let username = input.username.to_lowercase();

    if !username.is_empty() && !password.is_empty() {
        let lowered = password.to_lowercase();
        if lowered.contains(&username) || username.contains(&lowered) {
            add_password_error(
                &mut errors,
                "password_too_similar",
                "The password is too similar to the username.",
            );
        }
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        add_password_error(
            &mut errors,
            "password_too_short",
            "This password is too short. It must contain at least 8 characters.",
        );
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        add_password_error(
            &mut errors,
            "password_entirely_numeric",
            "This password is entirely numeric.",
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

fn add_password_error(errors: &mut ValidationErrors, code: &'static str, message: &'static str) {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    errors.add("password2", error);
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            email: format!("{username}@example.com"),
            password_hash: "$argon2id$stub".to_string(),
            first_name: None,
            last_name: None,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_service(user_db: Arc<sea_orm::DatabaseConnection>) -> AccountService {
        AccountService::new(UserRepository::new(user_db))
    }

    fn signup_input(username: &str, password: &str) -> SignupInput {
        SignupInput {
            first_name: None,
            last_name: None,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password1: password.to_string(),
            password2: password.to_string(),
        }
    }

    // Unit tests for password functions
    #[test]
    fn test_hash_password() {
        let password = "test_password_123";
        let hash = hash_password(password).unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hash.len() > 50);
    }

    #[test]
    fn test_verify_password_correct() {
        let password = "test_password_123";
        let hash = hash_password(password).unwrap();

        let result = verify_password(password, &hash).unwrap();
        assert!(result);
    }

    #[test]
    fn test_verify_password_incorrect() {
        let password = "test_password_123";
        let hash = hash_password(password).unwrap();

        let result = verify_password("wrong_password", &hash).unwrap();
        assert!(!result);
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        let result = verify_password("test", "invalid_hash");
        assert!(result.is_err());
    }

    #[test]
    fn test_hash_password_different_each_time() {
        let password = "same_password";
        let hash1 = hash_password(password).unwrap();
        let hash2 = hash_password(password).unwrap();

        // Different salts should produce different hashes
        assert_ne!(hash1, hash2);

        // But both should verify correctly
        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    // Unit tests for password rules
    #[test]
    fn test_validate_password_accepts_good_password() {
        let input = signup_input("garry", "correct horse battery");
        assert!(validate_password(&input).is_ok());
    }

    #[test]
    fn test_validate_password_mismatch() {
        let mut input = signup_input("garry", "correct horse battery");
        input.password2 = "different".to_string();

        let result = validate_password(&input);
        match result {
            Err(AppError::Validation(errors)) => {
                let fields = kotoba_common::error::field_messages(&errors);
                assert_eq!(
                    fields["password2"][0],
                    "The two password fields didn't match."
                );
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_validate_password_too_short() {
        let input = signup_input("garry", "short1");

        let result = validate_password(&input);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_password_entirely_numeric() {
        let input = signup_input("garry", "1234567890");

        let result = validate_password(&input);
        match result {
            Err(AppError::Validation(errors)) => {
                let fields = kotoba_common::error::field_messages(&errors);
                assert_eq!(fields["password2"][0], "This password is entirely numeric.");
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_validate_password_similar_to_username() {
        let input = signup_input("stasbasov", "stasbasov2024");

        let result = validate_password(&input);
        match result {
            Err(AppError::Validation(errors)) => {
                let fields = kotoba_common::error::field_messages(&errors);
                assert_eq!(
                    fields["password2"][0],
                    "The password is too similar to the username."
                );
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_validate_password_collects_all_violations() {
        let mut input = signup_input("garry", "123456");
        input.password2 = "654321".to_string();

        let result = validate_password(&input);
        match result {
            Err(AppError::Validation(errors)) => {
                let fields = kotoba_common::error::field_messages(&errors);
                let messages = fields["password2"].as_array().unwrap();
                // Mismatch, too short and entirely numeric all reported
                assert_eq!(messages.len(), 3);
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_signup_input_validation() {
        // Invalid username characters
        let mut input = signup_input("bad name!", "correct horse battery");
        assert!(input.validate().is_err());

        // Invalid email
        input = signup_input("garry", "correct horse battery");
        input.email = "not-an-email".to_string();
        assert!(input.validate().is_err());

        // Valid input
        input = signup_input("garry", "correct horse battery");
        assert!(input.validate().is_ok());
    }

    // Service tests
    #[tokio::test]
    async fn test_signup_creates_user() {
        let created = create_test_user("user1", "garry");

        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[created.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let service = create_test_service(user_db);

        let result = service
            .signup(signup_input("garry", "correct horse battery"))
            .await
            .unwrap();

        assert_eq!(result.username, "garry");
    }

    #[tokio::test]
    async fn test_signup_rejects_taken_username() {
        let existing = create_test_user("user1", "garry");

        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let service = create_test_service(user_db);

        let result = service
            .signup(signup_input("Garry", "correct horse battery"))
            .await;

        match result {
            Err(AppError::Validation(errors)) => {
                let fields = kotoba_common::error::field_messages(&errors);
                assert_eq!(
                    fields["username"][0],
                    "A user with that username already exists."
                );
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[tokio::test]
    async fn test_signup_rejects_password_mismatch_before_db() {
        // No mocked results: the password check fails before any query runs
        let user_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = create_test_service(user_db);

        let mut input = signup_input("garry", "correct horse battery");
        input.password2 = "different entirely".to_string();

        let result = service.signup(input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let mut user = create_test_user("user1", "garry");
        user.password_hash = hash_password("correct horse battery").unwrap();

        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let service = create_test_service(user_db);

        let result = service
            .authenticate("garry", "correct horse battery")
            .await
            .unwrap();

        assert_eq!(result.id, "user1");
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let mut user = create_test_user("user1", "garry");
        user.password_hash = hash_password("correct horse battery").unwrap();

        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let service = create_test_service(user_db);

        let result = service.authenticate("garry", "wrong password").await;

        match result {
            Err(AppError::Unauthorized) => {}
            _ => panic!("Expected Unauthorized error"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = create_test_service(user_db);

        let result = service.authenticate("nobody", "whatever").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
