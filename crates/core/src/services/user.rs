//! User service (identity store).

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use pickup_common::{AppError, AppResult, Config, IdGenerator};
use pickup_db::{
    entities::{game::SportId, user},
    repositories::{GameRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    game_repo: GameRepository,
    id_gen: IdGenerator,
    history_limit: u64,
    search_limit: u64,
    search_min_chars: usize,
}

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

/// Input for signing in.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SigninInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Input for renaming.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNameInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Input for replacing favorite sports.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFavoritesInput {
    #[validate(length(max = 9))]
    pub favorite_sports: Vec<String>,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub is_verified_student: bool,
    pub favorite_sports: Vec<String>,
    pub top_sport: Option<String>,
}

impl From<&user::Model> for UserResponse {
    fn from(u: &user::Model) -> Self {
        let favorite_sports = u.favorite_sport_ids();
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            is_verified_student: u.is_verified_student,
            top_sport: favorite_sports.first().cloned(),
            favorite_sports,
        }
    }
}

/// Profile with derived stats.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    /// Only present on the caller's own profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub games_played: u64,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

/// Result of register/signin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(user_repo: UserRepository, game_repo: GameRepository, config: &Config) -> Self {
        Self {
            user_repo,
            game_repo,
            id_gen: IdGenerator::new(),
            history_limit: config.games.history_limit,
            search_limit: config.social.search_limit,
            search_min_chars: config.social.search_min_chars,
        }
    }

    /// Register a new user and issue a token.
    pub async fn register(&self, input: RegisterInput) -> AppResult<SessionResponse> {
        input.validate()?;

        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        let email = input.email.trim().to_lowercase();

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::AlreadyExists(
                "Email is already registered".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;
        let token = self.id_gen.generate_token();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            name_lower: Set(name.to_lowercase()),
            name: Set(name),
            is_verified_student: Set(is_student_email(&email)),
            email: Set(email),
            password_hash: Set(Some(password_hash)),
            token: Set(Some(token.clone())),
            favorite_sports: Set(serde_json::json!([])),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        info!(user_id = %user.id, verified = user.is_verified_student, "User registered");

        Ok(SessionResponse {
            token,
            user: UserResponse::from(&user),
        })
    }

    /// Check credentials and return the user's token.
    pub async fn signin(&self, input: SigninInput) -> AppResult<SessionResponse> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("No account with that email".to_string()))?;

        let password_hash = user.password_hash.as_deref().ok_or(AppError::Unauthorized)?;
        if !verify_password(&input.password, password_hash)? {
            return Err(AppError::Unauthorized);
        }

        let token = match &user.token {
            Some(token) => token.clone(),
            None => {
                let token = self.id_gen.generate_token();
                let mut active: user::ActiveModel = user.clone().into();
                active.token = Set(Some(token.clone()));
                active.updated_at = Set(Some(Utc::now().into()));
                self.user_repo.update(active).await?;
                token
            }
        };

        Ok(SessionResponse {
            token,
            user: UserResponse::from(&user),
        })
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Profile of `user_id` as seen by `viewer_id`.
    ///
    /// `gamesPlayed` is recomputed from game membership on every call and clamped
    /// to the history page size, so it matches what the history listing returns.
    pub async fn get_profile(&self, user_id: &str, viewer_id: &str) -> AppResult<ProfileResponse> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let played = self.game_repo.count_history(user_id, Utc::now()).await?;

        Ok(ProfileResponse {
            user: UserResponse::from(&user),
            email: (user.id == viewer_id).then(|| user.email.clone()),
            games_played: played.min(self.history_limit),
            created_at: user.created_at,
        })
    }

    /// Rename a user. Existing game and chat snapshots keep the old name.
    pub async fn update_name(&self, user_id: &str, input: UpdateNameInput) -> AppResult<UserResponse> {
        input.validate()?;

        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }

        let user = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.name_lower = Set(name.to_lowercase());
        active.name = Set(name);
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.user_repo.update(active).await?;
        Ok(UserResponse::from(&updated))
    }

    /// Replace the ordered favorite sports list.
    pub async fn update_favorites(
        &self,
        user_id: &str,
        input: UpdateFavoritesInput,
    ) -> AppResult<UserResponse> {
        input.validate()?;
        let favorites = normalize_favorites(&input.favorite_sports)?;

        let user = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.favorite_sports = Set(serde_json::json!(favorites));
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.user_repo.update(active).await?;
        Ok(UserResponse::from(&updated))
    }

    /// Search users by name, excluding the caller.
    pub async fn search_users(&self, query: &str, exclude_id: &str) -> AppResult<Vec<UserResponse>> {
        let query = query.trim();
        if query.chars().count() < self.search_min_chars {
            return Ok(vec![]);
        }

        let users = self
            .user_repo
            .search(query, exclude_id, self.search_limit)
            .await?;
        Ok(users.iter().map(UserResponse::from).collect())
    }
}

/// `.edu` addresses are marked as verified students.
fn is_student_email(email: &str) -> bool {
    email.ends_with(".edu")
}

/// Validate sport ids and drop duplicates, keeping first occurrences.
fn normalize_favorites(ids: &[String]) -> AppResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim();
        match SportId::parse(id) {
            Some(sport) if sport != SportId::Other => {
                if !out.iter().any(|s| s == id) {
                    out.push(id.to_string());
                }
            }
            _ => return Err(AppError::Validation(format!("Unknown sport: {id}"))),
        }
    }
    Ok(out)
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
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
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn create_test_config() -> Config {
        serde_json::from_value(serde_json::json!({
            "database": { "url": "postgres://localhost/test" }
        }))
        .unwrap()
    }

    fn create_test_user(id: &str, name: &str, favorites: serde_json::Value) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: name.to_string(),
            name_lower: name.to_lowercase(),
            email: format!("{id}@state.edu"),
            is_verified_student: true,
            password_hash: Some(hash_password("secret123").unwrap()),
            token: Some(format!("token-{id}")),
            favorite_sports: favorites,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> UserService {
        let conn = Arc::new(db.into_connection());
        UserService::new(
            UserRepository::new(Arc::clone(&conn)),
            GameRepository::new(conn),
            &create_test_config(),
        )
    }

    fn count_row(n: i64) -> BTreeMap<String, Value> {
        let mut row = BTreeMap::new();
        row.insert("num_items".to_string(), Value::BigInt(Some(n)));
        row
    }

    #[test]
    fn test_student_email() {
        assert!(is_student_email("sam@mit.edu"));
        assert!(!is_student_email("sam@gmail.com"));
        assert!(!is_student_email("sam@edu.com"));
    }

    #[test]
    fn test_normalize_favorites_dedupes_in_order() {
        let input = vec![
            "soccer".to_string(),
            "tennis".to_string(),
            "soccer".to_string(),
        ];
        assert_eq!(normalize_favorites(&input).unwrap(), vec!["soccer", "tennis"]);
    }

    #[test]
    fn test_normalize_favorites_rejects_unknown() {
        let input = vec!["soccer".to_string(), "curling".to_string()];
        assert!(matches!(
            normalize_favorites(&input),
            Err(AppError::Validation(_))
        ));
        let other = vec!["other".to_string()];
        assert!(normalize_favorites(&other).is_err());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("secret123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let existing = create_test_user("user1", "Alice", serde_json::json!([]));
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]));

        let result = svc
            .register(RegisterInput {
                name: "Alice Again".to_string(),
                email: "USER1@state.edu".to_string(),
                password: "secret123".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_register_short_password() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .register(RegisterInput {
                name: "Alice".to_string(),
                email: "alice@state.edu".to_string(),
                password: "123".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_marks_edu_verified() {
        let created = create_test_user("user1", "Alice", serde_json::json!([]));
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[created]]),
        );

        let session = svc
            .register(RegisterInput {
                name: "Alice".to_string(),
                email: "alice@state.edu".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.token.len(), 32);
        assert!(session.user.is_verified_student);
    }

    #[tokio::test]
    async fn test_signin_unknown_email() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let result = svc
            .signin(SigninInput {
                email: "ghost@state.edu".to_string(),
                password: "secret123".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_signin_wrong_password() {
        let user = create_test_user("user1", "Alice", serde_json::json!([]));
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let result = svc
            .signin(SigninInput {
                email: "user1@state.edu".to_string(),
                password: "not-it".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_signin_returns_existing_token() {
        let user = create_test_user("user1", "Alice", serde_json::json!([]));
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let session = svc
            .signin(SigninInput {
                email: "user1@state.edu".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.token, "token-user1");
    }

    #[tokio::test]
    async fn test_authenticate_by_unknown_token() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let result = svc.authenticate_by_token("nope").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_profile_games_played_is_clamped() {
        let user = create_test_user("user1", "Alice", serde_json::json!(["tennis", "soccer"]));
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_query_results([[count_row(75)]]),
        );

        let profile = svc.get_profile("user1", "someone-else").await.unwrap();

        assert_eq!(profile.games_played, 50);
        assert_eq!(profile.user.top_sport.as_deref(), Some("tennis"));
        assert!(profile.email.is_none());
    }

    #[tokio::test]
    async fn test_own_profile_includes_email() {
        let user = create_test_user("user1", "Alice", serde_json::json!([]));
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_query_results([[count_row(3)]]),
        );

        let profile = svc.get_profile("user1", "user1").await.unwrap();

        assert_eq!(profile.games_played, 3);
        assert_eq!(profile.email.as_deref(), Some("user1@state.edu"));
        assert!(profile.user.top_sport.is_none());
    }

    #[tokio::test]
    async fn test_search_too_short_skips_query() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc.search_users(" a ", "user1").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_update_favorites() {
        let before = create_test_user("user1", "Alice", serde_json::json!([]));
        let after = create_test_user("user1", "Alice", serde_json::json!(["running", "tennis"]));
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[before]])
                .append_query_results([[after]]),
        );

        let updated = svc
            .update_favorites(
                "user1",
                UpdateFavoritesInput {
                    favorite_sports: vec![
                        "running".to_string(),
                        "tennis".to_string(),
                        "running".to_string(),
                    ],
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.top_sport.as_deref(), Some("running"));
    }

    #[tokio::test]
    async fn test_update_name_blank() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .update_name(
                "user1",
                UpdateNameInput {
                    name: "   ".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_name() {
        let before = create_test_user("user1", "Alice", serde_json::json!([]));
        let after = create_test_user("user1", "Ali", serde_json::json!([]));
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[before]])
                .append_query_results([[after]]),
        );

        let updated = svc
            .update_name(
                "user1",
                UpdateNameInput {
                    name: " Ali ".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Ali");
    }
}
