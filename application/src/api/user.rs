//! [`User`]-related HTTP API.

use axum::{
    extract::rejection::JsonRejection,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use derive_more::Debug;
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use service::{
    command::{
        self, create_user, create_user_session, delete_user,
        update_user_password, update_user_profile, Command as _,
    },
    domain::{self, user},
    query, Query as _,
};
use tracing as log;

use crate::{
    api::Message, context::require_auth, define_error, AsError, Error,
    Principal, Service,
};

/// Builds the [`Router`] of authentication endpoints.
///
/// Every route, except registration and login, requires a valid bearer
/// token.
pub fn routes() -> Router {
    let protected = Router::new()
        .route(
            "/me",
            get(current_user)
                .patch(update_profile)
                .delete(delete_account),
        )
        .route("/logout", post(logout))
        .route("/password", put(update_password))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
}

/// Registered user, as exposed to clients.
#[derive(Clone, Debug, Serialize)]
pub struct User {
    /// ID of this [`User`].
    pub id: user::Id,

    /// Unique username of this [`User`].
    pub username: user::Username,

    /// Unique email of this [`User`].
    pub email: user::Email,

    /// Whether this [`User`] is allowed to log in.
    pub is_active: bool,

    /// Language code this [`User`] prefers.
    pub preferred_language: String,

    /// Free-form learning preferences of this [`User`].
    pub learning_preferences: serde_json::Value,

    /// [RFC 3339] moment when this [`User`] registered.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub created_at: String,

    /// [RFC 3339] moment when this [`User`] logged in last time.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub last_activity_at: Option<String>,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_active: user.is_active,
            preferred_language: user.preferred_language.as_ref().to_owned(),
            learning_preferences: user.learning_preferences.as_ref().clone(),
            created_at: user.created_at.to_rfc3339(),
            last_activity_at: user.last_activity_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Request of the [`register()`] endpoint.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Desired username.
    pub username: String,

    /// Email address.
    pub email: String,

    /// Desired password.
    #[debug(skip)]
    pub password: String,

    /// Preferred language code, English if omitted.
    #[serde(default)]
    pub preferred_language: Option<String>,
}

/// Response of the [`register()`] endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct Registered {
    /// Human-readable message.
    pub message: &'static str,

    /// Registered [`User`].
    pub user: User,
}

/// Registers a new [`User`].
///
/// # Errors
///
/// - If the request is not a valid [`RegisterRequest`].
/// - If the username or email is occupied.
#[tracing::instrument(skip_all)]
pub async fn register(
    Extension(service): Extension<Service>,
    req: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(http::StatusCode, Json<Registered>), Error> {
    let Json(RegisterRequest {
        username,
        email,
        password,
        preferred_language,
    }) = req.map_err(AsError::into_error)?;

    let cmd = command::CreateUser {
        username: user::Username::new(username)
            .ok_or(ValidationError::InvalidUsername)?,
        email: user::Email::new(email).ok_or(ValidationError::InvalidEmail)?,
        password: new_password(password)?,
        preferred_language: preferred_language
            .map(|l| {
                user::Language::new(l).ok_or(ValidationError::InvalidLanguage)
            })
            .transpose()?,
    };

    let user = service.execute(cmd).await.map_err(AsError::into_error)?;
    log::info!(user.id = %user.id, "`User` registered");

    Ok((
        http::StatusCode::CREATED,
        Json(Registered {
            message: "User created successfully",
            user: user.into(),
        }),
    ))
}

/// Request of the [`login()`] endpoint.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username of the [`User`].
    pub username: String,

    /// Password of the [`User`].
    #[debug(skip)]
    pub password: String,
}

/// Response of the [`login()`] endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct LoggedIn {
    /// Bearer token to authenticate further requests with.
    #[debug(skip)]
    pub access_token: String,

    /// Type of the [`LoggedIn::access_token`], always `bearer`.
    pub token_type: &'static str,

    /// [RFC 3339] moment when the [`LoggedIn::access_token`] expires.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub expires_at: String,

    /// Logged in [`User`].
    pub user: User,
}

/// Logs a [`User`] in, issuing a new session token.
///
/// # Errors
///
/// - If the request is not a valid [`LoginRequest`].
/// - If the credentials are wrong, or the [`User`] is inactive.
#[tracing::instrument(skip_all)]
pub async fn login(
    Extension(service): Extension<Service>,
    req: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoggedIn>, Error> {
    let Json(LoginRequest { username, password }) =
        req.map_err(AsError::into_error)?;

    let create_user_session::Output {
        token,
        session,
        user,
    } = service
        .execute(command::CreateUserSession {
            username,
            password: SecretBox::new(Box::new(user::Password::unchecked(
                password,
            ))),
        })
        .await
        .map_err(AsError::into_error)?;
    log::info!(user.id = %user.id, "`User` logged in");

    Ok(Json(LoggedIn {
        access_token: token.into(),
        token_type: "bearer",
        expires_at: session.expires_at.to_rfc3339(),
        user: user.into(),
    }))
}

/// Returns the authenticated [`User`].
///
/// # Errors
///
/// If the [`User`] has disappeared since authentication.
#[tracing::instrument(skip_all, fields(user.id = %principal.id))]
pub async fn current_user(
    Extension(service): Extension<Service>,
    principal: Principal,
) -> Result<Json<User>, Error> {
    service
        .execute(query::user::ById::by(principal.id))
        .await
        .map_err(AsError::into_error)?
        .map(|u| Json(u.into()))
        .ok_or_else(|| UserError::NotExists.into())
}

/// Acknowledges a logout.
///
/// Session tokens are not stored, so the client is expected to discard its
/// token, which stays valid until it expires.
#[expect(clippy::unused_async, reason = "`async` is required by `axum`")]
#[tracing::instrument(skip_all, fields(user.id = %principal.id))]
pub async fn logout(principal: Principal) -> Json<Message> {
    log::info!("`User` logged out");
    Json(Message {
        message: "Logged out successfully",
    })
}

/// Request of the [`update_password()`] endpoint.
#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    /// Current password.
    #[debug(skip)]
    pub old_password: String,

    /// Desired password.
    #[debug(skip)]
    pub new_password: String,
}

/// Changes the password of the authenticated [`User`].
///
/// Sessions issued before stay valid.
///
/// # Errors
///
/// - If the request is not a valid [`UpdatePasswordRequest`].
/// - If the old password is wrong.
#[tracing::instrument(skip_all, fields(user.id = %principal.id))]
pub async fn update_password(
    Extension(service): Extension<Service>,
    principal: Principal,
    req: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> Result<Json<User>, Error> {
    let Json(UpdatePasswordRequest {
        old_password,
        new_password: new,
    }) = req.map_err(AsError::into_error)?;

    let user = service
        .execute(command::UpdateUserPassword {
            user_id: principal.id,
            old_password: SecretBox::new(Box::new(user::Password::unchecked(
                old_password,
            ))),
            new_password: new_password(new)?,
        })
        .await
        .map_err(AsError::into_error)?;
    log::info!("`User` password updated");

    Ok(Json(user.into()))
}

/// Request of the [`update_profile()`] endpoint.
///
/// Omitted fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    /// New preferred language code.
    pub preferred_language: Option<String>,

    /// New learning preferences, replacing the old ones.
    pub learning_preferences: Option<serde_json::Value>,
}

/// Updates the profile of the authenticated [`User`].
///
/// # Errors
///
/// If the request is not a valid [`UpdateProfileRequest`].
#[tracing::instrument(skip_all, fields(user.id = %principal.id))]
pub async fn update_profile(
    Extension(service): Extension<Service>,
    principal: Principal,
    req: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<User>, Error> {
    let Json(UpdateProfileRequest {
        preferred_language,
        learning_preferences,
    }) = req.map_err(AsError::into_error)?;

    let cmd = command::UpdateUserProfile {
        user_id: principal.id,
        preferred_language: preferred_language
            .map(|l| {
                user::Language::new(l).ok_or(ValidationError::InvalidLanguage)
            })
            .transpose()?,
        learning_preferences: learning_preferences
            .map(|prefs| match prefs {
                serde_json::Value::Object(map) => Ok(map.into()),
                _ => Err(ValidationError::InvalidLearningPreferences),
            })
            .transpose()?,
    };

    let user = service.execute(cmd).await.map_err(AsError::into_error)?;

    Ok(Json(user.into()))
}

/// Deletes the authenticated [`User`].
///
/// All of its sessions stop being accepted, and its username and email
/// become available for registration again.
///
/// # Errors
///
/// If the [`User`] has disappeared since authentication.
#[tracing::instrument(skip_all, fields(user.id = %principal.id))]
pub async fn delete_account(
    Extension(service): Extension<Service>,
    principal: Principal,
) -> Result<Json<Message>, Error> {
    service
        .execute(command::DeleteUser {
            user_id: principal.id,
        })
        .await
        .map_err(AsError::into_error)?;
    log::info!("`User` deleted");

    Ok(Json(Message {
        message: "Account deleted successfully",
    }))
}

/// Validates a new [`user::Password`].
fn new_password(
    password: String,
) -> Result<SecretBox<user::Password>, ValidationError> {
    user::Password::new(password)
        .map(|p| SecretBox::new(Box::new(p)))
        .ok_or(ValidationError::InvalidPassword)
}

define_error! {
    enum ValidationError {
        #[code = "INVALID_USERNAME"]
        #[status = BAD_REQUEST]
        #[message = "Username must be 3 to 50 characters long"]
        InvalidUsername,

        #[code = "INVALID_EMAIL"]
        #[status = BAD_REQUEST]
        #[message = "Invalid email address"]
        InvalidEmail,

        #[code = "INVALID_PASSWORD"]
        #[status = BAD_REQUEST]
        #[message = "Password must be 6 to 128 characters long"]
        InvalidPassword,

        #[code = "INVALID_LANGUAGE"]
        #[status = BAD_REQUEST]
        #[message = "Invalid preferred language"]
        InvalidLanguage,

        #[code = "INVALID_LEARNING_PREFERENCES"]
        #[status = BAD_REQUEST]
        #[message = "Learning preferences must be a JSON object"]
        InvalidLearningPreferences,
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "User not found"]
        NotExists,
    }
}

impl AsError for create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "USERNAME_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "Username is already registered"]
                UsernameOccupied,

                #[code = "EMAIL_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "Email is already registered"]
                EmailOccupied,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Hashing(e) => e.try_as_error(),
            Self::UsernameOccupied(_) => Some(Error::UsernameOccupied.into()),
            Self::EmailOccupied(_) => Some(Error::EmailOccupied.into()),
        }
    }
}

impl AsError for create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_CREDENTIALS"]
                #[status = UNAUTHORIZED]
                #[message = "Invalid credentials"]
                InvalidCredentials,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Signing(e) => e.try_as_error(),
            Self::WrongCredentials | Self::UserInactive(_) => {
                Some(Error::InvalidCredentials.into())
            }
        }
    }
}

impl AsError for update_user_password::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "WRONG_PASSWORD"]
                #[status = BAD_REQUEST]
                #[message = "Old password is wrong"]
                WrongPassword,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Hashing(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(UserError::NotExists.into()),
            Self::WrongPassword => Some(Error::WrongPassword.into()),
        }
    }
}

impl AsError for update_user_profile::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(UserError::NotExists.into()),
        }
    }
}

impl AsError for delete_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(UserError::NotExists.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use service::domain::{self, user};

    use super::User;

    #[test]
    fn never_exposes_password_hash() {
        let now = DateTime::now();
        let user = domain::User {
            id: user::Id::new(),
            username: user::Username::new("alice").unwrap(),
            email: user::Email::new("alice@example.com").unwrap(),
            password_hash: user::PasswordHash::new(&user::Password::unchecked(
                "secret1",
            ))
            .unwrap(),
            is_active: true,
            preferred_language: user::Language::default(),
            learning_preferences: user::LearningPreferences::default(),
            created_at: now.coerce(),
            updated_at: now.coerce(),
            last_activity_at: None,
            deleted_at: None,
        };

        let json = serde_json::to_value(User::from(user)).unwrap();

        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
        assert_eq!(json["preferred_language"], "en");
        assert_eq!(json["learning_preferences"], serde_json::json!({}));
        assert!(json["last_activity_at"].is_null());
    }
}
