//! Authenticated request context.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    middleware::Next,
    response::Response,
    Extension,
};
use derive_more::{Display, Error as StdError};
use service::{
    command::{self, authorize_user_session, Command as _},
    domain::user::{self, session},
};
use tracing as log;

use crate::{define_error, AsError, Error, Service};

/// [`user::User`] authenticated for the current request.
///
/// Available only to handlers behind [`require_auth()`].
#[derive(Clone, Debug)]
pub struct Principal {
    /// ID of the authenticated [`user::User`].
    pub id: user::Id,

    /// [`user::Username`] of the authenticated [`user::User`].
    pub username: user::Username,

    /// Whether the authenticated [`user::User`] is active.
    ///
    /// Always `true` at the moment of authentication.
    pub is_active: bool,

    /// Moment when the presented session token expires.
    pub expires_at: session::ExpirationDateTime,
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or_else(|| {
            Error::internal(
                &"missing `Principal` extension, route is unguarded",
            )
        })
    }
}

/// Middleware rejecting requests without a valid bearer token and exposing
/// the authenticated [`Principal`] to the inner handlers.
///
/// All the rejections look the same for the client, while the exact reason
/// is logged.
///
/// # Errors
///
/// - If the request doesn't carry a valid `Authorization: Bearer` header.
/// - If the token is invalid or expired.
/// - If its [`user::User`] is deleted or deactivated.
pub async fn require_auth(
    Extension(service): Extension<Service>,
    mut req: Request,
    next: Next,
) -> Result<Response, Error> {
    let token = bearer_token(req.headers()).map_err(|e| {
        log::info!("request rejected: {e}");
        e.into_error()
    })?;

    let authorize_user_session::Output { session, user } = service
        .execute(command::AuthorizeUserSession { token })
        .await
        .map_err(|e| {
            use authorize_user_session::ExecutionError as E;

            if !matches!(e.as_ref(), E::Db(_)) {
                log::info!("request rejected: {e}");
            }
            e.into_error()
        })?;

    _ = req.extensions_mut().insert(Principal {
        id: user.id,
        username: user.username,
        is_active: user.is_active,
        expires_at: session.expires_at,
    });

    Ok(next.run(req).await)
}

/// Extracts a [`session::Token`] out of the `Authorization` header.
fn bearer_token(
    headers: &http::HeaderMap,
) -> Result<session::Token, CredentialsError> {
    let header = headers
        .get(http::header::AUTHORIZATION)
        .filter(|h| !h.is_empty())
        .ok_or(CredentialsError::Missing)?;
    let header = header.to_str().map_err(|_| CredentialsError::Malformed)?;

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => {
            Ok(token.into())
        }
        _ => Err(CredentialsError::Malformed),
    }
}

/// Error of reading credentials out of a request.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, StdError)]
pub enum CredentialsError {
    /// `Authorization` header is absent or empty.
    #[display("missing credentials")]
    Missing,

    /// `Authorization` header is not a `Bearer <token>` pair.
    #[display("malformed credentials")]
    Malformed,
}

impl AsError for CredentialsError {
    fn try_as_error(&self) -> Option<Error> {
        Some(AuthError::Unauthenticated.into())
    }
}

impl AsError for authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Unauthenticated(_) | Self::StaleOrDisabledPrincipal(_) => {
                Some(AuthError::Unauthenticated.into())
            }
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "UNAUTHENTICATED"]
        #[status = UNAUTHORIZED]
        #[message = "Authentication required"]
        Unauthenticated,
    }
}
