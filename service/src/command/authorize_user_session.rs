//! [`Command`] for authorizing a [`User`] by a [`Session`] token.

use common::{
    operations::{By, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, jwt, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by a [`Session`] token.
///
/// Succeeds only if the token is authentic, not expired, and the [`User`] it
/// was issued for still exists and is active.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

/// Output of [`AuthorizeUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Verified [`Session`].
    pub session: Session,

    /// Current state of the [`User`] the [`Session`] belongs to.
    pub user: User,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = self
            .config()
            .session_validator
            .verify_at(&token, DateTime::now())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let user = self
            .database()
            .execute(Select(By::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(User::is_live)
            .ok_or_else(|| E::StaleOrDisabledPrincipal(session.user_id))
            .map_err(tracerr::wrap!())?;
        log::trace!(user_id = %user.id, "`Session` authorized");

        Ok(Output { session, user })
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Session`] token is invalid.
    #[display("Invalid `Session` token: {_0}")]
    #[from]
    Unauthenticated(jwt::ValidationError),

    /// [`User`] the [`Session`] belongs to doesn't exist anymore, or is
    /// deactivated.
    #[display("`User(id: {_0})` is deleted or inactive")]
    StaleOrDisabledPrincipal(#[error(not(source))] user::Id),
}
