//! [`Command`] for creating a [`Session`].

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::user::{Password, PasswordHash, Username};
use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, jwt, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a [`Session`] by [`User`] credentials.
#[derive(Clone, Debug)]
pub struct CreateUserSession {
    /// [`Username`] of a [`User`], as provided.
    ///
    /// Not required to be a valid [`Username`], so invalid ones are rejected
    /// the same way as unknown ones.
    pub username: String,

    /// [`Password`] of a [`User`].
    pub password: SecretBox<user::Password>,
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`Token`] of the created [`Session`].
    ///
    /// [`Token`]: session::Token
    pub token: session::Token,

    /// Created [`Session`].
    pub session: Session,

    /// [`User`] whose [`Session`] has been created.
    pub user: User,
}

impl<Db> Command<CreateUserSession> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Username>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Update<user::Change>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUserSession { username, password } = cmd;
        let password = password.expose_secret();

        let user = match user::Username::new(username) {
            Some(username) => self
                .database()
                .execute(Select(By::new(&username)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?,
            None => None,
        };
        let Some(user) = user else {
            log::debug!("login attempt for an unknown username");
            user::PasswordHash::verify_decoy(password);
            return Err(tracerr::new!(E::WrongCredentials));
        };

        if !user.password_hash.verify(password) {
            return Err(tracerr::new!(E::WrongCredentials));
        }
        if !user.is_active {
            log::debug!(
                user_id = %user.id,
                "login attempt of an inactive user",
            );
            return Err(tracerr::new!(E::UserInactive(user.id)));
        }

        // Only `last_activity_at` is written, and only while the `User` is
        // still live.
        let now = DateTime::now();
        let user = self
            .database()
            .execute(Update(user::Change {
                user_id: user.id,
                at: now,
                kind: user::change::Kind::Login,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| {
                log::debug!(
                    user_id = %user.id,
                    "`User` was deleted or deactivated during login",
                );
                E::UserInactive(user.id)
            })
            .map_err(tracerr::wrap!())?;

        let (token, session) = self
            .config()
            .session_issuer
            .issue_at(&user, now)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        Ok(Output {
            token,
            session,
            user,
        })
    }
}

/// Error of [`CreateUserSession`] [`Command`] execution.
///
/// [`ExecutionError::WrongCredentials`] and [`ExecutionError::UserInactive`]
/// are distinguished for diagnostics only, and must look the same for the
/// caller.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Session`] signing error.
    #[display("Failed to sign `Session`: {_0}")]
    #[from]
    Signing(jwt::SigningError),

    /// Unknown [`Username`] or wrong [`Password`].
    #[display("Wrong `User` credentials")]
    WrongCredentials,

    /// [`User`] is deactivated.
    #[display("`User(id: {_0})` is inactive")]
    UserInactive(#[error(not(source))] user::Id),
}
