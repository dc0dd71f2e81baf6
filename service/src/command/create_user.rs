//! [`Command`] for creating a new [`User`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Language, Password, Username};
use crate::{
    domain::{user, User},
    infra::{
        database::{self, EMAIL_UNIQUE, USERNAME_UNIQUE},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`User`].
#[derive(Clone, Debug)]
pub struct CreateUser {
    /// [`Username`] of a new [`User`].
    pub username: user::Username,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// Preferred [`Language`] of a new [`User`].
    ///
    /// Defaults to English.
    pub preferred_language: Option<user::Language>,
}

impl<Db> Command<CreateUser> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Username>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            username,
            email,
            password,
            preferred_language,
        } = cmd;

        let u = self
            .database()
            .execute(Select(By::new(&username)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::UsernameOccupied(username)));
        }

        let u = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let password_hash = user::PasswordHash::new(password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let now = DateTime::now();
        let user = User {
            id: user::Id::new(),
            username,
            email,
            password_hash,
            is_active: true,
            preferred_language: preferred_language.unwrap_or_default(),
            learning_preferences: user::LearningPreferences::default(),
            created_at: now.coerce(),
            updated_at: now.coerce(),
            last_activity_at: None,
            deleted_at: None,
        };

        // Concurrent registrations may pass the checks above simultaneously,
        // so the storage constraints have the final word.
        match self.database().execute(Insert(user.clone())).await {
            Ok(()) => Ok(user),
            Err(e) if e.as_ref().is_unique_violation(Some(USERNAME_UNIQUE)) => {
                Err(tracerr::new!(E::UsernameOccupied(user.username)))
            }
            Err(e) if e.as_ref().is_unique_violation(Some(EMAIL_UNIQUE)) => {
                Err(tracerr::new!(E::EmailOccupied(user.email)))
            }
            Err(e) => Err(e).map_err(tracerr::map_from_and_wrap!(=> E)),
        }
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Password`] hashing error.
    #[display("Failed to hash password: {_0}")]
    #[from]
    Hashing(user::HashingError),

    /// [`Username`] is already occupied.
    #[display("`{_0}` username is occupied")]
    UsernameOccupied(#[error(not(source))] user::Username),

    /// [`Email`] is already occupied.
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{
            fixture::{password, register, service},
            Command as _,
        },
        domain::user,
    };

    use super::{CreateUser, ExecutionError};

    #[tokio::test]
    async fn creates_active_user_with_defaults() {
        let svc = service();

        let user = register(&svc, "alice", "secret1").await;

        assert!(user.is_active);
        assert!(user.is_live());
        assert_eq!(user.preferred_language.as_ref(), "en");
        assert!(user.last_activity_at.is_none());
        assert!(user
            .password_hash
            .verify(&user::Password::unchecked("secret1")));
        assert_ne!(user.password_hash.as_ref(), "secret1");
    }

    #[tokio::test]
    async fn keeps_preferred_language() {
        let svc = service();

        let user = svc
            .execute(CreateUser {
                username: user::Username::new("yuki").unwrap(),
                email: user::Email::new("yuki@example.com").unwrap(),
                password: password("secret1"),
                preferred_language: user::Language::new("ja"),
            })
            .await
            .unwrap();

        assert_eq!(user.preferred_language.as_ref(), "ja");
    }

    #[tokio::test]
    async fn rejects_occupied_username() {
        let svc = service();
        drop(register(&svc, "alice", "secret1").await);

        let err = svc
            .execute(CreateUser {
                username: user::Username::new("alice").unwrap(),
                email: user::Email::new("other@example.com").unwrap(),
                password: password("secret2"),
                preferred_language: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::UsernameOccupied(_),
        ));
    }

    #[tokio::test]
    async fn rejects_occupied_email() {
        let svc = service();
        drop(register(&svc, "alice", "secret1").await);

        let err = svc
            .execute(CreateUser {
                username: user::Username::new("bob").unwrap(),
                email: user::Email::new("alice@example.com").unwrap(),
                password: password("secret2"),
                preferred_language: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
    }
}
