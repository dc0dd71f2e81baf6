//! [`Command`] for updating a [`user::Password`].

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Password, PasswordHash};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`user::Password`].
///
/// Always produces a freshly salted [`PasswordHash`].
#[derive(Clone, Debug)]
pub struct UpdateUserPassword {
    /// ID of the [`User`] whose [`Password`] should be updated.
    pub user_id: user::Id,

    /// Old [`Password`] of the [`User`].
    pub old_password: SecretBox<user::Password>,

    /// New [`Password`] of the [`User`].
    pub new_password: SecretBox<user::Password>,
}

impl<Db> Command<UpdateUserPassword> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Update<user::Change>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateUserPassword,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserPassword {
            user_id,
            old_password,
            new_password,
        } = cmd;

        let user = self
            .database()
            .execute(Select(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        if !user.password_hash.verify(old_password.expose_secret()) {
            return Err(tracerr::new!(E::WrongPassword));
        }

        let hash = user::PasswordHash::new(new_password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        self.database()
            .execute(Update(user::Change {
                user_id,
                at: DateTime::now(),
                kind: user::change::Kind::Password(hash),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`UpdateUserPassword`] [`Command`] execution.
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

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// Wrong old [`Password`] provided.
    #[display("Wrong old password")]
    WrongPassword,
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{
            fixture::{password, register, service},
            Command as _, CreateUserSession, DeleteUser,
        },
        domain::user,
    };

    use super::{ExecutionError, UpdateUserPassword};

    #[tokio::test]
    async fn replaces_password() {
        let svc = service();
        let alice = register(&svc, "alice", "secret1").await;

        let updated = svc
            .execute(UpdateUserPassword {
                user_id: alice.id,
                old_password: password("secret1"),
                new_password: password("secret2"),
            })
            .await
            .unwrap();

        assert_ne!(updated.password_hash, alice.password_hash);
        assert!(svc
            .execute(CreateUserSession {
                username: "alice".into(),
                password: password("secret1"),
            })
            .await
            .is_err());
        assert!(svc
            .execute(CreateUserSession {
                username: "alice".into(),
                password: password("secret2"),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn rehashes_same_password_with_new_salt() {
        let svc = service();
        let alice = register(&svc, "alice", "secret1").await;

        let updated = svc
            .execute(UpdateUserPassword {
                user_id: alice.id,
                old_password: password("secret1"),
                new_password: password("secret1"),
            })
            .await
            .unwrap();

        assert_ne!(updated.password_hash, alice.password_hash);
        assert!(updated
            .password_hash
            .verify(&user::Password::unchecked("secret1")));
    }

    #[tokio::test]
    async fn requires_old_password() {
        let svc = service();
        let alice = register(&svc, "alice", "secret1").await;

        let err = svc
            .execute(UpdateUserPassword {
                user_id: alice.id,
                old_password: password("wrong"),
                new_password: password("secret2"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::WrongPassword));
    }

    #[tokio::test]
    async fn fails_for_unknown_user() {
        let svc = service();
        let id = user::Id::new();

        let err = svc
            .execute(UpdateUserPassword {
                user_id: id,
                old_password: password("secret1"),
                new_password: password("secret2"),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::UserNotExists(i) if *i == id,
        ));
    }

    #[tokio::test]
    async fn fails_for_deleted_user() {
        let svc = service();
        let alice = register(&svc, "alice", "secret1").await;
        svc.execute(DeleteUser { user_id: alice.id }).await.unwrap();

        let err = svc
            .execute(UpdateUserPassword {
                user_id: alice.id,
                old_password: password("secret1"),
                new_password: password("secret2"),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::UserNotExists(i) if *i == alice.id,
        ));
    }
}
