//! [`Command`] for deleting a [`User`].

use common::{operations::Update, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`User`].
///
/// The record is kept as a tombstone, so the [`user::Id`] is never reused,
/// while the username and email become available again.
#[derive(Clone, Copy, Debug)]
pub struct DeleteUser {
    /// ID of the [`User`] to delete.
    pub user_id: user::Id,
}

impl<Db> Command<DeleteUser> for Service<Db>
where
    Db: Database<
        Update<user::Change>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteUser { user_id } = cmd;

        self.database()
            .execute(Update(user::Change {
                user_id,
                at: DateTime::now(),
                kind: user::change::Kind::Deletion,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .map(drop)
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`DeleteUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{
            fixture::{password, register, service},
            AuthorizeUserSession, Command as _, CreateUserSession,
        },
        query, Query as _,
    };

    use super::{DeleteUser, ExecutionError};

    #[tokio::test]
    async fn hides_user_and_revokes_sessions() {
        let svc = service();
        let alice = register(&svc, "alice", "secret1").await;
        let login = svc
            .execute(CreateUserSession {
                username: "alice".into(),
                password: password("secret1"),
            })
            .await
            .unwrap();

        svc.execute(DeleteUser { user_id: alice.id }).await.unwrap();

        assert!(svc
            .execute(query::user::ById::by(alice.id))
            .await
            .unwrap()
            .is_none());
        assert!(svc
            .execute(AuthorizeUserSession::from(login.token))
            .await
            .is_err());
        assert!(svc
            .execute(CreateUserSession {
                username: "alice".into(),
                password: password("secret1"),
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn frees_username_but_not_id() {
        let svc = service();
        let alice = register(&svc, "alice", "secret1").await;
        svc.execute(DeleteUser { user_id: alice.id }).await.unwrap();

        let successor = register(&svc, "alice", "secret2").await;

        assert_ne!(successor.id, alice.id);
        let err = svc
            .execute(DeleteUser { user_id: alice.id })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(_)));
    }
}
