//! [`Command`] for activating or deactivating a [`User`].

use common::{operations::Update, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for activating or deactivating a [`User`].
///
/// A deactivated [`User`] can't log in, and all of its existing sessions stop
/// being accepted immediately.
#[derive(Clone, Copy, Debug)]
pub struct UpdateUserActivity {
    /// ID of the [`User`] to update.
    pub user_id: user::Id,

    /// Whether the [`User`] should be active.
    pub is_active: bool,
}

impl<Db> Command<UpdateUserActivity> for Service<Db>
where
    Db: Database<
        Update<user::Change>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateUserActivity,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserActivity { user_id, is_active } = cmd;

        self.database()
            .execute(Update(user::Change {
                user_id,
                at: DateTime::now(),
                kind: user::change::Kind::Activity(is_active),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`UpdateUserActivity`] [`Command`] execution.
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
            AuthorizeUserSession, Command as _, CreateUserSession, DeleteUser,
        },
        query, Query as _,
    };

    use super::{ExecutionError, UpdateUserActivity};

    #[tokio::test]
    async fn deactivation_revokes_sessions_and_reactivation_restores_them() {
        let svc = service();
        let alice = register(&svc, "alice", "secret1").await;
        let login = svc
            .execute(CreateUserSession {
                username: "alice".into(),
                password: password("secret1"),
            })
            .await
            .unwrap();

        let user = svc
            .execute(UpdateUserActivity {
                user_id: alice.id,
                is_active: false,
            })
            .await
            .unwrap();
        assert!(!user.is_active);
        assert!(svc
            .execute(AuthorizeUserSession::from(login.token.clone()))
            .await
            .is_err());

        drop(
            svc.execute(UpdateUserActivity {
                user_id: alice.id,
                is_active: true,
            })
            .await
            .unwrap(),
        );
        assert!(svc
            .execute(AuthorizeUserSession::from(login.token))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn does_not_resurrect_deleted_user() {
        let svc = service();
        let alice = register(&svc, "alice", "secret1").await;
        svc.execute(DeleteUser { user_id: alice.id }).await.unwrap();

        let err = svc
            .execute(UpdateUserActivity {
                user_id: alice.id,
                is_active: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::UserNotExists(i) if *i == alice.id,
        ));
        assert!(svc
            .execute(query::user::ById::by(alice.id))
            .await
            .unwrap()
            .is_none());
    }
}
