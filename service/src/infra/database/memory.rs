//! In-memory [`Database`] implementation.
//!
//! Keeps everything in process memory, so all the data is lost on shutdown.
//! Mirrors constraints of the Postgres schema, including the uniqueness of
//! non-deleted [`User`]s' usernames and emails.

use std::{collections::HashMap, sync::Arc};

use common::operations::{By, Insert, Select, Update};
use derive_more::{Display, Error as StdError};
use tokio::sync::RwLock;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::database::{self, Database, EMAIL_UNIQUE, USERNAME_UNIQUE},
};

/// Name of the constraint keeping [`user::Id`]s unique.
const ID_UNIQUE: &str = "users_pkey";

/// In-memory [`Database`].
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// All the [`User`]s ever inserted, including deleted ones.
    users: Arc<RwLock<HashMap<user::Id, User>>>,
}

impl Memory {
    /// Checks that the provided [`User`] doesn't clash with any other
    /// non-deleted [`User`] stored.
    fn check_unique(
        users: &HashMap<user::Id, User>,
        user: &User,
    ) -> Result<(), Error> {
        if user.deleted_at.is_some() {
            return Ok(());
        }
        for other in users.values() {
            if other.id == user.id || other.deleted_at.is_some() {
                continue;
            }
            if other.username == user.username {
                return Err(Error::UniqueViolation(USERNAME_UNIQUE));
            }
            if other.email == user.email {
                return Err(Error::UniqueViolation(EMAIL_UNIQUE));
            }
        }
        Ok(())
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` violated")]
    UniqueViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |x| x == *c),
        }
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .users
            .read()
            .await
            .get(&id)
            .filter(|u| u.deleted_at.is_none())
            .cloned())
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Username>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Username>>,
    ) -> Result<Self::Ok, Self::Err> {
        let username = by.into_inner();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.deleted_at.is_none() && &u.username == username)
            .cloned())
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Email>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.deleted_at.is_none() && &u.email == email)
            .cloned())
    }
}

impl Database<Insert<User>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(tracerr::new!(database::Error::from(
                Error::UniqueViolation(ID_UNIQUE)
            )));
        }
        Self::check_unique(&users, &user)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;

        drop(users.insert(user.id, user));
        Ok(())
    }
}

impl Database<Update<user::Change>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(change): Update<user::Change>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut users = self.users.write().await;
        Ok(users
            .get_mut(&change.user_id)
            .and_then(|u| change.apply(u).then(|| u.clone())))
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Insert, Select, Update},
        DateTime,
    };

    use crate::{
        domain::{user, user::change::Kind, User},
        infra::{
            database::{EMAIL_UNIQUE, USERNAME_UNIQUE},
            Database as _,
        },
    };

    use super::Memory;

    fn change(target: &User, kind: Kind) -> user::Change {
        user::Change {
            user_id: target.id,
            at: DateTime::now(),
            kind,
        }
    }

    fn user(username: &str, email: &str) -> User {
        let now = DateTime::now();
        User {
            id: user::Id::new(),
            username: user::Username::new(username).unwrap(),
            email: user::Email::new(email).unwrap(),
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
        }
    }

    #[tokio::test]
    async fn selects_inserted_user() {
        let db = Memory::default();
        let alice = user("alice", "alice@example.com");

        db.execute(Insert(alice.clone())).await.unwrap();

        let by_id = db.execute(Select(By::new(alice.id))).await.unwrap();
        let by_name =
            db.execute(Select(By::new(&alice.username))).await.unwrap();
        let by_email = db.execute(Select(By::new(&alice.email))).await.unwrap();

        assert_eq!(by_id.map(|u| u.id), Some(alice.id));
        assert_eq!(by_name.map(|u| u.id), Some(alice.id));
        assert_eq!(by_email.map(|u| u.id), Some(alice.id));
    }

    #[tokio::test]
    async fn rejects_duplicate_username_and_email() {
        let db = Memory::default();
        db.execute(Insert(user("alice", "alice@example.com")))
            .await
            .unwrap();

        let err = db
            .execute(Insert(user("alice", "other@example.com")))
            .await
            .unwrap_err();
        assert!(err.as_ref().is_unique_violation(Some(USERNAME_UNIQUE)));
        assert!(!err.as_ref().is_unique_violation(Some(EMAIL_UNIQUE)));

        let err = db
            .execute(Insert(user("bob", "alice@example.com")))
            .await
            .unwrap_err();
        assert!(err.as_ref().is_unique_violation(Some(EMAIL_UNIQUE)));
    }

    #[tokio::test]
    async fn deleted_user_is_invisible_and_frees_username() {
        let db = Memory::default();
        let alice = user("alice", "alice@example.com");
        db.execute(Insert(alice.clone())).await.unwrap();

        let deleted = db
            .execute(Update(change(&alice, Kind::Deletion)))
            .await
            .unwrap();
        assert!(deleted.is_some_and(|u| u.deleted_at.is_some()));

        assert!(db
            .execute(Select(By::new(alice.id)))
            .await
            .unwrap()
            .is_none());
        assert!(db
            .execute(Select(By::new(&alice.username)))
            .await
            .unwrap()
            .is_none());

        let successor = user("alice", "alice@example.com");
        db.execute(Insert(successor.clone())).await.unwrap();
        assert_ne!(successor.id, alice.id);
    }

    #[tokio::test]
    async fn deleted_id_is_never_reused() {
        let db = Memory::default();
        let alice = user("alice", "alice@example.com");
        db.execute(Insert(alice.clone())).await.unwrap();
        drop(
            db.execute(Update(change(&alice, Kind::Deletion)))
                .await
                .unwrap(),
        );

        let mut clash = user("carol", "carol@example.com");
        clash.id = alice.id;

        assert!(db.execute(Insert(clash)).await.is_err());
    }

    #[tokio::test]
    async fn updates_only_changed_fields() {
        let db = Memory::default();
        let alice = user("alice", "alice@example.com");
        db.execute(Insert(alice.clone())).await.unwrap();

        let updated = db
            .execute(Update(change(&alice, Kind::Activity(false))))
            .await
            .unwrap()
            .unwrap();

        assert!(!updated.is_active);
        assert_eq!(updated.password_hash, alice.password_hash);
        assert_eq!(updated.created_at, alice.created_at);
        let stored = db.execute(Select(By::new(alice.id))).await.unwrap();
        assert_eq!(stored.map(|u| u.is_active), Some(false));
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_none() {
        let db = Memory::default();
        let ghost = user("ghost", "ghost@example.com");

        let updated = db
            .execute(Update(change(&ghost, Kind::Activity(false))))
            .await
            .unwrap();

        assert!(updated.is_none());
        assert!(db
            .execute(Select(By::new(ghost.id)))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_of_deleted_user_is_none() {
        let db = Memory::default();
        let alice = user("alice", "alice@example.com");
        db.execute(Insert(alice.clone())).await.unwrap();
        drop(
            db.execute(Update(change(&alice, Kind::Deletion)))
                .await
                .unwrap(),
        );

        for kind in [Kind::Activity(true), Kind::Login, Kind::Deletion] {
            let updated =
                db.execute(Update(change(&alice, kind))).await.unwrap();
            assert!(updated.is_none());
        }
        assert!(db
            .execute(Select(By::new(alice.id)))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn login_of_inactive_user_is_not_recorded() {
        let db = Memory::default();
        let alice = user("alice", "alice@example.com");
        db.execute(Insert(alice.clone())).await.unwrap();
        drop(
            db.execute(Update(change(&alice, Kind::Activity(false))))
                .await
                .unwrap(),
        );

        let updated =
            db.execute(Update(change(&alice, Kind::Login))).await.unwrap();

        assert!(updated.is_none());
        let stored = db
            .execute(Select(By::new(alice.id)))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.last_activity_at.is_none());
        assert!(!stored.is_active);
    }
}
