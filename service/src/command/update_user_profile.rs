//! [`Command`] for updating a [`User`]'s profile.

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Language, LearningPreferences};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`User`]'s profile.
///
/// Fields set to [`None`] are left untouched.
#[derive(Clone, Debug)]
pub struct UpdateUserProfile {
    /// ID of the [`User`] to update.
    pub user_id: user::Id,

    /// New preferred [`Language`] of the [`User`].
    pub preferred_language: Option<user::Language>,

    /// New [`LearningPreferences`] of the [`User`], replacing the old ones.
    pub learning_preferences: Option<user::LearningPreferences>,
}

impl<Db> Command<UpdateUserProfile> for Service<Db>
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
        cmd: UpdateUserProfile,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserProfile {
            user_id,
            preferred_language,
            learning_preferences,
        } = cmd;

        if preferred_language.is_none() && learning_preferences.is_none() {
            return self
                .database()
                .execute(Select(By::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::UserNotExists(user_id))
                .map_err(tracerr::wrap!());
        }

        self.database()
            .execute(Update(user::Change {
                user_id,
                at: DateTime::now(),
                kind: user::change::Kind::Profile {
                    preferred_language,
                    learning_preferences,
                },
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`UpdateUserProfile`] [`Command`] execution.
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
