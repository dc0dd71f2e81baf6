//! Targeted [`Change`]s of a stored [`User`].
//!
//! Every [`Change`] touches only the columns it names, and only while the
//! [`User`] is not deleted, so concurrent [`Change`]s never overwrite each
//! other with stale data.

use common::DateTime;

use super::{Id, Language, LearningPreferences, PasswordHash, User};

/// Change of a single aspect of a stored [`User`].
#[derive(Clone, Debug)]
pub struct Change {
    /// ID of the [`User`] to change.
    pub user_id: Id,

    /// [`DateTime`] when this [`Change`] happens.
    pub at: DateTime,

    /// What is changed.
    pub kind: Kind,
}

/// Kind of a [`Change`].
#[derive(Clone, Debug)]
pub enum Kind {
    /// Records a successful login into [`User::last_activity_at`].
    ///
    /// Applies to active [`User`]s only.
    Login,

    /// Replaces [`User::password_hash`].
    Password(PasswordHash),

    /// Sets [`User::is_active`].
    Activity(bool),

    /// Replaces the provided profile fields, leaving [`None`] ones intact.
    Profile {
        /// New [`User::preferred_language`].
        preferred_language: Option<Language>,

        /// New [`User::learning_preferences`].
        learning_preferences: Option<LearningPreferences>,
    },

    /// Marks the [`User`] as deleted.
    Deletion,
}

impl Change {
    /// Indicates whether this [`Change`] may be applied to the provided
    /// [`User`] in its current state.
    #[must_use]
    pub fn applies_to(&self, user: &User) -> bool {
        user.id == self.user_id
            && user.deleted_at.is_none()
            && (user.is_active || !matches!(self.kind, Kind::Login))
    }

    /// Applies this [`Change`] to the provided [`User`].
    ///
    /// Returns `false` and leaves the [`User`] intact if this [`Change`]
    /// doesn't [apply](Change::applies_to) to it.
    pub fn apply(self, user: &mut User) -> bool {
        if !self.applies_to(user) {
            return false;
        }

        let Self { user_id: _, at, kind } = self;
        match kind {
            Kind::Login => {
                user.last_activity_at = Some(at.coerce());
                return true;
            }
            Kind::Password(hash) => user.password_hash = hash,
            Kind::Activity(is_active) => user.is_active = is_active,
            Kind::Profile {
                preferred_language,
                learning_preferences,
            } => {
                if let Some(lang) = preferred_language {
                    user.preferred_language = lang;
                }
                if let Some(prefs) = learning_preferences {
                    user.learning_preferences = prefs;
                }
            }
            Kind::Deletion => user.deleted_at = Some(at.coerce()),
        }
        user.updated_at = at.coerce();
        true
    }
}
