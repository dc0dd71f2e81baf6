//! [`User`] definitions.

pub mod change;
pub mod credential;
pub mod session;

use std::{str::FromStr, sync::LazyLock};

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::{
    change::Change,
    credential::{HashingError, Password, PasswordHash},
    session::Session,
};

/// Registered user of the platform.
///
/// [`User`]s are never removed physically: deletion only sets
/// [`User::deleted_at`], after which the [`User`] is invisible to every
/// lookup, but its record (and [`Id`]) stays reserved.
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`Username`] of this [`User`], used to log in.
    pub username: Username,

    /// [`Email`] of this [`User`].
    pub email: Email,

    /// [`PasswordHash`] of this [`User`].
    pub password_hash: PasswordHash,

    /// Indicator whether this [`User`] is allowed to log in and use existing
    /// sessions.
    pub is_active: bool,

    /// [`Language`] this [`User`] prefers.
    pub preferred_language: Language,

    /// Free-form [`LearningPreferences`] of this [`User`].
    pub learning_preferences: LearningPreferences,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`User`] was modified last time.
    pub updated_at: ModificationDateTime,

    /// [`DateTime`] when this [`User`] logged in last time, if ever.
    pub last_activity_at: Option<ActivityDateTime>,

    /// [`DateTime`] when this [`User`] was deleted.
    pub deleted_at: Option<DeletionDateTime>,
}

impl User {
    /// Indicates whether this [`User`] may be authenticated right now.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.is_active && self.deleted_at.is_none()
    }
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[expect(clippy::new_without_default, reason = "random value")]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for Id {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|_| "invalid `user::Id`")
    }
}

/// Unique name of a [`User`] used to log in.
#[derive(Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Minimal length of a [`Username`] (in characters).
    pub const MIN_LEN: usize = 3;

    /// Maximal length of a [`Username`] (in characters).
    pub const MAX_LEN: usize = 50;

    /// Creates a new [`Username`] if the given `username` is valid.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Option<Self> {
        let username = username.into();
        Self::check(&username).then_some(Self(username))
    }

    /// Checks whether the given `username` is a valid [`Username`]:
    /// - must be between [`Username::MIN_LEN`] and [`Username::MAX_LEN`]
    ///   characters long;
    /// - must not start/end with whitespace;
    /// - must not contain control characters.
    fn check(username: impl AsRef<str>) -> bool {
        let username = username.as_ref();
        let len = username.chars().count();
        (Self::MIN_LEN..=Self::MAX_LEN).contains(&len)
            && username.trim() == username
            && !username.chars().any(char::is_control)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Username {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Username`")
    }
}

/// Email address of a [`User`].
#[derive(Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximal length of an [`Email`] (in characters).
    pub const MAX_LEN: usize = 100;

    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format: a non-empty local
        /// part, a single `@`, and a dotted domain without whitespace.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("valid regex")
        });

        let address = address.as_ref();
        address.chars().count() <= Self::MAX_LEN && REGEX.is_match(address)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Language code preferred by a [`User`] (`en`, `ja`, etc).
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Language(String);

impl Language {
    /// Maximal length of a [`Language`] code (in characters).
    pub const MAX_LEN: usize = 10;

    /// Creates a new [`Language`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        Self::check(&code).then_some(Self(code))
    }

    /// Checks whether the given `code` is a valid [`Language`].
    fn check(code: impl AsRef<str>) -> bool {
        let code = code.as_ref();
        !code.is_empty()
            && code.chars().count() <= Self::MAX_LEN
            && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    }
}

impl Default for Language {
    fn default() -> Self {
        Self("en".to_owned())
    }
}

impl AsRef<str> for Language {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Language {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Language`")
    }
}

/// Free-form learning preferences of a [`User`].
///
/// Always a JSON object.
#[derive(AsRef, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct LearningPreferences(serde_json::Value);

impl LearningPreferences {
    /// Returns these [`LearningPreferences`] as a JSON object.
    #[must_use]
    pub fn as_object(
        &self,
    ) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.0.as_object()
    }
}

impl Default for LearningPreferences {
    fn default() -> Self {
        Self(serde_json::Value::Object(serde_json::Map::new()))
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for LearningPreferences {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(serde_json::Value::Object(map))
    }
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;

/// [`DateTime`] when a [`User`] was modified.
pub type ModificationDateTime = DateTimeOf<(User, unit::Modification)>;

/// [`DateTime`] of a [`User`]'s last activity.
pub type ActivityDateTime = DateTimeOf<(User, unit::Activity)>;

/// [`DateTime`] when a [`User`] was deleted.
pub type DeletionDateTime = DateTimeOf<(User, unit::Deletion)>;
