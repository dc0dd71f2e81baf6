//! [`Database`]-related implementations.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};
#[cfg(feature = "postgres")]
use tracerr::Traced;

pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Name of the constraint keeping usernames of non-deleted [`User`]s unique.
///
/// [`User`]: crate::domain::User
pub const USERNAME_UNIQUE: &str = "users_username_unique";

/// Name of the constraint keeping emails of non-deleted [`User`]s unique.
///
/// [`User`]: crate::domain::User
pub const EMAIL_UNIQUE: &str = "users_email_unique";

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::Memory(e) => e.is_unique_violation(constraint),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
        }
    }
}

/// [`Database`] backend chosen at runtime.
#[cfg(feature = "postgres")]
#[derive(Clone, Debug, From)]
pub enum Backend {
    /// [`Postgres`] backend.
    Postgres(Postgres),

    /// [`Memory`] backend.
    Memory(Memory),
}

#[cfg(feature = "postgres")]
impl<Op, T> Database<Op> for Backend
where
    Postgres: Database<Op, Ok = T, Err = Traced<Error>>,
    Memory: Database<Op, Ok = T, Err = Traced<Error>>,
{
    type Ok = T;
    type Err = Traced<Error>;

    async fn execute(&self, op: Op) -> Result<Self::Ok, Self::Err> {
        match self {
            Self::Postgres(db) => db.execute(op).await,
            Self::Memory(db) => db.execute(op).await,
        }
    }
}
