//! Infrastructure layer.

pub mod database;
pub mod jwt;

pub use self::database::{Database, Memory};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Backend, Postgres};
