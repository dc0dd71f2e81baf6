//! Service contains the authentication and session logic of the
//! application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;

use std::time::Duration;

use derive_more::Debug;
use secrecy::SecretString;

use domain::user::PasswordHash;
#[cfg(doc)]
use domain::user::Session;
#[cfg(doc)]
use infra::Database;
use infra::jwt;

pub use self::{command::Command, query::Query};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [`jwt::Issuer`] of [`Session`] tokens.
    pub session_issuer: jwt::Issuer,

    /// [`jwt::Validator`] of [`Session`] tokens.
    pub session_validator: jwt::Validator,
}

impl Config {
    /// Creates a new [`Config`] signing [`Session`]s with the provided
    /// `secret` for the provided `ttl`.
    ///
    /// Also prepares the decoy [`PasswordHash`] verified on logins of unknown
    /// users.
    ///
    /// # Errors
    ///
    /// If the `secret` is empty or the `ttl` is invalid.
    pub fn new(
        secret: &SecretString,
        ttl: Duration,
    ) -> Result<Self, jwt::SigningError> {
        PasswordHash::prepare_decoy();
        Ok(Self {
            session_issuer: jwt::Issuer::new(secret, ttl)?,
            session_validator: jwt::Validator::new(secret)?,
        })
    }
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    #[must_use]
    pub fn new(config: Config, database: Db) -> Self {
        Self { config, database }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use secrecy::SecretString;

    use crate::domain::user::credential::DECOY;

    use super::Config;

    #[test]
    fn config_prepares_decoy_hash() {
        let secret = SecretString::from("test-secret".to_owned());

        drop(Config::new(&secret, Duration::from_secs(60)).unwrap());

        assert!(DECOY.get().is_some_and(Option::is_some));
    }
}
