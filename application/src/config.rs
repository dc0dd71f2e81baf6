//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use derive_more::{Debug, Display, Error as StdError, From};
use secrecy::SecretString;
use serde::Deserialize;
use service::infra::jwt;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// [`Mode`] the application runs in.
    #[serde(default)]
    pub mode: Mode,

    /// Server configuration.
    #[serde(default)]
    pub server: Server,

    /// Session configuration.
    #[serde(default)]
    pub session: Session,

    /// Database configuration.
    #[serde(default)]
    pub database: Database,

    /// Log configuration.
    #[serde(default)]
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }

    /// Builds a [`service::Config`] out of this [`Config`].
    ///
    /// # Errors
    ///
    /// - If the [`Session::secret`] is empty.
    /// - If the [`Session::secret`] is left default in [`Mode::Production`].
    /// - If the [`Session::ttl`] is zero.
    pub fn service(&self) -> Result<service::Config, ServiceConfigError> {
        let Session { secret, ttl } = &self.session;

        if self.mode == Mode::Production && secret == Session::DEFAULT_SECRET {
            return Err(ServiceConfigError::DefaultSecret);
        }

        Ok(service::Config::new(&SecretString::from(secret.clone()), *ttl)?)
    }
}

/// Error of building a [`service::Config`] out of a [`Config`].
#[derive(Debug, Display, From, StdError)]
pub enum ServiceConfigError {
    /// Built-in default secret is used in [`Mode::Production`].
    #[display("default `session.secret` must not be used in production")]
    DefaultSecret,

    /// [`jwt::Issuer`] or [`jwt::Validator`] cannot be built.
    #[display("invalid `session` configuration: {_0}")]
    #[from]
    Session(jwt::SigningError),
}

/// Mode the application runs in.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Local development, permitting insecure defaults.
    #[default]
    #[display("development")]
    Development,

    /// Production deployment.
    #[display("production")]
    Production,
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8000)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Session configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Session {
    /// Secret signing session tokens.
    ///
    /// Changing it invalidates all the issued tokens.
    #[debug(skip)]
    #[default(Session::DEFAULT_SECRET.to_owned())]
    pub secret: String,

    /// Lifetime of an issued session token.
    #[default(jwt::DEFAULT_TTL)]
    #[serde(with = "humantime_serde")]
    pub ttl: time::Duration,
}

impl Session {
    /// Built-in [`Session::secret`], acceptable in [`Mode::Development`] only.
    pub const DEFAULT_SECRET: &'static str = "dev-secret-change-me";
}

/// Database configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Database {
    /// [`Backend`] to store data in.
    pub backend: Backend,

    /// Postgres configuration.
    pub postgres: Postgres,
}

/// Database backend.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// [PostgreSQL] database.
    ///
    /// [PostgreSQL]: https://www.postgresql.org
    #[default]
    #[display("postgres")]
    Postgres,

    /// Process memory, lost on restart.
    #[display("memory")]
    Memory,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use super::{Backend, Config, Mode, ServiceConfigError};

    #[test]
    fn defaults() {
        let conf = Config::default();

        assert_eq!(conf.mode, Mode::Development);
        assert_eq!(conf.server.port, 8000);
        assert_eq!(conf.database.backend, Backend::Postgres);
        assert_eq!(conf.session.ttl.as_secs(), 24 * 60 * 60);
    }

    #[test]
    fn default_secret_is_allowed_in_development_only() {
        let mut conf = Config::default();
        assert!(conf.service().is_ok());

        conf.mode = Mode::Production;
        assert!(matches!(
            conf.service(),
            Err(ServiceConfigError::DefaultSecret),
        ));

        conf.session.secret = "prod-secret".to_owned();
        assert!(conf.service().is_ok());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut conf = Config::default();
        conf.session.secret = String::new();

        assert!(matches!(
            conf.service(),
            Err(ServiceConfigError::Session(_)),
        ));
    }
}
