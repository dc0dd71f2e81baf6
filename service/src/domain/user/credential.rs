//! [`Password`]s and their one-way salted [`PasswordHash`]es.

use std::{fmt, sync::OnceLock};

use argon2::{
    Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier as _,
    Version,
};
use derive_more::{Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use secrecy::{zeroize::Zeroize, CloneableSecret};

/// Plain password of a [`User`].
///
/// Never logged, never stored.
///
/// [`User`]: crate::domain::User
#[derive(Clone)]
pub struct Password(String);

impl Password {
    /// Minimal length of a [`Password`] (in characters).
    pub const MIN_LEN: usize = 6;

    /// Maximal length of a [`Password`] (in characters).
    pub const MAX_LEN: usize = 128;

    /// Creates a new [`Password`] if the given `password` satisfies the
    /// length policy for newly chosen passwords.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        let len = password.chars().count();
        (Self::MIN_LEN..=Self::MAX_LEN)
            .contains(&len)
            .then_some(Self(password))
    }

    /// Wraps the given `password` as is, without any policy checks.
    ///
    /// Used for passwords that are only verified, never stored.
    #[must_use]
    pub fn unchecked(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Returns raw bytes of this [`Password`].
    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl CloneableSecret for Password {}

/// Argon2 memory cost (in KiB).
const M_COST: u32 = 19 * 1024;

/// Argon2 number of iterations.
const T_COST: u32 = 2;

/// Argon2 degree of parallelism.
const P_COST: u32 = 1;

/// Length of a random salt (in bytes).
const SALT_LEN: usize = 16;

/// One-way salted hash of a [`Password`] in the PHC string format.
///
/// Encodes the algorithm, its parameters and the salt, so verification
/// doesn't depend on the current hashing settings.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes the provided [`Password`] with a fresh random salt.
    ///
    /// # Errors
    ///
    /// If no entropy is available or hashing itself fails.
    pub fn new(password: &Password) -> Result<Self, HashingError> {
        let mut salt = [0; SALT_LEN];
        getrandom::getrandom(&mut salt).map_err(HashingError::Entropy)?;
        let salt = password_hash::SaltString::encode_b64(&salt)
            .map_err(HashingError::Hash)?;

        let params = Params::new(M_COST, T_COST, P_COST, None)
            .map_err(HashingError::Params)?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .map(|phc| Self(phc.to_string()))
            .map_err(HashingError::Hash)
    }

    /// Checks whether the provided [`Password`] matches this [`PasswordHash`].
    ///
    /// Comparison is constant-time. Unparsable hashes never match.
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        password_hash::PasswordHash::new(&self.0).is_ok_and(|phc| {
            Argon2::default()
                .verify_password(password.as_bytes(), &phc)
                .is_ok()
        })
    }

    /// Burns the same amount of work as [`PasswordHash::verify()`] for a
    /// [`User`] that doesn't exist, so both cases take comparable time.
    ///
    /// [`User`]: crate::domain::User
    pub fn verify_decoy(password: &Password) {
        if let Some(decoy) = Self::decoy() {
            _ = decoy.verify(password);
        }
    }

    /// Computes the [`PasswordHash`] used by [`PasswordHash::verify_decoy()`]
    /// upfront, so the first unknown-user login costs the same as others.
    pub fn prepare_decoy() {
        _ = Self::decoy();
    }

    /// Returns the [`PasswordHash`] verified against unknown [`User`]s.
    ///
    /// [`User`]: crate::domain::User
    fn decoy() -> Option<&'static Self> {
        DECOY
            .get_or_init(|| {
                Self::new(&Password::unchecked("decoy-password")).ok()
            })
            .as_ref()
    }
}

/// [`PasswordHash`] verified against unknown [`User`]s.
///
/// [`User`]: crate::domain::User
pub(crate) static DECOY: OnceLock<Option<PasswordHash>> = OnceLock::new();

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error of hashing a [`Password`].
#[derive(Debug, Display, Error)]
pub enum HashingError {
    /// Failed to gather random bytes for a salt.
    #[display("Failed to gather salt entropy: {_0}")]
    Entropy(getrandom::Error),

    /// Invalid Argon2 parameters.
    #[display("Invalid hashing parameters: {_0}")]
    Params(argon2::Error),

    /// Failed to compute the hash.
    #[display("Failed to hash password: {_0}")]
    Hash(password_hash::Error),
}

#[cfg(test)]
mod spec {
    use super::{Password, PasswordHash, DECOY};

    #[test]
    fn password_length_policy() {
        assert!(Password::new("12345").is_none());
        assert!(Password::new("123456").is_some());
        assert!(Password::new("a".repeat(128)).is_some());
        assert!(Password::new("a".repeat(129)).is_none());
    }

    #[test]
    fn password_is_not_leaked_by_debug() {
        let password = Password::unchecked("secret1");

        assert_eq!(format!("{password:?}"), "Password(***)");
    }

    #[test]
    fn hash_verifies_only_original_password() {
        let hash = PasswordHash::new(&Password::unchecked("secret1")).unwrap();

        assert!(hash.verify(&Password::unchecked("secret1")));
        assert!(!hash.verify(&Password::unchecked("secret2")));
        assert!(!hash.verify(&Password::unchecked("")));
    }

    #[test]
    fn hash_is_salted() {
        let password = Password::unchecked("secret1");

        let first = PasswordHash::new(&password).unwrap();
        let second = PasswordHash::new(&password).unwrap();

        assert_ne!(first, second);
        assert!(first.verify(&password));
        assert!(second.verify(&password));
    }

    #[test]
    fn hash_is_self_describing() {
        let hash = PasswordHash::new(&Password::unchecked("secret1")).unwrap();

        assert!(hash.as_ref().starts_with("$argon2id$v=19$m=19456,t=2,p=1$"));
        assert!(!hash.as_ref().contains("secret1"));
    }

    #[test]
    fn garbage_hash_never_matches() {
        let hash = PasswordHash("not-a-phc-string".into());

        assert!(!hash.verify(&Password::unchecked("not-a-phc-string")));
    }

    #[test]
    fn decoy_is_prepared_once() {
        PasswordHash::prepare_decoy();
        let decoy = DECOY.get().and_then(Option::as_ref).unwrap();

        PasswordHash::verify_decoy(&Password::unchecked("secret1"));

        assert!(std::ptr::eq(
            decoy,
            DECOY.get().and_then(Option::as_ref).unwrap(),
        ));
        assert!(decoy.verify(&Password::unchecked("decoy-password")));
    }
}
