//! [JWT]-based [`Session`] [`Token`]s issuing and validation.
//!
//! [JWT]: https://datatracker.ietf.org/doc/html/rfc7519

use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use common::DateTime;
use derive_more::{Debug, Display, Error};
use jsonwebtoken::{
    errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret as _, SecretString};

use crate::domain::{
    user::session::{Session, Token},
    User,
};

/// [`Algorithm`] every [`Token`] is signed with.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Length of an [`ALGORITHM`] signature (in bytes).
const SIGNATURE_LEN: usize = 32;

/// Default lifetime of an issued [`Session`].
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Issuer of signed [`Session`] [`Token`]s.
#[derive(Clone, Debug)]
pub struct Issuer {
    /// Key to sign [`Token`]s with.
    #[debug(skip)]
    key: EncodingKey,

    /// Lifetime of issued [`Session`]s.
    ttl: Duration,
}

impl Issuer {
    /// Creates a new [`Issuer`] signing with the provided `secret`.
    ///
    /// # Errors
    ///
    /// If the `secret` is empty or the `ttl` is zero.
    pub fn new(
        secret: &SecretString,
        ttl: Duration,
    ) -> Result<Self, SigningError> {
        if ttl.is_zero() {
            return Err(SigningError::InvalidTtl);
        }
        Ok(Self {
            key: EncodingKey::from_secret(non_empty(secret)?),
            ttl,
        })
    }

    /// Returns lifetime of [`Session`]s issued by this [`Issuer`].
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a new [`Session`] [`Token`] for the provided [`User`].
    ///
    /// # Errors
    ///
    /// See [`Issuer::issue_at()`].
    pub fn issue(&self, user: &User) -> Result<(Token, Session), SigningError> {
        self.issue_at(user, DateTime::now())
    }

    /// Issues a new [`Session`] [`Token`] for the provided [`User`] as if
    /// it's the provided `now` moment.
    ///
    /// Timestamps are truncated to whole seconds.
    ///
    /// # Errors
    ///
    /// If the expiration moment overflows or encoding fails.
    pub fn issue_at(
        &self,
        user: &User,
        now: DateTime,
    ) -> Result<(Token, Session), SigningError> {
        let issued_at = now.trunc_to_secs();
        let expires_at = issued_at
            .checked_add(self.ttl)
            .ok_or(SigningError::InvalidTtl)?;
        let session = Session {
            user_id: user.id,
            username: user.username.clone(),
            issued_at: issued_at.coerce(),
            expires_at: expires_at.coerce(),
        };

        let token =
            jsonwebtoken::encode(&Header::new(ALGORITHM), &session, &self.key)
                .map_err(SigningError::Encode)?;

        Ok((Token::from(token), session))
    }
}

/// Validator of [`Session`] [`Token`]s issued by an [`Issuer`] sharing the
/// same secret.
#[derive(Clone, Debug)]
pub struct Validator {
    /// Key to check [`Token`] signatures with.
    #[debug(skip)]
    key: DecodingKey,

    /// Rules of [`Token`]s validation.
    #[debug(skip)]
    validation: Validation,
}

impl Validator {
    /// Creates a new [`Validator`] checking signatures with the provided
    /// `secret`.
    ///
    /// # Errors
    ///
    /// If the `secret` is empty.
    pub fn new(secret: &SecretString) -> Result<Self, SigningError> {
        let mut validation = Validation::new(ALGORITHM);
        // Expiration is checked against an explicit moment instead.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            key: DecodingKey::from_secret(non_empty(secret)?),
            validation,
        })
    }

    /// Validates the provided [`Token`] and returns its [`Session`].
    ///
    /// # Errors
    ///
    /// See [`Validator::verify_at()`].
    pub fn verify(&self, token: &Token) -> Result<Session, ValidationError> {
        self.verify_at(token, DateTime::now())
    }

    /// Validates the provided [`Token`] as if it's the provided `now` moment,
    /// and returns its [`Session`].
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MalformedToken`] if the [`Token`] is not a
    ///   well-formed signed [`Session`];
    /// - [`ValidationError::InvalidSignature`] if the [`Token`] wasn't signed
    ///   with the expected secret and [`Algorithm`];
    /// - [`ValidationError::TokenExpired`] if the [`Session`] is expired at
    ///   `now`.
    pub fn verify_at(
        &self,
        token: &Token,
        now: DateTime,
    ) -> Result<Session, ValidationError> {
        check_structure(token.as_ref())?;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.key,
            &self.validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                ValidationError::InvalidSignature
            }
            ErrorKind::MissingRequiredClaim(_) => {
                ValidationError::MalformedToken("missing required claim")
            }
            ErrorKind::Json(_) => {
                ValidationError::MalformedToken("invalid claims")
            }
            _ => ValidationError::MalformedToken("undecodable token"),
        })?
        .claims;

        if session.is_expired_at(now) {
            return Err(ValidationError::TokenExpired);
        }
        Ok(session)
    }
}

/// Checks that the provided `token` has the compact form of a signed
/// [`Session`]: three base64url segments, the first two being JSON objects
/// and the last one being an [`ALGORITHM`] signature.
fn check_structure(token: &str) -> Result<(), ValidationError> {
    use ValidationError as E;

    let mut segments = token.split('.');
    let (Some(header), Some(claims), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(E::MalformedToken("not three segments"));
    };

    for (segment, what) in [(header, "header"), (claims, "claims")] {
        let is_object = URL_SAFE_NO_PAD
            .decode(segment)
            .ok()
            .and_then(|raw| {
                serde_json::from_slice::<serde_json::Value>(&raw).ok()
            })
            .is_some_and(|json| json.is_object());
        if !is_object {
            return Err(E::MalformedToken(what));
        }
    }

    let signature_len = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| E::MalformedToken("signature"))?
        .len();
    if signature_len != SIGNATURE_LEN {
        return Err(E::MalformedToken("signature"));
    }

    Ok(())
}

/// Returns the exposed `secret` bytes, unless they're empty.
fn non_empty(secret: &SecretString) -> Result<&[u8], SigningError> {
    let secret = secret.expose_secret().as_bytes();
    if secret.is_empty() {
        return Err(SigningError::MissingSecret);
    }
    Ok(secret)
}

/// Error of signing [`Session`] [`Token`]s.
#[derive(Debug, Display, Error)]
pub enum SigningError {
    /// Signing secret is empty.
    #[display("Signing secret is empty")]
    MissingSecret,

    /// [`Session`] lifetime is zero or too large.
    #[display("Invalid `Session` lifetime")]
    InvalidTtl,

    /// [`jsonwebtoken`] encoding error.
    #[display("Failed to encode a JSON Web Token: {_0}")]
    Encode(jsonwebtoken::errors::Error),
}

/// Error of validating a [`Session`] [`Token`].
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum ValidationError {
    /// [`Token`] is not a well-formed signed [`Session`].
    #[display("Malformed token: {_0}")]
    MalformedToken(#[error(not(source))] &'static str),

    /// [`Token`] signature doesn't match.
    #[display("Token signature mismatch")]
    InvalidSignature,

    /// [`Session`] is expired.
    #[display("Token expired")]
    TokenExpired,
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use common::DateTime;
    use secrecy::SecretString;

    use crate::domain::{user, user::session::Token, User};

    use super::{Issuer, SigningError, ValidationError, Validator, DEFAULT_TTL};

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    fn alice() -> User {
        let now = DateTime::now();
        User {
            id: user::Id::new(),
            username: user::Username::new("alice").unwrap(),
            email: user::Email::new("alice@example.com").unwrap(),
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

    fn at(secs: i64) -> DateTime {
        DateTime::from_unix_timestamp(secs).unwrap()
    }

    #[test]
    fn rejects_empty_secret() {
        assert!(matches!(
            Issuer::new(&secret(""), DEFAULT_TTL),
            Err(SigningError::MissingSecret),
        ));
        assert!(matches!(
            Validator::new(&secret("")),
            Err(SigningError::MissingSecret),
        ));
        assert!(matches!(
            Issuer::new(&secret("k"), Duration::ZERO),
            Err(SigningError::InvalidTtl),
        ));
    }

    #[test]
    fn verifies_issued_token() {
        let issuer = Issuer::new(&secret("k1"), DEFAULT_TTL).unwrap();
        let validator = Validator::new(&secret("k1")).unwrap();
        let user = alice();

        let (token, issued) = issuer.issue_at(&user, at(1_000)).unwrap();
        let session = validator.verify_at(&token, at(1_000)).unwrap();

        assert_eq!(session, issued);
        assert_eq!(session.user_id, user.id);
        assert_eq!(session.username, user.username);
        assert_eq!(session.issued_at.unix_timestamp(), 1_000);
        assert_eq!(session.expires_at.unix_timestamp(), 1_000 + 86_400);
    }

    #[test]
    fn truncates_timestamps_to_seconds() {
        let issuer = Issuer::new(&secret("k1"), DEFAULT_TTL).unwrap();

        let (_, session) = issuer
            .issue_at(&alice(), at(1_000) + Duration::from_millis(999))
            .unwrap();

        assert_eq!(session.issued_at.unix_timestamp(), 1_000);
        assert_eq!(session.expires_at.unix_timestamp(), 87_400);
    }

    #[test]
    fn expires_exactly_at_ttl() {
        let issuer =
            Issuer::new(&secret("k1"), Duration::from_secs(60)).unwrap();
        let validator = Validator::new(&secret("k1")).unwrap();
        let (token, _) = issuer.issue_at(&alice(), at(1_000)).unwrap();

        assert!(validator.verify_at(&token, at(1_059)).is_ok());
        assert_eq!(
            validator.verify_at(&token, at(1_060)),
            Err(ValidationError::TokenExpired),
        );
        assert_eq!(
            validator.verify_at(&token, at(5_000)),
            Err(ValidationError::TokenExpired),
        );
    }

    #[test]
    fn detects_foreign_secret() {
        let issuer = Issuer::new(&secret("k1"), DEFAULT_TTL).unwrap();
        let validator = Validator::new(&secret("k2")).unwrap();
        let (token, _) = issuer.issue_at(&alice(), at(1_000)).unwrap();

        assert_eq!(
            validator.verify_at(&token, at(1_000)),
            Err(ValidationError::InvalidSignature),
        );
    }

    #[test]
    fn detects_tampered_claims() {
        let issuer = Issuer::new(&secret("k1"), DEFAULT_TTL).unwrap();
        let validator = Validator::new(&secret("k1")).unwrap();
        let (token, _) = issuer.issue_at(&alice(), at(1_000)).unwrap();

        let token: String = token.into();
        let segments = token.split('.').collect::<Vec<_>>();
        let mut claims: serde_json::Value = serde_json::from_slice(
            &URL_SAFE_NO_PAD.decode(segments[1]).unwrap(),
        )
        .unwrap();
        claims["exp"] = serde_json::json!(9_999_999_999_i64);
        let forged = format!(
            "{}.{}.{}",
            segments[0],
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap()),
            segments[2],
        );

        assert_eq!(
            validator.verify_at(&Token::from(forged), at(1_000)),
            Err(ValidationError::InvalidSignature),
        );
    }

    #[test]
    fn detects_malformed_tokens() {
        let issuer = Issuer::new(&secret("k1"), DEFAULT_TTL).unwrap();
        let validator = Validator::new(&secret("k1")).unwrap();
        let (token, _) = issuer.issue_at(&alice(), at(1_000)).unwrap();
        let token: String = token.into();

        for garbage in [
            "",
            "garbage",
            "a.b",
            "a.b.c.d",
            "!!!.???.***",
            &token[..token.len() - 5],
            &token[..token.rfind('.').unwrap()],
        ] {
            assert!(
                matches!(
                    validator.verify_at(&Token::from(garbage), at(1_000)),
                    Err(ValidationError::MalformedToken(_)),
                ),
                "`{garbage}` must be malformed",
            );
        }
    }

    #[test]
    fn requires_subject_claim() {
        let validator = Validator::new(&secret("k1")).unwrap();
        let claims = serde_json::json!({
            "username": "alice",
            "iat": 1_000,
            "exp": 90_000,
        });
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(b"k1"),
        )
        .unwrap();

        assert!(matches!(
            validator.verify_at(&Token::from(token), at(1_000)),
            Err(ValidationError::MalformedToken(_)),
        ));
    }
}
