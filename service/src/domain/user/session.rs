//! [`Session`] definitions.

use std::fmt;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::From;
use serde::{Deserialize, Serialize};

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user;

/// Authenticated session of a [`User`], carried inside a signed [`Token`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Session {
    /// ID of the [`User`] this [`Session`] belongs to.
    #[serde(rename = "sub")]
    pub user_id: user::Id,

    /// [`user::Username`] of the [`User`] at the moment of issuing.
    pub username: user::Username,

    /// [`DateTime`] when this [`Session`] was issued.
    #[serde(rename = "iat", with = "common::datetime::serde::unix_timestamp")]
    pub issued_at: IssueDateTime,

    /// [`DateTime`] when this [`Session`] expires.
    #[serde(rename = "exp", with = "common::datetime::serde::unix_timestamp")]
    pub expires_at: ExpirationDateTime,
}

impl Session {
    /// Indicates whether this [`Session`] is expired at the provided moment.
    ///
    /// The [`Session::expires_at`] moment itself is already expired.
    #[must_use]
    pub fn is_expired_at<Of: ?Sized>(&self, now: DateTimeOf<Of>) -> bool {
        now.coerce() >= self.expires_at
    }
}

/// Bearer access token of a [`Session`].
///
/// Holding a [`Token`] proves nothing until it's validated.
#[derive(Clone, Eq, From, PartialEq)]
pub struct Token(String);

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

/// [`DateTime`] when a [`Session`] was issued.
pub type IssueDateTime = DateTimeOf<(Session, unit::Issuance)>;

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use super::{Session, Token};
    use crate::domain::user;

    fn session(expires_at: i64) -> Session {
        Session {
            user_id: user::Id::new(),
            username: user::Username::new("alice").unwrap(),
            issued_at: DateTime::from_unix_timestamp(expires_at - 60)
                .unwrap()
                .coerce(),
            expires_at: DateTime::from_unix_timestamp(expires_at)
                .unwrap()
                .coerce(),
        }
    }

    #[test]
    fn expires_exactly_at_expiration() {
        let session = session(1_700_000_000);
        let exp = DateTime::from_unix_timestamp(1_700_000_000).unwrap();

        assert!(!session.is_expired_at(exp - Duration::from_secs(1)));
        assert!(session.is_expired_at(exp));
        assert!(session.is_expired_at(exp + Duration::from_secs(1)));
    }

    #[test]
    fn serializes_registered_claim_names() {
        let session = session(1_700_000_000);

        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["sub"], session.user_id.to_string());
        assert_eq!(json["username"], "alice");
        assert_eq!(json["iat"], 1_699_999_940);
        assert_eq!(json["exp"], 1_700_000_000);
        assert_eq!(serde_json::from_value::<Session>(json).unwrap(), session);
    }

    #[test]
    fn token_is_not_leaked_by_debug() {
        let token = Token::from("header.claims.signature");

        assert_eq!(format!("{token:?}"), "Token(***)");
        assert_eq!(token.as_ref(), "header.claims.signature");
    }
}
