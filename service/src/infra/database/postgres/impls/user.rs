//! [`User`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database::{self, postgres::Connection as _, Postgres},
        Database,
    },
};

/// Columns of the `users` table, in the order [`from_row()`] expects.
macro_rules! user_columns {
    () => {
        "id, username, email, password_hash, \
         is_active, preferred_language, learning_preferences, \
         created_at, updated_at, last_activity_at, deleted_at"
    };
}

/// Builds a [`User`] out of a `users` table [`Row`].
fn from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        is_active: row.get("is_active"),
        preferred_language: row.get("preferred_language"),
        learning_preferences: row.get("learning_preferences"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        last_activity_at: row.get("last_activity_at"),
        deleted_at: row.get("deleted_at"),
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Postgres {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = concat!(
            "SELECT ",
            user_columns!(),
            " FROM users \
              WHERE id = $1::UUID \
                AND deleted_at IS NULL",
        );
        Ok(self
            .connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Username>>> for Postgres {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Username>>,
    ) -> Result<Self::Ok, Self::Err> {
        let username = by.into_inner();

        const SQL: &str = concat!(
            "SELECT ",
            user_columns!(),
            " FROM users \
              WHERE username = $1::VARCHAR \
                AND deleted_at IS NULL \
              LIMIT 1",
        );
        Ok(self
            .connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(SQL, &[username])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Email>>> for Postgres {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();

        const SQL: &str = concat!(
            "SELECT ",
            user_columns!(),
            " FROM users \
              WHERE email = $1::VARCHAR \
                AND deleted_at IS NULL \
              LIMIT 1",
        );
        Ok(self
            .connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(SQL, &[email])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl Database<Insert<User>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let User {
            id,
            username,
            email,
            password_hash,
            is_active,
            preferred_language,
            learning_preferences,
            created_at,
            updated_at,
            last_activity_at,
            deleted_at,
        } = user;

        const SQL: &str = concat!(
            "INSERT INTO users (",
            user_columns!(),
            ") \
             VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::BOOL, $6::VARCHAR, $7::JSONB, \
                $8::TIMESTAMPTZ, $9::TIMESTAMPTZ, \
                $10::TIMESTAMPTZ, $11::TIMESTAMPTZ\
             )",
        );
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .exec(
                SQL,
                &[
                    &id,
                    &username,
                    &email,
                    &password_hash,
                    &is_active,
                    &preferred_language,
                    &learning_preferences,
                    &created_at,
                    &updated_at,
                    &last_activity_at,
                    &deleted_at,
                ],
            )
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl Database<Update<user::Change>> for Postgres {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(change): Update<user::Change>,
    ) -> Result<Self::Ok, Self::Err> {
        use user::change::Kind;

        let user::Change { user_id, at, kind } = change;
        let conn = self.connection().await.map_err(tracerr::wrap!())?;

        let row = match kind {
            Kind::Login => {
                const SQL: &str = concat!(
                    "UPDATE users \
                     SET last_activity_at = $2::TIMESTAMPTZ \
                     WHERE id = $1::UUID \
                       AND deleted_at IS NULL \
                       AND is_active \
                     RETURNING ",
                    user_columns!(),
                );
                conn.query_opt(SQL, &[&user_id, &at]).await
            }
            Kind::Password(hash) => {
                const SQL: &str = concat!(
                    "UPDATE users \
                     SET password_hash = $3::VARCHAR, \
                         updated_at = $2::TIMESTAMPTZ \
                     WHERE id = $1::UUID \
                       AND deleted_at IS NULL \
                     RETURNING ",
                    user_columns!(),
                );
                conn.query_opt(SQL, &[&user_id, &at, &hash]).await
            }
            Kind::Activity(is_active) => {
                const SQL: &str = concat!(
                    "UPDATE users \
                     SET is_active = $3::BOOL, \
                         updated_at = $2::TIMESTAMPTZ \
                     WHERE id = $1::UUID \
                       AND deleted_at IS NULL \
                     RETURNING ",
                    user_columns!(),
                );
                conn.query_opt(SQL, &[&user_id, &at, &is_active]).await
            }
            Kind::Profile {
                preferred_language,
                learning_preferences,
            } => {
                const SQL: &str = concat!(
                    "UPDATE users \
                     SET preferred_language = \
                            COALESCE($3::VARCHAR, preferred_language), \
                         learning_preferences = \
                            COALESCE($4::JSONB, learning_preferences), \
                         updated_at = $2::TIMESTAMPTZ \
                     WHERE id = $1::UUID \
                       AND deleted_at IS NULL \
                     RETURNING ",
                    user_columns!(),
                );
                conn.query_opt(
                    SQL,
                    &[
                        &user_id,
                        &at,
                        &preferred_language,
                        &learning_preferences,
                    ],
                )
                .await
            }
            Kind::Deletion => {
                const SQL: &str = concat!(
                    "UPDATE users \
                     SET deleted_at = $2::TIMESTAMPTZ, \
                         updated_at = $2::TIMESTAMPTZ \
                     WHERE id = $1::UUID \
                       AND deleted_at IS NULL \
                     RETURNING ",
                    user_columns!(),
                );
                conn.query_opt(SQL, &[&user_id, &at]).await
            }
        }
        .map_err(tracerr::wrap!())?;

        Ok(row.as_ref().map(from_row))
    }
}
