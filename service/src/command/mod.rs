//! [`Command`] definition.

pub mod authorize_user_session;
pub mod create_user;
pub mod create_user_session;
pub mod delete_user;
pub mod update_user_activity;
pub mod update_user_password;
pub mod update_user_profile;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession, create_user::CreateUser,
    create_user_session::CreateUserSession, delete_user::DeleteUser,
    update_user_activity::UpdateUserActivity,
    update_user_password::UpdateUserPassword,
    update_user_profile::UpdateUserProfile,
};
