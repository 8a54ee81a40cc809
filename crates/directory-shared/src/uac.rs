//! Shared items related to user account control

mod access;
mod errors;
mod fallback;
mod responses;
mod role;
mod user;

pub use access::{
    can_delete_department, can_delete_user, can_edit_department, can_edit_user,
    can_manage_departments, can_manage_users, can_remove_user_from_department, is_admin,
    is_moderator,
};
pub use errors::{AuthError, RegistrationError};
pub use fallback::synthesize_fallback_user;
pub use responses::LoginResponse;
pub use role::{determine_role, InvalidRole, Role};
pub use user::{Authority, EmailAddress, SessionUser, UserRecord, Username};
