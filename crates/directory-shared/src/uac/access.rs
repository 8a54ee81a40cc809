//! The single home for the management screens' permission checks
//!
//! Every predicate is a pure function of the current session user (and the
//! entity acted on) and is total: an unauthenticated caller gets `false`,
//! never a panic. These checks only decide what the UI offers, the server
//! enforces the real authorization on every request.

use crate::department::Department;

use super::{determine_role, Role, SessionUser, UserRecord};

pub fn is_admin(user: Option<&SessionUser>) -> bool {
    user.is_some_and(|u| u.role == Role::Admin)
}

pub fn is_moderator(user: Option<&SessionUser>) -> bool {
    user.is_some_and(|u| u.role == Role::Moderator)
}

pub fn can_manage_users(user: Option<&SessionUser>) -> bool {
    is_admin(user)
}

pub fn can_manage_departments(user: Option<&SessionUser>) -> bool {
    is_admin(user)
}

pub fn can_delete_user(user: Option<&SessionUser>) -> bool {
    is_admin(user)
}

/// Moderators may never delete, not even their own department
pub fn can_delete_department(user: Option<&SessionUser>) -> bool {
    is_admin(user)
}

pub fn can_edit_department(user: Option<&SessionUser>, department: &Department) -> bool {
    if is_admin(user) {
        return true;
    }
    match user {
        Some(u) if u.role == Role::Moderator => department.moderator_id == Some(u.id),
        _ => false,
    }
}

pub fn can_edit_user(
    user: Option<&SessionUser>,
    target: &UserRecord,
    department: Option<&Department>,
) -> bool {
    if is_admin(user) {
        return true;
    }
    let (Some(u), Some(department)) = (user, department) else {
        return false;
    };
    u.role == Role::Moderator
        && department.moderator_login.as_ref() == Some(&u.username)
        && determine_role(target) == Role::User
}

pub fn can_remove_user_from_department(
    user: Option<&SessionUser>,
    target: &UserRecord,
    department: &Department,
) -> bool {
    can_edit_user(user, target, Some(department))
}
