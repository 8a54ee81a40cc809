//! Degraded-mode session user synthesis
//!
//! Used only when the credential exchange succeeded but the profile endpoint
//! could not be reached: the UI still needs a username to greet and a role to
//! decide which menus to draw. The role comes from a naming convention on the
//! login identifier and is DISPLAY ONLY - the server makes every real
//! authorization decision and will reject anything this guess overpromises.

use crate::req_args::LoginReqArgs;

use super::{Role, SessionUser, Username};

/// Identifiers that are an administrative account by convention
const FALLBACK_ADMIN_ALIASES: &[&str] = &["admin", "administrator", "root"];
/// Identifier prefixes for administrative accounts, e.g. `admin.petrov`
const FALLBACK_ADMIN_PREFIXES: &[&str] = &["admin.", "admin_"];
/// Identifier prefixes for moderator accounts, e.g. `mod.volkova`
const FALLBACK_MODERATOR_PREFIXES: &[&str] = &["moderator.", "mod."];

/// Builds a provisional [`SessionUser`] from nothing but the credentials used
/// to log in
///
/// The id is a placeholder zero so none of the id-based predicates can match
/// a real entity, and there is no moderator assignment for the same reason.
pub fn synthesize_fallback_user(args: &LoginReqArgs) -> SessionUser {
    let role = role_from_identifier(&args.username);
    SessionUser {
        id: 0u64.into(),
        username: lossy_username(&args.username),
        email: None,
        first_name: None,
        last_name: None,
        middle_name: None,
        role,
        moderator_id: None,
        departments_ids: vec![],
        authorities: vec![],
    }
}

fn role_from_identifier(identifier: &str) -> Role {
    let identifier = identifier.trim().to_ascii_lowercase();
    if FALLBACK_ADMIN_ALIASES.iter().any(|&x| identifier == x)
        || FALLBACK_ADMIN_PREFIXES
            .iter()
            .any(|x| identifier.starts_with(x))
    {
        return Role::Admin;
    }
    if FALLBACK_MODERATOR_PREFIXES
        .iter()
        .any(|x| identifier.starts_with(x))
    {
        return Role::Moderator;
    }
    Role::User
}

/// The identifier already passed the server's checks so this is expected to
/// be a valid username, but the degraded path must not be able to fail
fn lossy_username(identifier: &str) -> Username {
    let mut candidate: String = identifier
        .trim()
        .chars()
        .take(Username::MAX_LENGTH)
        .collect();
    // Length limit is in bytes, pop whole chars until it is met
    while candidate.len() > Username::MAX_LENGTH {
        candidate.pop();
    }
    if candidate.is_empty() {
        candidate = "unknown".to_string();
    }
    candidate
        .try_into()
        .expect("bounded non-empty string is a valid username")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use secrecy::SecretString;

    use super::*;

    fn args(username: &str) -> LoginReqArgs {
        LoginReqArgs::new(username, SecretString::from("x"))
    }

    #[rstest]
    #[case::exact_alias("admin", Role::Admin)]
    #[case::alias_uppercase("Administrator", Role::Admin)]
    #[case::dotted_prefix("admin.petrov", Role::Admin)]
    #[case::underscore_prefix("admin_petrov", Role::Admin)]
    #[case::moderator_prefix("moderator.volkova", Role::Moderator)]
    #[case::short_moderator_prefix("mod.volkova", Role::Moderator)]
    #[case::plain_user("ivanov.i", Role::User)]
    #[case::admin_substring_not_prefix("petrov.admin", Role::User)]
    fn role_guessed_from_identifier(#[case] identifier: &str, #[case] expected: Role) {
        // Act
        let user = synthesize_fallback_user(&args(identifier));

        // Assert
        assert_eq!(user.role, expected);
        assert_eq!(user.id, 0u64.into());
        assert_eq!(user.moderator_id, None);
    }

    #[test]
    fn synthesis_never_fails_on_odd_identifiers() {
        let user = synthesize_fallback_user(&args(&"a".repeat(60)));
        assert_eq!(user.username.as_ref().len(), Username::MAX_LENGTH);
        let user = synthesize_fallback_user(&args("  "));
        assert_eq!(user.username.as_ref(), "unknown");
    }
}
