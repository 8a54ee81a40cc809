use std::fmt::Display;

use super::UserRecord;

/// Access level of a directory user
///
/// Kept deliberately small: the backend asserts one of three values and every
/// permission decision in the management screens keys off this plus the
/// moderator assignment on the department.
#[derive(
    Debug,
    serde::Serialize,
    serde::Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("not a recognized role: {0:?}")]
pub struct InvalidRole(pub String);

impl Role {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Moderator => "MODERATOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = InvalidRole;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "MODERATOR" => Ok(Role::Moderator),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(InvalidRole(value.to_string())),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}

/// Resolves the role for a raw user record
///
/// Precedence is deliberate: a role asserted by the server is taken as is, a
/// moderator assignment is only used to infer the role when the server did not
/// send one and everything else is a plain user.
pub fn determine_role(record: &UserRecord) -> Role {
    if let Some(role) = record
        .role
        .as_deref()
        .and_then(|x| Role::try_from(x).ok())
    {
        return role;
    }
    if record.moderator_id.is_some_and(|id| id > 0) {
        return Role::Moderator;
    }
    Role::User
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    fn record_with(role: Option<&str>, moderator_id: Option<i64>) -> UserRecord {
        UserRecord {
            id: 1,
            username: "petrova.a".try_into().unwrap(),
            email: None,
            first_name: None,
            last_name: None,
            middle_name: None,
            role: role.map(|x| x.to_string()),
            moderator_id,
            departments_ids: vec![],
            authorities: None,
        }
    }

    #[test]
    fn explicit_role_always_wins() {
        for role in Role::iter() {
            // Arrange - moderator id set to values that would otherwise change the answer
            let record = record_with(Some(role.as_wire_str()), Some(9));

            // Act / Assert
            assert_eq!(determine_role(&record), role);
        }
    }

    #[rstest]
    #[case::positive_id(Some(7), Role::Moderator)]
    #[case::zero_id(Some(0), Role::User)]
    #[case::negative_id(Some(-2), Role::User)]
    #[case::no_id(None, Role::User)]
    fn role_inferred_from_moderator_assignment(
        #[case] moderator_id: Option<i64>,
        #[case] expected: Role,
    ) {
        // Arrange
        let record = record_with(None, moderator_id);

        // Act / Assert
        assert_eq!(determine_role(&record), expected);
    }

    #[rstest]
    #[case::garbage("SUPERVISOR")]
    #[case::empty("")]
    fn unrecognized_role_string_falls_through_to_inference(#[case] role: &str) {
        let record = record_with(Some(role), Some(7));
        assert_eq!(determine_role(&record), Role::Moderator);
    }

    #[test]
    fn wire_strings_round_trip() {
        for role in Role::iter() {
            assert_eq!(Role::try_from(role.as_wire_str()).unwrap(), role);
        }
        // Parsing tolerates casing from older backends
        assert_eq!(Role::try_from("admin").unwrap(), Role::Admin);
        assert!(Role::try_from("owner").is_err());
    }
}
