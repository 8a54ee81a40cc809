use std::fmt::Display;

use crate::{errors::ConversionError, id::DbId};

use super::{determine_role, Role};

/// Represents a username and is constrained to not be an empty string
#[derive(
    Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct Username(String);

impl Username {
    pub const MAX_LENGTH: usize = 32;
}

impl TryFrom<String> for Username {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(ConversionError::Empty);
        }
        if value.len() > Self::MAX_LENGTH {
            return Err(ConversionError::MaxExceeded {
                max: Self::MAX_LENGTH,
                actual: value.len(),
            });
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Username {
    type Error = ConversionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.to_string().try_into()
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub const MAX_LENGTH: usize = 100;
}

impl TryFrom<String> for EmailAddress {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(ConversionError::Empty);
        }
        if value.len() > Self::MAX_LENGTH {
            return Err(ConversionError::MaxExceeded {
                max: Self::MAX_LENGTH,
                actual: value.len(),
            });
        }
        // Not a full validation, just enough to catch values that are clearly
        // not an address before they go over the wire
        if !value.contains('@') {
            return Err(ConversionError::InvalidFormat(value));
        }
        Ok(Self(value))
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Granted authority as the backend reports it, carried as opaque data
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct Authority {
    pub authority: String,
}

/// A user exactly as the backend sends it
///
/// Tolerant by design: the profile endpoint and the directory listings leave
/// most fields out depending on the caller's permissions, and older backends
/// omit `role` entirely. Use [`SessionUser::try_from`] to get a record into a
/// shape the rest of the client is allowed to rely on.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub username: Username,
    #[serde(default)]
    pub email: Option<EmailAddress>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub moderator_id: Option<i64>,
    #[serde(default)]
    pub departments_ids: Vec<i64>,
    #[serde(default)]
    pub authorities: Option<Vec<Authority>>,
}

/// The authenticated user's resolved profile
///
/// The only way to construct one from wire data is [`SessionUser::try_from`]
/// so a session user always carries a resolved [`Role`].
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: DbId,
    pub username: Username,
    pub email: Option<EmailAddress>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub role: Role,
    pub moderator_id: Option<DbId>,
    pub departments_ids: Vec<DbId>,
    pub authorities: Vec<Authority>,
}

impl SessionUser {
    /// Name to show in the header, falls back to the username when the
    /// profile fields are not populated
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(single), None) | (None, Some(single)) => single.clone(),
            (None, None) => self.username.to_string(),
        }
    }
}

impl TryFrom<UserRecord> for SessionUser {
    type Error = anyhow::Error;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let role = determine_role(&record);
        let id = record.id.try_into()?;
        // A missing or nonsensical moderator assignment is tolerated, it only
        // ever narrows what the UI offers
        let moderator_id = record
            .moderator_id
            .filter(|&x| x > 0)
            .and_then(|x| DbId::try_from(x).ok());
        let departments_ids = record
            .departments_ids
            .into_iter()
            .filter_map(|x| DbId::try_from(x).ok())
            .collect();
        Ok(Self {
            id,
            username: record.username,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            middle_name: record.middle_name,
            role,
            moderator_id,
            departments_ids,
            authorities: record.authorities.unwrap_or_default(),
        })
    }
}

impl From<&SessionUser> for UserRecord {
    fn from(user: &SessionUser) -> Self {
        Self {
            id: u64::from(user.id) as i64,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            middle_name: user.middle_name.clone(),
            role: Some(user.role.as_wire_str().to_string()),
            moderator_id: user.moderator_id.map(|x| u64::from(x) as i64),
            departments_ids: user.departments_ids.iter().map(|&x| u64::from(x) as i64).collect(),
            authorities: Some(user.authorities.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::empty("", ConversionError::Empty)]
    #[case::too_long("a".repeat(33), ConversionError::MaxExceeded{max:32, actual:33})]
    fn illegal_username(#[case] name: String, #[case] expect: ConversionError) {
        // Act
        let actual: Result<Username, ConversionError> = name.try_into();

        // Assert
        assert_eq!(actual.unwrap_err(), expect);
    }

    #[rstest]
    #[case::empty("", ConversionError::Empty)]
    #[case::no_at_sign("ivanov.uni.example", ConversionError::InvalidFormat("ivanov.uni.example".to_string()))]
    fn illegal_email(#[case] email: String, #[case] expect: ConversionError) {
        let actual: Result<EmailAddress, ConversionError> = email.try_into();
        assert_eq!(actual.unwrap_err(), expect);
    }

    #[test]
    fn wire_record_resolves_with_role_backfilled() {
        // Arrange - camelCase payload with role omitted, the way older
        // backends answer /auth/me
        let json = serde_json::json!({
            "id": 7,
            "username": "sidorova.m",
            "email": "m.sidorova@uni.example",
            "firstName": "Maria",
            "lastName": "Sidorova",
            "moderatorId": 7,
            "departmentsIds": [3, 9],
        });

        // Act
        let record: UserRecord = serde_json::from_value(json).unwrap();
        let user = SessionUser::try_from(record).unwrap();

        // Assert
        assert_eq!(user.role, Role::Moderator);
        assert_eq!(user.id, 7u64.into());
        assert_eq!(user.moderator_id, Some(7u64.into()));
        assert_eq!(user.departments_ids, vec![3u64.into(), 9u64.into()]);
        assert_eq!(user.display_name(), "Maria Sidorova");
    }

    #[test]
    fn negative_id_is_rejected_not_adopted() {
        let record = UserRecord {
            id: -1,
            username: "broken".try_into().unwrap(),
            email: None,
            first_name: None,
            last_name: None,
            middle_name: None,
            role: None,
            moderator_id: None,
            departments_ids: vec![],
            authorities: None,
        };
        assert!(SessionUser::try_from(record).is_err());
    }

    #[test]
    fn round_trip_keeps_resolved_role_explicit() {
        // Arrange
        let record = UserRecord {
            id: 4,
            username: "kuznetsov.p".try_into().unwrap(),
            email: None,
            first_name: None,
            last_name: None,
            middle_name: None,
            role: None,
            moderator_id: Some(4),
            departments_ids: vec![2],
            authorities: None,
        };

        // Act
        let user = SessionUser::try_from(record).unwrap();
        let back = UserRecord::from(&user);

        // Assert - once resolved the role travels explicitly so a snapshot
        // reload does not have to re-infer it
        assert_eq!(back.role.as_deref(), Some("MODERATOR"));
        assert_eq!(SessionUser::try_from(back).unwrap(), user);
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let record = UserRecord {
            id: 2,
            username: "orlov.d".try_into().unwrap(),
            email: None,
            first_name: None,
            last_name: None,
            middle_name: None,
            role: Some("USER".to_string()),
            moderator_id: None,
            departments_ids: vec![],
            authorities: None,
        };
        let user = SessionUser::try_from(record).unwrap();
        assert_eq!(user.display_name(), "orlov.d");
    }
}
