use crate::{errors::ConversionError, id::DbId, uac::Username};

/// A department as returned by the directory listing endpoints
///
/// Read-only input to the permission predicates. `moderator_id` and
/// `moderator_login` may be absent when a department has no moderator
/// assigned yet.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DbId,
    pub name: DepartmentName,
    #[serde(default)]
    pub moderator_id: Option<DbId>,
    #[serde(default)]
    pub moderator_login: Option<Username>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct DepartmentName(String);

impl DepartmentName {
    pub const MAX_LENGTH: usize = 100;
}

impl TryFrom<String> for DepartmentName {
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

impl From<DepartmentName> for String {
    fn from(value: DepartmentName) -> Self {
        value.0
    }
}

impl std::ops::Deref for DepartmentName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0[..]
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::empty("", ConversionError::Empty)]
    #[case::too_long("d".repeat(101), ConversionError::MaxExceeded{max:100, actual:101})]
    fn illegal_department_name(#[case] name: String, #[case] expect: ConversionError) {
        // Act
        let actual: Result<DepartmentName, ConversionError> = name.try_into();

        // Assert
        assert_eq!(actual.unwrap_err(), expect);
    }
}
