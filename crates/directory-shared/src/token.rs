use crate::random_string_def_len;

/// Opaque access token issued by the login endpoint
///
/// The client never inspects the contents, it only stores the value and
/// presents it back to the server on authenticated requests.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new_rand() -> Self {
        random_string_def_len().into()
    }
}

impl From<String> for AuthToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<AuthToken> for String {
    fn from(value: AuthToken) -> Self {
        value.0
    }
}

impl AsRef<str> for AuthToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
