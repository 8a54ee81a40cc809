/// Body of a successful login
///
/// The token is optional on the wire because older backends establish the
/// session via a cookie and send an empty body; the client treats a missing
/// token as "nothing to store" and relies on the profile fetch to confirm
/// the session.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}
