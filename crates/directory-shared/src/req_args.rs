//! This module stores the expected format of the arguments for the requests
//! The structure of the module is supposed to match the path of the endpoints.
//! For example `/auth/login` maps to [`LoginReqArgs`]

use crate::{
    const_config::uac::UAC_MIN_PASSWORD_LENGTH,
    uac::{EmailAddress, RegistrationError, Username},
};
use secrecy::{ExposeSecret, SecretString};
use std::fmt::Debug;

#[derive(serde::Deserialize, Clone)]
pub struct LoginReqArgs {
    // TODO 5: Is there a downside to making this a Username type instead of String
    pub username: String,
    pub password: SecretString,
}

impl LoginReqArgs {
    pub fn new<S: Into<String>>(username: S, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl Debug for LoginReqArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginReqArgs")
            .field("username", &self.username)
            .field("has_password", &!self.password.expose_secret().is_empty())
            .finish()
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct RegisterReqArgs {
    pub username: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
    pub email: String,
}

impl RegisterReqArgs {
    /// Client side validation done before the request is sent, the server
    /// still does its own checks (duplicates are only detectable there)
    pub fn validate(&self) -> Result<(), RegistrationError> {
        Username::try_from(self.username.clone()).map_err(RegistrationError::InvalidUsername)?;
        EmailAddress::try_from(self.email.clone()).map_err(RegistrationError::InvalidEmail)?;
        if self.password.expose_secret().len() < UAC_MIN_PASSWORD_LENGTH {
            return Err(RegistrationError::PasswordTooShort {
                min: UAC_MIN_PASSWORD_LENGTH,
            });
        }
        if self.password.expose_secret() != self.confirm_password.expose_secret() {
            return Err(RegistrationError::PasswordsDoNotMatch);
        }
        Ok(())
    }
}

impl Debug for RegisterReqArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterReqArgs")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("has_password", &!self.password.expose_secret().is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_args(password: &str, confirm: &str, email: &str) -> RegisterReqArgs {
        RegisterReqArgs {
            username: "ivanov.i".to_string(),
            password: SecretString::from(password),
            confirm_password: SecretString::from(confirm),
            email: email.to_string(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(register_args("long enough", "long enough", "i.ivanov@uni.example")
            .validate()
            .is_ok());
    }

    #[test]
    fn mismatched_passwords_rejected() {
        // Act
        let actual = register_args("long enough", "long enough!", "i.ivanov@uni.example").validate();

        // Assert
        assert!(matches!(
            actual.unwrap_err(),
            RegistrationError::PasswordsDoNotMatch
        ));
    }

    #[test]
    fn short_password_rejected() {
        let actual = register_args("short", "short", "i.ivanov@uni.example").validate();
        assert!(matches!(
            actual.unwrap_err(),
            RegistrationError::PasswordTooShort { min: 8 }
        ));
    }

    #[test]
    fn bad_email_rejected() {
        let actual = register_args("long enough", "long enough", "not-an-email").validate();
        assert!(matches!(
            actual.unwrap_err(),
            RegistrationError::InvalidEmail(_)
        ));
    }

    #[test]
    fn debug_never_exposes_passwords() {
        // Arrange
        let login = LoginReqArgs::new("ivanov.i", SecretString::from("hunter2andmore"));
        let register = register_args("hunter2andmore", "hunter2andmore", "i@uni.example");

        // Act
        let login_dbg = format!("{login:?}");
        let register_dbg = format!("{register:?}");

        // Assert
        assert!(!login_dbg.contains("hunter2andmore"));
        assert!(!register_dbg.contains("hunter2andmore"));
    }
}
