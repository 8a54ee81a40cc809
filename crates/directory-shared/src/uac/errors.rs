use crate::errors::ConversionError;

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid User or Password")]
    InvalidUserOrPassword,
    #[error("Session is no longer valid, please login again")]
    SessionExpired,
    #[error("Unexpected Error")]
    UnexpectedError(#[from] anyhow::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum RegistrationError {
    #[error("You entered two different passwords - the field values must match.")]
    PasswordsDoNotMatch,
    #[error("Password must be at least {min} characters long")]
    PasswordTooShort { min: usize },
    #[error("Username is not acceptable: {0}")]
    InvalidUsername(#[source] ConversionError),
    #[error("Email address is not acceptable: {0}")]
    InvalidEmail(#[source] ConversionError),
    #[error("Unexpected Error")]
    UnexpectedError(#[from] anyhow::Error),
}
