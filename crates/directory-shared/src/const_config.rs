//! Stores settings that are not expected to need to change but grouped together
//! for discoverability and reuse. Each constant should be prefixed by the module
//! name to allow importing the constant only and still be readable

use directory_time::Seconds;

pub const PANIC_ON_RARE_ERR: bool = true;

pub mod client {
    use super::*;

    /// Upper bound on any single request so bootstrap and login can never
    /// leave the UI stuck on a loading state behind a stalled connection
    pub const CLIENT_REQUEST_TIMEOUT: Seconds = Seconds::new(5);
}

pub mod storage {
    /// Key the serialized snapshot of the last known session user is kept
    /// under. Read as a fallback at bootstrap, overwritten by every
    /// successful fetch and removed on logout.
    pub const STORAGE_KEY_SESSION_USER: &str = "directory.session_user";
    /// Key the opaque access token is kept under
    pub const STORAGE_KEY_ACCESS_TOKEN: &str = "directory.access_token";
}

pub mod uac {
    /// Minimum accepted password length for registration
    // TODO 3: Add password complexity requirements
    pub const UAC_MIN_PASSWORD_LENGTH: usize = 8;
}

pub mod path {
    mod path_spec;
    pub use path_spec::PathSpec;
    pub const PATH_AUTH_LOGIN: PathSpec = PathSpec::post("/auth/login");
    pub const PATH_AUTH_LOGOUT: PathSpec = PathSpec::post("/auth/logout");
    pub const PATH_AUTH_ME: PathSpec = PathSpec::get("/auth/me");
    pub const PATH_AUTH_REGISTRATION: PathSpec = PathSpec::post("/auth/registration");
    pub const PATH_HEALTH_CHECK: PathSpec = PathSpec::get("/health_check");
}
