//! Stores the session state machine and request plumbing shared between the
//! directory clients
//! NB: The assumption is made that the async runtime has already been started
//! before any functions from this library are called

#![warn(unused_crate_dependencies)]

#[cfg(test)] // Included to prevent unused crate warning (only integration tests use it)
mod warning_suppress {
    use actix_web as _;
    use tokio as _;
}

mod storage;
mod store;

pub use storage::{InMemoryStorage, SessionStorage};
pub use store::{LoginOutcome, SessionState, SessionStore, UiCallBack, DUMMY_ARGUMENT};
