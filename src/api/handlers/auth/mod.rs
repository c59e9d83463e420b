//! Authentication: registration, login, stateless sessions, and email
//! verification codes.

pub mod jwt;
pub mod login;
pub mod otp;
pub mod password;
pub mod principal;
pub mod register;
pub mod session;
pub(crate) mod state;
pub(crate) mod storage;
pub mod types;

pub use state::{AuthConfig, AuthState};
