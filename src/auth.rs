//! Credentials and the two-tier token model.

pub mod credentials;
pub mod secret;
pub mod token;

pub use credentials::*;
pub use secret::*;
pub use token::*;
