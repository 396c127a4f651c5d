pub mod credential;
pub mod token;

pub use credential::Credential;
pub use token::{AccessTokenClaims, TokenError, TokenValidator};
