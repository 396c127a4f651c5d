pub mod client;
pub mod types;

pub use client::{HttpPassportClient, IssuerSettings, PassportClient, PassportError};
pub use types::{Passport, PassportRequest};
