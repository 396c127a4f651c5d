pub mod auth;
pub mod factory;
pub mod passport;
pub mod paths;
