//! Database models split into domain-specific modules.

pub mod token;
pub mod user;

pub use token::*;
pub use user::*;
