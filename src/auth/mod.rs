//! Token-based session authentication.

pub mod cleanup;
pub mod clock;
pub mod error;
pub mod password;
pub mod session;
pub mod token;

pub use cleanup::spawn_token_sweeper;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, DenyReason, HashError};
pub use password::{hash_password, verify_password};
pub use session::{IssuedSession, SessionAuthenticator, DEFAULT_TOKEN_TTL_HOURS};
pub use token::{generate, hash_token, GeneratedToken, SessionToken};
