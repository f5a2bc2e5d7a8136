//! Authentication for the notifier service.
//!
//! Sessions have two layers:
//!
//! - **Legitimacy**: a signed, time-limited session token proves the bearer
//!   got it from this service ([`token`]).
//! - **Identity**: the token only carries an opaque access token; the user
//!   is whoever currently holds that access token in storage ([`session`]).
//!
//! Passwords are stored as bcrypt hashes of composed password material
//! ([`password`]).

pub mod error;
pub mod password;
pub mod session;
pub mod token;

pub use error::AuthError;
pub use password::{compose_password_material, hash_password, verify_password};
pub use session::{SessionConfig, SessionManager, generate_user_id};
pub use token::{
    Clock, FixedClock, HmacKeys, KeyResolver, SessionClaims, SystemClock, issue_session_token,
    parse_bearer, verify_session_token,
};
