//! Domain records shared by the mock auth API and the client session store.

pub mod errors;
pub mod user;
pub mod seed;

pub use user::{PublicUser, User, UserRole, UserStatus};
