//! Client session store with persisted hydration.
//!
//! State lives in one [`store::SessionStore`]; readers observe it through
//! [`state::SessionState`] snapshots or a `watch` subscription, and the
//! [`guard`] helpers turn a snapshot into a routing decision.

pub mod guard;
pub mod state;
pub mod store;

pub use guard::{RouteDecision, RouteGuard};
pub use state::{PersistedSession, SessionFlags, SessionPhase, SessionState, StoredSnapshot};
pub use store::{global, init_global, SessionStore};
