use models::PublicUser;
use serde::{Deserialize, Serialize};

use crate::auth::domain::AuthSession;

/// Version tag written next to the persisted state; other versions are ignored on restore.
pub const SNAPSHOT_VERSION: u32 = 0;

/// The persisted projection of the session: identity, token and the derived flag.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default)]
    pub identity: Option<PublicUser>,
    #[serde(default)]
    pub credential_token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

/// What is written under the storage key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub state: PersistedSession,
    pub version: u32,
}

impl StoredSnapshot {
    pub fn new(state: PersistedSession) -> Self {
        Self { state, version: SNAPSHOT_VERSION }
    }
}

/// Process-local flags; never part of [`PersistedSession`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionFlags {
    pub is_loading: bool,
    pub has_hydrated: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Unhydrated,
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Observable session state. Only the store mutates it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionState {
    auth: PersistedSession,
    flags: SessionFlags,
    /// Bumped by every logout; a login that started under an older epoch may not commit.
    epoch: u64,
    /// Epoch of the login holding the in-flight slot. The slot is free once
    /// the epoch has moved on, so a logout releases it even if the backend hangs.
    login_epoch: Option<u64>,
}

impl SessionState {
    pub fn identity(&self) -> Option<&PublicUser> {
        self.auth.identity.as_ref()
    }

    pub fn credential_token(&self) -> Option<&str> {
        self.auth.credential_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.flags.is_loading
    }

    pub fn has_hydrated(&self) -> bool {
        self.flags.has_hydrated
    }

    pub fn flags(&self) -> SessionFlags {
        self.flags
    }

    pub fn phase(&self) -> SessionPhase {
        if !self.flags.has_hydrated {
            SessionPhase::Unhydrated
        } else if self.flags.is_loading {
            SessionPhase::Authenticating
        } else if self.auth.is_authenticated {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }

    /// `persist(state) -> snapshot`
    pub fn persist(&self) -> PersistedSession {
        self.auth.clone()
    }

    /// `restore(snapshot) -> partial state`. Only an identity paired with a
    /// non-empty token counts as a session; anything else restores as anonymous.
    /// The token itself is not validated.
    pub(crate) fn restore(&mut self, snapshot: PersistedSession) {
        match (snapshot.identity, snapshot.credential_token) {
            (Some(identity), Some(token)) if !token.is_empty() => {
                self.auth = PersistedSession {
                    identity: Some(identity),
                    credential_token: Some(token),
                    is_authenticated: true,
                };
            }
            _ => self.auth = PersistedSession::default(),
        }
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn login_in_flight(&self) -> bool {
        self.login_epoch == Some(self.epoch)
    }

    /// Take the in-flight slot and enter `Authenticating`; returns the login's epoch.
    pub(crate) fn start_login(&mut self) -> u64 {
        self.login_epoch = Some(self.epoch);
        self.flags.is_loading = true;
        self.epoch
    }

    /// Release the slot taken under `epoch`. A no-op once a logout or a
    /// newer login owns the state.
    pub(crate) fn finish_login(&mut self, epoch: u64) -> bool {
        if self.login_epoch != Some(epoch) || self.epoch != epoch {
            return false;
        }
        self.login_epoch = None;
        self.set_loading(false)
    }

    pub(crate) fn set_loading(&mut self, loading: bool) -> bool {
        let changed = self.flags.is_loading != loading;
        self.flags.is_loading = loading;
        changed
    }

    pub(crate) fn set_has_hydrated(&mut self, hydrated: bool) -> bool {
        let changed = self.flags.has_hydrated != hydrated;
        self.flags.has_hydrated = hydrated;
        changed
    }

    /// Identity, token, flag and loading change together.
    pub(crate) fn commit_login(&mut self, session: AuthSession) {
        self.auth = PersistedSession {
            identity: Some(session.user),
            credential_token: Some(session.token),
            is_authenticated: true,
        };
        self.flags.is_loading = false;
    }

    /// Back to anonymous; returns whether anything changed.
    pub(crate) fn clear(&mut self) -> bool {
        let changed = self.auth != PersistedSession::default() || self.flags.is_loading;
        self.auth = PersistedSession::default();
        self.flags.is_loading = false;
        self.login_epoch = None;
        self.epoch += 1;
        changed
    }

    /// Re-derive the flag from identity and token.
    pub(crate) fn normalize(&mut self) -> bool {
        let complete = self.auth.identity.is_some()
            && self.auth.credential_token.as_deref().is_some_and(|t| !t.is_empty());
        if !complete {
            let changed = self.auth != PersistedSession::default();
            self.auth = PersistedSession::default();
            return changed;
        }
        let changed = !self.auth.is_authenticated;
        self.auth.is_authenticated = true;
        changed
    }

    #[cfg(test)]
    pub(crate) fn force_auth(&mut self, auth: PersistedSession) {
        self.auth = auth;
    }

    /// `is_authenticated` agrees with identity and token.
    pub fn is_consistent(&self) -> bool {
        self.auth.is_authenticated == (self.auth.identity.is_some() && self.auth.credential_token.is_some())
    }
}
