use std::future::Future;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::auth::backend::AuthBackend;
use crate::auth::domain::{AuthSession, LoginInput, LoginOutcome};
use crate::auth::errors::AuthError;
use crate::storage::DurableStorage;

use super::state::{PersistedSession, SessionPhase, SessionState, StoredSnapshot, SNAPSHOT_VERSION};

pub const DEFAULT_STORAGE_KEY: &str = "chapa-auth";

pub const LOGIN_SUCCESS_MESSAGE: &str = "Login successful";

/// The authenticated session of this process.
///
/// All transitions run inside the `watch` channel's lock, and the storage
/// write for a transition happens inside the same critical section, so
/// storage always sees commits in order. Cloning shares the same session.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    storage: Arc<dyn DurableStorage>,
    storage_key: Arc<str>,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    /// Empty, unhydrated store. Call [`SessionStore::hydrate`] before trusting it.
    pub fn new(backend: Arc<dyn AuthBackend>, storage: Arc<dyn DurableStorage>) -> Self {
        Self::with_storage_key(backend, storage, DEFAULT_STORAGE_KEY)
    }

    pub fn with_storage_key(
        backend: Arc<dyn AuthBackend>,
        storage: Arc<dyn DurableStorage>,
        storage_key: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            backend,
            storage,
            storage_key: Arc::from(storage_key.into()),
            state: Arc::new(state),
        }
    }

    /// Construct and hydrate in one step.
    pub fn open(backend: Arc<dyn AuthBackend>, storage: Arc<dyn DurableStorage>) -> Self {
        let store = Self::new(backend, storage);
        store.hydrate();
        store
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolves once hydration has completed.
    pub async fn hydrated(&self) -> SessionState {
        let mut rx = self.subscribe();
        // bound to a local so the `watch::Ref` temporary is dropped before `rx`
        let state = match rx.wait_for(SessionState::has_hydrated).await {
            Ok(state) => state.clone(),
            // the sender lives in `self`, so the channel cannot close here
            Err(_) => self.snapshot(),
        };
        state
    }

    /// Run one transition. `mutate` reports whether observers should be
    /// notified; with `persist`, a changed projection is written to storage.
    fn apply<F>(&self, persist: bool, mutate: F) -> bool
    where
        F: FnOnce(&mut SessionState) -> bool,
    {
        self.state.send_if_modified(|state| {
            let before = persist.then(|| state.persist());
            let changed = mutate(state);
            if let Some(before) = before {
                let after = state.persist();
                if after != before {
                    self.write_snapshot(after);
                }
            }
            changed
        })
    }

    /// Persist `state`; an anonymous projection removes the key instead.
    fn write_snapshot(&self, state: PersistedSession) {
        if state == PersistedSession::default() {
            match self.storage.remove(&self.storage_key) {
                Ok(()) => debug!(key = %self.storage_key, "persisted session removed"),
                Err(e) => warn!(key = %self.storage_key, error = %e, "session removal failed; keeping in-memory state"),
            }
            return;
        }
        let authenticated = state.is_authenticated;
        let encoded = match serde_json::to_string(&StoredSnapshot::new(state)) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "session snapshot encode failed");
                return;
            }
        };
        match self.storage.set(&self.storage_key, &encoded) {
            Ok(()) => debug!(key = %self.storage_key, authenticated, "session persisted"),
            Err(e) => warn!(key = %self.storage_key, error = %e, "session persist failed; keeping in-memory state"),
        }
    }

    fn read_snapshot(&self) -> Option<PersistedSession> {
        let raw = match self.storage.get(&self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.storage_key, "no persisted session");
                return None;
            }
            Err(e) => {
                warn!(key = %self.storage_key, error = %e, "session storage unreadable; starting anonymous");
                return None;
            }
        };
        match serde_json::from_str::<StoredSnapshot>(&raw) {
            Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => Some(snapshot.state),
            Ok(snapshot) => {
                warn!(version = snapshot.version, "persisted session has unknown version; ignoring");
                None
            }
            Err(e) => {
                warn!(key = %self.storage_key, error = %e, "persisted session is corrupt; starting anonymous");
                None
            }
        }
    }

    /// Restore the persisted session and mark the store hydrated.
    /// Runs once; later calls return the current phase without touching storage.
    #[instrument(skip(self), fields(key = %self.storage_key))]
    pub fn hydrate(&self) -> SessionPhase {
        let already = self.state.borrow().has_hydrated();
        if already {
            return self.phase();
        }
        let snapshot = self.read_snapshot();
        self.apply(false, |state| {
            if state.has_hydrated() {
                return false;
            }
            if let Some(snapshot) = snapshot {
                state.restore(snapshot);
            }
            state.set_has_hydrated(true)
        });
        let phase = self.phase();
        info!(?phase, "session_hydrated");
        phase
    }

    /// Authenticate against the backend. Failures come back as a value.
    ///
    /// Only one login may be in flight; a second one is refused with
    /// "Login already in progress". A logout that lands while the backend
    /// call is pending wins, and the late result is discarded.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> LoginOutcome {
        let guard = match self.begin_login() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(code = e.code(), error = %e, "login_refused");
                return LoginOutcome::failure(e.to_string());
            }
        };

        let result = self.backend.login(input).await.and_then(accept_session);
        let outcome = match result {
            Ok(session) => {
                let user_id = session.user.id.clone();
                let mut committed = false;
                self.apply(true, |state| {
                    if state.epoch() != guard.epoch {
                        return false;
                    }
                    state.commit_login(session);
                    committed = true;
                    true
                });
                if committed {
                    info!(%user_id, "login_committed");
                    LoginOutcome::success(LOGIN_SUCCESS_MESSAGE)
                } else {
                    warn!(%user_id, "login_discarded_after_logout");
                    LoginOutcome::failure(AuthError::Superseded.to_string())
                }
            }
            Err(e) => {
                warn!(code = e.code(), error = %e, "login_failed");
                LoginOutcome::failure(e.to_string())
            }
        };
        drop(guard);
        outcome
    }

    fn begin_login(&self) -> Result<LoginGuard<'_>, AuthError> {
        let mut started: Result<u64, AuthError> = Err(AuthError::NotHydrated);
        self.apply(false, |state| {
            if !state.has_hydrated() {
                return false;
            }
            if state.login_in_flight() {
                started = Err(AuthError::LoginInFlight);
                return false;
            }
            started = Ok(state.start_login());
            true
        });
        started.map(|epoch| LoginGuard { store: self, epoch })
    }

    /// Clear the session locally, then notify the backend.
    ///
    /// The local transition happens when this is called, before the returned
    /// future is polled; the future only carries the best-effort notification
    /// and never fails.
    pub fn logout(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut token = None;
        self.apply(true, |state| {
            token = state.credential_token().map(str::to_owned);
            state.clear()
        });
        info!("session_cleared");

        let backend = Arc::clone(&self.backend);
        async move {
            if let Err(e) = backend.logout(token.as_deref()).await {
                warn!(code = e.code(), error = %e, "logout_notification_failed");
            }
        }
    }

    /// Re-validate the in-memory session without any I/O to the backend.
    pub fn check_auth(&self) {
        if self.apply(true, SessionState::normalize) {
            debug!(authenticated = self.state.borrow().is_authenticated(), "session_normalized");
        }
    }

    pub fn set_loading(&self, loading: bool) {
        self.apply(false, |state| state.set_loading(loading));
    }

    pub fn set_has_hydrated(&self, hydrated: bool) {
        self.apply(false, |state| state.set_has_hydrated(hydrated));
    }
}

/// Post-conditions on a backend success before it may be committed.
fn accept_session(session: AuthSession) -> Result<AuthSession, AuthError> {
    if !session.user.status.is_active() {
        return Err(AuthError::AccountInactive);
    }
    if session.token.is_empty() {
        return Err(AuthError::Transport("backend returned an empty token".into()));
    }
    Ok(session)
}

/// Held for the duration of a login. Dropping it, on completion or when the
/// login future is dropped, releases the in-flight slot and clears the
/// loading flag unless a logout has already released both.
struct LoginGuard<'a> {
    store: &'a SessionStore,
    epoch: u64,
}

impl Drop for LoginGuard<'_> {
    fn drop(&mut self) {
        let epoch = self.epoch;
        self.store.apply(false, |state| state.finish_login(epoch));
    }
}

static GLOBAL: OnceCell<SessionStore> = OnceCell::new();

/// Install the process-wide store. The first call wins; later calls return the installed store.
pub fn init_global(store: SessionStore) -> &'static SessionStore {
    let mut installed = false;
    let global = GLOBAL.get_or_init(|| {
        installed = true;
        store
    });
    if !installed {
        debug!("global session store already initialized");
    }
    global
}

pub fn global() -> Option<&'static SessionStore> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::guard::{RouteDecision, RouteGuard};
    use crate::session::state::SessionFlags;
    use std::sync::atomic::Ordering;
    use crate::storage::MemoryStorage;
    use crate::test_support::{mock_service, ReadOnlyStorage, ScriptedBackend};
    use models::UserRole;

    fn merchant1() -> LoginInput {
        LoginInput::new("merchant1@gmail.com", "12345678")
    }

    fn store_with(backend: Arc<dyn AuthBackend>, storage: Arc<dyn DurableStorage>) -> SessionStore {
        SessionStore::open(backend, storage)
    }

    fn mock_store(storage: Arc<dyn DurableStorage>) -> SessionStore {
        store_with(Arc::new(mock_service()), storage)
    }

    #[tokio::test]
    async fn hydration_gates_routing() {
        let store = SessionStore::new(Arc::new(mock_service()), Arc::new(MemoryStorage::new()));
        let state = store.snapshot();
        assert!(!state.has_hydrated());
        assert!(!state.is_authenticated());
        assert_eq!(RouteGuard::dashboard().decide(&state), RouteDecision::Wait);

        assert_eq!(store.hydrate(), SessionPhase::Anonymous);
        assert_eq!(RouteGuard::dashboard().decide(&store.snapshot()), RouteDecision::RedirectToLogin);
    }

    #[tokio::test]
    async fn login_before_hydration_is_refused() {
        let store = SessionStore::new(Arc::new(mock_service()), Arc::new(MemoryStorage::new()));
        let outcome = store.login(merchant1()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Session is not ready yet");
        assert!(!store.snapshot().is_loading());
    }

    #[tokio::test]
    async fn login_commits_public_identity() -> anyhow::Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        let store = mock_store(storage.clone());

        let outcome = store.login(merchant1()).await;
        assert_eq!(outcome, LoginOutcome::success("Login successful"));

        let state = store.snapshot();
        assert_eq!(state.phase(), SessionPhase::Authenticated);
        assert!(state.is_consistent());
        let identity = state.identity().expect("identity");
        assert_eq!(identity.role, UserRole::User);
        assert!(serde_json::to_value(identity)?.get("password").is_none());

        let raw = storage.get(DEFAULT_STORAGE_KEY)?.expect("persisted");
        assert!(!raw.contains("password"));
        assert!(!raw.contains("isLoading"));
        assert!(!raw.contains("hasHydrated"));
        Ok(())
    }

    #[tokio::test]
    async fn inactive_account_stays_anonymous() -> anyhow::Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        let store = mock_store(storage.clone());

        let outcome = store.login(LoginInput::new("merchant3@gmail.com", "12345678")).await;
        assert_eq!(outcome, LoginOutcome::failure("Account is inactive"));
        assert_eq!(store.phase(), SessionPhase::Anonymous);
        assert!(store.snapshot().identity().is_none());
        assert!(storage.get(DEFAULT_STORAGE_KEY)?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_reports_invalid_credentials() {
        let store = mock_store(Arc::new(MemoryStorage::new()));
        let outcome = store.login(LoginInput::new("merchant1@gmail.com", "wrong")).await;
        assert_eq!(outcome.message, "Invalid email or password");
        assert!(!store.snapshot().is_loading());
    }

    #[tokio::test]
    async fn restart_restores_session() {
        let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
        let first = mock_store(storage.clone());
        assert!(first.login(merchant1()).await.success);
        let identity = first.snapshot().identity().cloned();

        let restarted = SessionStore::new(Arc::new(mock_service()), storage);
        assert_eq!(restarted.phase(), SessionPhase::Unhydrated);
        restarted.hydrate();
        let state = restarted.snapshot();
        assert!(state.has_hydrated());
        assert!(state.is_authenticated());
        assert_eq!(state.identity().cloned(), identity);
        assert_eq!(state.credential_token(), Some("mock_token"));
    }

    #[tokio::test]
    async fn hydrate_runs_once() -> anyhow::Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        let store = mock_store(storage.clone());
        assert_eq!(store.phase(), SessionPhase::Anonymous);

        let other = mock_store(storage.clone());
        assert!(other.login(merchant1()).await.success);

        // storage now holds a session, but this store has already hydrated
        assert_eq!(store.hydrate(), SessionPhase::Anonymous);
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_snapshot_degrades_to_anonymous() -> anyhow::Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(DEFAULT_STORAGE_KEY, "{\"state\": 42")?;
        let store = mock_store(storage.clone());
        assert_eq!(store.phase(), SessionPhase::Anonymous);

        storage.set(DEFAULT_STORAGE_KEY, r#"{"state":{"identity":null,"credentialToken":"t","isAuthenticated":true},"version":0}"#)?;
        let store = mock_store(storage.clone());
        assert!(!store.snapshot().is_authenticated());

        storage.set(DEFAULT_STORAGE_KEY, r#"{"state":{},"version":7}"#)?;
        assert_eq!(mock_store(storage).phase(), SessionPhase::Anonymous);
        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_even_when_backend_fails() -> anyhow::Result<()> {
        let backend = Arc::new(ScriptedBackend::failing_logout());
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(backend.clone(), storage.clone());
        assert!(store.login(merchant1()).await.success);

        store.logout().await;
        let state = store.snapshot();
        assert!(state.identity().is_none());
        assert!(!state.is_authenticated());
        assert_eq!(backend.logouts.load(Ordering::SeqCst), 1);
        assert!(storage.get(DEFAULT_STORAGE_KEY)?.is_none());

        let restarted = store_with(backend, storage);
        assert_eq!(restarted.phase(), SessionPhase::Anonymous);
        Ok(())
    }

    #[tokio::test]
    async fn logout_is_local_before_the_future_is_polled() {
        let backend = Arc::new(ScriptedBackend::new());
        let store = store_with(backend.clone(), Arc::new(MemoryStorage::new()));
        assert!(store.login(merchant1()).await.success);

        let notify = store.logout();
        assert!(!store.snapshot().is_authenticated());
        drop(notify);
        assert_eq!(backend.logouts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_login_is_refused_and_commit_is_atomic() {
        let (backend, gate) = ScriptedBackend::gated();
        let store = store_with(Arc::new(backend), Arc::new(MemoryStorage::new()));
        let mut rx = store.subscribe();

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.login(merchant1()).await }
        });
        rx.wait_for(SessionState::is_loading).await.expect("loading observed");
        assert_eq!(store.phase(), SessionPhase::Authenticating);
        assert!(!store.snapshot().is_authenticated());

        let second = store.login(LoginInput::new("admin1@chapa.co", "12345678")).await;
        assert_eq!(second, LoginOutcome::failure("Login already in progress"));

        gate.notify_one();
        let observed = rx.wait_for(|s| !s.is_loading()).await.expect("commit observed").clone();
        assert!(observed.is_consistent());
        assert!(observed.is_authenticated());
        assert!(first.await.expect("join").success);
        assert_eq!(store.snapshot().identity().map(|u| u.email.as_str()), Some("merchant1@gmail.com"));
    }

    #[tokio::test]
    async fn logout_during_login_wins() {
        let (backend, gate) = ScriptedBackend::gated();
        let store = store_with(Arc::new(backend), Arc::new(MemoryStorage::new()));
        let mut rx = store.subscribe();

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.login(merchant1()).await }
        });
        rx.wait_for(SessionState::is_loading).await.expect("loading observed");

        store.logout().await;
        assert_eq!(store.phase(), SessionPhase::Anonymous);

        gate.notify_one();
        let outcome = pending.await.expect("join");
        assert_eq!(outcome, LoginOutcome::failure("Login cancelled by logout"));
        assert_eq!(store.phase(), SessionPhase::Anonymous);

        // the in-flight slot was released
        gate.notify_one();
        assert!(store.login(merchant1()).await.success);
    }

    #[tokio::test]
    async fn hung_backend_keeps_loading_until_dropped() {
        let store = store_with(Arc::new(ScriptedBackend::hanging()), Arc::new(MemoryStorage::new()));
        let mut rx = store.subscribe();
        let task = tokio::spawn({
            let store = store.clone();
            async move { store.login(merchant1()).await }
        });
        rx.wait_for(SessionState::is_loading).await.expect("loading observed");
        tokio::task::yield_now().await;
        assert!(store.snapshot().is_loading());

        task.abort();
        let _ = task.await;
        assert!(!store.snapshot().is_loading());
        assert_eq!(store.phase(), SessionPhase::Anonymous);
    }

    #[tokio::test]
    async fn logout_frees_the_slot_of_a_hung_login() {
        let store = store_with(Arc::new(ScriptedBackend::hanging()), Arc::new(MemoryStorage::new()));
        let mut rx = store.subscribe();
        let stuck = tokio::spawn({
            let store = store.clone();
            async move { store.login(merchant1()).await }
        });
        rx.wait_for(SessionState::is_loading).await.expect("loading observed");

        store.logout().await;
        let state = store.snapshot();
        assert_eq!(state.phase(), SessionPhase::Anonymous);
        assert!(!state.is_loading());

        let next = store.begin_login().expect("slot is free after logout");
        assert_eq!(store.phase(), SessionPhase::Authenticating);

        // the abandoned login must not touch the newer one
        stuck.abort();
        let _ = stuck.await;
        assert!(store.snapshot().is_loading());

        drop(next);
        assert_eq!(store.phase(), SessionPhase::Anonymous);
        assert!(store.begin_login().is_ok());
    }

    #[tokio::test]
    async fn check_auth_normalizes_without_backend() -> anyhow::Result<()> {
        let backend = Arc::new(ScriptedBackend::new());
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(backend.clone(), storage.clone());
        assert!(store.login(merchant1()).await.success);

        store.check_auth();
        assert!(store.snapshot().is_authenticated());

        let identity = store.snapshot().identity().cloned();
        store.apply(false, |state| {
            state.force_auth(PersistedSession { identity, credential_token: None, is_authenticated: true });
            true
        });
        store.check_auth();
        let state = store.snapshot();
        assert!(!state.is_authenticated());
        assert!(state.identity().is_none());
        assert!(state.is_consistent());
        assert_eq!(backend.logins.load(Ordering::SeqCst), 1);

        assert!(storage.get(DEFAULT_STORAGE_KEY)?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn storage_failure_keeps_memory_state() {
        let store = mock_store(Arc::new(ReadOnlyStorage));
        assert!(store.login(merchant1()).await.success);
        assert!(store.snapshot().is_authenticated());
        store.logout().await;
        assert!(!store.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn flag_setters_are_process_local() -> anyhow::Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(Arc::new(mock_service()), storage.clone());
        store.set_loading(true);
        store.set_has_hydrated(true);
        let state = store.snapshot();
        assert_eq!(state.flags(), SessionFlags { is_loading: true, has_hydrated: true });
        assert_eq!(state.persist(), PersistedSession::default());
        assert!(storage.get(DEFAULT_STORAGE_KEY)?.is_none());
        store.set_loading(false);
        assert_eq!(store.phase(), SessionPhase::Anonymous);
        Ok(())
    }

    #[tokio::test]
    async fn hydrated_resolves_after_hydrate() {
        let store = SessionStore::new(Arc::new(mock_service()), Arc::new(MemoryStorage::new()));
        let waiter = tokio::spawn({
            let store = store.clone();
            async move { store.hydrated().await }
        });
        tokio::task::yield_now().await;
        store.hydrate();
        let state = waiter.await.expect("join");
        assert!(state.has_hydrated());
    }

    #[tokio::test]
    async fn global_store_first_install_wins() {
        let first = init_global(mock_store(Arc::new(MemoryStorage::new())));
        let second = init_global(SessionStore::new(Arc::new(mock_service()), Arc::new(MemoryStorage::new())));
        assert!(std::ptr::eq(first, second));
        assert!(global().is_some_and(|g| g.snapshot().has_hydrated()));
    }
}
