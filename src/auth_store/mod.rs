//! Session, profile-completion and profile-cache state shared by every screen
//!
//! [`AuthStore`] is a cloneable handle around one [`AuthState`]. Every clone sees
//! the same state; screens call [`AuthStore::subscribe`] to re-render on change.
//!
//! Ordering: session checks run one at a time, and so do profile operations
//! (completion check, fetch, save, budget update), in the order they were
//! issued. Each login, logout or session reset starts a new generation; a
//! profile operation begun under an older generation drops its result.

mod snapshot;
mod state;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::auth::{Identity, Session, SessionService, SignInCredentials};
use crate::db::{validate_budget, Profile, ProfileInput, ProfileStore, ProfileUpdate, ProfileUpsert};
use crate::error::{Error, Result};

pub use snapshot::*;
pub use state::*;

struct Inner {
    sessions: Arc<dyn SessionService>,
    profiles: Arc<dyn ProfileStore>,
    snapshots: Option<SnapshotStore>,
    clear_snapshot_on_logout: bool,
    state: watch::Sender<AuthState>,
    generation: AtomicU64,
    /// Set by the first login, logout or session check result
    reconciled: AtomicBool,
    session_lock: Mutex<()>,
    profile_lock: Mutex<()>,
}

/// Builder for [`AuthStore`]
pub struct AuthStoreBuilder {
    sessions: Arc<dyn SessionService>,
    profiles: Arc<dyn ProfileStore>,
    snapshots: Option<SnapshotStore>,
    clear_snapshot_on_logout: bool,
}

impl AuthStoreBuilder {
    /// Persist snapshots through `snapshots`
    pub fn snapshots(mut self, snapshots: SnapshotStore) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Delete the stored snapshot on logout instead of overwriting it
    pub fn clear_snapshot_on_logout(mut self, value: bool) -> Self {
        self.clear_snapshot_on_logout = value;
        self
    }

    pub fn build(self) -> AuthStore {
        let (state, _) = watch::channel(AuthState::default());
        AuthStore {
            inner: Arc::new(Inner {
                sessions: self.sessions,
                profiles: self.profiles,
                snapshots: self.snapshots,
                clear_snapshot_on_logout: self.clear_snapshot_on_logout,
                state,
                generation: AtomicU64::new(0),
                reconciled: AtomicBool::new(false),
                session_lock: Mutex::new(()),
                profile_lock: Mutex::new(()),
            }),
        }
    }
}

/// Handle to the shared auth state and the operations that change it
#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<Inner>,
}

impl AuthStore {
    pub fn builder(
        sessions: Arc<dyn SessionService>,
        profiles: Arc<dyn ProfileStore>,
    ) -> AuthStoreBuilder {
        AuthStoreBuilder {
            sessions,
            profiles,
            snapshots: None,
            clear_snapshot_on_logout: false,
        }
    }

    /// Store without snapshot persistence
    pub fn new(sessions: Arc<dyn SessionService>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self::builder(sessions, profiles).build()
    }

    /// A copy of the current state
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified after every state change
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Current generation and identity, read under one state borrow
    fn current_identity(&self) -> Option<(u64, Identity)> {
        let state = self.inner.state.borrow();
        let identity = state.identity()?.clone();
        Some((self.inner.generation.load(Ordering::SeqCst), identity))
    }

    /// Apply `f` only if no login/logout happened since `generation`
    fn apply_for(&self, generation: u64, user_id: &str, f: impl FnOnce(&mut AuthState)) -> bool {
        let mut applied = false;
        self.inner.state.send_if_modified(|state| {
            if self.inner.generation.load(Ordering::SeqCst) != generation
                || state.user_id() != Some(user_id)
            {
                return false;
            }
            f(state);
            applied = true;
            true
        });
        if !applied {
            log::debug!("discarding stale profile result for {}", user_id);
        }
        applied
    }

    /// Start a new generation with `f`, unless `since` is given and another
    /// transition has happened after it
    fn transition(&self, since: Option<u64>, f: impl FnOnce(&mut AuthState)) -> bool {
        let mut applied = false;
        self.inner.state.send_if_modified(|state| {
            let generation = &self.inner.generation;
            if matches!(since, Some(since) if since != generation.load(Ordering::SeqCst)) {
                return false;
            }
            generation.fetch_add(1, Ordering::SeqCst);
            self.inner.reconciled.store(true, Ordering::SeqCst);
            f(state);
            applied = true;
            true
        });
        applied
    }

    fn establish(&self, identity: Identity, session: Session) {
        self.transition(None, |state| state.establish(identity, session));
    }

    fn reset(&self) {
        self.transition(None, AuthState::clear);
    }

    /// Record a login and check the profile in the background.
    ///
    /// The state is logged in when this returns. The session is handed to the
    /// session service and the completion check runs in a spawned task; await
    /// the returned handle to wait for both. Must be called inside a Tokio
    /// runtime.
    pub fn log_in(&self, identity: Identity, session: Session) -> JoinHandle<()> {
        if identity.id != session.user.id {
            log::warn!(
                "session user {} differs from identity {}",
                session.user.id,
                identity.id
            );
        }
        log::info!("logged in as {}", identity.id);
        self.establish(identity, session.clone());

        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.inner.sessions.set_active_session(session).await {
                log::warn!("failed to activate session: {}", e);
            }
            this.check_profile_completion().await;
        })
    }

    /// Sign in with email and password, then [`log_in`](Self::log_in).
    ///
    /// Empty fields are rejected without calling the session service.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<JoinHandle<()>> {
        let credentials = SignInCredentials::new(email, password);
        if !credentials.is_complete() {
            return Err(Error::invalid_input("email and password are required"));
        }
        let session = self.inner.sessions.sign_in(&credentials).await?;
        Ok(self.log_in(session.user.clone(), session))
    }

    /// Invalidate the session remotely (best effort) and reset all state.
    ///
    /// Only fails when removing the stored snapshot fails; the in-memory reset
    /// has already happened by then.
    pub async fn log_out(&self) -> Result<()> {
        if let Err(e) = self.inner.sessions.sign_out().await {
            log::warn!("sign out failed, clearing local state anyway: {}", e);
        }
        self.reset();
        log::info!("logged out");

        match &self.inner.snapshots {
            Some(snapshots) if self.inner.clear_snapshot_on_logout => snapshots.remove().await,
            _ => Ok(()),
        }
    }

    /// Ask the session service whether a session is live.
    ///
    /// With a session the state becomes logged in and the completion check is
    /// spawned; its handle is returned. Without one, or on any error, the state
    /// is reset to logged out. A login or logout made while the check was in
    /// flight wins and the result is dropped.
    pub async fn check_session(&self) -> Option<JoinHandle<()>> {
        let _guard = self.inner.session_lock.lock().await;
        let since = self.inner.generation.load(Ordering::SeqCst);

        let session = match self.inner.sessions.current_session().await {
            Ok(Some(session)) => Some(session),
            Ok(None) => {
                log::debug!("no live session");
                None
            }
            Err(e) => {
                log::error!("session check failed: {}", e);
                None
            }
        };
        let Some(session) = session else {
            if !self.transition(Some(since), AuthState::clear) {
                log::debug!("keeping state changed during session check");
            }
            return None;
        };

        log::debug!("found live session for {}", session.user.id);
        let identity = session.user.clone();
        if !self.transition(Some(since), |state| state.establish(identity, session)) {
            log::debug!("keeping state changed during session check");
            return None;
        }

        let this = self.clone();
        Some(tokio::spawn(async move {
            this.check_profile_completion().await;
        }))
    }

    /// Decide whether the current identity has a complete profile.
    ///
    /// A missing row or any query error counts as incomplete. Does not touch
    /// the cached profile.
    pub async fn check_profile_completion(&self) {
        let _guard = self.inner.profile_lock.lock().await;
        let Some((generation, identity)) = self.current_identity() else {
            return;
        };

        let complete = match self.inner.profiles.profile_completion(&identity.id).await {
            Ok(row) => row.is_complete(),
            Err(Error::NotFound) => false,
            Err(e) => {
                log::error!("profile check failed for {}: {}", identity.id, e);
                false
            }
        };

        self.apply_for(generation, &identity.id, |state| state.set_completion(complete));
    }

    /// Override the completion flag without querying.
    ///
    /// Ignored while logged out, where the flag must stay false.
    pub fn set_profile_completed(&self, completed: bool) {
        self.inner.state.send_if_modified(|state| {
            if !state.is_logged_in() {
                return false;
            }
            state.set_completion(completed);
            true
        });
    }

    /// Refresh the cached profile from the table. A missing row leaves the
    /// cache as it was.
    pub async fn fetch_profile(&self) {
        let _guard = self.inner.profile_lock.lock().await;
        if let Some((generation, identity)) = self.current_identity() {
            self.fetch_profile_locked(generation, &identity.id).await;
        }
    }

    async fn fetch_profile_locked(&self, generation: u64, user_id: &str) {
        match self.inner.profiles.find_profile(user_id).await {
            Ok(row) => match Profile::from_row(row, user_id) {
                Ok(profile) => {
                    self.apply_for(generation, user_id, |state| state.set_profile(profile));
                }
                Err(e) => log::error!("rejected profile row: {}", e),
            },
            Err(Error::NotFound) => log::debug!("no profile row for {}", user_id),
            Err(e) => log::error!("profile fetch failed for {}: {}", user_id, e),
        }
    }

    /// Create or update the current identity's profile.
    ///
    /// Returns false when logged out, when the input is invalid, or when the
    /// write fails; none of these change the state. On success the cache is
    /// updated from `input` and the profile is marked complete.
    pub async fn save_profile(&self, input: ProfileInput) -> bool {
        let _guard = self.inner.profile_lock.lock().await;
        let Some((generation, identity)) = self.current_identity() else {
            return false;
        };
        if let Err(e) = input.validate() {
            log::warn!("not saving profile: {}", e);
            return false;
        }

        let email = input
            .email
            .filter(|email| !email.is_empty())
            .unwrap_or_else(|| identity.email_or_default().to_string());
        let upsert = ProfileUpsert {
            user_id: identity.id.clone(),
            full_name: input.full_name,
            email,
            monthly_budget: input.monthly_budget,
        };

        if let Err(e) = self.inner.profiles.upsert_profile(&upsert).await {
            log::error!("profile save failed for {}: {}", identity.id, e);
            return false;
        }

        self.apply_for(generation, &identity.id, |state| {
            let (id, created_at) = match state.profile() {
                Some(cached) => (cached.id.clone(), cached.created_at.clone()),
                None => (None, None),
            };
            state.set_profile(Profile {
                id,
                created_at,
                user_id: upsert.user_id,
                full_name: upsert.full_name,
                email: upsert.email,
                monthly_budget: upsert.monthly_budget,
            });
            state.set_completion(true);
        });
        true
    }

    /// Change the monthly budget of the existing profile and re-fetch it
    pub async fn update_budget(&self, monthly_budget: f64) -> bool {
        let _guard = self.inner.profile_lock.lock().await;
        let Some((generation, identity)) = self.current_identity() else {
            return false;
        };
        if let Err(e) = validate_budget(monthly_budget) {
            log::warn!("not updating budget: {}", e);
            return false;
        }

        let update = ProfileUpdate {
            monthly_budget: Some(monthly_budget),
            ..Default::default()
        };
        if let Err(e) = self.inner.profiles.update_profile(&identity.id, &update).await {
            log::error!("budget update failed for {}: {}", identity.id, e);
            return false;
        }

        self.fetch_profile_locked(generation, &identity.id).await;
        true
    }

    /// Load the stored snapshot so routing can start before the session check.
    ///
    /// Does nothing once a login, logout or session check has settled the live
    /// state. A snapshot that cannot be parsed is deleted and treated as
    /// absent; storage errors propagate.
    pub async fn restore(&self) -> Result<Option<Snapshot>> {
        let Some(snapshots) = &self.inner.snapshots else {
            return Ok(None);
        };

        let snapshot = match snapshots.load().await {
            Ok(snapshot) => snapshot,
            Err(Error::Json(e)) => {
                log::warn!("discarding unreadable snapshot: {}", e);
                snapshots.remove().await?;
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(snapshot) = &snapshot {
            self.inner.state.send_if_modified(|state| {
                if state.is_logged_in() || self.inner.reconciled.load(Ordering::SeqCst) {
                    return false;
                }
                state.set_restored(snapshot.clone());
                true
            });
        }
        Ok(snapshot)
    }

    async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        match &self.inner.snapshots {
            Some(snapshots) if self.inner.clear_snapshot_on_logout && snapshot.is_logged_out() => {
                snapshots.remove().await
            }
            Some(snapshots) => snapshots.save(snapshot).await,
            None => Ok(()),
        }
    }

    /// Write the snapshot of the current state now
    pub async fn persist_now(&self) -> Result<()> {
        let snapshot = Snapshot::project(&self.inner.state.borrow());
        self.write_snapshot(&snapshot).await
    }

    /// Write a snapshot after every state change, in the background.
    ///
    /// The task ends with `Ok` once every handle to the store is dropped, or
    /// with the first storage error.
    pub fn spawn_persistence(&self) -> JoinHandle<Result<()>> {
        let mut changes = self.subscribe();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let snapshot = Snapshot::project(&changes.borrow_and_update());
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                AuthStore { inner }.write_snapshot(&snapshot).await?;
            }
            Ok(())
        })
    }
}
