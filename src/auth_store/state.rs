//! The in-memory auth aggregate and the routing decisions derived from it

use crate::auth::{Identity, Session};
use crate::auth_store::Snapshot;
use crate::db::Profile;

/// Where the user is in the login/onboarding flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    LoggedOut,
    /// Logged in, completion check still pending
    ProfileUnknown,
    ProfileIncomplete,
    ProfileComplete,
}

/// Top-level screen group the app may show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Login and sign-up screens
    Auth,
    /// Budget profile onboarding
    Onboarding,
    /// The main tabs
    Main,
}

impl Route {
    pub fn from_flags(is_logged_in: bool, has_completed_profile: bool) -> Self {
        match (is_logged_in, has_completed_profile) {
            (false, _) => Route::Auth,
            (true, false) => Route::Onboarding,
            (true, true) => Route::Main,
        }
    }
}

/// Session, profile-completion and cached-profile state.
///
/// Fields are only changed through [`crate::auth_store::AuthStore`], which keeps
/// these invariants:
/// - logged in implies both identity and session are present;
/// - logged out implies no completed profile and no cached profile;
/// - a cached profile always belongs to the current identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    identity: Option<Identity>,
    session: Option<Session>,
    is_logged_in: bool,
    has_completed_profile: bool,
    completion_known: bool,
    profile: Option<Profile>,
    restored: Option<Snapshot>,
}

impl AuthState {
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    pub fn has_completed_profile(&self) -> bool {
        self.has_completed_profile
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Snapshot loaded at start that has not yet been reconciled with the
    /// session service
    pub fn restored(&self) -> Option<&Snapshot> {
        self.restored.as_ref()
    }

    pub fn phase(&self) -> AuthPhase {
        match (self.is_logged_in, self.completion_known, self.has_completed_profile) {
            (false, _, _) => AuthPhase::LoggedOut,
            (true, false, _) => AuthPhase::ProfileUnknown,
            (true, true, false) => AuthPhase::ProfileIncomplete,
            (true, true, true) => AuthPhase::ProfileComplete,
        }
    }

    /// Screen group to show; uses the restored snapshot until the live
    /// session has been checked.
    pub fn route(&self) -> Route {
        match &self.restored {
            Some(snapshot) => {
                Route::from_flags(snapshot.is_logged_in, snapshot.has_completed_profile)
            }
            None => Route::from_flags(self.is_logged_in, self.has_completed_profile),
        }
    }

    pub(crate) fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.id.as_str())
    }

    /// Log in as `identity`. The completion flag becomes unconfirmed until the
    /// next check; for the same user its last value still drives the route.
    pub(crate) fn establish(&mut self, identity: Identity, session: Session) {
        if self.user_id() != Some(identity.id.as_str()) {
            self.has_completed_profile = false;
            self.profile = None;
        }
        self.completion_known = false;
        self.identity = Some(identity);
        self.session = Some(session);
        self.is_logged_in = true;
        self.restored = None;
    }

    pub(crate) fn clear(&mut self) {
        *self = AuthState::default();
    }

    pub(crate) fn set_completion(&mut self, completed: bool) {
        self.has_completed_profile = completed;
        self.completion_known = true;
    }

    pub(crate) fn set_profile(&mut self, profile: Profile) {
        self.profile = Some(profile);
    }

    pub(crate) fn set_restored(&mut self, snapshot: Snapshot) {
        self.restored = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str) -> Identity {
        Identity::new(id, Some("a@b.com"))
    }

    fn session(id: &str) -> Session {
        Session::new("access", "refresh", 3600, identity(id))
    }

    #[test]
    fn phases_follow_flags() {
        let mut state = AuthState::default();
        assert_eq!(state.phase(), AuthPhase::LoggedOut);
        assert_eq!(state.route(), Route::Auth);

        state.establish(identity("u1"), session("u1"));
        assert_eq!(state.phase(), AuthPhase::ProfileUnknown);
        assert_eq!(state.route(), Route::Onboarding);

        state.set_completion(false);
        assert_eq!(state.phase(), AuthPhase::ProfileIncomplete);

        state.set_completion(true);
        assert_eq!(state.phase(), AuthPhase::ProfileComplete);
        assert_eq!(state.route(), Route::Main);

        state.clear();
        assert_eq!(state, AuthState::default());
    }

    #[test]
    fn switching_identity_drops_profile_state() {
        let mut state = AuthState::default();
        state.establish(identity("u1"), session("u1"));
        state.set_completion(true);

        state.establish(identity("u1"), session("u1"));
        assert!(state.has_completed_profile());
        assert_eq!(state.route(), Route::Main);

        state.establish(identity("u2"), session("u2"));
        assert!(!state.has_completed_profile());
        assert_eq!(state.phase(), AuthPhase::ProfileUnknown);
    }

    #[test]
    fn reestablishing_same_user_awaits_a_fresh_check() {
        let mut state = AuthState::default();
        state.establish(identity("u1"), session("u1"));
        state.set_completion(true);
        assert_eq!(state.phase(), AuthPhase::ProfileComplete);

        state.establish(identity("u1"), session("u1"));
        assert_eq!(state.phase(), AuthPhase::ProfileUnknown);

        state.set_completion(false);
        assert_eq!(state.phase(), AuthPhase::ProfileIncomplete);
        assert_eq!(state.route(), Route::Onboarding);
    }

    #[test]
    fn restored_snapshot_drives_route_until_reconciled() {
        let mut state = AuthState::default();
        state.set_restored(Snapshot {
            is_logged_in: true,
            has_completed_profile: true,
            user: None,
        });
        assert!(!state.is_logged_in());
        assert_eq!(state.route(), Route::Main);

        state.clear();
        assert_eq!(state.route(), Route::Auth);
    }
}
