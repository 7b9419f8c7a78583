//! Session Manager
//!
//! Owns the login session of one tab: the identity handed over by the
//! authentication collaborator, the last-activity instant, and every side
//! effect that mirrors them (persisted record, cookies, default
//! `Authorization` header, activity listeners, expiry poll).
//!
//! # State Machine
//!
//! ```text
//!                  login() / initialize() restore
//!  Unauthenticated ─────────────────────────────────▶ Authenticated
//!        ▲                                                  │
//!        └──────────── logout() / inactivity expiry ────────┘
//! ```
//!
//! # Timing Paths
//!
//! 1. Activity notifications call [`SessionManager::refresh`], which stamps
//!    `now` into memory and the persisted store.
//! 2. A repeating poll calls [`SessionManager::check_expiration`], which reads
//!    the timestamp fresh each time (never a cached snapshot) and takes the
//!    newer of the in-memory and persisted values, so a tab that slept, or
//!    another tab sharing the store, is accounted for.
//!
//! # Failure Semantics
//!
//! The in-memory transition is authoritative. A corrupt persisted record is
//! treated as "logged out" and wiped; failing storage or cookie clears are
//! logged and never block logout.

use std::cmp;

use tracing::{debug, info, trace, warn};

use session_contract::{
    bearer_value, clear_session_cookies, format_last_activity, parse_last_activity,
    parse_user_record, serialize_user_record, session_cookies, ContractError, UserIdentity,
    AUTHORIZATION_HEADER, LAST_ACTIVITY_STORAGE_KEY, USER_STORAGE_KEY,
};

use crate::activity::ActivitySource;
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::cookies::CookieJar;
use crate::error::{Result, SessionError};
use crate::headers::AuthHeaders;
use crate::navigation::Navigator;
use crate::storage::SessionStorage;
use crate::timer::Scheduler;
use crate::types::{
    ActivityKind, EpochMillis, ListenerId, LogoutReason, NavigationTarget, SessionState,
    SessionStatus, TimerId,
};

/// Everything the manager talks to. Each field is the only write path to its
/// resource; consumers read through their own handles.
pub struct Collaborators {
    pub storage: Box<dyn SessionStorage>,
    pub cookies: Box<dyn CookieJar>,
    pub headers: Box<dyn AuthHeaders>,
    pub navigator: Box<dyn Navigator>,
    pub clock: Box<dyn Clock>,
    pub activity: Box<dyn ActivitySource>,
    pub scheduler: Box<dyn Scheduler>,
}

#[derive(Debug, Clone)]
struct ActiveSession {
    user: UserIdentity,
    last_activity: EpochMillis,
}

enum PersistedSession {
    Absent,
    Corrupt(String),
    Present {
        user: UserIdentity,
        last_activity: EpochMillis,
    },
}

pub struct SessionManager {
    config: SessionConfig,
    io: Collaborators,
    session: Option<ActiveSession>,
    redirect_in_flight: bool,
    /// Whole second of the last timestamp this manager persisted.
    persisted_second: Option<i64>,
    poll_timer: Option<TimerId>,
    listener: Option<ListenerId>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, io: Collaborators) -> Self {
        Self {
            config,
            io,
            session: None,
            redirect_in_flight: false,
            persisted_second: None,
            poll_timer: None,
            listener: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn now(&self) -> EpochMillis {
        self.io.clock.now_millis()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutating operations
    // ─────────────────────────────────────────────────────────────────────

    /// Restores the session persisted by a previous page load, or expires it.
    pub fn initialize(&mut self) -> SessionState {
        if self.session.is_some() {
            debug!("initialize() called on an authenticated manager; ignoring");
            return SessionState::Authenticated;
        }

        let (user, last_activity) = match self.read_persisted() {
            PersistedSession::Absent => {
                debug!("No persisted session");
                return SessionState::Unauthenticated;
            }
            PersistedSession::Corrupt(details) => {
                warn!(details = %details, "Persisted session is corrupt; discarding");
                self.clear_persisted();
                return SessionState::Unauthenticated;
            }
            PersistedSession::Present {
                user,
                last_activity,
            } => (user, last_activity),
        };

        let now = self.now();
        if last_activity > now {
            warn!(
                last_activity,
                now, "Persisted last activity is in the future; clamping to now"
            );
        }
        let last_activity = cmp::min(last_activity, now);
        let elapsed_ms = now.saturating_sub(last_activity);
        if elapsed_ms >= self.config.session_duration_millis() {
            info!(
                user_id = %user.id,
                elapsed_ms,
                "Persisted session expired while the app was closed"
            );
            self.clear_persisted();
            let location = self.io.navigator.current_location();
            if self.config.is_public_route(&location) {
                debug!(path = %location, "On a public route; no expiry redirect");
            } else {
                self.redirect_in_flight = true;
                self.io
                    .navigator
                    .navigate(&NavigationTarget::Login { expired: true });
            }
            return SessionState::Unauthenticated;
        }

        info!(user_id = %user.id, elapsed_ms, "Restored persisted session");
        self.install_auth_header(&user.token);
        self.session = Some(ActiveSession {
            user,
            last_activity,
        });
        self.arm_activity_tracking(now);
        self.refresh();
        SessionState::Authenticated
    }

    /// Installs an identity the authentication collaborator already verified.
    pub fn login(&mut self, identity: UserIdentity) -> Result<()> {
        identity.validate().map_err(SessionError::InvalidIdentity)?;
        let record = serialize_user_record(&identity).map_err(SessionError::Record)?;

        if let Some(previous) = self.session.take() {
            debug!(user_id = %previous.user.id, "Replacing existing session");
        }
        self.disarm_activity_tracking();
        self.clear_persisted();

        let now = self.now();
        if let Err(err) = self.persist_session(&record, now) {
            warn!(error = %err, "Failed to persist new session; staying logged out");
            self.clear_persisted();
            self.io.headers.remove_default(AUTHORIZATION_HEADER);
            return Err(err);
        }
        self.persisted_second = Some(second_of(now));

        self.install_auth_header(&identity.token);
        info!(
            user_id = %identity.id,
            role = %identity.role,
            company_id = %identity.company_id,
            "Session started"
        );
        self.session = Some(ActiveSession {
            user: identity,
            last_activity: now,
        });
        self.redirect_in_flight = false;
        self.issue_cookies(now);
        self.arm_activity_tracking(now);
        self.io.navigator.navigate(&NavigationTarget::Landing);
        Ok(())
    }

    /// Ends the session. Safe to call in any state, any number of times.
    pub fn logout(&mut self, reason: LogoutReason) {
        match self.session.take() {
            Some(previous) => info!(user_id = %previous.user.id, reason = ?reason, "Session ended"),
            None => debug!(reason = ?reason, "logout() while unauthenticated"),
        }
        self.clear_persisted();
        self.io.headers.remove_default(AUTHORIZATION_HEADER);
        self.disarm_activity_tracking();
        self.io.navigator.navigate(&NavigationTarget::Login {
            expired: reason == LogoutReason::Expired,
        });
    }

    /// Resets the inactivity clock to now. No-op while unauthenticated.
    ///
    /// The store and cookies are rewritten at most once per wall-clock second;
    /// bursts of activity within the same second only move the in-memory
    /// stamp.
    pub fn refresh(&mut self) {
        let now = self.now();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.last_activity = now;

        let second = second_of(now);
        if self.persisted_second == Some(second) {
            return;
        }
        match self
            .io
            .storage
            .set(LAST_ACTIVITY_STORAGE_KEY, &format_last_activity(now))
        {
            Ok(()) => self.persisted_second = Some(second),
            Err(err) => warn!(error = %err, "Failed to persist last activity"),
        }
        self.issue_cookies(now);
        trace!(last_activity = now, "Session refreshed");
    }

    /// Expires the session if the inactivity window has elapsed. Returns true
    /// when this call performed the expiry.
    pub fn check_expiration(&mut self) -> bool {
        if self.session.is_none() {
            return false;
        }
        if self.redirect_in_flight {
            debug!("Expiry redirect already in flight; skipping check");
            return false;
        }

        let now = self.now();
        let Some(last_activity) = self.effective_last_activity() else {
            return false;
        };
        let elapsed_ms = now.saturating_sub(last_activity);
        if elapsed_ms < self.config.session_duration_millis() {
            trace!(elapsed_ms, "Session still active");
            return false;
        }

        info!(elapsed_ms, "Session expired after inactivity");
        self.redirect_in_flight = true;
        self.logout(LogoutReason::Expired);
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Host callbacks
    // ─────────────────────────────────────────────────────────────────────

    /// Activity notification from the host. Ignored unless listeners are
    /// registered for `kind`.
    pub fn handle_activity(&mut self, kind: ActivityKind) {
        if self.listener.is_none() || !self.config.activity_events.contains(&kind) {
            return;
        }
        self.refresh();
    }

    /// Timer callback from the host. Only the live poll timer does anything.
    pub fn on_timer(&mut self, id: TimerId) {
        if self.poll_timer == Some(id) {
            self.check_expiration();
        } else {
            debug!(timer = id.0, "Ignoring stale timer");
        }
    }

    /// A navigation finished; a new expiry redirect may be issued again.
    pub fn navigation_completed(&mut self, location: &str) {
        if self.redirect_in_flight {
            debug!(path = %location, "Navigation completed; clearing redirect guard");
        }
        self.redirect_in_flight = false;
    }

    /// Owning UI scope is going away: drop listeners and the poll timer but
    /// leave the session itself persisted for the next load.
    pub fn shutdown(&mut self) {
        self.disarm_activity_tracking();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        if self.session.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        self.session.as_ref().map(|session| &session.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.user().map(|user| user.token.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(|user| user.role.is_admin())
    }

    pub fn last_activity(&self) -> Option<EpochMillis> {
        self.session.as_ref().map(|session| session.last_activity)
    }

    pub fn is_redirect_in_flight(&self) -> bool {
        self.redirect_in_flight
    }

    pub fn is_tracking_activity(&self) -> bool {
        self.listener.is_some() && self.poll_timer.is_some()
    }

    pub fn poll_timer(&self) -> Option<TimerId> {
        self.poll_timer
    }

    pub fn status(&self) -> SessionStatus {
        let now = self.now();
        let last_activity = self.effective_last_activity();
        let limit = self.config.session_duration_millis();
        let expires_at = last_activity.map(|instant| instant.saturating_add(limit));
        SessionStatus {
            state: self.state(),
            user: self.user().cloned(),
            is_admin: self.is_admin(),
            last_activity,
            expires_at,
            remaining_ms: expires_at.map(|deadline| deadline.saturating_sub(now).max(0)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn read_persisted(&self) -> PersistedSession {
        let raw_user = match self.io.storage.get(USER_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return PersistedSession::Absent,
            Err(err) => return PersistedSession::Corrupt(err.to_string()),
        };
        let raw_activity = match self.io.storage.get(LAST_ACTIVITY_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return PersistedSession::Corrupt("lastActivity is missing".to_string()),
            Err(err) => return PersistedSession::Corrupt(err.to_string()),
        };

        let parsed: std::result::Result<_, ContractError> = parse_user_record(&raw_user)
            .and_then(|user| parse_last_activity(&raw_activity).map(|at| (user, at)));
        match parsed {
            Ok((user, last_activity)) => PersistedSession::Present {
                user,
                last_activity,
            },
            Err(err) => PersistedSession::Corrupt(err.to_string()),
        }
    }

    /// Newer of the in-memory and persisted timestamps, never later than
    /// now. A persisted value only counts when it is well-formed and not in
    /// the future; a future value would otherwise hold the session open.
    fn effective_last_activity(&self) -> Option<EpochMillis> {
        let now = self.now();
        let in_memory = cmp::min(self.session.as_ref()?.last_activity, now);
        let persisted = self
            .io
            .storage
            .get(LAST_ACTIVITY_STORAGE_KEY)
            .ok()
            .flatten()
            .and_then(|raw| parse_last_activity(&raw).ok())
            .filter(|persisted| *persisted <= now);
        Some(match persisted {
            Some(persisted) => cmp::max(in_memory, persisted),
            None => in_memory,
        })
    }

    fn persist_session(&mut self, record: &str, now: EpochMillis) -> Result<()> {
        self.io.storage.set(USER_STORAGE_KEY, record)?;
        self.io
            .storage
            .set(LAST_ACTIVITY_STORAGE_KEY, &format_last_activity(now))
    }

    /// Best-effort wipe of the persisted record and the cookies.
    fn clear_persisted(&mut self) {
        self.persisted_second = None;
        for key in [USER_STORAGE_KEY, LAST_ACTIVITY_STORAGE_KEY] {
            if let Err(err) = self.io.storage.remove(key) {
                warn!(key, error = %err, "Failed to clear persisted session entry");
            }
        }
        let now = self.now();
        for cookie in clear_session_cookies() {
            if let Err(err) = self.io.cookies.apply(&cookie, now) {
                warn!(cookie = %cookie.name, error = %err, "Failed to clear session cookie");
            }
        }
    }

    /// Re-issues both cookies with max-age set to the remaining window.
    fn issue_cookies(&mut self, now: EpochMillis) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let limit = self.config.session_duration_millis();
        let remaining_ms = limit.saturating_sub(now.saturating_sub(session.last_activity));
        let max_age_secs = (remaining_ms.max(0) + 999) / 1000;
        for cookie in session_cookies(&session.user.role, max_age_secs) {
            if let Err(err) = self.io.cookies.apply(&cookie, now) {
                warn!(cookie = %cookie.name, error = %err, "Failed to issue session cookie");
            }
        }
    }

    fn install_auth_header(&mut self, token: &str) {
        self.io
            .headers
            .set_default(AUTHORIZATION_HEADER, &bearer_value(token));
    }

    fn arm_activity_tracking(&mut self, now: EpochMillis) {
        if self.listener.is_none() {
            self.listener = Some(self.io.activity.subscribe(&self.config.activity_events));
        }
        if self.poll_timer.is_none() {
            let period = self.config.poll_interval();
            self.poll_timer = Some(self.io.scheduler.schedule_repeating(period, now));
        }
    }

    fn disarm_activity_tracking(&mut self) {
        if let Some(listener) = self.listener.take() {
            self.io.activity.unsubscribe(listener);
        }
        if let Some(timer) = self.poll_timer.take() {
            self.io.scheduler.cancel(timer);
        }
    }
}

fn second_of(instant: EpochMillis) -> i64 {
    instant.div_euclid(1000)
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.disarm_activity_tracking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityBus;
    use crate::clock::ManualClock;
    use crate::cookies::MemoryCookieJar;
    use crate::headers::SharedHeaders;
    use crate::navigation::RecordingNavigator;
    use crate::storage::MemoryStorage;
    use crate::timer::TimerQueue;
    use session_contract::{RecordId, Role, USER_COOKIE};

    struct Harness {
        clock: ManualClock,
        storage: MemoryStorage,
        cookies: MemoryCookieJar,
        headers: SharedHeaders,
        navigator: RecordingNavigator,
        bus: ActivityBus,
        timers: TimerQueue,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                clock: ManualClock::new(0),
                storage: MemoryStorage::new(),
                cookies: MemoryCookieJar::new(),
                headers: SharedHeaders::new(),
                navigator: RecordingNavigator::at("/dashboard"),
                bus: ActivityBus::new(),
                timers: TimerQueue::new(),
            }
        }

        fn manager(&self) -> SessionManager {
            self.manager_with(SessionConfig::default())
        }

        fn manager_with(&self, config: SessionConfig) -> SessionManager {
            SessionManager::new(
                config,
                Collaborators {
                    storage: Box::new(self.storage.clone()),
                    cookies: Box::new(self.cookies.clone()),
                    headers: Box::new(self.headers.clone()),
                    navigator: Box::new(self.navigator.clone()),
                    clock: Box::new(self.clock.clone()),
                    activity: Box::new(self.bus.clone()),
                    scheduler: Box::new(self.timers.clone()),
                },
            )
        }
    }

    fn identity(role: &str) -> UserIdentity {
        UserIdentity {
            id: RecordId::Number(1),
            name: "Jo".to_string(),
            email: "jo@example.com".to_string(),
            role: Role::from(role),
            company_id: RecordId::Number(3),
            company_name: "Acme".to_string(),
            token: "tok".to_string(),
        }
    }

    #[test]
    fn refresh_is_noop_when_unauthenticated() {
        let harness = Harness::new();
        let mut manager = harness.manager();
        manager.refresh();
        assert!(harness.storage.is_empty());
        assert!(harness.cookies.history().is_empty());
    }

    #[test]
    fn refresh_stamps_now_after_clock_steps_back() {
        let harness = Harness::new();
        let mut manager = harness.manager();
        harness.clock.set(5_000);
        manager.login(identity("admin")).unwrap();
        harness.clock.set(3_000);
        manager.refresh();
        assert_eq!(manager.last_activity(), Some(3_000));
        assert_eq!(
            harness.storage.get(LAST_ACTIVITY_STORAGE_KEY).unwrap().as_deref(),
            Some("3000")
        );
    }

    #[test]
    fn future_persisted_activity_does_not_hold_session_open() {
        let harness = Harness::new();
        let mut storage = harness.storage.clone();
        storage
            .set(USER_STORAGE_KEY, &serialize_user_record(&identity("admin")).unwrap())
            .unwrap();
        storage.set(LAST_ACTIVITY_STORAGE_KEY, "86400000").unwrap();

        let mut manager = harness.manager();
        assert_eq!(manager.initialize(), SessionState::Authenticated);
        assert_eq!(manager.last_activity(), Some(0));

        // Another writer keeps pushing a future stamp; it must be ignored.
        storage.set(LAST_ACTIVITY_STORAGE_KEY, "86400000").unwrap();
        harness.clock.set(1_800_000);
        assert!(manager.check_expiration());
        assert_eq!(manager.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn refresh_writes_through_once_per_second() {
        let harness = Harness::new();
        let mut manager = harness.manager();
        manager.login(identity("admin")).unwrap();
        let issued = harness.cookies.history().len();

        harness.clock.set(400);
        manager.refresh();
        manager.refresh();
        assert_eq!(manager.last_activity(), Some(400));
        assert_eq!(
            harness.storage.get(LAST_ACTIVITY_STORAGE_KEY).unwrap().as_deref(),
            Some("0")
        );
        assert_eq!(harness.cookies.history().len(), issued);

        harness.clock.set(1_000);
        manager.refresh();
        assert_eq!(
            harness.storage.get(LAST_ACTIVITY_STORAGE_KEY).unwrap().as_deref(),
            Some("1000")
        );
        assert_eq!(harness.cookies.history().len(), issued + 2);
    }

    #[test]
    fn cookies_carry_full_window_after_refresh() {
        let harness = Harness::new();
        let mut manager = harness.manager();
        manager.login(identity("admin")).unwrap();
        harness.clock.set(600_000);
        manager.refresh();
        let flag = harness.cookies.get(USER_COOKIE).unwrap();
        assert_eq!(flag.expires_at, 600_000 + 900_000);
    }

    #[test]
    fn activity_ignored_for_unconfigured_kind() {
        let harness = Harness::new();
        let mut config = SessionConfig::default();
        config.activity_events = vec![ActivityKind::KeyPress];
        let mut manager = harness.manager_with(config);
        manager.login(identity("admin")).unwrap();
        harness.clock.set(10_000);
        manager.handle_activity(ActivityKind::Scroll);
        assert_eq!(manager.last_activity(), Some(0));
        manager.handle_activity(ActivityKind::KeyPress);
        assert_eq!(manager.last_activity(), Some(10_000));
    }

    #[test]
    fn stale_timer_id_does_not_check() {
        let harness = Harness::new();
        let mut manager = harness.manager();
        manager.login(identity("admin")).unwrap();
        harness.clock.set(2_000_000);
        manager.on_timer(TimerId(9_999));
        assert_eq!(manager.state(), SessionState::Authenticated);
        let poll = manager.poll_timer().unwrap();
        manager.on_timer(poll);
        assert_eq!(manager.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn drop_releases_listeners_and_timer() {
        let harness = Harness::new();
        {
            let mut manager = harness.manager();
            manager.login(identity("admin")).unwrap();
            assert_eq!(harness.bus.listener_count(), 1);
            assert_eq!(harness.timers.active_count(), 1);
        }
        assert_eq!(harness.bus.listener_count(), 0);
        assert_eq!(harness.timers.active_count(), 0);
        assert!(!harness.storage.is_empty());
    }

    #[test]
    fn status_reports_remaining_window() {
        let harness = Harness::new();
        let mut manager = harness.manager();
        manager.login(identity("manager")).unwrap();
        harness.clock.set(100_000);
        let status = manager.status();
        assert_eq!(status.state, SessionState::Authenticated);
        assert_eq!(status.expires_at, Some(900_000));
        assert_eq!(status.remaining_ms, Some(800_000));
        assert!(!status.is_admin);
    }
}
