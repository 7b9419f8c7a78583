//! Lifecycle tests: login, reload, refresh cadence, inactivity expiry, logout.

use session_contract::{
    RecordId, Role, UserIdentity, AUTHORIZATION_HEADER, LAST_ACTIVITY_STORAGE_KEY, USER_COOKIE,
    USER_ROLE_COOKIE, USER_STORAGE_KEY,
};
use session_core::{
    ActivityKind, LogoutReason, ManualClock, MemoryCookieJar, MemoryStorage, NavigationTarget,
    RecordingNavigator, SessionConfig, SessionRuntime, SessionState, SessionStorage,
    SharedHeaders,
};

const LIMIT_MS: i64 = 900_000;

struct Tab {
    clock: ManualClock,
    storage: MemoryStorage,
    cookies: MemoryCookieJar,
    headers: SharedHeaders,
    navigator: RecordingNavigator,
}

impl Tab {
    fn new() -> Self {
        Self {
            clock: ManualClock::new(0),
            storage: MemoryStorage::new(),
            cookies: MemoryCookieJar::new(),
            headers: SharedHeaders::new(),
            navigator: RecordingNavigator::at("/dashboard"),
        }
    }

    /// A fresh runtime over the same persisted state, like a page reload.
    fn open(&self) -> SessionRuntime {
        SessionRuntime::new(
            SessionConfig::default(),
            Box::new(self.storage.clone()),
            Box::new(self.cookies.clone()),
            Box::new(self.headers.clone()),
            Box::new(self.navigator.clone()),
            Box::new(self.clock.clone()),
        )
    }

    fn expiry_redirects(&self) -> usize {
        self.navigator
            .requests()
            .iter()
            .filter(|target| **target == NavigationTarget::Login { expired: true })
            .count()
    }
}

fn identity(role: &str) -> UserIdentity {
    UserIdentity {
        id: RecordId::Number(17),
        name: "Mariam Koné".to_string(),
        email: "mariam@acme.test".to_string(),
        role: Role::from(role),
        company_id: RecordId::from("company-4"),
        company_name: "Acme Logistics".to_string(),
        token: "eyJhbGciOiJIUzI1NiJ9.payload.sig".to_string(),
    }
}

#[test]
fn login_installs_session_and_side_effects() {
    let tab = Tab::new();
    let mut runtime = tab.open();

    runtime.manager_mut().login(identity("admin")).unwrap();

    let manager = runtime.manager();
    assert_eq!(manager.state(), SessionState::Authenticated);
    assert_eq!(manager.token(), Some("eyJhbGciOiJIUzI1NiJ9.payload.sig"));
    assert_eq!(
        tab.headers.get(AUTHORIZATION_HEADER).as_deref(),
        Some("Bearer eyJhbGciOiJIUzI1NiJ9.payload.sig")
    );
    assert_eq!(
        tab.storage.get(LAST_ACTIVITY_STORAGE_KEY).unwrap().as_deref(),
        Some("0")
    );
    assert!(tab.storage.get(USER_STORAGE_KEY).unwrap().is_some());
    assert_eq!(tab.cookies.live_value(USER_COOKIE, 0).as_deref(), Some("true"));
    assert_eq!(
        tab.cookies.live_value(USER_ROLE_COOKIE, 0).as_deref(),
        Some("admin")
    );
    assert_eq!(tab.navigator.last_request(), Some(NavigationTarget::Landing));
    assert!(manager.is_tracking_activity());
}

#[test]
fn refresh_cadence_below_limit_never_expires() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    runtime.manager_mut().login(identity("employee")).unwrap();

    // Four simulated hours: poll every 30s, activity every 14 minutes.
    let mut now = 0;
    while now < 4 * 60 * 60 * 1000 {
        now += 30_000;
        tab.clock.set(now);
        if now % 840_000 == 0 {
            assert!(runtime.dispatch_activity(ActivityKind::KeyPress));
        }
        runtime.run_due_timers();
        assert_eq!(runtime.manager().state(), SessionState::Authenticated);
    }
    assert_eq!(tab.expiry_redirects(), 0);
}

#[test]
fn inactivity_expires_exactly_once() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    runtime.manager_mut().login(identity("employee")).unwrap();

    tab.clock.set(LIMIT_MS);
    assert!(runtime.manager_mut().check_expiration());
    assert_eq!(runtime.manager().state(), SessionState::Unauthenticated);

    tab.clock.set(LIMIT_MS + 30_000);
    assert!(!runtime.manager_mut().check_expiration());
    assert_eq!(runtime.run_due_timers(), 0);
    assert_eq!(tab.expiry_redirects(), 1);
}

#[test]
fn documented_refresh_then_expiry_scenario() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    runtime.manager_mut().login(identity("admin")).unwrap();

    tab.clock.set(800_000);
    runtime.manager_mut().refresh();

    tab.clock.set(1_500_000);
    assert!(!runtime.manager_mut().check_expiration());
    assert_eq!(runtime.manager().state(), SessionState::Authenticated);

    tab.clock.set(1_900_000);
    assert!(runtime.manager_mut().check_expiration());
    assert_eq!(runtime.manager().state(), SessionState::Unauthenticated);
    assert_eq!(tab.expiry_redirects(), 1);
}

#[test]
fn poll_timer_drives_expiry() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    runtime.manager_mut().login(identity("admin")).unwrap();
    assert_eq!(runtime.next_deadline(), Some(30_000));

    let mut now = 0;
    while runtime.manager().state() == SessionState::Authenticated {
        now = runtime.next_deadline().expect("poll timer armed while authenticated");
        tab.clock.set(now);
        runtime.run_due_timers();
    }

    assert_eq!(now, 900_000);
    assert_eq!(runtime.next_deadline(), None);
    assert_eq!(tab.expiry_redirects(), 1);
}

#[test]
fn reload_restores_identical_user_without_expiry() {
    let tab = Tab::new();
    let user = identity("manager");
    {
        let mut runtime = tab.open();
        runtime.manager_mut().login(user.clone()).unwrap();
    }

    tab.clock.set(120_000);
    let mut reloaded = tab.open();
    assert_eq!(
        reloaded.manager_mut().initialize(),
        SessionState::Authenticated
    );
    assert_eq!(reloaded.manager().user(), Some(&user));
    assert_eq!(reloaded.manager().last_activity(), Some(120_000));
    assert_eq!(
        tab.headers.get(AUTHORIZATION_HEADER),
        Some(format!("Bearer {}", user.token))
    );
    assert!(reloaded.manager().is_tracking_activity());
    assert_eq!(tab.expiry_redirects(), 0);
}

#[test]
fn reload_after_limit_redirects_with_expiry_flag() {
    let tab = Tab::new();
    {
        let mut runtime = tab.open();
        runtime.manager_mut().login(identity("admin")).unwrap();
        runtime.manager_mut().shutdown();
    }

    tab.navigator.set_location("/reports?month=3");
    tab.clock.set(LIMIT_MS + 1);
    let mut reloaded = tab.open();
    assert_eq!(
        reloaded.manager_mut().initialize(),
        SessionState::Unauthenticated
    );
    assert!(tab.storage.is_empty());
    assert!(tab.cookies.is_empty());
    assert!(reloaded.manager().is_redirect_in_flight());
    assert_eq!(
        tab.navigator.last_request(),
        Some(NavigationTarget::Login { expired: true })
    );
    assert!(!reloaded.manager().is_tracking_activity());
}

#[test]
fn reload_after_limit_on_public_route_does_not_redirect() {
    let tab = Tab::new();
    {
        let mut runtime = tab.open();
        runtime.manager_mut().login(identity("admin")).unwrap();
    }
    tab.navigator.clear();
    tab.navigator.set_location("/login?expired=true");
    tab.clock.set(2 * LIMIT_MS);

    let mut reloaded = tab.open();
    assert_eq!(
        reloaded.manager_mut().initialize(),
        SessionState::Unauthenticated
    );
    assert!(tab.navigator.requests().is_empty());
    assert!(tab.storage.is_empty());
}

#[test]
fn malformed_record_is_treated_as_logged_out() {
    let tab = Tab::new();
    let mut storage = tab.storage.clone();
    storage.set(USER_STORAGE_KEY, "{").unwrap();
    storage.set(LAST_ACTIVITY_STORAGE_KEY, "0").unwrap();

    let mut runtime = tab.open();
    assert_eq!(
        runtime.manager_mut().initialize(),
        SessionState::Unauthenticated
    );
    assert!(runtime.manager().user().is_none());
    assert!(tab.storage.is_empty());
    assert!(tab.navigator.requests().is_empty());
}

#[test]
fn record_without_timestamp_is_treated_as_logged_out() {
    let tab = Tab::new();
    {
        let mut runtime = tab.open();
        runtime.manager_mut().login(identity("admin")).unwrap();
    }
    let mut storage = tab.storage.clone();
    storage.remove(LAST_ACTIVITY_STORAGE_KEY).unwrap();

    let mut runtime = tab.open();
    assert_eq!(
        runtime.manager_mut().initialize(),
        SessionState::Unauthenticated
    );
    assert!(tab.storage.is_empty());
}

#[test]
fn logout_clears_everything_and_is_idempotent() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    runtime.manager_mut().login(identity("admin")).unwrap();

    runtime.manager_mut().logout(LogoutReason::Normal);
    runtime.manager_mut().logout(LogoutReason::Normal);

    assert_eq!(runtime.manager().state(), SessionState::Unauthenticated);
    assert!(runtime.manager().token().is_none());
    assert!(tab.storage.is_empty());
    assert!(tab.cookies.is_empty());
    assert!(tab.headers.get(AUTHORIZATION_HEADER).is_none());
    assert_eq!(runtime.next_deadline(), None);
    assert_eq!(runtime.activity().listener_count(), 0);
    assert_eq!(
        tab.navigator.last_request(),
        Some(NavigationTarget::Login { expired: false })
    );
}

#[test]
fn logout_on_fresh_manager_is_safe() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    runtime.manager_mut().logout(LogoutReason::Expired);
    assert_eq!(runtime.manager().state(), SessionState::Unauthenticated);
    assert!(tab.storage.is_empty());
}

#[test]
fn repeated_login_logout_cycles_do_not_leak() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    for _ in 0..5 {
        runtime.manager_mut().login(identity("admin")).unwrap();
        runtime.manager_mut().login(identity("employee")).unwrap();
        assert_eq!(runtime.timers().active_count(), 1);
        assert_eq!(runtime.activity().listener_count(), 1);
        runtime.manager_mut().logout(LogoutReason::Normal);
        assert_eq!(runtime.timers().active_count(), 0);
        assert_eq!(runtime.activity().listener_count(), 0);
    }
}

#[test]
fn activity_is_not_delivered_while_logged_out() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    assert!(!runtime.dispatch_activity(ActivityKind::PointerDown));
    assert!(tab.storage.is_empty());
}

#[test]
fn activity_from_every_kind_resets_clock() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    runtime.manager_mut().login(identity("admin")).unwrap();

    for (step, kind) in ActivityKind::ALL.into_iter().enumerate() {
        let now = (step as i64 + 1) * 1_000;
        tab.clock.set(now);
        assert!(runtime.dispatch_activity(kind));
        assert_eq!(runtime.manager().last_activity(), Some(now));
    }
}

#[test]
fn persisted_timestamp_from_another_tab_keeps_session_alive() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    runtime.manager_mut().login(identity("admin")).unwrap();

    // Another tab sharing the store records activity; this tab saw none.
    let mut other_tab_storage = tab.storage.clone();
    other_tab_storage
        .set(LAST_ACTIVITY_STORAGE_KEY, "700000")
        .unwrap();

    tab.clock.set(1_000_000);
    assert!(!runtime.manager_mut().check_expiration());
    assert_eq!(runtime.manager().state(), SessionState::Authenticated);
    // A passive check does not move the in-memory clock.
    assert_eq!(runtime.manager().last_activity(), Some(0));

    tab.clock.set(1_600_000);
    assert!(runtime.manager_mut().check_expiration());
}

#[test]
fn redirect_guard_resets_on_navigation() {
    let tab = Tab::new();
    {
        let mut runtime = tab.open();
        runtime.manager_mut().login(identity("admin")).unwrap();
    }
    tab.clock.set(LIMIT_MS);
    let mut runtime = tab.open();
    runtime.manager_mut().initialize();
    assert!(runtime.manager().is_redirect_in_flight());

    runtime.manager_mut().navigation_completed("/login?expired=true");
    assert!(!runtime.manager().is_redirect_in_flight());

    runtime.manager_mut().login(identity("admin")).unwrap();
    tab.clock.set(2 * LIMIT_MS);
    assert!(runtime.manager_mut().check_expiration());
    assert_eq!(tab.expiry_redirects(), 2);
}

#[test]
fn is_admin_only_for_admin_role() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    assert!(!runtime.manager().is_admin());

    runtime.manager_mut().login(identity("admin")).unwrap();
    assert!(runtime.manager().is_admin());

    for role in ["Admin", "administrator", "manager", ""] {
        let mut user = identity("admin");
        user.role = Role::from(role);
        if role.is_empty() {
            assert!(runtime.manager_mut().login(user).is_err());
            continue;
        }
        runtime.manager_mut().login(user).unwrap();
        assert!(!runtime.manager().is_admin(), "role {role:?} must not be admin");
    }
}

#[test]
fn invalid_identity_is_rejected_without_side_effects() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    let mut user = identity("admin");
    user.token = String::new();

    assert!(runtime.manager_mut().login(user).is_err());
    assert_eq!(runtime.manager().state(), SessionState::Unauthenticated);
    assert!(tab.storage.is_empty());
    assert!(tab.navigator.requests().is_empty());
}

#[test]
fn cookie_max_age_matches_session_window() {
    let tab = Tab::new();
    let mut runtime = tab.open();
    runtime.manager_mut().login(identity("admin")).unwrap();

    let issued: Vec<_> = tab
        .cookies
        .history()
        .into_iter()
        .filter(|cookie| !cookie.is_removal())
        .collect();
    assert_eq!(issued.len(), 2);
    assert!(issued.iter().all(|cookie| cookie.max_age_secs == 900));
    assert!(issued.iter().all(|cookie| cookie.path == "/"));
}

#[test]
fn future_persisted_activity_still_expires_after_limit() {
    let tab = Tab::new();
    {
        let mut runtime = tab.open();
        runtime.manager_mut().login(identity("admin")).unwrap();
    }
    // Written by a tab whose clock ran a day ahead.
    let mut storage = tab.storage.clone();
    storage.set(LAST_ACTIVITY_STORAGE_KEY, "86400000").unwrap();
    tab.navigator.clear();

    let mut runtime = tab.open();
    assert_eq!(
        runtime.manager_mut().initialize(),
        SessionState::Authenticated
    );
    assert_eq!(runtime.manager().last_activity(), Some(0));
    assert_eq!(
        tab.storage.get(LAST_ACTIVITY_STORAGE_KEY).unwrap().as_deref(),
        Some("0")
    );

    let mut now = 0;
    while now < 2 * LIMIT_MS {
        now += 30_000;
        tab.clock.set(now);
        runtime.run_due_timers();
    }
    assert_eq!(runtime.manager().state(), SessionState::Unauthenticated);
    assert_eq!(tab.expiry_redirects(), 1);
}

#[test]
fn clock_stepping_back_restarts_window_from_new_time() {
    let tab = Tab::new();
    tab.clock.set(10_000_000);
    let mut runtime = tab.open();
    runtime.manager_mut().login(identity("admin")).unwrap();

    tab.clock.set(5_000_000);
    assert!(runtime.dispatch_activity(ActivityKind::Scroll));
    assert_eq!(runtime.manager().last_activity(), Some(5_000_000));

    tab.clock.set(5_000_000 + LIMIT_MS - 1);
    assert!(!runtime.manager_mut().check_expiration());
    tab.clock.set(5_000_000 + LIMIT_MS);
    assert!(runtime.manager_mut().check_expiration());
    assert_eq!(tab.expiry_redirects(), 1);
}
