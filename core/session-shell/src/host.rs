//! File-backed host: one simulated tab over the shared session home.

use chrono::{TimeZone, Utc};
use serde::Serialize;
use tracing::debug;

use session_contract::AUTHORIZATION_HEADER;
use session_core::{
    load_config, FileCookieJar, FileStorage, Navigator, RecordingNavigator, SessionPaths,
    SessionRuntime, SessionState, SessionStatus, SharedHeaders, SystemClock,
};

use crate::error::ShellError;

pub struct Host {
    runtime: SessionRuntime,
    headers: SharedHeaders,
    navigator: RecordingNavigator,
    reported_navigations: usize,
}

/// What one invocation prints to stdout.
#[derive(Debug, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub status: SessionStatus,
    pub expires_at_utc: Option<String>,
    pub authorization: Option<String>,
    pub location: String,
    pub navigations: Vec<String>,
}

impl Host {
    pub fn open(location: &str) -> Result<Self, ShellError> {
        let paths = SessionPaths::resolve()?;
        Self::open_in(&paths, location)
    }

    pub fn open_in(paths: &SessionPaths, location: &str) -> Result<Self, ShellError> {
        let config = load_config(&paths.config_file())?;
        let headers = SharedHeaders::new();
        let navigator = RecordingNavigator::at(location);
        let runtime = SessionRuntime::new(
            config,
            Box::new(FileStorage::new(&paths.local_storage_file())),
            Box::new(FileCookieJar::new(&paths.cookies_file())),
            Box::new(headers.clone()),
            Box::new(navigator.clone()),
            Box::new(SystemClock),
        );

        let mut host = Self {
            runtime,
            headers,
            navigator,
            reported_navigations: 0,
        };
        let state = host.runtime.manager_mut().initialize();
        debug!(state = ?state, path = %location, "Tab started");
        Ok(host)
    }

    pub fn runtime(&self) -> &SessionRuntime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut SessionRuntime {
        &mut self.runtime
    }

    pub fn is_authenticated(&self) -> bool {
        self.runtime.manager().state() == SessionState::Authenticated
    }

    /// Follows navigations requested since the last call: the tab moves to
    /// each target and the manager is told the navigation finished.
    pub fn follow_navigations(&mut self) -> Vec<String> {
        let requests = self.navigator.requests();
        let config = self.runtime.manager().config().clone();
        let fresh: Vec<String> = requests
            .iter()
            .skip(self.reported_navigations)
            .map(|target| target.location(&config.landing_route, &config.login_route))
            .collect();
        self.reported_navigations = requests.len();

        for location in &fresh {
            self.navigator.set_location(location);
            self.runtime.manager_mut().navigation_completed(location);
        }
        fresh
    }

    pub fn report(&mut self) -> Report {
        let navigations = self.follow_navigations();
        let status = self.runtime.manager().status();
        let expires_at_utc = status
            .expires_at
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .map(|at| at.to_rfc3339());
        Report {
            status,
            expires_at_utc,
            authorization: self.headers.get(AUTHORIZATION_HEADER),
            location: self.navigator.current_location(),
            navigations,
        }
    }

    pub fn print_report(&mut self) -> Result<(), ShellError> {
        let report = self.report();
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
