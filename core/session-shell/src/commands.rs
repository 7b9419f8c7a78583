//! One-shot subcommands. Each runs on a freshly initialized host and prints
//! the resulting report.

use clap::Args;
use tracing::info;

use session_contract::{RecordId, Role, UserIdentity};
use session_core::LogoutReason;

use crate::error::ShellError;
use crate::host::Host;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// User id (numeric ids are stored as numbers)
    #[arg(long)]
    pub id: String,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub email: String,

    /// Role string; only `admin` grants admin access
    #[arg(long)]
    pub role: String,

    #[arg(long)]
    pub company_id: String,

    #[arg(long)]
    pub company_name: String,

    /// Bearer token issued by the backend
    #[arg(long)]
    pub token: String,
}

impl LoginArgs {
    fn into_identity(self) -> UserIdentity {
        UserIdentity {
            id: record_id(&self.id),
            name: self.name,
            email: self.email,
            role: Role::from(self.role),
            company_id: record_id(&self.company_id),
            company_name: self.company_name,
            token: self.token,
        }
    }
}

fn record_id(raw: &str) -> RecordId {
    match raw.trim().parse::<i64>() {
        Ok(number) => RecordId::Number(number),
        Err(_) => RecordId::Text(raw.trim().to_string()),
    }
}

pub fn login(host: &mut Host, args: LoginArgs) -> Result<(), ShellError> {
    let identity = args.into_identity();
    host.runtime_mut().manager_mut().login(identity)?;
    host.print_report()
}

pub fn status(host: &mut Host) -> Result<(), ShellError> {
    host.print_report()
}

pub fn refresh(host: &mut Host) -> Result<(), ShellError> {
    if !host.is_authenticated() {
        return Err(ShellError::InvalidArgument(
            "no active session to refresh".to_string(),
        ));
    }
    host.runtime_mut().manager_mut().refresh();
    host.print_report()
}

pub fn check(host: &mut Host) -> Result<(), ShellError> {
    if host.runtime_mut().manager_mut().check_expiration() {
        info!("Session expired during check");
    }
    host.print_report()
}

pub fn logout(host: &mut Host, expired: bool) -> Result<(), ShellError> {
    let reason = if expired {
        LogoutReason::Expired
    } else {
        LogoutReason::Normal
    };
    host.runtime_mut().manager_mut().logout(reason);
    host.print_report()
}
