//! session-shell: CLI host for the attendance session manager.
//!
//! Every invocation behaves like a tab starting up: it builds a manager over
//! the file-backed store and cookie jar under `~/.attendance-session/`, runs
//! `initialize()`, performs the requested operation, and prints a JSON report
//! (session status, `Authorization` header, navigations requested).
//!
//! ## Subcommands
//!
//! - `login`: Install an identity the backend already authenticated
//! - `status`: Report the restored session
//! - `refresh`: Record activity now
//! - `check`: Run one expiry check
//! - `logout`: End the session (`--expired` for the forced variant)
//! - `watch`: Event loop fed with activity kinds on stdin

mod commands;
mod error;
mod host;
mod logging;
mod watch;

use clap::{Parser, Subcommand};

use crate::commands::LoginArgs;

#[derive(Parser)]
#[command(name = "session-shell")]
#[command(about = "Attendance dashboard session manager")]
#[command(version)]
struct Cli {
    /// Location the simulated tab is on when it starts
    #[arg(long, global = true, default_value = "/dashboard")]
    path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session for an already-authenticated user
    Login(LoginArgs),

    /// Print the current session status
    Status,

    /// Reset the inactivity clock
    Refresh,

    /// Run one inactivity check
    Check,

    /// End the session
    Logout {
        /// Treat as an inactivity expiry (login page gets `?expired=true`)
        #[arg(long)]
        expired: bool,
    },

    /// Keep the session open, reading activity kinds from stdin
    Watch,
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let result = host::Host::open(&cli.path).and_then(|mut host| {
        match cli.command {
            Commands::Login(args) => commands::login(&mut host, args),
            Commands::Status => commands::status(&mut host),
            Commands::Refresh => commands::refresh(&mut host),
            Commands::Check => commands::check(&mut host),
            Commands::Logout { expired } => commands::logout(&mut host, expired),
            Commands::Watch => watch::run(&mut host),
        }
    });

    if let Err(e) = result {
        tracing::error!(error = %e, "session-shell failed");
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
