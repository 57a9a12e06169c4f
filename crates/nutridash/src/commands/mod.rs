//! Command dispatch: bridges CLI args -> dashboard operations -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod items;
pub mod stats;
pub mod util;

use nutridash_core::Dashboard;

use crate::cli::{AuthCommand, Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    dashboard: &Dashboard,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::List(args) => items::list(dashboard, args, global).await,
        Command::Browse(args) => items::browse(dashboard, args, global).await,
        Command::Search(args) => items::search(dashboard, args, global).await,
        Command::Create(args) => items::create(dashboard, args, global).await,
        Command::Update(args) => items::update(dashboard, args, global).await,
        Command::Delete(args) => items::delete(dashboard, args, global).await,
        Command::Stats(args) => stats::handle(dashboard, args, global).await,
        Command::Auth(args) => match args.command {
            AuthCommand::Login { email, password } => {
                auth::login(
                    dashboard,
                    email,
                    password,
                    resolved.profile.email.as_deref(),
                    global,
                )
                .await
            }
            AuthCommand::Logout | AuthCommand::Status => Ok(()),
        },
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

/// Resource kind a command operates on, for error context.
pub fn kind_of(cmd: &Command) -> Option<nutridash_core::ResourceKind> {
    let kind = match cmd {
        Command::List(a) => a.kind,
        Command::Browse(a) => a.kind,
        Command::Search(a) => a.kind,
        Command::Create(a) => a.kind,
        Command::Update(a) => a.kind,
        Command::Delete(a) => a.kind,
        Command::Stats(a) => a.kind,
        Command::Auth(_) | Command::Config(_) | Command::Completions(_) => return None,
    };
    Some(kind.into())
}
