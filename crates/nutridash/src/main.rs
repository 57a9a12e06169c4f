mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nutridash_core::Dashboard;

use crate::cli::{AuthCommand, Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a backend
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "nutridash", &mut std::io::stdout());
            Ok(())
        }

        // Session inspection only touches the token store
        Command::Auth(ref args) if !matches!(args.command, AuthCommand::Login { .. }) => {
            let (profile, store) = config::token_store(&cli.global);
            match args.command {
                AuthCommand::Logout => commands::auth::logout(&store, &profile, &cli.global),
                _ => commands::auth::status(&store, &profile, &cli.global),
            }
        }

        cmd => {
            let resolved = config::resolve(&cli.global)?;
            let dashboard = Dashboard::new(resolved.dashboard.clone(), resolved.tokens.clone())?;

            let kind = commands::kind_of(&cmd);
            tracing::debug!(command = ?cmd, profile = %resolved.profile_name, "dispatching command");
            let result = commands::dispatch(cmd, &dashboard, &resolved, &cli.global).await;
            dashboard.shutdown();
            result.map_err(|err| {
                err.in_context(
                    &resolved.profile_name,
                    kind.map_or("", nutridash_core::ResourceKind::path),
                )
            })
        }
    }
}
