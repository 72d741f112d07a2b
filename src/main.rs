//! Usage: `workhub-auth` diagnostic CLI - run one auth operation against the configured backend.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use workhub_auth::commands::auth;
use workhub_auth::{global_registry, logging, settings, AuthController, AuthState};

#[derive(Parser)]
#[command(name = "workhub-auth")]
#[command(about = "Try Workhub sign-in methods and explain auth error codes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (TOML); environment overrides still apply
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    SignIn {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account, optionally setting its display name
    SignUp {
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        display_name: Option<String>,
    },
    /// Sign in through an OAuth popup provider
    SignInWith {
        /// Provider name (google, github)
        provider: String,
    },
    /// Send a password reset email
    ResetPassword { email: String },
    /// Sign out of the current session (succeeds when already signed out)
    SignOut,
    /// Show the user-facing message and help topic for an error code
    Explain { code: String },
    /// List the OAuth providers and their scopes
    Providers,
}

#[derive(Serialize)]
struct ProviderRow {
    name: &'static str,
    provider_id: &'static str,
    scopes: &'static [&'static str],
}

fn print_json(value: &impl Serialize) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to encode output: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_providers() -> ExitCode {
    let registry = global_registry();
    let rows: Vec<ProviderRow> = registry
        .names()
        .into_iter()
        .filter_map(|name| registry.get_by_name(name))
        .map(|config| ProviderRow {
            name: config.key.as_str(),
            provider_id: config.provider_id,
            scopes: config.scopes,
        })
        .collect();
    print_json(&rows)
}

async fn run_online(command: &Commands, controller: &AuthController) -> Option<auth::CommandReport> {
    let report = match command {
        Commands::SignIn { email, password } => auth::sign_in(controller, email, password).await,
        Commands::SignUp {
            email,
            password,
            display_name,
        } => auth::sign_up(controller, email, password, display_name.as_deref()).await,
        Commands::SignInWith { provider } => auth::sign_in_with_provider(controller, provider).await,
        Commands::ResetPassword { email } => auth::reset_password(controller, email).await,
        Commands::SignOut => auth::sign_out(controller).await,
        Commands::Explain { .. } | Commands::Providers => return None,
    };
    Some(report)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Offline commands need neither settings nor a backend.
    match &cli.command {
        Commands::Explain { code } => return print_json(&auth::explain(code)),
        Commands::Providers => return print_providers(),
        _ => {}
    }

    let settings = match settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = match logging::init(&settings.logging) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let state = match AuthState::from_settings(&settings) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!("auth state init failed: {err}");
            return ExitCode::FAILURE;
        }
    };
    let controller = state.controller();

    let exit = match run_online(&cli.command, &controller).await {
        Some(report) => {
            let printed = print_json(&report);
            if report.ok {
                printed
            } else {
                ExitCode::FAILURE
            }
        }
        None => ExitCode::FAILURE,
    };

    drop(controller);
    state.shutdown().await;
    exit
}
