use std::process::ExitCode;

use clap::{Parser, Subcommand};
use portal_guard::{GuardConfig, GuardDecision, PortalContext, RouteDescriptor};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "portal-guard", about = "Session and availability checks against the portal backend")]
struct Cli {
    /// Overrides `PORTAL_API_URL`.
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether the backend is in maintenance mode.
    Status {
        #[arg(long)]
        force: bool,
    },
    /// Derive the current session.
    Whoami,
    /// Run the navigation guard chain for a destination.
    Navigate {
        path: String,
        #[arg(long)]
        requires_auth: bool,
        #[arg(long)]
        guest_only: bool,
        #[arg(long)]
        bypass_availability: bool,
    },
    /// End the session remotely and locally.
    Logout,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match GuardConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(2);
        }
    };
    let config = match cli.api_url.as_deref() {
        Some(url) => match config.with_api_url(url) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "invalid --api-url");
                return ExitCode::from(2);
            }
        },
        None => config,
    };

    let ctx = match PortalContext::from_config(&config) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client");
            return ExitCode::from(2);
        }
    };
    tracing::info!(api_url = %config.api_url, "portal guard ready");

    run(&ctx, cli.command).await
}

async fn run(ctx: &PortalContext, command: Command) -> ExitCode {
    match command {
        Command::Status { force } => {
            let blocked = ctx.availability.ensure_availability(force).await;
            let state = ctx.availability.current();
            if blocked {
                println!("degraded: {}", state.message);
                ExitCode::FAILURE
            } else {
                println!("available");
                ExitCode::SUCCESS
            }
        }
        Command::Whoami => {
            ctx.start().await;
            match ctx.session.current().user {
                Some(user) => {
                    println!("{} <{}>", user.display_name(), user.email);
                    ExitCode::SUCCESS
                }
                None => {
                    println!("not authenticated");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Navigate { path, requires_auth, guest_only, bypass_availability } => {
            ctx.start().await;
            let route = RouteDescriptor { path, requires_auth, guest_only, bypass_availability };
            match ctx.guard.navigate(&route).await {
                GuardDecision::Proceed => {
                    println!("proceed");
                    ExitCode::SUCCESS
                }
                GuardDecision::Redirect(redirect) => {
                    println!("redirect {}", redirect.href());
                    ExitCode::FAILURE
                }
            }
        }
        Command::Logout => {
            let remote_ok = ctx.session.logout().await;
            println!("logged out (remote {})", if remote_ok { "ok" } else { "failed" });
            ExitCode::SUCCESS
        }
    }
}
