//! Proposer CLI and REST API entry point.
//!
//! Binary name: `proposer`
//!
//! Parses CLI arguments, initializes database and services, then dispatches
//! to the terminal interview, the listings, or the REST API server.

mod cli;
mod http;
mod state;

use anyhow::anyhow;
use clap::Parser;
use clap_complete::generate;
use proposer_infra::filesystem::ReferencePolicy;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    proposer_observe::tracing_setup::init_tracing(cli.otel, cli.log_filter())
        .map_err(|e| anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "proposer", &mut std::io::stdout());
        return Ok(());
    }

    // Only the terminal user may point at files on this machine.
    let policy = match cli.command {
        Commands::Chat { .. } => ReferencePolicy::UrlsAndLocalFiles,
        _ => ReferencePolicy::UrlsOnly,
    };
    let state = AppState::init(policy).await?;

    match cli.command {
        Commands::Chat { resume } => {
            cli::chat::run_chat(&state, resume).await?;
        }

        Commands::Engineers => {
            cli::engineer::list_engineers(&state, cli.json).await?;
        }

        Commands::Drafts => {
            cli::draft::list_drafts(&state, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let api_key = http::extractors::auth::ensure_api_key(&state).await?;
            if api_key.starts_with(http::extractors::auth::KEY_PREFIX) {
                println!();
                println!(
                    "  {} API key generated (save this -- it won't be shown again):",
                    console::style("🔑").bold()
                );
                println!();
                println!("  {}", console::style(&api_key).yellow().bold());
                println!();
            }

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Proposer API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => {}
    }

    proposer_observe::tracing_setup::shutdown_tracing();
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
