/**
 * Gestion Sync Operator Entry Point
 *
 * Command-line access to the offline queue: inspect it, drain it, move it
 * between instances with transfer files, or watch the probe loop.
 */

#[cfg(feature = "cli")]
mod commands;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> std::process::ExitCode {
    use clap::Parser;

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let cli = commands::Cli::parse();
    match commands::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "[CLI] Command failed");
            eprintln!("{}", e.user_message());
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("The operator binary requires the 'cli' feature to be enabled.");
    eprintln!("Run with: cargo run --bin gestion-sync --features cli -- --help");
    std::process::exit(1);
}
