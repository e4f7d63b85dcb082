use clap::Parser;
use pipeflow::cli::{execute_command, log_filter, Cli};
use pipeflow::config::SettingsLoader;
use tracing::{debug, error, trace};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = SettingsLoader::new().load().await;
    let configured_level = settings.as_ref().ok().and_then(|s| s.log_level.clone());
    let filter = log_filter(cli.verbose, std::env::var("PIPEFLOW_LOG").ok(), configured_level);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();

    debug!("pipeflow started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("Unable to load settings: {}", e);
            eprintln!("Error: {}", e.user_message());
            std::process::exit(1);
        }
    };

    match execute_command(cli.command, settings).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
