//! Stepwise CLI - Main entry point

mod cli;
mod config;

use clap::{Parser, Subcommand};
use config::ProviderFlags;
use stepwise_foundation::{AgentSettings, ProviderSelection};
use stepwise_provider::create_provider;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Stepwise - drive a model through think / action / observe / output steps
#[derive(Parser, Debug)]
#[command(name = "stepwise")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Run in non-interactive mode with a single prompt
    #[arg(short, long)]
    prompt: Option<String>,

    #[command(flatten)]
    provider: ProviderFlags,

    /// Maximum model calls per turn
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save the provider selection
    Config {
        #[command(flatten)]
        provider: ProviderFlags,

        /// Save to .stepwise/ in the current directory instead of the global config
        #[arg(long)]
        project: bool,

        /// Print the effective selection (API key masked)
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging (stdout는 step 출력용이라 stderr로)
    let log_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Some(Command::Config {
        provider,
        project,
        show,
    }) = &args.command
    {
        return config::run_config(provider, *project, *show);
    }

    // Load configuration
    let mut settings = AgentSettings::load()?;
    if let Some(max) = args.max_iterations {
        settings = settings.with_max_iterations(max);
        settings.validate()?;
    }

    let selection = config::resolve_selection(ProviderSelection::load()?, &args.provider, &settings)?;
    tracing::info!("Using provider: {}", selection.provider);
    let provider = create_provider(&selection)?;

    let banner = format!(
        "Stepwise - {} ({})",
        provider.metadata().display_name,
        provider.model()
    );
    let runner = cli::Runner::new(provider, settings, args.debug);

    // Run based on mode
    if let Some(prompt) = args.prompt {
        cli::run_once(runner, &prompt).await
    } else {
        cli::run_repl(runner, &banner).await
    }
}
