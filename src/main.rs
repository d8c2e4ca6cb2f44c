use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mentor_gateway::{Config, Gateway};

/// Mentor - voice coding mentor backend with live workspace context
#[derive(Parser)]
#[command(name = "mentor", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "MENTOR_PORT")]
    port: Option<u16>,

    /// Workspace directory to watch for source changes
    #[arg(short, long, env = "WORKSPACE_DIR")]
    workspace: Option<PathBuf>,

    /// Directory with the static web UI
    #[arg(long, env = "MENTOR_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,mentor_gateway=info",
        1 => "info,mentor_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    // Flags win over env and file
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(workspace) = cli.workspace {
        config.workspace.dir = workspace;
    }
    if let Some(static_dir) = cli.static_dir {
        config.server.static_dir = Some(static_dir);
    }

    tracing::info!(
        port = config.server.port,
        workspace = %config.workspace.dir.display(),
        "starting mentor gateway"
    );
    tracing::debug!(?config, "loaded configuration");

    Gateway::new(config).run().await?;

    Ok(())
}
