mod commands;

use clap::{Args, CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "prerender")]
#[command(version, about = "Prerender a single-page site into static HTML", long_about = None)]
struct Cli {
    /// Path to prerender.toml (defaults to ./prerender.toml when present)
    #[arg(long, global = true, env = "PRERENDER_CONFIG")]
    config: Option<PathBuf>,

    /// Path to .env file (optional)
    #[arg(long, global = true, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Parser)]
enum Command {
    /// Render every route to static HTML (default)
    Run(RunArgs),

    /// Print the routes that would be rendered
    Routes,

    /// Serve the build output locally with SPA fallback
    Serve {
        /// Build output directory
        #[arg(long)]
        dist: Option<PathBuf>,

        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check that every route has a snapshot and the SPA fallbacks exist
    Verify {
        /// Build output directory
        #[arg(long)]
        dist: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Overrides for a prerender run; unset values come from config and environment
#[derive(Args, Debug, Default, Clone)]
struct RunArgs {
    /// Build output directory
    #[arg(long)]
    dist: Option<PathBuf>,

    /// Port for the local static server
    #[arg(short, long)]
    port: Option<u16>,

    /// Browser executable (skips the path search)
    #[arg(long)]
    browser: Option<PathBuf>,

    /// Navigation timeout per route, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Delay after network idle before capturing, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Write a JSON report of every route's outcome
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load .env file if it exists
    if cli.dotenv.exists() {
        dotenvy::from_path(&cli.dotenv)?;
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Run(args) => commands::run::run(config_path, args.into()).await,
        Command::Routes => commands::routes::run(config_path).await,
        Command::Serve { dist, port } => commands::serve::run(config_path, dist, port).await,
        Command::Verify { dist } => commands::verify::run(config_path, dist).await,
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "prerender", &mut io::stdout());
            Ok(())
        }
    }
}

impl From<RunArgs> for commands::run::Overrides {
    fn from(args: RunArgs) -> Self {
        Self {
            dist: args.dist,
            port: args.port,
            browser: args.browser,
            timeout_secs: args.timeout_secs,
            settle_ms: args.settle_ms,
            report: args.report,
        }
    }
}
