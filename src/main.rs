//! CLI entry point for verdict

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use verdict::config::SiteConfig;
use verdict::Verdict;

#[derive(Parser)]
#[command(name = "verdict")]
#[command(version)]
#[command(about = "Product reviews and comparisons rendered from a GitHub content repository", long_about = None)]
struct Cli {
    /// Path to the site configuration
    #[arg(short, long, global = true, default_value = "verdict.yml")]
    config: PathBuf,

    /// GitHub token used to read the content repository
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (defaults to server.ip)
        #[arg(short, long)]
        ip: Option<String>,

        /// Serve every request from the content store
        #[arg(long)]
        no_cache: bool,
    },

    /// Render one review or comparison page
    Render {
        /// Kind of document (review, comparison)
        kind: String,

        /// Slug of the document
        slug: String,

        /// Write the page to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List documents in the content repository
    List {
        /// Collection to list (reviews, comparisons); all when omitted
        r#type: Option<String>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "verdict=debug,tower_http=debug,info"
    } else {
        "verdict=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve { port, ip, no_cache } => {
            let mut config = load_config(&cli.config)?;
            if no_cache {
                config.cache.enabled = false;
            }
            let ip = ip.unwrap_or_else(|| config.server.ip.clone());
            let port = port.unwrap_or(config.server.port);

            let app = Verdict::new(config, cli.token)?;
            tracing::info!(
                "Serving {}/{} at http://{}:{}",
                app.config().github.owner,
                app.config().github.repo,
                ip,
                port
            );
            verdict::server::start(app, &ip, port).await?;
        }

        Commands::Render { kind, slug, output } => {
            let app = Verdict::new(load_config(&cli.config)?, cli.token)?;
            verdict::commands::render::run(&app, &kind, &slug, output.as_deref()).await?;
        }

        Commands::List { r#type } => {
            let app = Verdict::new(load_config(&cli.config)?, cli.token)?;
            verdict::commands::list::run(&app, r#type.as_deref()).await?;
        }

        Commands::Version => {
            println!("verdict version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Config file (or defaults) with `VERDICT_*` overrides applied
fn load_config(path: &Path) -> Result<SiteConfig> {
    let mut config = SiteConfig::load_or_default(path)?;
    config.apply_env();
    Ok(config)
}
