//! ChurnGuard CLI: the main entry point.
//!
//! Commands:
//! - `init`        - Write a default config file
//! - `serve`       - Start the HTTP gateway for the dashboard
//! - `predict`     - Assess one customer's churn risk
//! - `portfolio`   - Generate the training script and README
//! - `schema`      - Print the request a pipeline would send
//! - `config`      - Show the effective configuration
//! - `doctor`      - Diagnose setup
//! - `completions` - Generate shell completions

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};

mod commands;

use commands::predict::PredictArgs;
use commands::schema::{Dialect, PipelineKind};

#[derive(Parser)]
#[command(
    name = "churnguard",
    about = "ChurnGuard: structured churn inference",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of ~/.churnguard/config.toml
    #[arg(short, long, global = true, env = "CHURNGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Assess a customer's churn risk
    Predict(PredictArgs),

    /// Generate the portfolio training script and documentation
    Portfolio {
        /// Print only the source code
        #[arg(long, conflicts_with = "docs")]
        code: bool,

        /// Print only the documentation
        #[arg(long)]
        docs: bool,
    },

    /// Print the request a pipeline would send, without sending it
    Schema {
        #[arg(value_enum, default_value_t = PipelineKind::Churn)]
        pipeline: PipelineKind,

        /// Schema dialect to render
        #[arg(long, value_enum, default_value_t = Dialect::JsonSchema)]
        dialect: Dialect,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose configuration and connectivity
    Doctor,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let config_path = cli.config.unwrap_or_else(commands::default_config_path);

    match cli.command {
        Commands::Init { force } => commands::init::run(&config_path, force)?,
        Commands::Serve { port } => commands::serve::run(&config_path, port).await?,
        Commands::Predict(args) => commands::predict::run(&config_path, args).await?,
        Commands::Portfolio { code, docs } => {
            commands::portfolio::run(&config_path, code, docs).await?
        }
        Commands::Schema { pipeline, dialect } => {
            commands::schema::run(&config_path, pipeline, dialect)?
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&config_path)?,
            ConfigAction::Path => println!("{}", config_path.display()),
        },
        Commands::Doctor => commands::doctor::run(&config_path).await?,
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "churnguard",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug. Logs go to stderr so
/// command output on stdout stays machine-readable.
fn init_tracing(verbose: bool, format: LogFormat) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
