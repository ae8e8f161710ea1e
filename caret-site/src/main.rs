//! Caret site - Main entry point
//!
//! Serves the agency's marketing site and its admin panel, and offers a few
//! operator commands against the hosted backend.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use caret_site::admin::{AdminPanel, AdminState, Notice, SessionStore};
use caret_site::backend::{Backend, InMemoryBackend, SupabaseClient};
use caret_site::config::{self, Config};
use caret_site::server::{ServerConfig, http_router, run_server, spawn_session_cleanup};
use caret_site::site::SiteState;
use caret_site::site::brand::Brand;
use caret_site::site::theme::Theme;

/// Operator account of the in-memory backend used by `serve --dry-run`
const DRY_RUN_EMAIL: &str = "admin@localhost";
const DRY_RUN_PASSWORD: &str = "admin";

/// Caret site - agency website with an admin panel
#[derive(Parser)]
#[command(name = "caret-site")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value_os_t = Config::default_path())]
    config: PathBuf,

    /// Data directory for logs
    #[arg(short, long, default_value_os_t = Config::default_data_dir())]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Dry-run mode: use an in-memory backend instead of Supabase
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a default configuration file
    InitConfig {
        /// Output path (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sign in as the operator and export newsletter subscribers as CSV
    ExportSubscribers {
        /// Operator email
        #[arg(long)]
        email: String,

        /// Operator password
        #[arg(long, env = "CARET_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        /// Output path (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on command type
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    match cli.command {
        Commands::Serve { listen, dry_run } => {
            // For daemon mode: log to both stdout and file with rotation
            init_daemon_logging(&cli.data_dir, filter)?;
            serve(&cli.config, listen, dry_run).await
        }
        Commands::InitConfig { output } => {
            init_cli_logging(filter);
            generate_config(output)
        }
        Commands::ExportSubscribers {
            email,
            password,
            output,
        } => {
            init_cli_logging(filter);
            export_subscribers(&cli.config, &email, &password, output).await
        }
    }
}

/// Initialize logging for CLI commands (stderr only, stdout carries command output).
fn init_cli_logging(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Initialize logging for daemon mode (stdout + rotating file).
fn init_daemon_logging(data_dir: &Path, filter: EnvFilter) -> Result<()> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    // Create a daily rotating file appender (e.g., caret-site.2026-01-15.log)
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("caret-site")
        .filename_suffix("log")
        .build(&log_dir)
        .with_context(|| "Failed to create log file appender")?;

    // Non-blocking writer for the file
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // The writer must outlive every log call of the server
    std::mem::forget(_guard);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false)) // stdout
        .with(fmt::layer().with_target(true).with_ansi(false).with_writer(non_blocking)) // file
        .init();

    info!("Logging to: {}", log_dir.display());
    Ok(())
}

/// Run the web server
async fn serve(config_path: &Path, listen_override: Option<SocketAddr>, dry_run: bool) -> Result<()> {
    // Load configuration (backend credentials are optional in dry-run mode)
    let config = if dry_run {
        Config::load_or_default(config_path)?
    } else {
        Config::load(config_path)?
    };

    // Determine listen address
    let listen_addr: SocketAddr = match listen_override {
        Some(addr) => addr,
        None => config.server.listen_addr.parse().with_context(|| {
            format!("Invalid listen address in config: {}", config.server.listen_addr)
        })?,
    };

    // In dry-run mode, use the in-memory backend instead of Supabase
    let backend: Arc<dyn Backend> = if dry_run {
        warn!("DRY-RUN MODE: using in-memory backend, nothing is persisted");
        info!(
            "Admin login: {} / {}",
            DRY_RUN_EMAIL, DRY_RUN_PASSWORD
        );
        Arc::new(InMemoryBackend::with_operator(DRY_RUN_EMAIL, DRY_RUN_PASSWORD).await)
    } else {
        info!("Backend: {}", config.backend.url);
        Arc::new(SupabaseClient::new(&config.backend)?)
    };

    let brand = Brand::from_config(&config.site);
    let default_theme = Theme::from_dark_mode(config.site.dark_mode);

    info!("Caret site starting...");
    info!("Brand: {} ({})", brand.name, brand.site_url);

    let admin_state = Arc::new(AdminState {
        sessions: SessionStore::new(backend.clone(), config.admin.session_timeout()?),
        default_theme,
        site_name: brand.name.clone(),
    });
    let site_state = Arc::new(SiteState::new(backend, brand, default_theme));

    // Spawn expired session cleanup task
    spawn_session_cleanup(admin_state.clone());

    let router = http_router(site_state, admin_state);
    run_server(ServerConfig { listen_addr }, router).await
}

/// Sign in, fetch subscribers and write them as CSV
async fn export_subscribers(
    config_path: &Path,
    email: &str,
    password: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let backend: Arc<dyn Backend> = Arc::new(SupabaseClient::new(&config.backend)?);

    let mut panel = AdminPanel::new(backend);
    if !panel.login(email, password).await {
        bail!(
            "Sign-in failed: {}",
            panel.login_error().unwrap_or("unknown error")
        );
    }

    let errors: Vec<String> = panel
        .take_notices()
        .into_iter()
        .filter(Notice::is_error)
        .map(|n| n.text().to_string())
        .collect();
    if !errors.is_empty() {
        panel.logout().await;
        bail!("{}", errors.join("; "));
    }

    let csv = panel.export_csv();
    let count = panel.subscribers().len();
    panel.logout().await;

    match output {
        Some(path) => {
            std::fs::write(&path, &csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported {} subscribers to: {}", count, path.display());
        }
        None => {
            print!("{}", csv);
        }
    }

    Ok(())
}

fn generate_config(output: Option<PathBuf>) -> Result<()> {
    let config = config::default_config_template();

    match output {
        Some(path) => {
            std::fs::write(&path, &config)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Configuration written to: {}", path.display());
        }
        None => {
            print!("{}", config);
        }
    }

    Ok(())
}
