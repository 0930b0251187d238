//! snowcover CLI - monthly MODIS snow-cover composites

mod config;
mod notify;
mod report;

use anyhow::{Context, Result};
use chrono::Local;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use snowcover_cloud::monthly_export::{DEFAULT_AQUA_COLLECTION, DEFAULT_TERRA_COLLECTION};
use snowcover_cloud::{monthly_export_proc, track_exports, LocalStore};

use config::{check_required_assets, Config, EmailConfig};
use notify::EmailSender;
use report::{export_plan_report, export_results_report};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "snowcover")]
#[command(author, version, about = "Monthly MODIS snow-cover composites", long_about = None)]
struct Cli {
    /// Root directory of the asset store
    #[arg(long, env = "OSN_STORE_ROOT", default_value = ".")]
    store_root: PathBuf,

    /// MODIS/Terra daily snow cover collection
    #[arg(long, env = "OSN_TERRA_COLLECTION", default_value = DEFAULT_TERRA_COLLECTION)]
    terra_collection: String,

    /// MODIS/Aqua daily snow cover collection
    #[arg(long, env = "OSN_AQUA_COLLECTION", default_value = DEFAULT_AQUA_COLLECTION)]
    aqua_collection: String,

    /// Folder or ImageCollection where monthly images are saved
    #[arg(long = "month-assets-path", env = "OSN_MONTHLY_ASSETS_PATH")]
    monthly_assets_path: Option<String>,

    /// Prefix for monthly image names
    #[arg(long = "month-image-prefix", env = "OSN_MONTHLY_IMAGE_PREFIX")]
    monthly_image_prefix: Option<String>,

    /// AOI table (FeatureCollection) asset path
    #[arg(long, env = "OSN_AOI_ASSET_PATH")]
    aoi_asset_path: Option<String>,

    /// DEM image asset path
    #[arg(long, env = "OSN_DEM_ASSET_PATH")]
    dem_asset_path: Option<String>,

    /// Comma-separated months to export, e.g. '2022-11, 2022-10'
    #[arg(long = "months-to-export", env = "OSN_MONTHS_LIST")]
    months_list: Option<String>,

    /// Logging level: DEBUG, INFO, WARNING, ERROR
    #[arg(short = 'l', long, env = "OSN_LOG_LEVEL", default_value = "INFO")]
    log_level: String,

    /// Write logs to a file instead of stderr
    #[arg(
        long,
        env = "OSN_LOG_FILE",
        num_args = 0..=1,
        default_missing_value = "./snowcover.log"
    )]
    log_file: Option<PathBuf>,

    /// Seconds between export status checks
    #[arg(long, env = "OSN_STATUS_CHECK_WAIT", default_value_t = 60)]
    poll_interval: u64,

    /// Plan exports without creating them
    #[arg(long, env = "OSN_DRY_RUN", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    dry_run: bool,

    #[command(flatten)]
    email: EmailArgs,
}

#[derive(Args)]
struct EmailArgs {
    /// Enable email notifications
    #[arg(long, env = "OSN_ENABLE_EMAIL", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    enable_email: bool,

    /// SMTP server for sending email
    #[arg(long, env = "OSN_SMTP_SERVER")]
    smtp_server: Option<String>,

    /// SMTP port for sending email
    #[arg(long, env = "OSN_SMTP_PORT")]
    smtp_port: Option<u16>,

    /// SMTP user
    #[arg(long, env = "OSN_SMTP_USER", hide_env_values = true)]
    smtp_user: Option<String>,

    /// SMTP password
    #[arg(long, env = "OSN_SMTP_PASSWORD", hide_env_values = true)]
    smtp_password: Option<String>,

    /// File holding the SMTP user (overrides --smtp-user)
    #[arg(long, env = "OSN_SMTP_USER_FILE")]
    smtp_user_file: Option<PathBuf>,

    /// File holding the SMTP password (overrides --smtp-password)
    #[arg(long, env = "OSN_SMTP_PASSWORD_FILE")]
    smtp_password_file: Option<PathBuf>,

    /// Sender address
    #[arg(long, env = "OSN_SMTP_FROM")]
    from_address: Option<String>,

    /// Recipients separated by ',' or ';'
    #[arg(long, env = "OSN_SMTP_TO")]
    to_address: Option<String>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn log_level(name: &str) -> Level {
    match name.trim().to_uppercase().as_str() {
        "DEBUG" => Level::DEBUG,
        "WARNING" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn setup_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let level = log_level(level);
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("setting default subscriber failed");
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("setting default subscriber failed");
        }
    }
    Ok(())
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// E-mail service, or `None` when disabled or the server is unreachable
fn init_email_service(config: Option<EmailConfig>) -> Option<EmailSender> {
    let Some(config) = config else {
        debug!("Email messaging disabled");
        return None;
    };
    debug!(?config, "Initializing email messaging");
    let sender = EmailSender::new(config);
    if sender.test_connection() {
        debug!("Email messaging enabled");
        Some(sender)
    } else {
        tracing::warn!("Initializing email service failed: connection failed");
        None
    }
}

/// Log and print the error, and e-mail it when a service is available.
fn terminate_error(err: &anyhow::Error, started: &str, email: Option<&EmailSender>) -> ExitCode {
    if let Some(sender) = email {
        sender.send_error(&format!("{:#}", err), started);
    }
    error!("{:#}", err);
    eprintln!("Error: {:#}", err);
    info!("------ EXITING SCRIPT ------");
    ExitCode::FAILURE
}

/// Validate, plan, export and track; returns the run report.
fn process(cli: &Cli) -> Result<String> {
    let config = Config::from_cli(cli).context("Invalid configuration")?;
    debug!(?config, "Configuration");

    let store = LocalStore::open(&config.store_root).with_context(|| {
        format!("Failed to open asset store at {}", config.store_root.display())
    })?;
    check_required_assets(&store, &config)?;

    let pb = spinner("Building monthly composites...");
    let start = Instant::now();
    let result = monthly_export_proc(&store, &config.export_request());
    pb.finish_and_clear();
    let result = result.context("Monthly export process failed")?;
    info!("Monthly export planned in {:.2?}", start.elapsed());

    let mut report = export_plan_report(&result);

    let pb = spinner("Waiting for export tasks...");
    let tasks = track_exports(&store, result.export_tasks, config.poll_interval);
    pb.finish_and_clear();

    report.push_str(&export_results_report(&tasks));
    Ok(report)
}

fn main() -> ExitCode {
    let started = Local::now().format(notify::TIME_FORMAT).to_string();
    let cli = Cli::parse();
    if let Err(e) = setup_logging(&cli.log_level, cli.log_file.as_deref()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }
    debug!("---- STARTING SCRIPT ----");

    let email = match EmailConfig::from_args(&cli.email) {
        Ok(config) => init_email_service(config),
        Err(e) => {
            let err = anyhow::Error::new(e).context("Invalid email configuration");
            return terminate_error(&err, &started, None);
        }
    };

    match process(&cli) {
        Ok(report) => {
            println!("{}", report);
            if let Some(sender) = &email {
                sender.send_results(&report, &started);
            }
            debug!("---- SCRIPT FINISHED ----");
            ExitCode::SUCCESS
        }
        Err(e) => terminate_error(&e, &started, email.as_ref()),
    }
}
