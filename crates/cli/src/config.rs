//! Validation of the parsed command line into a run configuration.
//!
//! E-mail settings are validated first and on their own, so that errors in
//! the rest of the configuration can still be reported by e-mail.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lettre::message::Mailbox;
use thiserror::Error;
use tracing::{debug, warn};

use snowcover_cloud::{AssetType, ComputeService, ExportMode, MonthlyExportRequest};
use snowcover_core::calendar::YearMonth;

use crate::{Cli, EmailArgs};

const MASK: &str = "********";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("SMTP parameter {0} is required")]
    MissingSmtp(&'static str),

    #[error("One or more months provided in the months list are not valid: {0}")]
    InvalidMonths(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("No valid emails found in the to-address list")]
    NoRecipients,

    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{what} not found: {path}")]
    AssetNotFound { what: &'static str, path: String },
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_root: PathBuf,
    pub terra_collection: String,
    pub aqua_collection: String,
    pub monthly_assets_path: String,
    pub monthly_image_prefix: String,
    pub aoi_asset_path: String,
    pub dem_asset_path: String,
    pub months_list: Vec<YearMonth>,
    pub poll_interval: Duration,
    pub mode: ExportMode,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        debug!("Checking required config parameters");
        let monthly_assets_path = required(&cli.monthly_assets_path, "Monthly assets path")?;
        let monthly_image_prefix = required(
            &cli.monthly_image_prefix,
            "Monthly image prefix",
        )?;
        let aoi_asset_path = required(
            &cli.aoi_asset_path,
            "Path to AOI FeatureCollection asset",
        )?;
        let dem_asset_path = required(&cli.dem_asset_path, "Path to DEM image asset")?;
        let months_list = match &cli.months_list {
            Some(csv) => parse_months(csv)?,
            None => Vec::new(),
        };

        Ok(Self {
            store_root: cli.store_root.clone(),
            terra_collection: cli.terra_collection.clone(),
            aqua_collection: cli.aqua_collection.clone(),
            monthly_assets_path,
            monthly_image_prefix,
            aoi_asset_path,
            dem_asset_path,
            months_list,
            poll_interval: Duration::from_secs(cli.poll_interval),
            mode: if cli.dry_run {
                ExportMode::DryRun
            } else {
                ExportMode::Submit
            },
        })
    }

    pub fn export_request(&self) -> MonthlyExportRequest {
        MonthlyExportRequest::new(
            &self.monthly_assets_path,
            &self.aoi_asset_path,
            &self.dem_asset_path,
            &self.monthly_image_prefix,
        )
        .with_months(self.months_list.clone())
        .with_collections(&self.terra_collection, &self.aqua_collection)
        .with_mode(self.mode)
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(name))
}

/// Split a comma-separated string, trimming items and dropping empty ones.
pub fn csv_to_list(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a comma-separated month list (`YYYY-MM` or `YYYY-M`).
pub fn parse_months(csv: &str) -> Result<Vec<YearMonth>, ConfigError> {
    csv_to_list(csv)
        .iter()
        .map(|m| m.parse::<YearMonth>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ConfigError::InvalidMonths(csv.to_string()))
}

/// The monthly collection must be a container, the AOI a table and the
/// DEM an image.
pub fn check_required_assets<S>(service: &S, config: &Config) -> Result<(), ConfigError>
where
    S: ComputeService + ?Sized,
{
    debug!("Checking required assets");
    let checks: [(&'static str, &str, &[AssetType]); 3] = [
        (
            "Monthly IC folder",
            &config.monthly_assets_path,
            &[AssetType::Folder, AssetType::ImageCollection],
        ),
        (
            "AOI FeatureCollection",
            &config.aoi_asset_path,
            &[AssetType::Table],
        ),
        ("DEM image", &config.dem_asset_path, &[AssetType::Image]),
    ];
    for (what, path, allowed) in checks {
        if let Err(e) = service.check_asset(path, allowed) {
            debug!(path, error = %e, "Asset check failed");
            return Err(ConfigError::AssetNotFound {
                what,
                path: path.to_string(),
            });
        }
    }
    Ok(())
}

/// SMTP settings; present only when e-mail is enabled.
#[derive(Clone)]
pub struct EmailConfig {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("user", &MASK)
            .field("password", &MASK)
            .field("from", &self.from.to_string())
            .field(
                "to",
                &self.to.iter().map(ToString::to_string).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl EmailConfig {
    /// `Ok(None)` when e-mail is disabled. User and password files take
    /// precedence over the inline values.
    pub fn from_args(args: &EmailArgs) -> Result<Option<Self>, ConfigError> {
        debug!("Initializing email configuration");
        if !args.enable_email {
            return Ok(None);
        }

        let user = match &args.smtp_user_file {
            Some(path) => Some(read_file_to_var(path)?),
            None => args.smtp_user.clone(),
        };
        let password = match &args.smtp_password_file {
            Some(path) => Some(read_file_to_var(path)?),
            None => args.smtp_password.clone(),
        };

        let server = required_smtp(&args.smtp_server, "smtp_server")?;
        let port = args.smtp_port.ok_or(ConfigError::MissingSmtp("smtp_port"))?;
        let user = required_smtp(&user, "smtp_user")?;
        let password = required_smtp(&password, "smtp_password")?;
        let from_address = required_smtp(&args.from_address, "smtp_from_address")?;
        let to_address = required_smtp(&args.to_address, "smtp_to_address")?;

        let from = from_address
            .parse::<Mailbox>()
            .map_err(|_| ConfigError::InvalidAddress(from_address.clone()))?;
        let to = parse_emails(&to_address);
        if to.is_empty() {
            return Err(ConfigError::NoRecipients);
        }

        Ok(Some(Self {
            server,
            port,
            user,
            password,
            from,
            to,
        }))
    }
}

fn required_smtp(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    required(value, name).map_err(|_| ConfigError::MissingSmtp(name))
}

fn read_file_to_var(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path)
        .map(|s| s.trim_end_matches(['\r', '\n']).to_string())
        .map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Addresses separated by `,` or `;`; invalid ones are skipped with a warning.
pub fn parse_emails(emails: &str) -> Vec<Mailbox> {
    emails
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|address| match address.parse::<Mailbox>() {
            Ok(mailbox) => Some(mailbox),
            Err(_) => {
                warn!("Invalid email address skipped: {}", address);
                None
            }
        })
        .collect()
}
