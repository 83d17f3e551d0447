#![cfg(feature = "web")]

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::PageLayout;
use crate::report::DEFAULT_LABOR_RATE;
use crate::view::{MAX_WIDTH, MIN_WIDTH};

pub const DEFAULT_BIND: &str = "0.0.0.0:8501";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8501";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_PRINT_WIDTH: u32 = 1400;
pub const DEFAULT_DEVICE_SCALE: f64 = 2.0;
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;
pub const MAX_DEVICE_SCALE: f64 = 8.0;

/// Device scale factors must lie in `(0, MAX_DEVICE_SCALE]`
fn parse_device_scale(raw: &str) -> Result<f64, String> {
    let scale: f64 = raw.trim().parse().map_err(|e| format!("{e}"))?;
    if scale.is_finite() && scale > 0.0 && scale <= MAX_DEVICE_SCALE {
        Ok(scale)
    } else {
        Err(format!("must be greater than 0 and at most {MAX_DEVICE_SCALE}"))
    }
}

/// Server configuration
///
/// Every setting can be given as a flag or through its environment
/// variable, e.g. `REPORT_BASE_URL=http://reports:8080 website`.
#[derive(Debug, Clone, Parser)]
#[command(name = "website", about = "Work order cost breakdown dashboard with PDF export")]
pub struct Config {
    /// Address the web server listens on
    #[arg(long, env = "REPORT_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Base URL the headless browser uses to reach this server
    #[arg(long, env = "REPORT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Directory uploaded workbooks are stored in
    #[arg(long, env = "REPORT_UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
    pub upload_dir: PathBuf,

    /// Layout width of the printable view in CSS pixels
    #[arg(
        long,
        env = "REPORT_PRINT_WIDTH",
        default_value_t = DEFAULT_PRINT_WIDTH,
        value_parser = clap::value_parser!(u32).range(MIN_WIDTH as i64..=MAX_WIDTH as i64)
    )]
    pub print_width: u32,

    /// Device pixel ratio used for captures
    #[arg(
        long,
        env = "REPORT_DEVICE_SCALE",
        default_value_t = DEFAULT_DEVICE_SCALE,
        value_parser = parse_device_scale
    )]
    pub device_scale_factor: f64,

    /// Seconds to wait for the report to signal readiness
    #[arg(long, env = "REPORT_READY_TIMEOUT", default_value_t = DEFAULT_READY_TIMEOUT_SECS)]
    pub ready_timeout_secs: u64,

    /// Chrome/Chromium executable (auto-detected when unset)
    #[arg(long, env = "REPORT_CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Labor rate used when the user has not entered one ($/hr)
    #[arg(long, env = "REPORT_DEFAULT_RATE", default_value_t = DEFAULT_LABOR_RATE)]
    pub default_rate: f64,

    /// Largest accepted upload in megabytes
    #[arg(long, env = "REPORT_MAX_UPLOAD_MB", default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: ([0, 0, 0, 0], 8501).into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            print_width: DEFAULT_PRINT_WIDTH,
            device_scale_factor: DEFAULT_DEVICE_SCALE,
            ready_timeout_secs: DEFAULT_READY_TIMEOUT_SECS,
            chrome_path: None,
            default_rate: DEFAULT_LABOR_RATE,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

impl Config {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Layout shared by every capture
    pub fn layout(&self) -> PageLayout {
        PageLayout::new(self.print_width, self.device_scale_factor, self.ready_timeout())
    }
}
