#![cfg(feature = "web")]

use headless_chrome::browser::default_executable;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info, warn};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::view::ViewParams;

/// Element the printable view appends once everything has rendered
pub const READY_SELECTOR: &str = "#report-ready";

/// One-time setup that provides the browser runtime
pub const SETUP_COMMAND: &str = "apt-get install -y chromium";

const CSS_PX_PER_INCH: f64 = 96.0;

// Initial viewport height; the PDF height comes from the measured document
const VIEWPORT_HEIGHT: u32 = 1080;

// Extra room below the content so nothing spills onto a second page
const PAGE_HEIGHT_SLACK_PX: f64 = 16.0;

const MEASURE_HEIGHT_JS: &str = "Math.ceil(Math.max(\
    document.body.scrollHeight, document.documentElement.scrollHeight, \
    document.body.offsetHeight, document.documentElement.offsetHeight))";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(
        "Headless Chromium is not installed. Run the one-time setup command `{}` \
         (or set REPORT_CHROME_PATH to an existing Chrome/Chromium binary) and try again.",
        SETUP_COMMAND
    )]
    RuntimeMissing,

    #[error("Report did not signal readiness within {0:?}")]
    ReadyTimeout(Duration),

    #[error("Browser automation failed: {0}")]
    Browser(String),
}

fn browser_error(e: impl std::fmt::Display) -> CaptureError {
    CaptureError::Browser(e.to_string())
}

/// Fixed layout used for every capture
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    /// Viewport and page width in CSS pixels
    pub width_px: u32,

    /// Device pixel ratio forced on the browser
    pub device_scale_factor: f64,

    /// Selector that signals the page is ready
    pub ready_selector: String,

    /// How long to wait for the ready selector
    pub ready_timeout: Duration,
}

impl PageLayout {
    pub fn new(width_px: u32, device_scale_factor: f64, ready_timeout: Duration) -> Self {
        Self {
            width_px,
            device_scale_factor,
            ready_selector: READY_SELECTOR.to_string(),
            ready_timeout,
        }
    }

    pub fn paper_width_in(&self) -> f64 {
        self.width_px as f64 / CSS_PX_PER_INCH
    }

    /// Paper height for a document `height_px` tall
    pub fn paper_height_in(&self, height_px: f64) -> f64 {
        (height_px.max(1.0) + PAGE_HEIGHT_SLACK_PX) / CSS_PX_PER_INCH
    }

    /// PDF options for a single unpaginated page
    pub fn print_options(&self, height_px: f64) -> PrintToPdfOptions {
        PrintToPdfOptions {
            landscape: Some(false),
            display_header_footer: Some(false),
            print_background: Some(true),
            scale: Some(1.0),
            paper_width: Some(self.paper_width_in()),
            paper_height: Some(self.paper_height_in(height_px)),
            margin_top: Some(0.0),
            margin_bottom: Some(0.0),
            margin_left: Some(0.0),
            margin_right: Some(0.0),
            page_ranges: Some("1".to_string()),
            prefer_css_page_size: Some(false),
            ..Default::default()
        }
    }
}

/// URL of the printable variant of `params`, served from `base_url`
///
/// # Examples
/// ```
/// use workorder_report::capture::printable_url;
/// use workorder_report::view::ViewParams;
///
/// let params = ViewParams { upload: Some("abc".into()), ..Default::default() };
/// assert_eq!(
///     printable_url("http://127.0.0.1:8501/", &params, 1400),
///     "http://127.0.0.1:8501/?upload=abc&print=1&width=1400"
/// );
/// ```
pub fn printable_url(base_url: &str, params: &ViewParams, width: u32) -> String {
    format!(
        "{}/?{}",
        base_url.trim_end_matches('/'),
        params.printable(width).to_query()
    )
}

/// Turns a URL into PDF bytes
///
/// Implementations block; async callers run them on a blocking thread.
pub trait Capturer: Send + Sync {
    fn capture(&self, url: &str, layout: &PageLayout) -> Result<Vec<u8>, CaptureError>;
}

/// Captures pages with a headless Chromium
#[derive(Debug, Clone, Default)]
pub struct ChromeCapturer {
    chrome_path: Option<PathBuf>,
}

impl ChromeCapturer {
    /// `chrome_path` overrides executable auto-detection
    pub fn new(chrome_path: Option<PathBuf>) -> Self {
        Self { chrome_path }
    }

    /// Find the browser executable, or explain how to install one
    pub fn resolve_executable(&self) -> Result<PathBuf, CaptureError> {
        match &self.chrome_path {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => {
                warn!("Configured browser {} does not exist", path.display());
                Err(CaptureError::RuntimeMissing)
            }
            None => default_executable().map_err(|e| {
                warn!("No Chromium executable found: {}", e);
                CaptureError::RuntimeMissing
            }),
        }
    }
}

impl Capturer for ChromeCapturer {
    fn capture(&self, url: &str, layout: &PageLayout) -> Result<Vec<u8>, CaptureError> {
        let executable = self.resolve_executable()?;
        debug!("Launching {} for {}", executable.display(), url);

        let scale_arg = OsString::from(format!(
            "--force-device-scale-factor={}",
            layout.device_scale_factor
        ));
        let options = LaunchOptions::default_builder()
            .path(Some(executable))
            .headless(true)
            .sandbox(false)
            .window_size(Some((layout.width_px, VIEWPORT_HEIGHT)))
            .args(vec![scale_arg.as_os_str(), OsStr::new("--hide-scrollbars")])
            .idle_browser_timeout(layout.ready_timeout + Duration::from_secs(30))
            .build()
            .map_err(browser_error)?;

        let browser = Browser::new(options).map_err(browser_error)?;
        let tab = browser.new_tab().map_err(browser_error)?;
        tab.set_default_timeout(layout.ready_timeout);

        tab.navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(browser_error)?;

        tab.wait_for_element_with_custom_timeout(&layout.ready_selector, layout.ready_timeout)
            .map_err(|e| {
                debug!("Waiting for {} failed: {}", layout.ready_selector, e);
                CaptureError::ReadyTimeout(layout.ready_timeout)
            })?;

        let height = tab
            .evaluate(MEASURE_HEIGHT_JS, false)
            .map_err(browser_error)?
            .value
            .and_then(|value| value.as_f64())
            .unwrap_or(VIEWPORT_HEIGHT as f64);

        let pdf = tab
            .print_to_pdf(Some(layout.print_options(height)))
            .map_err(browser_error)?;

        info!(
            "Captured {} ({}px x {}px, {} bytes)",
            url,
            layout.width_px,
            height,
            pdf.len()
        );
        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paper_size_matches_css_pixels() {
        let layout = PageLayout::new(1440, 2.0, Duration::from_secs(5));
        assert_eq!(layout.paper_width_in(), 15.0);
        assert_eq!(layout.paper_height_in(944.0), 10.0);

        let options = layout.print_options(944.0);
        assert_eq!(options.print_background, Some(true));
        assert_eq!(options.page_ranges.as_deref(), Some("1"));
        assert_eq!(options.margin_top, Some(0.0));
    }

    #[test]
    fn printable_url_forces_print_flags() {
        let params = ViewParams::parse(Some("upload=abc&rate=60&date=2025-03-01"));
        assert_eq!(
            printable_url("http://reports.internal:9000//", &params, 1400),
            "http://reports.internal:9000/?upload=abc&print=1&width=1400&rate=60.00&date=2025-03-01"
        );
    }

    #[test]
    fn missing_browser_is_reported_with_setup_command() {
        let capturer = ChromeCapturer::new(Some(PathBuf::from("/nonexistent/chromium")));
        let layout = PageLayout::new(1400, 2.0, Duration::from_secs(1));

        let err = capturer
            .capture("http://127.0.0.1:9/", &layout)
            .unwrap_err();
        assert!(matches!(err, CaptureError::RuntimeMissing));
        assert!(err.to_string().contains(SETUP_COMMAND));
    }
}
