use earlybird_core::{CheckinWindow, CoreResult, TimeZoneResolver};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub site: SiteConfig,
    pub checkin: CheckinConfig,
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Extra or corrected airport zones, `CODE = "Area/Zone"`.
    #[serde(default)]
    pub airports: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    pub base_url: String,
    pub itinerary_path: String,
    pub checkin_path: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckinConfig {
    /// Minutes before the 24-hour mark at which the first attempt fires.
    pub window_minutes: u64,
    pub retry_interval_seconds: u64,
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArtifactConfig {
    pub directory: PathBuf,
}

/// Mail settings. No mail is sent unless `smtp_server` is set.
#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    pub email_from: Option<String>,
    /// Comma separated recipients.
    pub email_to: Option<String>,
    pub smtp_server: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Upgrade the connection with STARTTLS before sending.
    #[serde(default)]
    pub smtp_use_tls: bool,
    /// Defaults to `email_from`.
    pub smtp_user: Option<String>,
    /// Logs in only when set.
    pub smtp_password: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            email_from: None,
            email_to: None,
            smtp_server: None,
            smtp_port: default_smtp_port(),
            smtp_use_tls: false,
            smtp_user: None,
            smtp_password: None,
        }
    }
}

fn default_user_agent() -> String {
    format!("earlybird/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 { 30 }

fn default_attempt_timeout() -> u64 { 120 }

fn default_smtp_port() -> u16 { 587 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new("config"))
    }

    /// Layered load from `dir`: `default` (required), `$RUN_MODE` and `local` (optional),
    /// then `EARLYBIRD__SECTION__KEY` environment variables.
    pub fn load_from(dir: &Path) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let layer = |name: &str| dir.join(name).to_string_lossy().into_owned();

        let s = config::Config::builder()
            .add_source(config::File::with_name(&layer("default")))
            .add_source(config::File::with_name(&layer(&run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name(&layer("local")).required(false))
            .add_source(config::Environment::with_prefix("EARLYBIRD").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Reject settings that would only fail later, at check-in time.
    pub fn validate(&self) -> CoreResult<()> {
        self.checkin_window()?;
        self.time_zones()?;
        Ok(())
    }

    pub fn checkin_window(&self) -> Result<CheckinWindow, earlybird_core::WindowError> {
        CheckinWindow::new(
            Duration::from_secs(self.checkin.window_minutes * 60),
            Duration::from_secs(self.checkin.retry_interval_seconds),
        )
    }

    pub fn time_zones(&self) -> Result<TimeZoneResolver, earlybird_core::AirportError> {
        TimeZoneResolver::with_overrides(
            self.airports
                .iter()
                .map(|(code, zone)| (code.as_str(), zone.as_str())),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.site.request_timeout_seconds)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.checkin.attempt_timeout_seconds)
    }
}

impl NotifyConfig {
    pub fn recipients(&self) -> Vec<String> {
        self.email_to
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}
