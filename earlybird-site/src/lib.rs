pub mod app_config;
pub mod artifacts;
pub mod http_client;
pub mod notifier;
pub mod southwest;

pub use app_config::Config;
pub use artifacts::DirectoryArtifactStore;
pub use http_client::{ClientBuildError, HttpSiteClient};
pub use notifier::{LogNotifier, MailConfigError, SmtpNotifier};
pub use southwest::SouthwestMarkup;
