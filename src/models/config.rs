//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::parse_selector;

/// Root application configuration.
///
/// Built once at startup (file, then CLI overrides) and handed out by
/// reference; nothing mutates it afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listing page and polling behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Mail server and addresses
    #[serde(default)]
    pub mail: MailConfig,

    /// Seen-offer cache file
    #[serde(default)]
    pub cache: CacheConfig,

    /// CSS selectors for the listing markup
    #[serde(default)]
    pub selectors: ListingSelectors,

    /// Log verbosity
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let listing_url = self.crawler.listing_url.trim();
        if listing_url.is_empty() {
            return Err(AppError::validation("crawler.listing_url is empty"));
        }
        url::Url::parse(listing_url)?;
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.poll_interval_secs == 0 {
            return Err(AppError::validation(
                "crawler.poll_interval_secs must be > 0",
            ));
        }

        self.mail.endpoint()?;
        self.mail.sender_mailbox()?;
        self.mail.recipient_mailbox()?;
        if self.mail.user.trim().is_empty() {
            return Err(AppError::validation("mail.user is required"));
        }
        if self.mail.password.is_empty() {
            return Err(AppError::validation("mail.password is required"));
        }
        if self.mail.timeout_secs == 0 {
            return Err(AppError::validation("mail.timeout_secs must be > 0"));
        }

        if self.cache.path.as_os_str().is_empty() {
            return Err(AppError::validation("cache.path is empty"));
        }

        for selector in self.selectors.all() {
            parse_selector(selector)?;
        }
        Ok(())
    }
}

/// Listing page and polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Listings page polled on every iteration
    #[serde(default = "defaults::listing_url")]
    pub listing_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pause between poll iterations in seconds
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,
}

impl CrawlerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            listing_url: defaults::listing_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            poll_interval_secs: defaults::poll_interval(),
        }
    }
}

/// Mail server settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// SMTP server as `host:port`
    #[serde(default = "defaults::mail_server")]
    pub server: String,

    /// `From` address
    #[serde(default = "defaults::sender")]
    pub sender: String,

    /// `To` address
    #[serde(default = "defaults::recipient")]
    pub recipient: String,

    /// SMTP login
    #[serde(default)]
    pub user: String,

    /// SMTP password
    #[serde(default, skip_serializing)]
    pub password: String,

    /// SMTP command timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl MailConfig {
    /// Split `server` into host and port.
    pub fn endpoint(&self) -> Result<(String, u16)> {
        let (host, port) = self.server.trim().rsplit_once(':').ok_or_else(|| {
            AppError::validation(format!(
                "mail.server '{}' must be in host:port form",
                self.server
            ))
        })?;
        if host.is_empty() {
            return Err(AppError::validation("mail.server host is empty"));
        }
        let port = port.parse::<u16>().map_err(|e| {
            AppError::validation(format!("mail.server port '{port}' is invalid: {e}"))
        })?;
        Ok((host.to_string(), port))
    }

    pub fn sender_mailbox(&self) -> Result<Mailbox> {
        parse_mailbox(&self.sender)
    }

    pub fn recipient_mailbox(&self) -> Result<Mailbox> {
        parse_mailbox(&self.recipient)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| AppError::address(address, e))
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("server", &self.server)
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            server: defaults::mail_server(),
            sender: defaults::sender(),
            recipient: defaults::recipient(),
            user: String::new(),
            password: String::new(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Seen-offer cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Flat file with one known link per line
    #[serde(default = "defaults::cache_path")]
    pub path: PathBuf,

    /// Start from an empty cache, discarding the file contents
    #[serde(default)]
    pub purge: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: defaults::cache_path(),
            purge: false,
        }
    }
}

/// CSS selectors locating offers in the listing markup.
///
/// `header`, `body` are searched inside each `listing` element;
/// `header_link` inside the header; `price`, `location`, `size` inside
/// the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    #[serde(default = "defaults::listing")]
    pub listing: String,
    #[serde(default = "defaults::header")]
    pub header: String,
    #[serde(default = "defaults::header_link")]
    pub header_link: String,
    #[serde(default = "defaults::body")]
    pub body: String,
    #[serde(default = "defaults::price")]
    pub price: String,
    #[serde(default = "defaults::location")]
    pub location: String,
    #[serde(default = "defaults::size")]
    pub size: String,
}

impl ListingSelectors {
    /// All selector strings, in declaration order.
    pub fn all(&self) -> [&str; 7] {
        [
            &self.listing,
            &self.header,
            &self.header_link,
            &self.body,
            &self.price,
            &self.location,
            &self.size,
        ]
    }
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            listing: defaults::listing(),
            header: defaults::header(),
            header_link: defaults::header_link(),
            body: defaults::body(),
            price: defaults::price(),
            location: defaults::location(),
            size: defaults::size(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Numeric verbosity (10 debug, 20 info, 30 warn, 40 error)
    #[serde(default = "defaults::verbosity")]
    pub verbosity: u8,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbosity: defaults::verbosity(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn listing_url() -> String {
        "http://ogloszenia.trojmiasto.pl/nieruchomosci-mam-do-wynajecia/wi,100,ai,_1800,e1i,38_35_3_34_36_87_5_2,ri,_2,na,1,has_hv,1,o0,0.html".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; flatfinder/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn poll_interval() -> u64 {
        60
    }

    // Mail defaults
    pub fn mail_server() -> String {
        "smtp.gmail.com:587".into()
    }
    pub fn sender() -> String {
        "flatfinder@example.com".into()
    }
    pub fn recipient() -> String {
        "flatfinder@example.com".into()
    }

    // Cache defaults
    pub fn cache_path() -> PathBuf {
        PathBuf::from("offers.dat")
    }

    // Selector defaults
    pub fn listing() -> String {
        "li.list-elem".into()
    }
    pub fn header() -> String {
        "div.ogl-head".into()
    }
    pub fn header_link() -> String {
        "h2 a".into()
    }
    pub fn body() -> String {
        "div.ogl-content".into()
    }
    pub fn price() -> String {
        "li.price".into()
    }
    pub fn location() -> String {
        "li.place".into()
    }
    pub fn size() -> String {
        "li.size".into()
    }

    // Logging defaults
    pub fn verbosity() -> u8 {
        20
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.mail.user = "user@example.com".to_string();
        config.mail.password = "secret".to_string();
        config
    }

    #[test]
    fn validate_complete_config_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_credentials() {
        // Defaults carry no credentials.
        assert!(Config::default().validate().is_err());

        let mut config = valid_config();
        config.mail.password.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = valid_config();
        config.crawler.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = valid_config();
        config.selectors.price = "[[invalid".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_address() {
        let mut config = valid_config();
        config.mail.recipient = "not an address".to_string();
        assert!(matches!(config.validate(), Err(AppError::Address { .. })));
    }

    #[test]
    fn endpoint_splits_host_and_port() {
        let mail = MailConfig::default();
        assert_eq!(
            mail.endpoint().unwrap(),
            ("smtp.gmail.com".to_string(), 587)
        );
    }

    #[test]
    fn endpoint_rejects_missing_port() {
        let mail = MailConfig {
            server: "smtp.example.com".to_string(),
            ..MailConfig::default()
        };
        assert!(mail.endpoint().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            poll_interval_secs = 300

            [selectors]
            price = "span.cost"
            "#,
        )
        .unwrap();
        assert_eq!(config.crawler.poll_interval_secs, 300);
        assert_eq!(config.crawler.timeout_secs, 30);
        assert_eq!(config.selectors.price, "span.cost");
        assert_eq!(config.selectors.listing, "li.list-elem");
        assert_eq!(config.cache.path, PathBuf::from("offers.dat"));
    }

    #[test]
    fn debug_redacts_password() {
        let config = valid_config();
        let rendered = format!("{:?}", config.mail);
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        assert!(matches!(
            Config::load("/nonexistent/flatfinder.toml"),
            Err(AppError::Io(_))
        ));
    }
}
