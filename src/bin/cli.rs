//! flatfinder CLI
//!
//! Polls the listings page and emails every offer not seen before.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flatfinder::{
    error::Result,
    models::Config,
    pipeline,
    storage::OfferCache,
    utils::log::level_for_verbosity,
};

const DEFAULT_CONFIG: &str = "flatfinder.toml";

/// flatfinder - new real-estate offer notifier
#[derive(Parser, Debug)]
#[command(name = "flatfinder", version, about = "Emails new real-estate offers")]
struct Cli {
    /// Path to a TOML config file (default: ./flatfinder.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Logging verbosity (10 debug, 20 info, 30 warn, 40 error)
    #[arg(short, long, global = true)]
    verbosity: Option<u8>,

    /// Purge the offer cache before polling
    #[arg(short = 'd', long, global = true)]
    purge: bool,

    /// Sender address
    #[arg(short = 'f', long, global = true)]
    sender: Option<String>,

    /// Recipient address
    #[arg(short, long, global = true)]
    to: Option<String>,

    /// Polling interval in seconds
    #[arg(short = 'x', long, global = true)]
    timeout: Option<u64>,

    /// Mail server address as host:port
    #[arg(short = 's', long, global = true)]
    mailserver: Option<String>,

    /// Mail server user
    #[arg(short, long, global = true, env = "FLATFINDER_MAIL_USER")]
    user: Option<String>,

    /// Mail server password
    #[arg(
        short,
        long,
        global = true,
        env = "FLATFINDER_MAIL_PASSWORD",
        hide_env_values = true
    )]
    password: Option<String>,

    /// Listings page URL
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Poll the listings page and notify about new offers (default)
    Run,

    /// Fetch the listings once and show which offers are new
    Check,

    /// Validate the merged configuration
    Validate,

    /// Show offer cache info
    Info,
}

impl Cli {
    /// Load the config file, then apply command-line overrides.
    fn build_config(&self) -> (Config, Option<String>) {
        let path = self
            .config
            .clone()
            .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.exists()));

        let (mut config, load_warning) = match path {
            Some(path) => match Config::load(&path) {
                Ok(config) => (config, None),
                Err(e) => (
                    Config::default(),
                    Some(format!("Config load failed from {}: {}", path.display(), e)),
                ),
            },
            None => (Config::default(), None),
        };

        if let Some(verbosity) = self.verbosity {
            config.logging.verbosity = verbosity;
        }
        if self.purge {
            config.cache.purge = true;
        }
        if let Some(sender) = &self.sender {
            config.mail.sender = sender.clone();
        }
        if let Some(to) = &self.to {
            config.mail.recipient = to.clone();
        }
        if let Some(interval) = self.timeout {
            config.crawler.poll_interval_secs = interval;
        }
        if let Some(server) = &self.mailserver {
            config.mail.server = server.clone();
        }
        if let Some(user) = &self.user {
            config.mail.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.mail.password = password.clone();
        }
        if let Some(url) = &self.url {
            config.crawler.listing_url = url.clone();
        }

        (config, load_warning)
    }
}

/// Initialize logging from the numeric verbosity; `RUST_LOG` wins if set.
fn init_logging(verbosity: u8) {
    let level = level_for_verbosity(verbosity).to_string();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Install the Ctrl-C (and on Unix, SIGTERM) listeners.
///
/// The handlers are registered here, not on first poll, so an interrupt
/// during cache open or mail login is still caught.
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        Ok(async move {
            tokio::select! {
                _ = interrupt.recv() => {}
                _ = terminate.recv() => {}
            }
            log::info!("Shutdown signal received");
        })
    }

    #[cfg(not(unix))]
    {
        let mut interrupt = tokio::signal::windows::ctrl_c()?;
        Ok(async move {
            interrupt.recv().await;
            log::info!("Shutdown signal received");
        })
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, load_warning) = cli.build_config();
    init_logging(config.logging.verbosity);

    if let Some(warning) = load_warning {
        log::warn!("{}. Using defaults.", warning);
    }

    log::info!("Starting flatfinder");

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }

            let shutdown = shutdown_signal()?;
            let summary = pipeline::run_poller(&config, shutdown).await?;
            log::debug!("Run summary: {:?}", summary);
            log::info!("Quitting...");
        }

        Command::Check => {
            let checked = pipeline::run_check(&config).await?;
            let fresh = checked.iter().filter(|c| !c.known).count();

            for entry in &checked {
                log::info!(
                    "[{}] {} | {}",
                    if entry.known { "known" } else { "new" },
                    entry.offer.link,
                    entry.offer.subject()
                );
            }
            log::info!("{} offers on the page, {} new", checked.len(), fresh);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (listing URL, mail settings, selectors)");
        }

        Command::Info => {
            let path = &config.cache.path;
            log::info!("Listings page: {}", config.crawler.listing_url);
            log::info!("Offer cache: {}", path.display());

            if path.exists() {
                let known: HashSet<String> =
                    OfferCache::read_known(path).await.into_iter().collect();
                log::info!("Known offers: {}", known.len());
            } else {
                log::info!("No offer cache found yet.");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_before_first_poll_is_not_lost() {
        let shutdown = shutdown_signal().unwrap();

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), shutdown)
            .await
            .expect("SIGTERM sent before polling should resolve the future");
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "flatfinder",
            "-c",
            "/nonexistent/flatfinder.toml",
            "-x",
            "15",
            "-s",
            "mail.example.com:2525",
            "-d",
        ]);
        let (config, warning) = cli.build_config();

        assert!(warning.is_some());
        assert_eq!(config.crawler.poll_interval_secs, 15);
        assert_eq!(config.mail.server, "mail.example.com:2525");
        assert!(config.cache.purge);
    }
}
