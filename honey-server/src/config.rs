//! Configuration module

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the decoy on
    pub bind_addr: IpAddr,

    /// Server port
    pub port: u16,

    /// SQLite URL of the attempt store
    pub database_url: String,

    /// Directory holding the portal's css/js/font/image files
    pub assets_dir: PathBuf,

    /// Optional flat-file copy of captured credentials
    pub creds_log: Option<PathBuf>,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("HONEY_BIND")
                .ok()
                .and_then(|a| a.parse().ok())
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/honeypot.db".to_string()),

            assets_dir: env::var("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static")),

            creds_log: env::var("CREDS_LOG")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Default tracing filter when `RUST_LOG` is not set
    pub fn default_log_filter(&self) -> &'static str {
        if self.is_production() {
            "honey_server=info,honey_store=info,tower_http=info"
        } else {
            "honey_server=debug,honey_store=debug,tower_http=debug"
        }
    }
}
