//! Configuration module
//!
//! One TOML file, loaded once at start-up and never changed during a run.
//!
//! ```toml
//! database_url = "sqlite://data/honeypot.db"
//! state_dir = "state"
//!
//! [report]
//! hours = 24
//! exfiltrated_passwords = "exfil_passwords.txt"
//!
//! [[destinations]]
//! kind = "otx"
//! name = "FortiGate VPN-SSL Honeypot"
//! api_key = "..."
//!
//! [[destinations]]
//! kind = "virustotal"
//! name = "FortiGate VPN-SSL Honeypot"
//! api_key = "..."
//! comment = "IP {ip} seen at {seen}"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::error::ConfigError;
use crate::state::sanitize_tag;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SyncConfig {
    /// SQLite URL of the attempt store
    #[serde(default = "default_database_url")]
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Watermark files live under `<state_dir>/<kind>/`
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Wait before the single retry of a throttled call
    #[serde(default = "default_retry_delay_secs")]
    #[validate(range(max = 600))]
    pub retry_delay_secs: u64,

    /// Per-request HTTP timeout
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,

    #[serde(default)]
    #[validate(nested)]
    pub report: ReportSettings,

    #[serde(default)]
    pub destinations: Vec<Destination>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReportSettings {
    /// Window of the report, counted back from now
    #[serde(default = "default_report_hours")]
    #[validate(range(min = 1, max = 8760))]
    pub hours: u32,

    /// One password per line; highlighted wherever they are tried
    #[serde(default)]
    pub exfiltrated_passwords: Option<PathBuf>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            hours: default_report_hours(),
            exfiltrated_passwords: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Destination {
    Otx(OtxSettings),
    VirusTotal(VirusTotalSettings),
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OtxSettings {
    /// Pulse name, also the watermark tag
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(length(min = 1))]
    pub api_key: String,

    #[serde(default = "default_otx_url")]
    #[validate(url)]
    pub base_url: String,

    #[serde(default = "default_pulse_description")]
    pub description: String,

    #[serde(default = "default_true")]
    pub public: bool,

    #[serde(default = "default_tlp")]
    #[validate(length(min = 1))]
    pub tlp: String,

    #[serde(default = "default_tags")]
    pub tags: Vec<String>,

    /// Only report sources first seen within this many hours
    #[serde(default)]
    #[validate(range(min = 1, max = 8760))]
    pub recency_hours: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VirusTotalSettings {
    /// Watermark tag
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(length(min = 1))]
    pub api_key: String,

    #[serde(default = "default_vt_url")]
    #[validate(url)]
    pub base_url: String,

    /// Comment text; `{ip}` and `{seen}` are filled in
    #[serde(default = "default_comment")]
    #[validate(length(min = 1))]
    pub comment: String,

    #[serde(default = "default_vt_recency_hours")]
    #[validate(range(min = 1, max = 8760))]
    pub recency_hours: Option<u32>,
}

impl Destination {
    pub fn name(&self) -> &str {
        match self {
            Destination::Otx(s) => &s.name,
            Destination::VirusTotal(s) => &s.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Destination::Otx(_) => "otx",
            Destination::VirusTotal(_) => "virustotal",
        }
    }

    pub fn recency(&self) -> Option<chrono::Duration> {
        let hours = match self {
            Destination::Otx(s) => s.recency_hours,
            Destination::VirusTotal(s) => s.recency_hours,
        };
        hours.map(|h| chrono::Duration::hours(i64::from(h)))
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Destination::Otx(s) => s.validate(),
            Destination::VirusTotal(s) => s.validate(),
        }
    }
}

impl SyncConfig {
    /// Read, parse and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(raw)?;
        Validate::validate(&config)?;

        let mut seen = HashSet::new();
        for destination in &config.destinations {
            destination.validate()?;

            let tag = sanitize_tag(destination.name());
            if tag.is_empty() {
                return Err(ConfigError::UnusableName(destination.name().to_string()));
            }
            if !seen.insert((destination.kind(), tag)) {
                return Err(ConfigError::Duplicate(format!(
                    "{} {:?}",
                    destination.kind(),
                    destination.name()
                )));
            }
        }

        Ok(config)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Watermark directory for one destination kind.
    pub fn state_dir_for(&self, destination: &Destination) -> PathBuf {
        self.state_dir.join(destination.kind())
    }
}

fn default_database_url() -> String {
    "sqlite://data/honeypot.db".to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

fn default_retry_delay_secs() -> u64 {
    15
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_report_hours() -> u32 {
    24
}

fn default_otx_url() -> String {
    "https://otx.alienvault.com".to_string()
}

fn default_vt_url() -> String {
    "https://www.virustotal.com".to_string()
}

fn default_pulse_description() -> String {
    "Source addresses submitting credentials to an SSL-VPN honeypot".to_string()
}

fn default_true() -> bool {
    true
}

fn default_tlp() -> String {
    "white".to_string()
}

fn default_tags() -> Vec<String> {
    vec!["honeypot".to_string(), "ssl-vpn".to_string(), "bruteforce".to_string()]
}

fn default_comment() -> String {
    "IP {ip} seen at {seen}".to_string()
}

fn default_vt_recency_hours() -> Option<u32> {
    Some(24)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        database_url = "sqlite:///var/lib/honey/honeypot.db"
        state_dir = "/var/lib/honey/state"
        retry_delay_secs = 5

        [report]
        hours = 48
        exfiltrated_passwords = "exfil.txt"

        [[destinations]]
        kind = "otx"
        name = "FortiGate VPN-SSL Honeypot"
        api_key = "otx-key"
        tlp = "green"

        [[destinations]]
        kind = "virustotal"
        name = "FortiGate VPN-SSL Honeypot"
        api_key = "vt-key"
    "#;

    #[test]
    fn parses_full_config_with_defaults() {
        let config = SyncConfig::parse(FULL).unwrap();

        assert_eq!(config.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.report.hours, 48);
        assert_eq!(config.destinations.len(), 2);

        match &config.destinations[0] {
            Destination::Otx(otx) => {
                assert_eq!(otx.tlp, "green");
                assert!(otx.public);
                assert_eq!(otx.base_url, "https://otx.alienvault.com");
                assert_eq!(otx.recency_hours, None);
            }
            other => panic!("expected otx, got {other:?}"),
        }
        match &config.destinations[1] {
            Destination::VirusTotal(vt) => {
                assert_eq!(vt.comment, "IP {ip} seen at {seen}");
                assert_eq!(vt.recency_hours, Some(24));
            }
            other => panic!("expected virustotal, got {other:?}"),
        }

        assert_eq!(
            config.state_dir_for(&config.destinations[1]),
            PathBuf::from("/var/lib/honey/state/virustotal")
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = SyncConfig::parse("").unwrap();
        assert_eq!(config.database_url, "sqlite://data/honeypot.db");
        assert_eq!(config.retry_delay(), Duration::from_secs(15));
        assert!(config.destinations.is_empty());
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = SyncConfig::parse(
            r#"
            [[destinations]]
            kind = "misp"
            name = "Feed"
            api_key = "k"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_empty_key_and_bad_window() {
        let empty_key = SyncConfig::parse(
            r#"
            [[destinations]]
            kind = "otx"
            name = "Feed"
            api_key = ""
            "#,
        );
        assert!(matches!(empty_key, Err(ConfigError::Invalid(_))));

        let window = SyncConfig::parse(
            r#"
            [[destinations]]
            kind = "virustotal"
            name = "Feed"
            api_key = "k"
            recency_hours = 0
            "#,
        );
        assert!(matches!(window, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_colliding_tags() {
        let err = SyncConfig::parse(
            r#"
            [[destinations]]
            kind = "otx"
            name = "Honeypot Feed"
            api_key = "a"

            [[destinations]]
            kind = "otx"
            name = "Honeypot-Feed"
            api_key = "b"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Duplicate(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = SyncConfig::load(Path::new("/nonexistent/intel-sync.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
