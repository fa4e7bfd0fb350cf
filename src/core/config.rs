use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SettlementConfig {
    pub interval_hours: u64,
    pub penalty_rate_percent: Decimal,
    pub penalty_grace_days: i64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        SettlementConfig {
            interval_hours: 12,
            penalty_rate_percent: dec!(10),
            penalty_grace_days: 7,
        }
    }
}

pub const MAX_INTERVAL_HOURS: u64 = 24 * 366;
pub const MAX_PENALTY_GRACE_DAYS: i64 = 3650;

impl SettlementConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.saturating_mul(60 * 60))
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_INTERVAL_HOURS).contains(&self.interval_hours) {
            bail!(
                "settlement.interval_hours must be between 1 and {MAX_INTERVAL_HOURS}, got {}",
                self.interval_hours
            );
        }
        if self.penalty_rate_percent < Decimal::ZERO {
            bail!(
                "settlement.penalty_rate_percent cannot be negative, got {}",
                self.penalty_rate_percent
            );
        }
        if !(0..=MAX_PENALTY_GRACE_DAYS).contains(&self.penalty_grace_days) {
            bail!(
                "settlement.penalty_grace_days must be between 0 and {MAX_PENALTY_GRACE_DAYS}, got {}",
                self.penalty_grace_days
            );
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RatesConfig {
    /// Rate service endpoint. When absent, `default_key_rate` is used as a fixed rate.
    pub base_url: Option<String>,
    /// Used by origination when the rate source fails outright.
    pub default_key_rate: Decimal,
    /// Served and cached when the rate service cannot be reached.
    pub fallback_key_rate: Decimal,
    pub markup_percent: Decimal,
    pub cache_ttl_minutes: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            base_url: None,
            default_key_rate: dec!(10),
            fallback_key_rate: dec!(16),
            markup_percent: dec!(5),
            cache_ttl_minutes: 60,
        }
    }
}

impl RatesConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes.saturating_mul(60))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("default_key_rate", self.default_key_rate),
            ("fallback_key_rate", self.fallback_key_rate),
            ("markup_percent", self.markup_percent),
        ] {
            if value < Decimal::ZERO {
                bail!("rates.{name} cannot be negative, got {value}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpeningAccount {
    pub id: String,
    #[serde(default)]
    pub opening_balance: Decimal,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub accounts: Vec<OpeningAccount>,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "loanbook", "loanbook")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "loanbook", "loanbook")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn validate(&self) -> Result<()> {
        self.settlement.validate()?;
        self.rates.validate()
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
settlement:
  interval_hours: 6
  penalty_rate_percent: 12.5
rates:
  base_url: "http://rates.example.com"
  markup_percent: 4
accounts:
  - id: "acc-1"
    opening_balance: 1500.25
  - id: "acc-2"
data_path: "/tmp/loanbook"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.settlement.interval_hours, 6);
        assert_eq!(config.settlement.penalty_rate_percent, dec!(12.5));
        // Unspecified fields keep their defaults
        assert_eq!(config.settlement.penalty_grace_days, 7);
        assert_eq!(
            config.rates.base_url.as_deref(),
            Some("http://rates.example.com")
        );
        assert_eq!(config.rates.markup_percent, dec!(4));
        assert_eq!(config.rates.fallback_key_rate, dec!(16));
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[0].opening_balance, dec!(1500.25));
        assert_eq!(config.accounts[1].opening_balance, Decimal::ZERO);
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/loanbook")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.settlement.interval(), Duration::from_secs(12 * 3600));
        assert_eq!(config.settlement.penalty_rate_percent, dec!(10));
        assert_eq!(config.rates.default_key_rate, dec!(10));
        assert_eq!(config.rates.cache_ttl(), Duration::from_secs(3600));
        assert!(config.rates.base_url.is_none());
        assert!(config.accounts.is_empty());
    }

    fn load_yaml(yaml: &str) -> Result<AppConfig> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yaml");
        fs::write(&path, yaml)?;
        AppConfig::load_from_path(&path)
    }

    #[test]
    fn test_load_from_path_accepts_valid_settlement() {
        let config = load_yaml("settlement:\n  interval_hours: 1\n  penalty_grace_days: 0\n").unwrap();
        assert_eq!(config.settlement.interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_load_from_path_rejects_bad_settlement() {
        for yaml in [
            "settlement:\n  interval_hours: 0\n",
            "settlement:\n  interval_hours: 18446744073709551615\n",
            "settlement:\n  penalty_rate_percent: -5\n",
            "settlement:\n  penalty_grace_days: -1\n",
            "settlement:\n  penalty_grace_days: 9223372036854775807\n",
            "rates:\n  markup_percent: -1\n",
        ] {
            let err = load_yaml(yaml).unwrap_err();
            assert!(
                format!("{err:#}").contains("Invalid config file"),
                "{yaml}: {err:#}"
            );
        }
    }

    #[test]
    fn test_interval_does_not_overflow() {
        let config = SettlementConfig {
            interval_hours: u64::MAX,
            ..SettlementConfig::default()
        };
        assert_eq!(config.interval(), Duration::from_secs(u64::MAX));
        assert!(config.validate().is_err());
    }
}
