/// Engine configuration.
///
/// # Environment variables
///
/// Every field can be overridden through the environment:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | DATA_DIR | /var/lib/comanda | Directory holding the order database |
/// | STORAGE_TIMEOUT_MS | 5000 | Per-operation storage timeout (ms) |
/// | POLL_INTERVAL_MS | 1000 | Display refresh poll interval (ms) |
/// | TAX_RATE_PERCENT | 0 | Tax applied on checkout subtotals |
/// | ENVIRONMENT | development | Run environment |
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the order database and log files.
    pub data_dir: String,
    /// How long a storage call may take before the operation is treated as
    /// not-applied.
    pub storage_timeout_ms: u64,
    /// How often polling display surfaces re-query storage.
    pub poll_interval_ms: u64,
    /// Tax rate applied to cart subtotals at checkout, in percent.
    pub tax_rate_percent: f64,
    /// development | staging | production
    pub environment: String,
}

impl Config {
    /// Load from the environment, falling back to defaults. Reads a local
    /// `.env` file first if one exists.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/var/lib/comanda".into()),
            storage_timeout_ms: std::env::var("STORAGE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            tax_rate_percent: std::env::var("TAX_RATE_PERCENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Override the data directory, keeping everything else from the
    /// environment. Used in tests with a temp dir.
    pub fn with_data_dir(data_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.data_dir = data_dir.into();
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn storage_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.storage_timeout_ms)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
