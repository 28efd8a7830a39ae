//! Configuration loading and types for replset-bootstrap.
//!
//! Every setting has a built-in default that reproduces the fixed
//! three-member `rs0` topology, so running without a file is the normal
//! case.  A YAML file can override any subsection; the result is
//! validated once at startup and never mutated afterwards.

use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::bootstrap::BootstrapPlan;
use crate::retry::AttemptBudget;
use crate::topology::ClusterConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, garde::Validate)]
pub struct Config {
    /// Replica set name and members.
    #[serde(default)]
    #[garde(dive)]
    pub cluster: ClusterConfig,

    /// Host that receives `status` and `initiate`.  Defaults to the
    /// highest-priority member.
    #[serde(default)]
    #[garde(skip)]
    pub seed: Option<String>,

    /// Budget for waiting on member hosts.
    #[serde(default = "AttemptBudget::host_wait")]
    #[garde(dive)]
    pub host_wait: AttemptBudget,

    /// Budget for polling status after initiation.
    #[serde(default = "AttemptBudget::primary_poll")]
    #[garde(dive)]
    pub primary_poll: AttemptBudget,

    /// Driver connection settings.
    #[serde(default)]
    #[garde(dive)]
    pub connection: ConnectionConfig,

    /// Logging settings.
    #[serde(default)]
    #[garde(skip)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            seed: None,
            host_wait: AttemptBudget::host_wait(),
            primary_poll: AttemptBudget::primary_poll(),
            connection: ConnectionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Driver connection settings.
#[derive(Clone, Deserialize, garde::Validate)]
pub struct ConnectionConfig {
    /// Per-command server selection timeout.
    #[serde(default = "default_server_selection_timeout")]
    #[garde(range(min = 1))]
    pub server_selection_timeout_ms: u64,

    /// Username for SCRAM authentication against `admin`.
    #[serde(default)]
    #[garde(skip)]
    pub username: Option<String>,

    #[serde(default)]
    #[garde(skip)]
    pub password: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_selection_timeout_ms: default_server_selection_timeout(),
            username: None,
            password: None,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("server_selection_timeout_ms", &self.server_selection_timeout_ms)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Run field validation plus the cross-field checks garde cannot express.
    pub fn check(&self) -> anyhow::Result<()> {
        garde::Validate::validate(self).map_err(|report| anyhow::anyhow!("{report}"))?;

        if let Some(seed) = &self.seed {
            if !self.cluster.contains_host(seed) {
                anyhow::bail!("seed {seed} is not a member of replica set {}", self.cluster.id);
            }
        }
        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("logging.format must be text or json, got {other}"),
        }
        if self.connection.password.is_some() && self.connection.username.is_none() {
            anyhow::bail!("connection.password is set without connection.username");
        }
        Ok(())
    }

    /// Host that receives `status` and `initiate`.
    pub fn seed_host(&self) -> String {
        self.seed
            .clone()
            .or_else(|| self.cluster.primary_designate().map(str::to_string))
            .unwrap_or_default()
    }

    /// Freeze the parts the bootstrapper needs.
    pub fn plan(&self) -> BootstrapPlan {
        BootstrapPlan {
            cluster: self.cluster.clone(),
            host_wait: self.host_wait,
            primary_poll: self.primary_poll,
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_server_selection_timeout() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load, parse and validate configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("parsing {}", path.display()))?;
    config.check()?;
    Ok(config)
}
