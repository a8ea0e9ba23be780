//! Layered configuration: defaults < TOML files < environment < flags.
//!
//! Environment variables and flags are both handled by clap (`SABNZBD_*`), which
//! already gives flags precedence over the environment. Config files fill in
//! whatever neither of them set.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use tracing::Level;

use sabnzbd_exporter_core::client::{DEFAULT_TIMEOUT, resolve_api_url};

pub(crate) const DEFAULT_LISTEN_PORT: u16 = 8080;
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = DEFAULT_TIMEOUT.as_secs();

// ============================================================
// CLI
// ============================================================

#[derive(Parser, Debug, Default)]
#[command(
    name = "sabnzbd-exporter",
    about = "Prometheus exporter for SABnzbd",
    version = sabnzbd_exporter_core::VERSION
)]
pub(crate) struct Args {
    /// Path to a TOML config file. May be repeated; later files win.
    #[arg(long = "config", value_name = "PATH")]
    pub(crate) config: Vec<PathBuf>,

    /// Base URL of the SABnzbd instance (URL or host:port).
    #[arg(long, env = "SABNZBD_BASE_URL")]
    pub(crate) base_url: Option<String>,

    /// SABnzbd API key.
    #[arg(long, env = "SABNZBD_API_KEY", hide_env_values = true)]
    pub(crate) api_key: Option<String>,

    /// Port to serve metrics on [default: 8080].
    #[arg(long, env = "SABNZBD_LISTEN_PORT")]
    pub(crate) listen_port: Option<u16>,

    /// Log level: debug, info, warn or error [default: info].
    #[arg(long, env = "SABNZBD_LOG_LEVEL")]
    pub(crate) log_level: Option<String>,

    /// Export process metrics (CPU, memory, file descriptors) of the exporter.
    #[arg(
        long,
        env = "SABNZBD_PROCESS_COLLECTOR",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub(crate) process_collector: Option<bool>,

    /// Timeout for SABnzbd API requests in seconds [default: 10].
    #[arg(long, env = "SABNZBD_TIMEOUT_SECS")]
    pub(crate) timeout_secs: Option<u64>,
}

// ============================================================
// Config file
// ============================================================

/// Contents of one TOML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) base_url: Option<String>,
    pub(crate) api_key: Option<String>,
    pub(crate) listen_port: Option<u16>,
    pub(crate) log_level: Option<String>,
    pub(crate) process_collector: Option<bool>,
    pub(crate) timeout_secs: Option<u64>,
}

impl FileConfig {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Overlays every key set in `other`.
    fn merge(&mut self, other: FileConfig) {
        self.base_url = other.base_url.or(self.base_url.take());
        self.api_key = other.api_key.or(self.api_key.take());
        self.listen_port = other.listen_port.or(self.listen_port);
        self.log_level = other.log_level.or(self.log_level.take());
        self.process_collector = other.process_collector.or(self.process_collector);
        self.timeout_secs = other.timeout_secs.or(self.timeout_secs);
    }
}

// ============================================================
// Errors
// ============================================================

/// Error type for configuration loading.
#[derive(Debug)]
pub(crate) enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "error loading config file ({}): {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => {
                write!(f, "error parsing config file ({}): {}", path.display(), source)
            }
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================
// Resolved config
// ============================================================

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) listen_port: u16,
    pub(crate) log_level: Level,
    pub(crate) process_collector: bool,
    pub(crate) timeout: Duration,
}

impl Config {
    pub(crate) fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut layered = FileConfig::default();
        for path in &args.config {
            layered.merge(FileConfig::read(path)?);
        }
        layered.merge(FileConfig {
            base_url: args.base_url.clone(),
            api_key: args.api_key.clone(),
            listen_port: args.listen_port,
            log_level: args.log_level.clone(),
            process_collector: args.process_collector,
            timeout_secs: args.timeout_secs,
        });
        Self::resolve(layered)
    }

    /// Applies defaults and validates.
    fn resolve(layered: FileConfig) -> Result<Self, ConfigError> {
        let base_url = layered.base_url.unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "base_url must be set to the base url of your sabnzbd instance".to_string(),
            ));
        }
        resolve_api_url(&base_url).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let api_key = layered.api_key.unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "api_key must be set to the api key of your sabnzbd instance".to_string(),
            ));
        }

        let listen_port = layered.listen_port.unwrap_or(DEFAULT_LISTEN_PORT);
        if listen_port == 0 {
            return Err(ConfigError::Invalid(
                "listen_port must be between 1 and 65535".to_string(),
            ));
        }

        let log_level = parse_log_level(layered.log_level.as_deref().unwrap_or("info"))?;

        let timeout_secs = layered.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            api_key,
            listen_port,
            log_level,
            process_collector: layered.process_collector.unwrap_or(false),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_log_level(s: &str) -> Result<Level, ConfigError> {
    match s {
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(ConfigError::Invalid(format!(
            "log_level must be one of debug, info, warn, error (got '{}')",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, PoisonError};

    // -- helpers --

    fn valid() -> FileConfig {
        FileConfig {
            base_url: Some("https://this.is.a.valid.url".to_string()),
            api_key: Some("acbdef0123456789acbdef0123456789".to_string()),
            ..Default::default()
        }
    }

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    const ENV_KEYS: [&str; 6] = [
        "SABNZBD_BASE_URL",
        "SABNZBD_API_KEY",
        "SABNZBD_LISTEN_PORT",
        "SABNZBD_LOG_LEVEL",
        "SABNZBD_PROCESS_COLLECTOR",
        "SABNZBD_TIMEOUT_SECS",
    ];

    /// Serializes every test that touches the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Parses `argv` with exactly `env` as the `SABNZBD_*` environment.
    fn args_with_env(argv: &[&str], env: &[(&str, &str)]) -> Args {
        let _guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        // SAFETY: tests only mutate the environment while holding ENV_LOCK.
        unsafe {
            for key in ENV_KEYS {
                std::env::remove_var(key);
            }
            for (key, value) in env {
                std::env::set_var(key, value);
            }
        }

        let mut full = vec!["sabnzbd-exporter"];
        full.extend_from_slice(argv);
        let parsed = Args::try_parse_from(full);

        unsafe {
            for (key, _) in env {
                std::env::remove_var(key);
            }
        }
        parsed.unwrap()
    }

    fn args(argv: &[&str]) -> Args {
        args_with_env(argv, &[])
    }

    // ===== validation =====

    #[test]
    fn validation_table() {
        let cases: Vec<(&str, FileConfig, bool)> = vec![
            ("valid config - url", valid(), true),
            (
                "valid config - host:port",
                FileConfig {
                    base_url: Some("localhost:8080".to_string()),
                    ..valid()
                },
                true,
            ),
            (
                "valid config - url:port",
                FileConfig {
                    base_url: Some("http://localhost:8080".to_string()),
                    ..valid()
                },
                true,
            ),
            (
                "missing base url",
                FileConfig {
                    base_url: None,
                    ..valid()
                },
                false,
            ),
            (
                "bad base url",
                FileConfig {
                    base_url: Some("this is not a url".to_string()),
                    ..valid()
                },
                false,
            ),
            (
                "missing api key",
                FileConfig {
                    api_key: Some(String::new()),
                    ..valid()
                },
                false,
            ),
            (
                "zero listen port",
                FileConfig {
                    listen_port: Some(0),
                    ..valid()
                },
                false,
            ),
            (
                "bad log level",
                FileConfig {
                    log_level: Some("bad".to_string()),
                    ..valid()
                },
                false,
            ),
            (
                "zero timeout",
                FileConfig {
                    timeout_secs: Some(0),
                    ..valid()
                },
                false,
            ),
        ];

        for (name, cfg, ok) in cases {
            let result = Config::resolve(cfg);
            assert_eq!(result.is_ok(), ok, "{}: {:?}", name, result.err());
        }
    }

    #[test]
    fn defaults_applied() {
        let cfg = Config::resolve(valid()).unwrap();
        assert_eq!(cfg.listen_port, DEFAULT_LISTEN_PORT);
        assert_eq!(cfg.log_level, Level::INFO);
        assert!(!cfg.process_collector);
        assert_eq!(cfg.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    // ===== layering =====

    #[test]
    fn flags_only() {
        let a = args(&[
            "--base-url",
            "http://localhost:8080",
            "--api-key",
            "abc123",
            "--listen-port",
            "9999",
            "--log-level",
            "debug",
            "--process-collector",
        ]);
        let cfg = Config::load(&a).unwrap();
        assert_eq!(cfg.base_url, "http://localhost:8080");
        assert_eq!(cfg.api_key, "abc123");
        assert_eq!(cfg.listen_port, 9999);
        assert_eq!(cfg.log_level, Level::DEBUG);
        assert!(cfg.process_collector);
    }

    #[test]
    fn file_fills_gaps_and_flags_win() {
        let f = toml_file(
            r#"
            base_url = "http://file:8080"
            api_key = "from-file"
            listen_port = 9100
            log_level = "warn"
            "#,
        );
        let path = f.path().to_str().unwrap();
        let a = args(&["--config", path, "--listen-port", "9200"]);
        let cfg = Config::load(&a).unwrap();
        assert_eq!(cfg.base_url, "http://file:8080");
        assert_eq!(cfg.api_key, "from-file");
        assert_eq!(cfg.listen_port, 9200);
        assert_eq!(cfg.log_level, Level::WARN);
    }

    #[test]
    fn later_files_win() {
        let first = toml_file("base_url = \"http://first\"\napi_key = \"one\"\n");
        let second = toml_file("api_key = \"two\"\n");
        let a = args(&[
            "--config",
            first.path().to_str().unwrap(),
            "--config",
            second.path().to_str().unwrap(),
        ]);
        let cfg = Config::load(&a).unwrap();
        assert_eq!(cfg.base_url, "http://first");
        assert_eq!(cfg.api_key, "two");
    }

    #[test]
    fn env_overrides_file_and_flags_override_env() {
        let f = toml_file(
            r#"
            base_url = "http://file:8080"
            api_key = "from-file"
            listen_port = 9100
            "#,
        );
        let a = args_with_env(
            &["--config", f.path().to_str().unwrap(), "--listen-port", "9400"],
            &[
                ("SABNZBD_API_KEY", "from-env"),
                ("SABNZBD_LISTEN_PORT", "9300"),
                ("SABNZBD_LOG_LEVEL", "error"),
            ],
        );
        let cfg = Config::load(&a).unwrap();
        assert_eq!(cfg.base_url, "http://file:8080");
        assert_eq!(cfg.api_key, "from-env");
        assert_eq!(cfg.listen_port, 9400);
        assert_eq!(cfg.log_level, Level::ERROR);
    }

    #[test]
    fn env_process_collector_accepts_bool() {
        let a = args_with_env(
            &["--base-url", "localhost:8080", "--api-key", "abc"],
            &[("SABNZBD_PROCESS_COLLECTOR", "true")],
        );
        assert!(Config::load(&a).unwrap().process_collector);
    }

    #[test]
    fn unknown_file_key_is_rejected() {
        let f = toml_file("base_url = \"http://x\"\nbogus = 1\n");
        let a = args(&["--config", f.path().to_str().unwrap()]);
        assert!(matches!(Config::load(&a), Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn missing_file_is_read_error() {
        let a = args(&["--config", "/nonexistent/sabnzbd-exporter.toml"]);
        assert!(matches!(Config::load(&a), Err(ConfigError::Read { .. })));
    }
}
