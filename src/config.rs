use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::log_config_loaded;

/// Config files searched by `load_default`, in order
pub const CONFIG_PATHS: [&str; 2] = ["khronos.toml", "khronos.toml.template"];

/// Environment variable overriding `report.output_dir`
pub const OUTPUT_DIR_ENV: &str = "KHRONOS_OUTPUT_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilerConfig {
    /// Timer storage settings
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Report output settings
    #[serde(default)]
    pub report: ReportConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Number of timers reserved by `initialize`; storage doubles past this
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory the report file is written into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// File name prefix, followed by the program name and `.json`
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_initial_capacity() -> usize {
    10
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_file_prefix() -> String {
    "profiler_data_".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Load `.env` from the working directory, then from beside the config
/// file. Variables already set are never overwritten.
fn load_env_files(config_path: &Path) {
    if Path::new(".env").exists() {
        dotenv::dotenv().ok();
    }
    if let Some(dir) = config_path.parent() {
        let beside = dir.join(".env");
        if !dir.as_os_str().is_empty() && beside.exists() {
            dotenv::from_path(&beside).ok();
        }
    }
}

impl ProfilerConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let mut config: ProfilerConfig = toml::from_str(content).map_err(|e| {
            anyhow::anyhow!("❌ Failed to parse config file: {}\n💡 Check your TOML syntax", e)
        })?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        load_env_files(path.as_ref());

        let content = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!(
                "❌ Failed to read config file {}: {}\n💡 Make sure the file exists and is readable",
                path.as_ref().display(),
                e
            )
        })?;

        let config = Self::from_toml_str(&content)?;
        log_config_loaded(&path.as_ref().display().to_string());
        Ok(config)
    }

    /// Load the first config file found, falling back to defaults
    pub fn load_default() -> anyhow::Result<Self> {
        load_env_files(Path::new(CONFIG_PATHS[0]));

        for path in &CONFIG_PATHS {
            if Path::new(path).exists() {
                return Self::load_from_file(path);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        log_config_loaded("built-in defaults");
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var(OUTPUT_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.report.output_dir = PathBuf::from(dir);
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.registry.initial_capacity == 0 {
            return Err(anyhow::anyhow!(
                "❌ registry.initial_capacity cannot be 0"
            ));
        }

        if self.report.file_prefix.contains(&['/', '\\'][..]) {
            return Err(anyhow::anyhow!(
                "❌ report.file_prefix '{}' must not contain path separators",
                self.report.file_prefix
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(anyhow::anyhow!(
                    "❌ Unknown log level '{}'\n💡 Use one of: trace, debug, info, warn, error",
                    other
                ))
            }
        }

        Ok(())
    }

    /// Destination of the report for `program_name`
    pub fn report_path(&self, program_name: &str) -> PathBuf {
        crate::report::report_path(
            &self.report.output_dir,
            &self.report.file_prefix,
            program_name,
        )
    }
}
