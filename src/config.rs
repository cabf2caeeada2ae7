use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use crate::error::{ConfigError, ConfigResult as Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub reader: ReaderConfig,
    pub writer: WriterConfig,
    pub output: OutputConfig,
}

/// Reader configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReaderConfig {
    /// Minimum time between two progress reports in milliseconds
    pub progress_interval_ms: u64,
}

/// Writer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WriterConfig {
    /// Number of indent characters per nesting level
    pub indent: usize,
    /// Indent character
    pub indent_char: char,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormatConfig,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
    /// Report reader progress on stderr
    pub progress: bool,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    Human,
    Json,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 1000,
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            indent_char: ' ',
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormatConfig::Human,
            verbose: false,
            quiet: false,
            progress: false,
        }
    }
}

impl OutputConfig {
    /// Quiet wins over verbose; validation rejects both at once anyway.
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            if !config_path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: config_path.clone(),
                });
            }
            config = Self::load_from_file(config_path).await?;
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = found_config;
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "bmecat.toml",
            "bmecat.json",
            ".bmecat.toml",
            ".bmecat.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("bmecat");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(interval) = env.get("BMECAT_PROGRESS_INTERVAL_MS") {
            config.reader.progress_interval_ms = interval.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid BMECAT_PROGRESS_INTERVAL_MS value: {}",
                    interval
                ))
            })?;
        }

        if let Some(indent) = env.get("BMECAT_INDENT") {
            config.writer.indent = indent.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid BMECAT_INDENT value: {}", indent))
            })?;
        }

        if let Some(verbose) = env.get("BMECAT_VERBOSE") {
            config.output.verbose = verbose.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid BMECAT_VERBOSE value: {}", verbose))
            })?;
        }

        if let Some(quiet) = env.get("BMECAT_QUIET") {
            config.output.quiet = quiet.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid BMECAT_QUIET value: {}", quiet))
            })?;
        }

        if let Some(progress) = env.get("BMECAT_PROGRESS") {
            config.output.progress = progress.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid BMECAT_PROGRESS value: {}", progress))
            })?;
        }

        if let Some(format) = env.get("BMECAT_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid BMECAT_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(format) = cli.output_format {
            config.output.format = format.into();
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }
        if cli.file_args().progress {
            config.output.progress = true;
        }

        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.reader.progress_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "Progress interval must be greater than 0".to_string(),
            ));
        }

        if config.writer.indent > 16 {
            return Err(ConfigError::Validation(
                "Indent cannot exceed 16 characters".to_string(),
            ));
        }

        if !config.writer.indent_char.is_ascii() {
            return Err(ConfigError::Validation(
                "Indent character must be ASCII".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn new() -> Self {
            Self {
                vars: HashMap::new(),
            }
        }

        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.reader.progress_interval_ms, 1000);
        assert_eq!(config.writer.indent, 2);
        assert_eq!(config.writer.indent_char, ' ');
        assert_eq!(config.output.format, OutputFormatConfig::Human);
        assert!(!config.output.verbose);
        assert!(!config.output.quiet);
        assert!(!config.output.progress);
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bmecat.toml");

        let toml_content = r#"
[reader]
progress_interval_ms = 250

[writer]
indent = 4
indent_char = "\t"

[output]
format = "json"
verbose = true
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.reader.progress_interval_ms, 250);
        assert_eq!(config.writer.indent, 4);
        assert_eq!(config.writer.indent_char, '\t');
        assert_eq!(config.output.format, OutputFormatConfig::Json);
        assert!(config.output.verbose);
        assert!(!config.output.quiet);
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bmecat.json");

        let json_content = r#"{
  "reader": { "progress_interval_ms": 500 },
  "output": { "format": "human", "quiet": true }
}"#;
        fs::write(&config_path, json_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.reader.progress_interval_ms, 500);
        assert_eq!(config.writer, WriterConfig::default());
        assert!(config.output.quiet);
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bmecat.yaml");
        fs::write(&config_path, "reader: {}").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));
    }

    #[tokio::test]
    async fn test_explicit_config_file_must_exist() {
        let cli = Cli::try_parse_from([
            "bmecat",
            "--config",
            "/does/not/exist.toml",
            "info",
            "catalog.xml",
        ])
        .unwrap();

        let result = ConfigManager::load_config(&cli).await;
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_environment_overrides() {
        let mut env = MockEnvProvider::new();
        env.set("BMECAT_PROGRESS_INTERVAL_MS", "100");
        env.set("BMECAT_INDENT", "0");
        env.set("BMECAT_FORMAT", "JSON");
        env.set("BMECAT_PROGRESS", "true");

        let config =
            ConfigManager::apply_environment_overrides_with(&env, Config::default()).unwrap();

        assert_eq!(config.reader.progress_interval_ms, 100);
        assert_eq!(config.writer.indent, 0);
        assert_eq!(config.output.format, OutputFormatConfig::Json);
        assert!(config.output.progress);
    }

    #[test]
    fn test_invalid_environment_value() {
        let mut env = MockEnvProvider::new();
        env.set("BMECAT_INDENT", "lots");

        let result = ConfigManager::apply_environment_overrides_with(&env, Config::default());
        assert!(matches!(result, Err(ConfigError::Environment(msg)) if msg.contains("BMECAT_INDENT")));

        let mut env = MockEnvProvider::new();
        env.set("BMECAT_FORMAT", "xml");
        assert!(ConfigManager::apply_environment_overrides_with(&env, Config::default()).is_err());
    }

    #[test]
    fn test_cli_takes_precedence() {
        let mut config = Config::default();
        config.output.quiet = true;
        config.output.format = OutputFormatConfig::Json;

        let cli =
            Cli::try_parse_from(["bmecat", "perf", "-P", "-v", "--format", "human", "c.xml"])
                .unwrap();
        let config = ConfigManager::merge_with_cli(config, &cli);

        assert!(config.output.verbose);
        assert!(!config.output.quiet);
        assert!(config.output.progress);
        assert_eq!(config.output.format, OutputFormatConfig::Human);
    }

    #[test]
    fn test_validate_config() {
        let mut config = Config::default();
        config.reader.progress_interval_ms = 0;
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.writer.indent = 17;
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.output.verbose = true;
        config.output.quiet = true;
        assert!(ConfigManager::validate_config(&config).is_err());
    }

    #[test]
    fn test_indent_char_must_be_ascii() {
        let mut config = Config::default();
        config.writer.indent_char = '\t';
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.writer.indent_char = '\u{a0}';
        match ConfigManager::validate_config(&config) {
            Err(ConfigError::Validation(message)) => assert!(message.contains("ASCII")),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_output_verbosity() {
        let mut output = OutputConfig::default();
        assert_eq!(output.verbosity(), VerbosityLevel::Normal);

        output.verbose = true;
        assert_eq!(output.verbosity(), VerbosityLevel::Verbose);

        output.verbose = false;
        output.quiet = true;
        assert_eq!(output.verbosity(), VerbosityLevel::Quiet);
    }
}
