//! Configuration loading for the quoting service.
//!
//! Files may be TOML, JSON or YAML. `${VAR}` references are substituted from
//! the environment before parsing, a handful of settings can be overridden
//! through prefixed environment variables, and the result is validated before
//! it is handed out.

use regex::Regex;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

pub mod types;

pub use types::*;

const KNOWN_STORAGE_BACKENDS: [&str; 2] = ["memory", "file"];
const KNOWN_DIRECTORY_BACKENDS: [&str; 2] = ["static", "http"];

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
	Toml,
	Json,
	Yaml,
}

impl ConfigFormat {
	pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
		match path.extension().and_then(|ext| ext.to_str()) {
			Some("toml") => Ok(Self::Toml),
			Some("json") => Ok(Self::Json),
			Some("yaml") | Some("yml") => Ok(Self::Yaml),
			_ => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {}",
				path.display()
			))),
		}
	}
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "QUOTING_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<QuotingConfig, ConfigError> {
		let Some(file_path) = &self.file_path else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		let path = Path::new(file_path);
		if !path.exists() {
			return Err(ConfigError::FileNotFound(file_path.clone()));
		}

		info!("Loading configuration from {}", file_path);
		let format = ConfigFormat::from_path(path)?;
		let content = tokio::fs::read_to_string(path).await?;

		self.load_from_str(&content, format)
	}

	/// Parses, overrides and validates an in-memory document.
	pub fn load_from_str(
		&self,
		content: &str,
		format: ConfigFormat,
	) -> Result<QuotingConfig, ConfigError> {
		let substituted = substitute_env_vars(content)?;
		let mut config = parse(&substituted, format)?;

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		Ok(config)
	}

	fn apply_env_overrides(&self, config: &mut QuotingConfig) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			debug!("Overriding log level from environment");
			config.service.log_level = log_level;
		}

		if let Ok(http_port) = env::var(format!("{}HTTP_PORT", self.env_prefix)) {
			config.service.http_port = http_port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid HTTP port: {}", e)))?;
		}

		if let Ok(pass_through) = env::var(format!("{}PASS_THROUGH_MODE", self.env_prefix)) {
			config.service.pass_through_mode = pass_through.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid pass-through flag: {}", e))
			})?;
		}

		Ok(())
	}
}

fn parse(content: &str, format: ConfigFormat) -> Result<QuotingConfig, ConfigError> {
	match format {
		ConfigFormat::Toml => toml::from_str(content)
			.map_err(|e| ConfigError::ParseError(format!("Failed to parse TOML: {}", e))),
		ConfigFormat::Json => serde_json::from_str(content)
			.map_err(|e| ConfigError::ParseError(format!("Failed to parse JSON: {}", e))),
		ConfigFormat::Yaml => serde_yaml::from_str(content)
			.map_err(|e| ConfigError::ParseError(format!("Failed to parse YAML: {}", e))),
	}
}

fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;
	let mut result = content.to_string();

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

fn validate_config(config: &QuotingConfig) -> Result<(), ConfigError> {
	if config.service.name.trim().is_empty() {
		return Err(ConfigError::ValidationError(
			"Service name must not be empty".to_string(),
		));
	}

	if config.service.max_batch_size == 0 {
		return Err(ConfigError::ValidationError(
			"max_batch_size must be greater than zero".to_string(),
		));
	}

	if config.cache.enabled && config.cache.ttl_secs == 0 {
		return Err(ConfigError::ValidationError(
			"Cache TTL must be greater than zero when the cache is enabled".to_string(),
		));
	}

	for currency in &config.scheme_rules.currencies {
		if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
			return Err(ConfigError::ValidationError(format!(
				"Invalid currency code in scheme rules: {}",
				currency
			)));
		}
	}

	check_backend("storage", &config.storage, &KNOWN_STORAGE_BACKENDS)?;
	check_backend("participants", &config.participants, &KNOWN_DIRECTORY_BACKENDS)?;
	check_backend(
		"account_lookup",
		&config.account_lookup,
		&KNOWN_DIRECTORY_BACKENDS,
	)?;

	Ok(())
}

fn check_backend(section: &str, backend: &BackendConfig, known: &[&str]) -> Result<(), ConfigError> {
	if !known.contains(&backend.backend.as_str()) {
		return Err(ConfigError::ValidationError(format!(
			"Unknown {} backend '{}', expected one of {:?}",
			section, backend.backend, known
		)));
	}

	if backend.backend == "http" && backend.config.get("base_url").is_none() {
		return Err(ConfigError::ValidationError(format!(
			"{} backend 'http' requires config.base_url",
			section
		)));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const MINIMAL: &str = r#"
[service]
name = "quoting-test"

[storage]
backend = "memory"

[participants]
backend = "static"

[account_lookup]
backend = "static"
"#;

	fn loader(prefix: &str) -> ConfigLoader {
		ConfigLoader::new().with_env_prefix(prefix)
	}

	#[test]
	fn defaults_apply_to_minimal_config() {
		let config = loader("QUOTING_TEST_DEFAULTS_")
			.load_from_str(MINIMAL, ConfigFormat::Toml)
			.unwrap();

		assert_eq!(config.service.http_port, 3033);
		assert_eq!(config.service.max_batch_size, 500);
		assert_eq!(config.service.log_format, LogFormat::Pretty);
		assert!(!config.service.pass_through_mode);
		assert!(config.cache.enabled);
		assert_eq!(config.cache.ttl_secs, 30);
		assert!(config.scheme_rules.currencies.is_empty());
	}

	#[test]
	fn env_overrides_take_precedence() {
		env::set_var("QUOTING_TEST_OVERRIDE_HTTP_PORT", "4040");
		env::set_var("QUOTING_TEST_OVERRIDE_PASS_THROUGH_MODE", "true");

		let config = loader("QUOTING_TEST_OVERRIDE_")
			.load_from_str(MINIMAL, ConfigFormat::Toml)
			.unwrap();

		assert_eq!(config.service.http_port, 4040);
		assert!(config.service.pass_through_mode);
	}

	#[test]
	fn invalid_port_override_is_rejected() {
		env::set_var("QUOTING_TEST_BADPORT_HTTP_PORT", "not-a-port");

		let result = loader("QUOTING_TEST_BADPORT_").load_from_str(MINIMAL, ConfigFormat::Toml);
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}

	#[test]
	fn substitutes_environment_references() {
		env::set_var("QUOTING_TEST_SERVICE_NAME", "from-env");
		let content = MINIMAL.replace("quoting-test", "${QUOTING_TEST_SERVICE_NAME}");

		let config = loader("QUOTING_TEST_SUBST_")
			.load_from_str(&content, ConfigFormat::Toml)
			.unwrap();
		assert_eq!(config.service.name, "from-env");
	}

	#[test]
	fn missing_environment_reference_fails() {
		let content = MINIMAL.replace("quoting-test", "${QUOTING_TEST_DEFINITELY_UNSET}");

		let result = loader("QUOTING_TEST_UNSET_").load_from_str(&content, ConfigFormat::Toml);
		assert!(matches!(result, Err(ConfigError::EnvVarNotFound(name)) if name == "QUOTING_TEST_DEFINITELY_UNSET"));
	}

	#[test]
	fn rejects_unknown_backend() {
		let content = MINIMAL.replace("backend = \"memory\"", "backend = \"redis\"");

		let result = loader("QUOTING_TEST_BACKEND_").load_from_str(&content, ConfigFormat::Toml);
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}

	#[test]
	fn rejects_malformed_currency() {
		let content = format!("{}\n[scheme_rules]\ncurrencies = [\"usd\"]\n", MINIMAL);

		let result = loader("QUOTING_TEST_CURRENCY_").load_from_str(&content, ConfigFormat::Toml);
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}

	#[test]
	fn rejects_zero_cache_ttl_when_enabled() {
		let content = format!("{}\n[cache]\nenabled = true\nttl_secs = 0\n", MINIMAL);

		let result = loader("QUOTING_TEST_TTL_").load_from_str(&content, ConfigFormat::Toml);
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}

	#[test]
	fn http_backend_requires_base_url() {
		let content = MINIMAL.replace(
			"[participants]\nbackend = \"static\"",
			"[participants]\nbackend = \"http\"",
		);

		let result = loader("QUOTING_TEST_HTTP_").load_from_str(&content, ConfigFormat::Toml);
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}

	#[test]
	fn parses_json_documents() {
		let content = r#"{
			"service": {"name": "json-quoting", "max_batch_size": 10},
			"storage": {"backend": "memory"},
			"participants": {"backend": "static"},
			"account_lookup": {"backend": "static"}
		}"#;

		let config = loader("QUOTING_TEST_JSON_")
			.load_from_str(content, ConfigFormat::Json)
			.unwrap();
		assert_eq!(config.service.max_batch_size, 10);
	}

	#[tokio::test]
	async fn loads_from_file() {
		let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
		file.write_all(MINIMAL.as_bytes()).unwrap();

		let config = loader("QUOTING_TEST_FILE_")
			.with_file(file.path())
			.load()
			.await
			.unwrap();
		assert_eq!(config.service.name, "quoting-test");
	}

	#[tokio::test]
	async fn missing_file_is_reported() {
		let result = loader("QUOTING_TEST_NOFILE_")
			.with_file("/nonexistent/quoting.toml")
			.load()
			.await;
		assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
	}
}
