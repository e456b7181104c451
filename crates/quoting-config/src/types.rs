//! Configuration types for the quoting service.

use serde::{Deserialize, Serialize};

/// Complete service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotingConfig {
	/// Service identity and runtime switches
	pub service: ServiceSettings,
	/// Scheme rules applied to amounts
	#[serde(default)]
	pub scheme_rules: SchemeRulesConfig,
	/// Quote persistence backend
	pub storage: BackendConfig,
	/// Read-through cache in front of the repositories
	#[serde(default)]
	pub cache: CacheConfig,
	/// Participant directory backend
	pub participants: BackendConfig,
	/// Account lookup backend
	pub account_lookup: BackendConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceSettings {
	pub name: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	#[serde(default)]
	pub log_format: LogFormat,
	#[serde(default = "default_http_port")]
	pub http_port: u16,
	/// Forward outcomes without persisting or reading quotes.
	#[serde(default)]
	pub pass_through_mode: bool,
	/// Largest batch accepted on the message endpoint.
	#[serde(default = "default_max_batch_size")]
	pub max_batch_size: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SchemeRulesConfig {
	/// Accepted ISO 4217 codes. Empty accepts any currency.
	#[serde(default)]
	pub currencies: Vec<String>,
}

/// A pluggable backend chosen by name, with backend-specific settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
	pub backend: String,
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
	#[serde(default = "default_true")]
	pub enabled: bool,
	#[serde(default = "default_cache_ttl")]
	pub ttl_secs: u64,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			ttl_secs: default_cache_ttl(),
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_http_port() -> u16 {
	3033
}

fn default_max_batch_size() -> usize {
	500
}

fn default_cache_ttl() -> u64 {
	30
}

fn default_true() -> bool {
	true
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}
