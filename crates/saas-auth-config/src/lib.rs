// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the saas-auth ability engine.
//!
//! This crate provides:
//! - Layered configuration from defaults, a TOML file, and the environment
//! - Consistent environment variable naming (`SAAS_AUTH_*`)
//! - Cross-field validation run once at load time
//!
//! # Usage
//!
//! ```ignore
//! use saas_auth_config::load_config;
//!
//! let config = load_config()?;
//! println!("auditing decisions: {}", config.policy.audit_decisions);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::AuthConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH,
};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthConfig {
	pub logging: LoggingConfig,
	pub policy: PolicyConfig,
}

impl AuthConfig {
	/// Logs the resolved settings at info level.
	///
	/// Binaries that install their subscriber from this config call it again
	/// once logging is up, since the load itself runs before any subscriber.
	pub fn log_summary(&self) {
		info!(
			log_level = %self.logging.level,
			log_json = self.logging.json,
			audit_decisions = self.policy.audit_decisions,
			environment = %self.policy.environment,
			"Authorization configuration loaded"
		);
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`SAAS_AUTH_*`)
/// 2. Config file (`/etc/saas-auth/config.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<AuthConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<AuthConfig, ConfigError> {
	load_from_sources(vec![Box::new(EnvSource)])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<AuthConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge sources in precedence order and finalize.
pub fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<AuthConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = AuthConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: AuthConfigLayer) -> Result<AuthConfig, ConfigError> {
	let logging = layer.logging.unwrap_or_default().finalize();
	let policy = layer.policy.unwrap_or_default().finalize();

	validate_config(&logging, &policy)?;

	let config = AuthConfig { logging, policy };
	config.log_summary();
	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(logging: &LoggingConfig, policy: &PolicyConfig) -> Result<(), ConfigError> {
	if policy.is_production() && logging.enables_trace() {
		return Err(ConfigError::Validation(
			"SAAS_AUTH_LOG_LEVEL enables trace while SAAS_AUTH_ENV=production. \
			 Trace-level evaluation spans record owner identifiers. Lower the log level \
			 or set SAAS_AUTH_ENV to a non-production value."
				.to_string(),
		));
	}

	Ok(())
}
