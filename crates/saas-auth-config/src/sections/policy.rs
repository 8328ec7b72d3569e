// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy evaluation configuration.

use serde::{Deserialize, Serialize};

fn default_environment() -> String {
	"development".to_string()
}

/// Policy configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfigLayer {
	#[serde(default)]
	pub audit_decisions: Option<bool>,
	#[serde(default)]
	pub environment: Option<String>,
}

impl PolicyConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.audit_decisions.is_some() {
			self.audit_decisions = other.audit_decisions;
		}
		if other.environment.is_some() {
			self.environment = other.environment;
		}
	}

	pub fn finalize(self) -> PolicyConfig {
		PolicyConfig {
			audit_decisions: self.audit_decisions.unwrap_or(false),
			environment: self.environment.unwrap_or_else(default_environment),
		}
	}
}

/// Policy configuration (runtime, fully resolved).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfig {
	/// Log every allow/deny decision under the `saas_auth::audit` target.
	pub audit_decisions: bool,
	pub environment: String,
}

impl PolicyConfig {
	pub fn is_production(&self) -> bool {
		self.environment.eq_ignore_ascii_case("production")
	}
}

impl Default for PolicyConfig {
	fn default() -> Self {
		Self {
			audit_decisions: false,
			environment: default_environment(),
		}
	}
}
