// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

use crate::abac::{Action, SubjectType};

pub type Result<T> = std::result::Result<T, AuthzError>;

/// Errors raised while wiring policies or evaluating queries.
///
/// An authorization denial is never an error; `can` returns `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
	/// The role has no entry in the policy table, or names no known role.
	#[error("no policy registered for role '{0}'")]
	UnrecognizedRole(String),

	/// A rule references an action or attribute its subject does not define.
	#[error("invalid rule #{index}: {reason}")]
	InvalidRule { index: usize, reason: String },

	#[error("unknown action '{0}'")]
	UnknownAction(String),

	#[error("unknown subject type '{0}'")]
	UnknownSubject(String),

	#[error("action '{action}' is not defined for subject '{subject}'")]
	InvalidQuery {
		action: Action,
		subject: SubjectType,
	},

	#[error("invalid subject instance: {0}")]
	InvalidInstance(String),
}

impl AuthzError {
	/// Returns true for policy wiring faults that should abort startup.
	pub fn is_configuration_error(&self) -> bool {
		matches!(
			self,
			AuthzError::UnrecognizedRole(_) | AuthzError::InvalidRule { .. }
		)
	}

	/// Returns true for malformed queries (a caller bug, not a denial).
	pub fn is_query_error(&self) -> bool {
		matches!(
			self,
			AuthzError::UnknownAction(_)
				| AuthzError::UnknownSubject(_)
				| AuthzError::InvalidQuery { .. }
				| AuthzError::InvalidInstance(_)
		)
	}
}
