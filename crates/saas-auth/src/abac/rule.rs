// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant/revoke rules and their condition predicates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::instance::TaggedInstance;
use super::types::{Action, Attribute, SubjectType};
use crate::types::UserId;

/// Whether a matching rule allows or denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
	Grant,
	Revoke,
}

impl Effect {
	pub fn allows(self) -> bool {
		matches!(self, Effect::Grant)
	}
}

/// A typed predicate over one attribute of a subject instance.
///
/// Values are captured when the rule is authored; nothing is re-resolved at
/// evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
	/// `attribute == value`
	Eq { attribute: Attribute, value: Uuid },
}

impl Condition {
	pub fn equals(attribute: Attribute, value: impl Into<Uuid>) -> Self {
		Condition::Eq {
			attribute,
			value: value.into(),
		}
	}

	/// `ownerId == user`
	pub fn owned_by(user: UserId) -> Self {
		Self::equals(Attribute::OwnerId, user)
	}

	pub fn attribute(&self) -> Attribute {
		match self {
			Condition::Eq { attribute, .. } => *attribute,
		}
	}

	/// A missing attribute never satisfies a predicate.
	pub fn matches(&self, instance: &TaggedInstance) -> bool {
		match self {
			Condition::Eq { attribute, value } => instance.attribute(*attribute) == Some(*value),
		}
	}
}

/// One authored permission rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
	pub effect: Effect,
	pub actions: Vec<Action>,
	pub subject: SubjectType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub condition: Option<Condition>,
}

impl Rule {
	pub fn new(effect: Effect, actions: impl IntoIterator<Item = Action>, subject: SubjectType) -> Self {
		let mut deduped = Vec::new();
		for action in actions {
			if !deduped.contains(&action) {
				deduped.push(action);
			}
		}
		Self {
			effect,
			actions: deduped,
			subject,
			condition: None,
		}
	}

	pub fn is_conditional(&self) -> bool {
		self.condition.is_some()
	}

	/// Subject is the queried type or `all`.
	pub fn covers_subject(&self, subject: SubjectType) -> bool {
		self.subject.is_wildcard() || self.subject == subject
	}

	/// Action is listed, or the rule lists `manage`.
	pub fn covers_action(&self, action: Action) -> bool {
		self.actions
			.iter()
			.any(|a| *a == action || *a == Action::Manage)
	}

	/// Checks the rule against the subject registry.
	pub(crate) fn validate(&self) -> Result<(), String> {
		if self.actions.is_empty() {
			return Err(format!("no actions given for subject '{}'", self.subject));
		}

		if let Some(action) = self
			.actions
			.iter()
			.find(|a| !self.subject.supports_action(**a))
		{
			return Err(format!(
				"action '{action}' is not defined for subject '{}'",
				self.subject
			));
		}

		if let Some(condition) = &self.condition {
			let attribute = condition.attribute();
			if !self.subject.supports_attribute(attribute) {
				return Err(format!(
					"subject '{}' has no attribute '{attribute}'",
					self.subject
				));
			}
		}

		Ok(())
	}
}
