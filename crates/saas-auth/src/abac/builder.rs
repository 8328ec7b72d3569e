// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rule accumulation.
//!
//! Policy functions receive `&mut AbilityBuilder` and append rules in the
//! order they should be evaluated. Only the owner of the builder can call
//! [`AbilityBuilder::build`], which consumes it, so a builder cannot be
//! reused once its ability exists.

use tracing::debug;

use super::engine::Ability;
use super::rule::{Condition, Effect, Rule};
use super::types::{Action, SubjectType};
use crate::error::{AuthzError, Result};
use crate::types::Actor;

/// Collects grant and revoke rules for one actor.
#[derive(Debug, Default)]
pub struct AbilityBuilder {
	actor: Option<Actor>,
	rules: Vec<Rule>,
}

impl AbilityBuilder {
	/// Creates a builder not tied to any actor.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a builder whose ability records the actor it was built for.
	pub fn for_actor(actor: Actor) -> Self {
		Self {
			actor: Some(actor),
			rules: Vec::new(),
		}
	}

	/// Appends a grant rule.
	pub fn grant(
		&mut self,
		actions: impl IntoIterator<Item = Action>,
		subject: SubjectType,
	) -> RuleRef<'_> {
		self.push(Rule::new(Effect::Grant, actions, subject))
	}

	/// Appends a revoke rule.
	pub fn revoke(
		&mut self,
		actions: impl IntoIterator<Item = Action>,
		subject: SubjectType,
	) -> RuleRef<'_> {
		self.push(Rule::new(Effect::Revoke, actions, subject))
	}

	fn push(&mut self, rule: Rule) -> RuleRef<'_> {
		self.rules.push(rule);
		let index = self.rules.len() - 1;
		RuleRef {
			rule: &mut self.rules[index],
		}
	}

	pub fn rules(&self) -> &[Rule] {
		&self.rules
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}

	/// Validates every rule against the subject registry and freezes them.
	pub fn build(self) -> Result<Ability> {
		for (index, rule) in self.rules.iter().enumerate() {
			rule.validate()
				.map_err(|reason| AuthzError::InvalidRule { index, reason })?;
		}

		debug!(
			user_id = ?self.actor.map(|a| a.id),
			rules = self.rules.len(),
			"ability built"
		);

		Ok(Ability::new(self.rules, self.actor))
	}
}

/// Handle to the rule just appended.
#[derive(Debug)]
pub struct RuleRef<'a> {
	rule: &'a mut Rule,
}

impl RuleRef<'_> {
	/// Scopes the rule to instances satisfying `condition`.
	pub fn when(self, condition: Condition) {
		self.rule.condition = Some(condition);
	}
}
