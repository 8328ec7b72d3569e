// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The policy table: role → rule construction function.
//!
//! The standard table is built once, on first use, and never mutated. Every
//! [`Role`] is covered by the exhaustive match in [`roles::policy_for`], so a
//! new role without a policy does not compile. Tables assembled by hand (for
//! tests or alternative deployments) may still lack a role; resolving it
//! fails with [`AuthzError::UnrecognizedRole`] instead of defaulting to an
//! empty or full rule set.

pub mod roles;

use std::collections::HashMap;
use std::sync::LazyLock;

use tracing::debug;

use super::builder::AbilityBuilder;
use super::engine::Ability;
use crate::error::{AuthzError, Result};
use crate::types::{Actor, Role};

/// Populates a builder with one role's rules, capturing the actor's id
/// into any ownership conditions.
pub type PolicyFn = fn(&Actor, &mut AbilityBuilder);

static STANDARD: LazyLock<PolicyTable> = LazyLock::new(PolicyTable::standard);

/// Immutable mapping from role to policy function.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
	entries: HashMap<Role, PolicyFn>,
}

impl PolicyTable {
	/// A table with no roles; every resolve fails.
	pub fn empty() -> Self {
		Self::default()
	}

	/// The production policy for every role.
	pub fn standard() -> Self {
		Role::all()
			.iter()
			.fold(Self::empty(), |table, role| {
				table.with_policy(*role, roles::policy_for(*role))
			})
	}

	/// Registers (or replaces) a role's policy while assembling the table.
	pub fn with_policy(mut self, role: Role, policy: PolicyFn) -> Self {
		self.entries.insert(role, policy);
		self
	}

	pub fn resolve(&self, role: Role) -> Result<PolicyFn> {
		self.entries
			.get(&role)
			.copied()
			.ok_or_else(|| AuthzError::UnrecognizedRole(role.to_string()))
	}

	/// Resolves a raw role string as read from a membership record.
	pub fn resolve_named(&self, role: &str) -> Result<PolicyFn> {
		self.resolve(role.parse()?)
	}

	pub fn contains(&self, role: Role) -> bool {
		self.entries.contains_key(&role)
	}

	/// Registered roles, in [`Role::all`] order.
	pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
		Role::all().iter().copied().filter(|role| self.contains(*role))
	}

	/// Builds the ability for `actor` from this table.
	pub fn build(&self, actor: &Actor) -> Result<Ability> {
		let policy = self.resolve(actor.role)?;
		let mut builder = AbilityBuilder::for_actor(*actor);
		policy(actor, &mut builder);
		debug!(
			user_id = %actor.id,
			role = %actor.role,
			rules = builder.len(),
			"policy applied"
		);
		builder.build()
	}
}

/// The process-wide standard table.
pub fn standard_table() -> &'static PolicyTable {
	&STANDARD
}

/// Builds an actor's ability from the standard table.
pub fn build_ability(actor: &Actor) -> Result<Ability> {
	STANDARD.build(actor)
}
