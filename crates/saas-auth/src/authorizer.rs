// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Service-level entry point for request handlers.
//!
//! [`Authorizer`] owns a shared, read-only [`PolicyTable`] and the settings
//! loaded at startup. Handlers build one ability per request through it:
//!
//! ```
//! use saas_auth::{Action, Actor, Authorizer, OrgId, PolicySettings, UserId};
//! use saas_auth::TaggedInstance;
//!
//! let authorizer = Authorizer::standard(PolicySettings::default());
//! let actor = Actor::from_membership(UserId::generate(), "ADMIN")?;
//! let organization = TaggedInstance::organization(OrgId::generate(), UserId::generate());
//!
//! let ability = authorizer.ability_for(&actor)?;
//! if ability.cannot(Action::Update, &organization)? {
//!     // respond 401 "You're not allowed to update this organization."
//! }
//! # Ok::<(), saas_auth::AuthzError>(())
//! ```

use std::sync::Arc;

use tracing::{info, instrument};

use crate::abac::{standard_table, Ability, Action, AuthSubject, PolicyTable};
use crate::error::Result;
use crate::types::{Actor, Role, UserId};

/// Runtime switches for ability construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySettings {
	/// Log every decision under the `saas_auth::audit` target.
	pub audit_decisions: bool,
}

#[derive(Debug, Clone)]
enum SharedTable {
	Standard(&'static PolicyTable),
	Custom(Arc<PolicyTable>),
}

/// Builds abilities from a shared policy table.
#[derive(Debug, Clone)]
pub struct Authorizer {
	table: SharedTable,
	settings: PolicySettings,
}

impl Authorizer {
	pub fn new(table: PolicyTable, settings: PolicySettings) -> Self {
		Self {
			table: SharedTable::Custom(Arc::new(table)),
			settings,
		}
	}

	/// Uses the process-wide standard table; no copy is made.
	pub fn standard(settings: PolicySettings) -> Self {
		Self {
			table: SharedTable::Standard(standard_table()),
			settings,
		}
	}

	pub fn settings(&self) -> &PolicySettings {
		&self.settings
	}

	pub fn table(&self) -> &PolicyTable {
		match &self.table {
			SharedTable::Standard(table) => table,
			SharedTable::Custom(table) => table,
		}
	}

	pub fn ability_for(&self, actor: &Actor) -> Result<Ability> {
		Ok(self
			.table()
			.build(actor)?
			.with_audit(self.settings.audit_decisions))
	}

	/// One-shot check against a domain record.
	pub fn check(&self, actor: &Actor, action: Action, subject: &impl AuthSubject) -> Result<bool> {
		let instance = subject.to_subject();
		self.ability_for(actor)?.can(action, &instance)
	}

	/// Builds every registered role's ability for a throwaway actor.
	///
	/// Meant for startup: a policy that references an undefined action or
	/// attribute surfaces here instead of on the first request. Returns the
	/// rule count per role.
	#[instrument(level = "debug", skip(self))]
	pub fn validate(&self) -> Result<Vec<(Role, usize)>> {
		let user = UserId::generate();
		let mut counts = Vec::new();
		let table = self.table();
		for role in table.roles() {
			let ability = table.build(&Actor::new(user, role))?;
			counts.push((role, ability.rules().len()));
		}
		info!(roles = counts.len(), "policy table validated");
		Ok(counts)
	}
}
