// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-role rule sets.

use super::PolicyFn;
use crate::abac::builder::AbilityBuilder;
use crate::abac::rule::Condition;
use crate::abac::types::{Action, SubjectType};
use crate::types::{Actor, Role};

pub fn policy_for(role: Role) -> PolicyFn {
	match role {
		Role::Admin => admin,
		Role::Member => member,
		Role::Billing => billing,
	}
}

/// Everything, except updating or transferring organizations the admin does
/// not own. The revoke must precede the owner grant.
pub fn admin(actor: &Actor, builder: &mut AbilityBuilder) {
	let ownership = [Action::TransferOwnership, Action::Update];

	builder.grant([Action::Manage], SubjectType::All);
	builder.revoke(ownership, SubjectType::Organization);
	builder
		.grant(ownership, SubjectType::Organization)
		.when(Condition::owned_by(actor.id));
}

/// Reads users, creates and reads projects, updates only owned projects.
pub fn member(actor: &Actor, builder: &mut AbilityBuilder) {
	builder.grant([Action::Get], SubjectType::User);
	builder.grant([Action::Create, Action::Get], SubjectType::Project);
	// `create` is already unconditional; kept so the owner rule mirrors `update`.
	builder
		.grant([Action::Create, Action::Update], SubjectType::Project)
		.when(Condition::owned_by(actor.id));
}

pub fn billing(_actor: &Actor, builder: &mut AbilityBuilder) {
	builder.grant([Action::Manage], SubjectType::Billing);
}
